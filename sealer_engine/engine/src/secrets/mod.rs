pub mod memory;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::SealerResult;
use crate::types::{ActiveSecret, Entropy};

/// Secret-management collaborator: publishes the active secret and unlocks entropy.
///
/// Implementations own persistence and mnemonic handling; the engine only observes.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Watch the active secret. `None` until the user selects one.
    fn active_secret(&self) -> watch::Receiver<Option<ActiveSecret>>;

    /// Entropy for `secret`. Fails with `EntropyUnavailable` if it cannot be unlocked.
    async fn retrieve_entropy(&self, secret: &ActiveSecret) -> SealerResult<Entropy>;
}
