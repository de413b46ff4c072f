use std::collections::HashMap;
use std::sync::RwLock;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::sync::watch;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{SealerError, SealerResult};
use crate::secrets::SecretStore;
use crate::types::{ActiveSecret, Entropy};

/// Entropy sealed with AES-GCM
struct SealedEntropy {
    label: String,
    ciphertext: Vec<u8>,
    nonce: [u8; 12],
    locked: bool,
}

/// In-process secret store. Entropy is sealed under a per-process key that never
/// leaves this struct, simulating TEE sealing.
pub struct MemorySecretStore {
    store: RwLock<HashMap<String, SealedEntropy>>,
    cipher: Aes256Gcm,
    active: watch::Sender<Option<ActiveSecret>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut key[..]);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
        let (active, _) = watch::channel(None);

        MemorySecretStore {
            store: RwLock::new(HashMap::new()),
            cipher,
            active,
        }
    }

    /// Seal `entropy` under a fresh id. The secret is not activated.
    pub fn add_secret(&self, label: &str, entropy: &[u8]) -> SealerResult<ActiveSecret> {
        let id = uuid::Uuid::new_v4().to_string();

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), entropy)
            .map_err(|e| SealerError::EntropyUnavailable(format!("sealing failed: {e:?}")))?;

        let mut store = self.write()?;
        store.insert(
            id.clone(),
            SealedEntropy {
                label: label.to_string(),
                ciphertext,
                nonce: nonce_bytes,
                locked: false,
            },
        );
        debug!(secret_id = %id, label, "secret added");

        Ok(ActiveSecret::new(id, label))
    }

    /// Make `id` the active secret and notify watchers.
    pub fn activate(&self, id: &str) -> SealerResult<ActiveSecret> {
        let secret = {
            let store = self.read()?;
            let sealed = store
                .get(id)
                .ok_or_else(|| SealerError::EntropyUnavailable(format!("unknown secret {id}")))?;
            ActiveSecret::new(id, sealed.label.clone())
        };
        self.active.send_replace(Some(secret.clone()));
        debug!(secret_id = %id, label = %secret.label, "secret activated");
        Ok(secret)
    }

    /// Clear the active secret.
    pub fn deactivate(&self) {
        self.active.send_replace(None);
    }

    /// Locked secrets keep their sealed entropy but refuse to release it.
    pub fn set_locked(&self, id: &str, locked: bool) -> SealerResult<()> {
        let mut store = self.write()?;
        let sealed = store
            .get_mut(id)
            .ok_or_else(|| SealerError::EntropyUnavailable(format!("unknown secret {id}")))?;
        sealed.locked = locked;
        Ok(())
    }

    fn read(&self) -> SealerResult<std::sync::RwLockReadGuard<'_, HashMap<String, SealedEntropy>>> {
        self.store
            .read()
            .map_err(|_| SealerError::EntropyUnavailable("secret store lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> SealerResult<std::sync::RwLockWriteGuard<'_, HashMap<String, SealedEntropy>>> {
        self.store
            .write()
            .map_err(|_| SealerError::EntropyUnavailable("secret store lock poisoned".into()))
    }
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn active_secret(&self) -> watch::Receiver<Option<ActiveSecret>> {
        self.active.subscribe()
    }

    async fn retrieve_entropy(&self, secret: &ActiveSecret) -> SealerResult<Entropy> {
        let store = self.read()?;
        let sealed = store.get(&secret.id).ok_or_else(|| {
            SealerError::EntropyUnavailable(format!("unknown secret {}", secret.id))
        })?;
        if sealed.locked {
            return Err(SealerError::EntropyUnavailable(format!(
                "secret '{}' is locked",
                sealed.label
            )));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
            .map_err(|e| SealerError::EntropyUnavailable(format!("unsealing failed: {e:?}")))?;

        Ok(Entropy::new(plaintext))
    }
}
