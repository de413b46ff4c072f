use std::sync::Arc;

use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};

use crate::config::SealerConfig;
use crate::error::SealerResult;
use crate::interaction::InteractionTransport;
use crate::orchestrator::ThresholdOrchestrator;
use crate::packager::ResultPackager;
use crate::primitive::ElGamalPrimitive;
use crate::secrets::SecretStore;
use crate::types::{EncryptionBatch, PartialDecryptionShare, PublicKeyShare};

/// One sealer device: runs an operation and hands its own result to the packager.
pub struct Sealer<R = OsRng> {
    orchestrator: Arc<ThresholdOrchestrator<R>>,
    packager: ResultPackager,
}

impl Sealer<OsRng> {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        primitive: Arc<dyn ElGamalPrimitive>,
        transport: Arc<dyn InteractionTransport>,
        config: SealerConfig,
    ) -> Self {
        let packager = ResultPackager::new(transport, &config);
        let orchestrator = ThresholdOrchestrator::new(secrets, primitive, config);
        Self::from_parts(Arc::new(orchestrator), packager)
    }
}

impl<R> Sealer<R>
where
    R: RngCore + CryptoRng + Send + 'static,
{
    pub fn from_parts(orchestrator: Arc<ThresholdOrchestrator<R>>, packager: ResultPackager) -> Self {
        Self {
            orchestrator,
            packager,
        }
    }

    pub fn orchestrator(&self) -> &Arc<ThresholdOrchestrator<R>> {
        &self.orchestrator
    }

    /// Keygen for the active secret, then start the sign interaction for the share.
    /// Nothing is emitted if the run fails.
    pub async fn keygen_and_emit(&self) -> SealerResult<PublicKeyShare> {
        let share = self.orchestrator.run_keygen().await?;
        self.packager.emit_keygen(&share).await?;
        Ok(share)
    }

    /// Partial decryption for the active secret, then start the sign interaction.
    pub async fn decrypt_and_emit(
        &self,
        encryptions: &EncryptionBatch,
    ) -> SealerResult<PartialDecryptionShare> {
        let share = self.orchestrator.run_partial_decryption(encryptions).await?;
        self.packager.emit_partial_decryption(&share).await?;
        Ok(share)
    }
}
