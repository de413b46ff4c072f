//! Wraps orchestration results into interaction requests and hands them off.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::SealerConfig;
use crate::error::SealerResult;
use crate::interaction::{
    InteractionOperation, InteractionRequest, InteractionTransport, MessageType, ProtocolTag,
    SignedMessage, SignedMessageEnvelope,
};
use crate::types::{PartialDecryptionShare, PublicKeyShare};

/// Routing tag for public key shares.
pub const KEYGEN_PROTOCOL: ProtocolTag = ProtocolTag::Xtz;
/// Routing tag for partial decryptions.
pub const DECRYPTION_PROTOCOL: ProtocolTag = ProtocolTag::Eth;

pub struct ResultPackager {
    transport: Arc<dyn InteractionTransport>,
    envelope_id: u32,
}

impl ResultPackager {
    pub fn new(transport: Arc<dyn InteractionTransport>, config: &SealerConfig) -> Self {
        Self {
            transport,
            envelope_id: config.envelope_id,
        }
    }

    /// Serialize `payload` into an unsigned envelope wrapped in an interaction request.
    pub fn package<T: Serialize>(
        &self,
        payload: &T,
        protocol: ProtocolTag,
        operation: InteractionOperation,
    ) -> SealerResult<InteractionRequest> {
        let message = SignedMessage::unsigned(serde_json::to_string(payload)?);
        let envelope = SignedMessageEnvelope {
            id: self.envelope_id,
            message_type: MessageType::MessageSignResponse,
            protocol,
            payload: message.clone(),
        };

        Ok(InteractionRequest {
            operation_type: operation,
            iac_message: vec![envelope],
            message_sign_response: message,
        })
    }

    pub async fn emit_keygen(&self, share: &PublicKeyShare) -> SealerResult<()> {
        let request = self.package(share, KEYGEN_PROTOCOL, InteractionOperation::MessageSignRequest)?;
        self.emit(request, &share.sealer).await
    }

    pub async fn emit_partial_decryption(&self, share: &PartialDecryptionShare) -> SealerResult<()> {
        let request =
            self.package(share, DECRYPTION_PROTOCOL, InteractionOperation::MessageSignRequest)?;
        self.emit(request, &share.sealer).await
    }

    async fn emit(&self, request: InteractionRequest, sealer: &str) -> SealerResult<()> {
        let protocol = request.protocol();
        match self.transport.start_interaction(request).await {
            Ok(()) => {
                info!(sealer, ?protocol, "interaction started");
                Ok(())
            }
            Err(e) => {
                warn!(sealer, ?protocol, error = %e, "interaction failed");
                Err(e)
            }
        }
    }
}
