//! Messages handed to the interaction layer that signs and relays between devices.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SealerResult;

/// Routing hint for the receiving party's handler. One fixed value per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolTag {
    /// Carries public key shares.
    Xtz,
    /// Carries partial decryptions.
    Eth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    MessageSignResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionOperation {
    MessageSignRequest,
}

/// Payload of an envelope. `public_key` and `signature` stay empty here; the
/// interaction layer fills them when it signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    pub message: String,
    pub public_key: String,
    pub signature: String,
}

impl SignedMessage {
    pub fn unsigned(message: String) -> Self {
        Self {
            message,
            public_key: String::new(),
            signature: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessageEnvelope {
    pub id: u32,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub protocol: ProtocolTag,
    pub payload: SignedMessage,
}

/// What the interaction layer's "start interaction" entry point receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequest {
    pub operation_type: InteractionOperation,
    pub iac_message: Vec<SignedMessageEnvelope>,
    pub message_sign_response: SignedMessage,
}

impl InteractionRequest {
    pub fn protocol(&self) -> Option<ProtocolTag> {
        self.iac_message.first().map(|envelope| envelope.protocol)
    }
}

/// Interaction/transport collaborator.
#[async_trait]
pub trait InteractionTransport: Send + Sync {
    /// Fails with `TransportFailure`.
    async fn start_interaction(&self, request: InteractionRequest) -> SealerResult<()>;
}
