//! Capability interface to the external ElGamal primitive library.

pub mod simulated;

use async_trait::async_trait;

use crate::error::SealerResult;
use crate::types::{
    EncryptionBatch, Entropy, GroupParams, KeyMaterial, PublicKey, RawDecryptionBatch,
    RawKeyShare, SecretKey, SecureScalar,
};

/// Every call may suspend; failures surface as `PrimitiveOperationFailed`.
#[async_trait]
pub trait ElGamalPrimitive: Send + Sync {
    /// Load the library. Safe to call repeatedly.
    async fn initialize(&self) -> SealerResult<()>;

    /// Derive the group and this sealer's key pair from secret entropy.
    async fn setup_from_entropy(&self, entropy: &Entropy) -> SealerResult<KeyMaterial>;

    /// Produce this sealer's public key share, using `r` as proof randomness.
    async fn keygen(
        &self,
        r: &SecureScalar,
        sealer: &str,
        params: &GroupParams,
        sk: &SecretKey,
        pk: &PublicKey,
    ) -> SealerResult<RawKeyShare>;

    /// Produce this sealer's partial decryptions of `encryptions`.
    async fn decrypt(
        &self,
        encryptions: &EncryptionBatch,
        sealer: &str,
        r: &SecureScalar,
        params: &GroupParams,
        sk: &SecretKey,
        pk: &PublicKey,
    ) -> SealerResult<RawDecryptionBatch>;
}
