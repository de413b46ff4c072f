//! Shared data types for the sealer engine: secrets, key material, scalars and shares.

use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::Zeroizing;

/// The wallet secret currently selected by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveSecret {
    /// Stable id assigned by the secret store.
    pub id: String,
    /// Human readable label, used as the sealer identity.
    pub label: String,
}

impl ActiveSecret {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Entropy of a secret. Zeroized on drop.
#[derive(Clone)]
pub struct Entropy(Zeroizing<Vec<u8>>);

impl Entropy {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Entropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entropy([REDACTED; {}])", self.0.len())
    }
}

/// Opaque group parameters produced by the primitive library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupParams(pub Value);

/// Opaque public key produced by the primitive library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKey(pub Value);

/// Opaque secret key bytes produced by the primitive library. Zeroized on drop.
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Everything `setup_from_entropy` returns. Lives for exactly one orchestration run.
#[derive(Debug)]
pub struct KeyMaterial {
    /// Group order `q`, as the primitive encodes it.
    pub order: String,
    pub params: GroupParams,
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

/// A freshly sampled scalar `r` with `0 <= r < q`. Stored as big-endian bytes so it
/// can be zeroized; never reuse one across primitive calls.
pub struct SecureScalar {
    bytes: Zeroizing<Vec<u8>>,
    draw_len: usize,
}

impl SecureScalar {
    pub(crate) fn new(value: &BigUint, draw_len: usize) -> Self {
        Self {
            bytes: Zeroizing::new(value.to_bytes_be()),
            draw_len,
        }
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.bytes)
    }

    /// Decimal encoding, the form the primitive library accepts.
    pub fn to_decimal(&self) -> Zeroizing<String> {
        let value = Zeroizing::new(self.to_biguint());
        Zeroizing::new(value.to_str_radix(10))
    }

    /// Number of random bytes drawn for the final (accepted) value.
    pub fn draw_len(&self) -> usize {
        self.draw_len
    }
}

impl fmt::Debug for SecureScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureScalar([REDACTED], draw_len: {})", self.draw_len)
    }
}

/// One ElGamal ciphertext `(a, b)`, both group elements as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub a: String,
    pub b: String,
}

/// The batch of ciphertexts a sealer is asked to partially decrypt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptionBatch(pub Vec<Ciphertext>);

impl EncryptionBatch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Keygen output as the primitive returns it, before sealer tagging.
pub type RawKeyShare = Map<String, Value>;

/// Decrypt output as the primitive returns it, before sealer tagging.
pub type RawDecryptionBatch = Map<String, Value>;

/// Public key share of one sealer: raw keygen fields plus `sealer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyShare {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub sealer: String,
}

impl PublicKeyShare {
    /// Merge the sealer label into a raw share. The label wins over any `sealer` key
    /// the primitive emitted.
    pub fn tag(mut raw: RawKeyShare, sealer: &str) -> Self {
        raw.remove("sealer");
        Self {
            fields: raw,
            sealer: sealer.to_string(),
        }
    }
}

/// Partial decryption share of one sealer: raw decrypt fields plus `sealer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialDecryptionShare {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub sealer: String,
}

impl PartialDecryptionShare {
    pub fn tag(mut raw: RawDecryptionBatch, sealer: &str) -> Self {
        raw.remove("sealer");
        Self {
            fields: raw,
            sealer: sealer.to_string(),
        }
    }
}
