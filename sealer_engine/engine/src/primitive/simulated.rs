//! Simulated ElGamal primitive over a prime-order subgroup of `Z_p*`.
//!
//! Stands in for the native/WASM library in local runs and tests. The group is a safe
//! prime `p = 2q + 1` with a generator `g` of order `q`. Keygen returns the public
//! share `h = g^sk` with a Schnorr proof; decrypt returns `a^sk` per ciphertext with
//! one batched Chaum-Pedersen proof. Both proofs take their randomness from the
//! caller's scalar `r` and bind the sealer label into the challenge.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::{Num, One, Zero};
use serde_json::{Map, Value, json};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{PrimitiveOperation, SealerError, SealerResult};
use crate::primitive::ElGamalPrimitive;
use crate::types::{
    Ciphertext, EncryptionBatch, Entropy, GroupParams, KeyMaterial, PublicKey,
    RawDecryptionBatch, RawKeyShare, SecretKey, SecureScalar,
};

const SECRET_KEY_CONTEXT: &str = "sealer-engine simulated-elgamal 2024 secret key";
const CHALLENGE_CONTEXT: &str = "sealer-engine simulated-elgamal 2024 challenge";

/// RFC 2409 Oakley group 1, 768-bit MODP safe prime.
const OAKLEY_768_P: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
E485B576625E7EC6F44C42E9A63A3620FFFFFFFFFFFFFFFF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
}

impl GroupSpec {
    /// `p = 2039`, `q = 1019`. Small enough to reason about in tests.
    pub fn toy() -> Self {
        Self {
            p: BigUint::from(2039u32),
            q: BigUint::from(1019u32),
            g: BigUint::from(4u32),
        }
    }

    pub fn oakley_768() -> Self {
        let p = BigUint::from_str_radix(OAKLEY_768_P, 16)
            .expect("OAKLEY_768_P is a valid hex constant");
        let q = (&p - 1u32) >> 1usize;
        // 4 is a quadratic residue, so it generates the order-q subgroup
        Self {
            p,
            q,
            g: BigUint::from(4u32),
        }
    }

    pub fn to_params(&self) -> GroupParams {
        GroupParams(json!({
            "p": to_hex(&self.p),
            "q": to_hex(&self.q),
            "g": to_hex(&self.g),
        }))
    }

    pub fn from_params(params: &GroupParams, op: PrimitiveOperation) -> SealerResult<Self> {
        let fields = params
            .0
            .as_object()
            .ok_or_else(|| SealerError::primitive(op, "group params must be an object"))?;
        let group = Self {
            p: hex_field(fields, "p", op)?,
            q: hex_field(fields, "q", op)?,
            g: hex_field(fields, "g", op)?,
        };
        if group.q.is_zero() || group.p <= group.q {
            return Err(SealerError::primitive(op, "malformed group params"));
        }
        Ok(group)
    }

    fn element(&self, value: &BigUint, op: PrimitiveOperation) -> SealerResult<()> {
        if value.is_zero() || value >= &self.p {
            return Err(SealerError::primitive(op, "group element out of range"));
        }
        Ok(())
    }
}

pub struct SimulatedElGamal {
    group: GroupSpec,
    initialized: AtomicBool,
}

impl SimulatedElGamal {
    pub fn new(group: GroupSpec) -> Self {
        Self {
            group,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn group(&self) -> &GroupSpec {
        &self.group
    }

    /// Exponential ElGamal encryption of a small integer under `pk`, with nonce `k`.
    pub fn encrypt(
        params: &GroupParams,
        pk: &PublicKey,
        message: u64,
        k: &BigUint,
    ) -> SealerResult<Ciphertext> {
        let group = GroupSpec::from_params(params, PrimitiveOperation::Decrypt)?;
        let h = public_element(pk, PrimitiveOperation::Decrypt)?;
        let a = group.g.modpow(k, &group.p);
        let b = group.g.modpow(&BigUint::from(message), &group.p) * h.modpow(k, &group.p)
            % &group.p;
        Ok(Ciphertext {
            a: to_hex(&a),
            b: to_hex(&b),
        })
    }

    fn ensure_initialized(&self, op: PrimitiveOperation) -> SealerResult<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(SealerError::primitive(op, "library not initialized"));
        }
        Ok(())
    }

    fn secret_scalar(&self, sk: &SecretKey, op: PrimitiveOperation) -> SealerResult<BigUint> {
        let x = BigUint::from_bytes_be(sk.as_bytes());
        if x.is_zero() {
            return Err(SealerError::primitive(op, "empty secret key"));
        }
        Ok(x)
    }
}

#[async_trait]
impl ElGamalPrimitive for SimulatedElGamal {
    async fn initialize(&self) -> SealerResult<()> {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            debug!(group_bits = self.group.p.bits(), "simulated elgamal initialized");
        }
        Ok(())
    }

    async fn setup_from_entropy(&self, entropy: &Entropy) -> SealerResult<KeyMaterial> {
        self.ensure_initialized(PrimitiveOperation::Setup)?;
        if entropy.as_bytes().is_empty() {
            return Err(SealerError::primitive(PrimitiveOperation::Setup, "empty entropy"));
        }

        let seed = Zeroizing::new(blake3::derive_key(SECRET_KEY_CONTEXT, entropy.as_bytes()));
        let mut x = BigUint::from_bytes_be(&seed[..]) % &self.group.q;
        if x.is_zero() {
            x = BigUint::one();
        }
        let h = self.group.g.modpow(&x, &self.group.p);

        Ok(KeyMaterial {
            order: to_hex(&self.group.q),
            params: self.group.to_params(),
            secret_key: SecretKey::new(x.to_bytes_be()),
            public_key: PublicKey(json!({ "h": to_hex(&h) })),
        })
    }

    async fn keygen(
        &self,
        r: &SecureScalar,
        sealer: &str,
        params: &GroupParams,
        sk: &SecretKey,
        pk: &PublicKey,
    ) -> SealerResult<RawKeyShare> {
        let op = PrimitiveOperation::Keygen;
        self.ensure_initialized(op)?;
        let group = GroupSpec::from_params(params, op)?;
        let x = self.secret_scalar(sk, op)?;
        let h = public_element(pk, op)?;
        let r = r.to_biguint() % &group.q;

        let t = group.g.modpow(&r, &group.p);
        let c = challenge(&group.q, b"keygen", sealer, &[&h, &t]);
        let s = (r + &c * x) % &group.q;

        let share = json!({
            "pk": to_hex(&h),
            "proof": {
                "commitment": to_hex(&t),
                "challenge": to_hex(&c),
                "response": to_hex(&s),
            },
        });
        into_object(share, op)
    }

    async fn decrypt(
        &self,
        encryptions: &EncryptionBatch,
        sealer: &str,
        r: &SecureScalar,
        params: &GroupParams,
        sk: &SecretKey,
        pk: &PublicKey,
    ) -> SealerResult<RawDecryptionBatch> {
        let op = PrimitiveOperation::Decrypt;
        self.ensure_initialized(op)?;
        if encryptions.is_empty() {
            return Err(SealerError::primitive(op, "empty encryption batch"));
        }
        let group = GroupSpec::from_params(params, op)?;
        let x = self.secret_scalar(sk, op)?;
        let h = public_element(pk, op)?;
        let r = r.to_biguint() % &group.q;

        let t1 = group.g.modpow(&r, &group.p);
        let mut transcript = vec![h.clone(), t1.clone()];
        let mut decryptions = Vec::with_capacity(encryptions.len());
        let mut commitments = Vec::with_capacity(encryptions.len());
        for ct in &encryptions.0 {
            let a = parse_hex(&ct.a, op)?;
            group.element(&a, op)?;
            let d = a.modpow(&x, &group.p);
            let t2 = a.modpow(&r, &group.p);
            decryptions.push(to_hex(&d));
            commitments.push(to_hex(&t2));
            transcript.extend([a, d, t2]);
        }

        let refs: Vec<&BigUint> = transcript.iter().collect();
        let c = challenge(&group.q, b"decrypt", sealer, &refs);
        let s = (r + &c * x) % &group.q;

        let batch = json!({
            "decryptions": decryptions,
            "proof": {
                "commitment_g": to_hex(&t1),
                "commitments": commitments,
                "challenge": to_hex(&c),
                "response": to_hex(&s),
            },
        });
        into_object(batch, op)
    }
}

fn challenge(q: &BigUint, domain: &[u8], sealer: &str, elements: &[&BigUint]) -> BigUint {
    let mut hasher = blake3::Hasher::new_derive_key(CHALLENGE_CONTEXT);
    hasher.update(domain);
    hasher.update(&(sealer.len() as u64).to_be_bytes());
    hasher.update(sealer.as_bytes());
    for element in elements {
        let bytes = element.to_bytes_be();
        hasher.update(&(bytes.len() as u64).to_be_bytes());
        hasher.update(&bytes);
    }
    BigUint::from_bytes_be(hasher.finalize().as_bytes()) % q
}

fn to_hex(value: &BigUint) -> String {
    value.to_str_radix(16)
}

fn parse_hex(raw: &str, op: PrimitiveOperation) -> SealerResult<BigUint> {
    BigUint::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| SealerError::primitive(op, format!("bad hex '{raw}': {e}")))
}

fn hex_field(fields: &Map<String, Value>, key: &str, op: PrimitiveOperation) -> SealerResult<BigUint> {
    let raw = fields
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SealerError::primitive(op, format!("missing field '{key}'")))?;
    parse_hex(raw, op)
}

fn public_element(pk: &PublicKey, op: PrimitiveOperation) -> SealerResult<BigUint> {
    let fields = pk
        .0
        .as_object()
        .ok_or_else(|| SealerError::primitive(op, "public key must be an object"))?;
    hex_field(fields, "h", op)
}

fn into_object(value: Value, op: PrimitiveOperation) -> SealerResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SealerError::primitive(op, "primitive returned a non-object")),
    }
}
