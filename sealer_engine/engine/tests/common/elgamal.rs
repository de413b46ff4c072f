//! Verifier side of the simulated ElGamal backend. Recomputes the challenge
//! transcript independently so the tests check the wire format, not just the code
//! that produced it.

use num_bigint::BigUint;
use serde_json::{Map, Value};

use sealer_engine::error::PrimitiveOperation;
use sealer_engine::primitive::simulated::GroupSpec;
use sealer_engine::types::{Ciphertext, EncryptionBatch, GroupParams, PublicKey};

const CHALLENGE_CONTEXT: &str = "sealer-engine simulated-elgamal 2024 challenge";

fn group(params: &GroupParams) -> GroupSpec {
    GroupSpec::from_params(params, PrimitiveOperation::Decrypt).unwrap()
}

fn hex(raw: &str) -> BigUint {
    BigUint::parse_bytes(raw.as_bytes(), 16).unwrap()
}

fn field(fields: &Map<String, Value>, key: &str) -> BigUint {
    hex(fields[key].as_str().unwrap())
}

fn list(fields: &Map<String, Value>, key: &str) -> Vec<BigUint> {
    fields[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| hex(v.as_str().unwrap()))
        .collect()
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

/// Schnorr check of a keygen share against the label bound into its challenge.
pub fn verify_key_share(params: &GroupParams, share: &Map<String, Value>, sealer: &str) -> bool {
    let group = group(params);
    let proof = share["proof"].as_object().unwrap();
    let h = field(share, "pk");
    let t = field(proof, "commitment");
    let c = field(proof, "challenge");
    let s = field(proof, "response");

    c == challenge(&group.q, b"keygen", sealer, &[&h, &t])
        && group.g.modpow(&s, &group.p) == t * h.modpow(&c, &group.p) % &group.p
}

/// Batched Chaum-Pedersen check of a partial decryption.
pub fn verify_partial_decryption(
    params: &GroupParams,
    pk: &PublicKey,
    encryptions: &EncryptionBatch,
    share: &Map<String, Value>,
    sealer: &str,
) -> bool {
    let group = group(params);
    let h = hex(pk.0["h"].as_str().unwrap());
    let proof = share["proof"].as_object().unwrap();
    let decryptions = list(share, "decryptions");
    let commitments = list(proof, "commitments");
    let t1 = field(proof, "commitment_g");
    let c = field(proof, "challenge");
    let s = field(proof, "response");

    if decryptions.len() != encryptions.len() || commitments.len() != encryptions.len() {
        return false;
    }

    let firsts: Vec<BigUint> = encryptions.0.iter().map(|ct| hex(&ct.a)).collect();
    let mut transcript = vec![&h, &t1];
    for ((a, d), t2) in firsts.iter().zip(&decryptions).zip(&commitments) {
        transcript.extend([a, d, t2]);
    }
    if c != challenge(&group.q, b"decrypt", sealer, &transcript) {
        return false;
    }

    if group.g.modpow(&s, &group.p) != &t1 * h.modpow(&c, &group.p) % &group.p {
        return false;
    }
    firsts
        .iter()
        .zip(&decryptions)
        .zip(&commitments)
        .all(|((a, d), t2)| a.modpow(&s, &group.p) == t2 * d.modpow(&c, &group.p) % &group.p)
}

/// Single-sealer combination: strip `decryption` from `b` and search `0..=max` for
/// the exponent.
pub fn recover_message(
    params: &GroupParams,
    ciphertext: &Ciphertext,
    decryption: &str,
    max: u64,
) -> Option<u64> {
    let group = group(params);
    let d = hex(decryption);
    let d_inv = d.modpow(&(&group.p - 2u32), &group.p);
    let target = hex(&ciphertext.b) * d_inv % &group.p;

    let mut acc = BigUint::from(1u8);
    for m in 0..=max {
        if acc == target {
            return Some(m);
        }
        acc = acc * &group.g % &group.p;
    }
    None
}
