//! Secure scalar sampling below a group order.
//!
//! A draw is `len` bytes from a cryptographic source, read as a big-endian unsigned
//! integer and mapped into `[0, modulus)`. The draw length comes from a byte size
//! supplied by the caller, typically the length of the order's string encoding. If
//! that size does not fit a `usize` (or exceeds `max_draw_bytes`) the fixed fallback
//! length is used instead; elliptic-curve orders hit this path. A draw is never
//! narrower than the modulus itself.
//!
//! [`SamplingPolicy::Reduce`] maps with `value mod modulus`, which leaves a small bias
//! whenever `256^len` is not a multiple of the modulus. [`SamplingPolicy::Rejection`]
//! redraws values in the biased tail and is exactly uniform.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use tracing::trace;
use zeroize::Zeroizing;

use crate::config::{SamplingPolicy, SealerConfig};
use crate::error::{SealerError, SealerResult};
use crate::types::SecureScalar;

pub struct SecureScalarSampler<R> {
    rng: R,
    policy: SamplingPolicy,
    fallback_draw_bytes: usize,
    max_draw_bytes: usize,
}

impl SecureScalarSampler<OsRng> {
    /// Sampler backed by the operating system's CSPRNG.
    pub fn os(config: &SealerConfig) -> Self {
        Self::new(OsRng, config)
    }
}

impl<R: RngCore + CryptoRng> SecureScalarSampler<R> {
    pub fn new(rng: R, config: &SealerConfig) -> Self {
        Self {
            rng,
            policy: config.sampling,
            fallback_draw_bytes: config.fallback_draw_bytes,
            max_draw_bytes: config.max_draw_bytes,
        }
    }

    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    /// Number of bytes to draw for a requested byte size.
    pub fn draw_length(&self, byte_size: &BigUint) -> usize {
        match byte_size.to_usize() {
            Some(len) if len > 0 && len <= self.max_draw_bytes => len,
            _ => self.fallback_draw_bytes,
        }
    }

    /// Sample `r` with `0 <= r < modulus`, sizing the draw by the byte length of the
    /// modulus's decimal encoding.
    pub fn sample(&mut self, modulus: &BigUint) -> SealerResult<SecureScalar> {
        let byte_size = BigUint::from(modulus.to_str_radix(10).len());
        self.sample_sized(modulus, &byte_size)
    }

    /// Sample `r` with `0 <= r < modulus` using an explicit byte size for the draw.
    pub fn sample_sized(
        &mut self,
        modulus: &BigUint,
        byte_size: &BigUint,
    ) -> SealerResult<SecureScalar> {
        if modulus.is_zero() {
            return Err(SealerError::InvalidModulus("modulus must be positive".into()));
        }

        // the fallback length must not confine r to a sub-range of [0, modulus)
        let modulus_len = modulus.bits().div_ceil(8) as usize;
        let len = self.draw_length(byte_size).max(modulus_len);

        match self.policy {
            SamplingPolicy::Reduce => {
                let value = self.draw(len)?;
                let r = Zeroizing::new(&*value % modulus);
                Ok(SecureScalar::new(&r, len))
            }
            SamplingPolicy::Rejection => {
                let range = BigUint::from(1u8) << (8 * len);
                let limit = &range - (&range % modulus);

                loop {
                    let value = self.draw(len)?;
                    if *value < limit {
                        let r = Zeroizing::new(&*value % modulus);
                        return Ok(SecureScalar::new(&r, len));
                    }
                    trace!(draw_len = len, "draw fell in biased tail, redrawing");
                }
            }
        }
    }

    fn draw(&mut self, len: usize) -> SealerResult<Zeroizing<BigUint>> {
        let mut buf = Zeroizing::new(vec![0u8; len]);
        self.rng
            .try_fill_bytes(&mut buf)
            .map_err(|e| SealerError::SecureRandomSourceFailure(e.to_string()))?;
        Ok(Zeroizing::new(BigUint::from_bytes_be(&buf)))
    }
}
