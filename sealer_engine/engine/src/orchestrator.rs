//! Drives one sealer through keygen or partial decryption.
//!
//! Every run follows the same setup-then-operate sequence:
//!   1. Take the active secret from the secret store.
//!   2. Retrieve its entropy and set up the group and key pair through the primitive.
//!   3. Sample a fresh scalar `r` below the group order.
//!   4. Call the primitive's keygen or decrypt with `r` and tag the result with the
//!      sealer label.
//!
//! Key material and `r` are locals of a single run. Results are returned by value,
//! so concurrent runs never share state. A run is abandoned with
//! [`SealerError::Superseded`] when a different secret becomes active before it
//! finishes (unless `cancel_on_supersede` is off).

use std::future::Future;
use std::sync::{Arc, Mutex};

use num_bigint::BigUint;
use num_traits::Num;
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{SealerConfig, SealerIdentityPolicy};
use crate::error::{SealerError, SealerResult};
use crate::primitive::ElGamalPrimitive;
use crate::sampler::SecureScalarSampler;
use crate::secrets::SecretStore;
use crate::types::{
    ActiveSecret, EncryptionBatch, KeyMaterial, PartialDecryptionShare, PublicKeyShare,
    SecureScalar,
};

type SecretWatch = watch::Receiver<Option<ActiveSecret>>;

pub struct ThresholdOrchestrator<R = OsRng> {
    secrets: Arc<dyn SecretStore>,
    primitive: Arc<dyn ElGamalPrimitive>,
    sampler: Mutex<SecureScalarSampler<R>>,
    config: SealerConfig,
}

impl ThresholdOrchestrator<OsRng> {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        primitive: Arc<dyn ElGamalPrimitive>,
        config: SealerConfig,
    ) -> Self {
        Self::with_rng(secrets, primitive, OsRng, config)
    }
}

impl<R> ThresholdOrchestrator<R>
where
    R: RngCore + CryptoRng + Send + 'static,
{
    pub fn with_rng(
        secrets: Arc<dyn SecretStore>,
        primitive: Arc<dyn ElGamalPrimitive>,
        rng: R,
        config: SealerConfig,
    ) -> Self {
        let sampler = SecureScalarSampler::new(rng, &config);
        Self {
            secrets,
            primitive,
            sampler: Mutex::new(sampler),
            config,
        }
    }

    pub fn config(&self) -> &SealerConfig {
        &self.config
    }

    /// Keygen for the current active secret, waiting for one if none is selected.
    pub async fn run_keygen(&self) -> SealerResult<PublicKeyShare> {
        let mut rx = self.secrets.active_secret();
        let secret = self.await_secret(&mut rx).await?;
        self.supervise(&secret, rx, self.keygen_for(&secret)).await
    }

    /// Partial decryption for the current active secret.
    pub async fn run_partial_decryption(
        &self,
        encryptions: &EncryptionBatch,
    ) -> SealerResult<PartialDecryptionShare> {
        let mut rx = self.secrets.active_secret();
        let secret = self.await_secret(&mut rx).await?;
        self.supervise(&secret, rx, self.partial_decryption_for(&secret, encryptions))
            .await
    }

    /// Keygen for an explicit secret, without supersede tracking.
    pub async fn keygen_for(&self, secret: &ActiveSecret) -> SealerResult<PublicKeyShare> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("keygen", %run_id, sealer = %secret.label);

        async move {
            let material = self.prepare(secret).await?;
            let r = self.sample_scalar(&material.order)?;

            let raw = self
                .primitive
                .keygen(
                    &r,
                    &secret.label,
                    &material.params,
                    &material.secret_key,
                    &material.public_key,
                )
                .await?;

            info!("public key share ready");
            Ok(PublicKeyShare::tag(raw, &secret.label))
        }
        .instrument(span)
        .await
    }

    /// Partial decryption for an explicit secret, without supersede tracking.
    pub async fn partial_decryption_for(
        &self,
        secret: &ActiveSecret,
        encryptions: &EncryptionBatch,
    ) -> SealerResult<PartialDecryptionShare> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!(
            "partial_decryption",
            %run_id,
            sealer = %secret.label,
            ciphertexts = encryptions.len()
        );

        async move {
            let material = self.prepare(secret).await?;
            let r = self.sample_scalar(&material.order)?;

            // the output is always tagged with the real label; only the label bound
            // into the primitive's proof follows the identity policy
            let internal_sealer = match self.config.decryption_sealer {
                SealerIdentityPolicy::ActiveLabel => secret.label.as_str(),
                SealerIdentityPolicy::Placeholder => self.config.placeholder_sealer.as_str(),
            };

            let raw = self
                .primitive
                .decrypt(
                    encryptions,
                    internal_sealer,
                    &r,
                    &material.params,
                    &material.secret_key,
                    &material.public_key,
                )
                .await?;

            info!("partial decryption ready");
            Ok(PartialDecryptionShare::tag(raw, &secret.label))
        }
        .instrument(span)
        .await
    }

    /// Run keygen once for every newly activated secret, one run at a time.
    ///
    /// Results arrive on the returned channel in activation order. The task ends when
    /// the secret store goes away or the receiver is dropped.
    pub fn follow_keygen(
        self: Arc<Self>,
    ) -> (JoinHandle<()>, mpsc::Receiver<SealerResult<PublicKeyShare>>) {
        let (tx, rx_out) = mpsc::channel(8);
        let mut secrets_rx = self.secrets.active_secret();

        let handle = tokio::spawn(async move {
            let mut last_id: Option<String> = None;
            loop {
                let current = secrets_rx.borrow_and_update().clone();
                match current {
                    Some(secret) if last_id.as_deref() != Some(secret.id.as_str()) => {
                        last_id = Some(secret.id.clone());
                        let result = self
                            .supervise(&secret, secrets_rx.clone(), self.keygen_for(&secret))
                            .await;
                        if tx.send(result).await.is_err() {
                            break;
                        }
                        // a newer secret may have arrived while the run was in flight
                        continue;
                    }
                    Some(_) => {}
                    // deselection: selecting the same secret again is a new activation
                    None => last_id = None,
                }

                tokio::select! {
                    changed = secrets_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
            debug!("keygen follower stopped");
        });

        (handle, rx_out)
    }

    async fn await_secret(&self, rx: &mut SecretWatch) -> SealerResult<ActiveSecret> {
        let wait = async {
            loop {
                let current = rx.borrow_and_update().clone();
                if let Some(secret) = current {
                    return Ok(secret);
                }
                rx.changed()
                    .await
                    .map_err(|_| SealerError::SecretStreamClosed)?;
            }
        };

        match self.config.secret_wait_timeout() {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| SealerError::NoActiveSecret)?,
            None => wait.await,
        }
    }

    async fn supervise<T>(
        &self,
        secret: &ActiveSecret,
        mut rx: SecretWatch,
        run: impl Future<Output = SealerResult<T>>,
    ) -> SealerResult<T> {
        if !self.config.cancel_on_supersede {
            return run.await;
        }

        tokio::select! {
            biased;
            result = run => result,
            _ = superseded(&mut rx, secret) => {
                warn!(sealer = %secret.label, "run abandoned, active secret changed");
                Err(SealerError::Superseded { label: secret.label.clone() })
            }
        }
    }

    async fn prepare(&self, secret: &ActiveSecret) -> SealerResult<KeyMaterial> {
        let entropy = self.secrets.retrieve_entropy(secret).await?;
        debug!("entropy retrieved");

        self.primitive.initialize().await?;
        let material = self.primitive.setup_from_entropy(&entropy).await?;
        debug!(order_len = material.order.len(), "group and key pair ready");

        Ok(material)
    }

    fn sample_scalar(&self, order: &str) -> SealerResult<SecureScalar> {
        let order = order.trim();
        let modulus = BigUint::from_str_radix(order, self.config.order_radix.radix())
            .map_err(|e| SealerError::InvalidModulus(format!("group order '{order}': {e}")))?;
        // draw size follows the order's encoded length, not its magnitude
        let byte_size = BigUint::from(order.len());

        let mut sampler = self
            .sampler
            .lock()
            .map_err(|_| SealerError::SecureRandomSourceFailure("sampler lock poisoned".into()))?;
        let r = sampler.sample_sized(&modulus, &byte_size)?;

        debug!(draw_len = r.draw_len(), "secure scalar sampled");
        Ok(r)
    }
}

/// Resolves once the active secret differs from `secret` (including deselection).
/// Never resolves if the secret store is dropped.
async fn superseded(rx: &mut SecretWatch, secret: &ActiveSecret) {
    loop {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        let replaced = rx
            .borrow_and_update()
            .as_ref()
            .is_none_or(|current| current.id != secret.id);
        if replaced {
            return;
        }
    }
}
