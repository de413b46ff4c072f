#![allow(dead_code)]

pub mod elgamal;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand_core::{CryptoRng, RngCore};
use serde_json::{Value, json};
use tokio::sync::{Semaphore, watch};

use sealer_engine::error::{PrimitiveOperation, SealerError, SealerResult};
use sealer_engine::interaction::{InteractionRequest, InteractionTransport};
use sealer_engine::primitive::ElGamalPrimitive;
use sealer_engine::secrets::SecretStore;
use sealer_engine::types::{
    ActiveSecret, EncryptionBatch, Entropy, GroupParams, KeyMaterial, PublicKey,
    RawDecryptionBatch, RawKeyShare, SecretKey, SecureScalar,
};

// ---------------------------------------------------------------------------
// secret store
// ---------------------------------------------------------------------------

pub struct StubSecretStore {
    active: watch::Sender<Option<ActiveSecret>>,
    entropy: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_entropy: AtomicBool,
    pub entropy_calls: AtomicUsize,
}

impl StubSecretStore {
    pub fn new() -> Arc<Self> {
        let (active, _) = watch::channel(None);
        Arc::new(Self {
            active,
            entropy: Mutex::new(HashMap::new()),
            fail_entropy: AtomicBool::new(false),
            entropy_calls: AtomicUsize::new(0),
        })
    }

    /// Register a secret without activating it.
    pub fn register(&self, id: &str, label: &str, entropy: &[u8]) -> ActiveSecret {
        self.entropy
            .lock()
            .unwrap()
            .insert(id.to_string(), entropy.to_vec());
        ActiveSecret::new(id, label)
    }

    pub fn activate(&self, id: &str, label: &str, entropy: &[u8]) -> ActiveSecret {
        let secret = self.register(id, label, entropy);
        self.active.send_replace(Some(secret.clone()));
        secret
    }

    pub fn reemit(&self, secret: &ActiveSecret) {
        self.active.send_replace(Some(secret.clone()));
    }

    pub fn deactivate(&self) {
        self.active.send_replace(None);
    }
}

#[async_trait]
impl SecretStore for StubSecretStore {
    fn active_secret(&self) -> watch::Receiver<Option<ActiveSecret>> {
        self.active.subscribe()
    }

    async fn retrieve_entropy(&self, secret: &ActiveSecret) -> SealerResult<Entropy> {
        self.entropy_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_entropy.load(Ordering::SeqCst) {
            return Err(SealerError::EntropyUnavailable(format!(
                "secret '{}' is locked",
                secret.label
            )));
        }
        let map = self.entropy.lock().unwrap();
        let bytes = map
            .get(&secret.id)
            .cloned()
            .ok_or_else(|| SealerError::EntropyUnavailable("unknown secret".into()))?;
        Ok(Entropy::new(bytes))
    }
}

// ---------------------------------------------------------------------------
// primitive
// ---------------------------------------------------------------------------

/// Echoing primitive: `sk` is the entropy itself, and every output names the
/// entropy, sealer argument and scalar it was called with.
pub struct CountingPrimitive {
    order: String,
    pub initialize_calls: AtomicUsize,
    pub setup_calls: AtomicUsize,
    pub keygen_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
    pub fail_keygen: AtomicBool,
    /// Per-entropy delay before keygen returns, in milliseconds.
    delays: Mutex<HashMap<Vec<u8>, u64>>,
    /// When set, keygen/decrypt wait for a permit.
    gate: Option<Arc<Semaphore>>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub sealer: String,
    pub r: String,
}

impl CountingPrimitive {
    pub fn new(order: &str) -> Arc<Self> {
        Arc::new(Self::build(order, None))
    }

    pub fn gated(order: &str, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self::build(order, Some(gate)))
    }

    fn build(order: &str, gate: Option<Arc<Semaphore>>) -> Self {
        Self {
            order: order.to_string(),
            initialize_calls: AtomicUsize::new(0),
            setup_calls: AtomicUsize::new(0),
            keygen_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
            fail_keygen: AtomicBool::new(false),
            delays: Mutex::new(HashMap::new()),
            gate,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn delay_for(&self, entropy: &[u8], millis: u64) {
        self.delays.lock().unwrap().insert(entropy.to_vec(), millis);
    }

    pub fn primitive_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
            + self.setup_calls.load(Ordering::SeqCst)
            + self.keygen_calls.load(Ordering::SeqCst)
            + self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn pause(&self, sk: &SecretKey) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let delay = self.delays.lock().unwrap().get(sk.as_bytes()).copied();
        if let Some(millis) = delay {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn record(&self, operation: &'static str, sealer: &str, r: &SecureScalar) -> String {
        let r = r.to_decimal().to_string();
        self.calls.lock().unwrap().push(RecordedCall {
            operation,
            sealer: sealer.to_string(),
            r: r.clone(),
        });
        r
    }
}

#[async_trait]
impl ElGamalPrimitive for CountingPrimitive {
    async fn initialize(&self) -> SealerResult<()> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn setup_from_entropy(&self, entropy: &Entropy) -> SealerResult<KeyMaterial> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(KeyMaterial {
            order: self.order.clone(),
            params: GroupParams(json!("stub")),
            secret_key: SecretKey::new(entropy.as_bytes().to_vec()),
            public_key: PublicKey(json!({ "h": hex::encode(entropy.as_bytes()) })),
        })
    }

    async fn keygen(
        &self,
        r: &SecureScalar,
        sealer: &str,
        _params: &GroupParams,
        sk: &SecretKey,
        pk: &PublicKey,
    ) -> SealerResult<RawKeyShare> {
        self.keygen_calls.fetch_add(1, Ordering::SeqCst);
        let r = self.record("keygen", sealer, r);
        self.pause(sk).await;
        if self.fail_keygen.load(Ordering::SeqCst) {
            return Err(SealerError::primitive(PrimitiveOperation::Keygen, "boom"));
        }
        let share = json!({
            "pk": pk.0["h"],
            "sk_echo": hex::encode(sk.as_bytes()),
            "r": r,
            "sealer_arg": sealer,
            "sealer": "primitive-internal",
        });
        Ok(into_map(share))
    }

    async fn decrypt(
        &self,
        encryptions: &EncryptionBatch,
        sealer: &str,
        r: &SecureScalar,
        _params: &GroupParams,
        sk: &SecretKey,
        _pk: &PublicKey,
    ) -> SealerResult<RawDecryptionBatch> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        let r = self.record("decrypt", sealer, r);
        self.pause(sk).await;
        let batch = json!({
            "decryptions": encryptions.0.iter().map(|ct| ct.a.clone()).collect::<Vec<_>>(),
            "sk_echo": hex::encode(sk.as_bytes()),
            "r": r,
            "sealer_arg": sealer,
        });
        Ok(into_map(batch))
    }
}

fn into_map(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// byte sources
// ---------------------------------------------------------------------------

/// Always yields the big-endian encoding of one value, zero-padded on the left.
pub struct FixedValueRng {
    pub value: u64,
    pub requests: Arc<Mutex<Vec<usize>>>,
}

impl FixedValueRng {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl RngCore for FixedValueRng {
    fn next_u32(&mut self) -> u32 {
        self.value as u32
    }
    fn next_u64(&mut self) -> u64 {
        self.value
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.try_fill_bytes(dest).unwrap()
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.requests.lock().unwrap().push(dest.len());
        write_be(dest, self.value);
        Ok(())
    }
}

impl CryptoRng for FixedValueRng {}

/// The n-th draw yields `n` (starting at 1), big-endian. Distinct on every call.
pub struct SequenceRng {
    counter: Arc<AtomicU64>,
}

impl SequenceRng {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl RngCore for SequenceRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }
    fn next_u64(&mut self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.try_fill_bytes(dest).unwrap()
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        let n = self.next_u64();
        write_be(dest, n);
        Ok(())
    }
}

impl CryptoRng for SequenceRng {}

/// Every draw fails, as an exhausted or unavailable entropy source would.
pub struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        unimplemented!()
    }
    fn next_u64(&mut self) -> u64 {
        unimplemented!()
    }
    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unimplemented!()
    }
    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
        Err(rand_core::Error::new("entropy source unavailable"))
    }
}

impl CryptoRng for FailingRng {}

fn write_be(dest: &mut [u8], value: u64) {
    let bytes = value.to_be_bytes();
    dest.fill(0);
    let n = dest.len().min(bytes.len());
    let len = dest.len();
    dest[len - n..].copy_from_slice(&bytes[bytes.len() - n..]);
}

// ---------------------------------------------------------------------------
// transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingTransport {
    pub requests: Mutex<Vec<InteractionRequest>>,
    pub fail: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<InteractionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InteractionTransport for RecordingTransport {
    async fn start_interaction(&self, request: InteractionRequest) -> SealerResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SealerError::TransportFailure("relay offline".into()));
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}
