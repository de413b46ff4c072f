//! Sealer Engine Core Library
//!
//! Client-side orchestration for threshold ElGamal sealers: secure scalar sampling,
//! public key share generation and partial decryption, and packaging of results for
//! the interaction layer.

pub mod config;
pub mod error;
pub mod interaction;
pub mod logging;
pub mod orchestrator;
pub mod packager;
pub mod primitive;
pub mod sampler;
pub mod sealer;
pub mod secrets;
pub mod types;

pub use config::SealerConfig;
pub use error::{SealerError, SealerResult};
pub use orchestrator::ThresholdOrchestrator;
pub use packager::ResultPackager;
pub use sampler::SecureScalarSampler;
pub use sealer::Sealer;
