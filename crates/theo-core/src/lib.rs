#![deny(missing_docs)]
#![doc = "Error taxonomy, configuration and canonical hashing shared by the theoris crates."]

/// Configuration types and TOML loading.
pub mod config;
pub mod errors;
pub mod hash;
pub mod provenance;

pub use config::{CodegenOptions, ProofPolicy, SolverBackend, TheorisConfig, UnitPolicy};
pub use errors::{ErrorInfo, TheoError, TheoResult};
pub use hash::{from_json_slice, stable_hash_string, to_canonical_json_bytes};
pub use provenance::SchemaVersion;
