use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, TheoError};

/// Satisfiability backend selected for proof verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// In-process linear real arithmetic decision procedure.
    Builtin,
    /// External SMT-LIB2 solver driven over a subprocess.
    Smt,
}

impl Default for SolverBackend {
    fn default() -> Self {
        Self::Builtin
    }
}

/// Limits and backend selection for the proof engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProofPolicy {
    /// Wall-clock budget per solver query, in milliseconds.
    #[serde(default = "ProofPolicy::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum number of disjuncts produced while normalising a query.
    #[serde(default = "ProofPolicy::default_max_disjuncts")]
    pub max_disjuncts: usize,
    /// Maximum number of intermediate constraints during variable elimination.
    #[serde(default = "ProofPolicy::default_max_constraints")]
    pub max_constraints: usize,
    /// Backend used for verification.
    #[serde(default)]
    pub backend: SolverBackend,
    /// Program spawned by the SMT backend.
    #[serde(default = "ProofPolicy::default_smt_program")]
    pub smt_program: String,
    /// Arguments passed to the SMT program.
    #[serde(default = "ProofPolicy::default_smt_args")]
    pub smt_args: Vec<String>,
}

impl ProofPolicy {
    const fn default_timeout_ms() -> u64 {
        5_000
    }

    const fn default_max_disjuncts() -> usize {
        64
    }

    const fn default_max_constraints() -> usize {
        4_096
    }

    fn default_smt_program() -> String {
        "z3".to_string()
    }

    fn default_smt_args() -> Vec<String> {
        vec!["-in".to_string(), "-smt2".to_string()]
    }
}

impl Default for ProofPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            max_disjuncts: Self::default_max_disjuncts(),
            max_constraints: Self::default_max_constraints(),
            backend: SolverBackend::default(),
            smt_program: Self::default_smt_program(),
            smt_args: Self::default_smt_args(),
        }
    }
}

/// Unit checking discipline applied while assembling sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitPolicy {
    /// Reject statements whose expression unit disagrees with the declared unit.
    #[serde(default = "UnitPolicy::default_enforce")]
    pub enforce: bool,
}

impl UnitPolicy {
    const fn default_enforce() -> bool {
        true
    }
}

impl Default for UnitPolicy {
    fn default() -> Self {
        Self {
            enforce: Self::default_enforce(),
        }
    }
}

/// Options consumed by the code and documentation emitters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Emit a module level doc comment naming the documentation.
    #[serde(default = "CodegenOptions::default_module_doc")]
    pub module_doc: bool,
    /// Path of the module providing external symbol implementations.
    #[serde(default = "CodegenOptions::default_external_module")]
    pub external_module: String,
}

impl CodegenOptions {
    const fn default_module_doc() -> bool {
        true
    }

    fn default_external_module() -> String {
        "external".to_string()
    }
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            module_doc: Self::default_module_doc(),
            external_module: Self::default_external_module(),
        }
    }
}

/// Top level configuration for theoris.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TheorisConfig {
    /// Proof engine policy.
    #[serde(default)]
    pub proof: ProofPolicy,
    /// Unit checking policy.
    #[serde(default)]
    pub units: UnitPolicy,
    /// Emitter options.
    #[serde(default)]
    pub codegen: CodegenOptions,
}

impl TheorisConfig {
    /// Parses a configuration from TOML text. Missing fields take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, TheoError> {
        let config: Self = toml::from_str(contents)
            .map_err(|err| TheoError::Config(ErrorInfo::new("parse-config", err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, TheoError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            TheoError::Config(
                ErrorInfo::new("read-config", format!("failed to read config: {err}"))
                    .with_context("path", path.display()),
            )
        })?;
        Self::from_toml_str(&contents).map_err(|err| err.with_context("path", path.display()))
    }

    /// Rejects limits that would make every query inconclusive.
    pub fn validate(&self) -> Result<(), TheoError> {
        if self.proof.max_disjuncts == 0 {
            return Err(TheoError::Config(
                ErrorInfo::new("invalid-limit", "proof.max_disjuncts must be positive")
                    .with_hint("use at least 1"),
            ));
        }
        if self.proof.max_constraints == 0 {
            return Err(TheoError::Config(
                ErrorInfo::new("invalid-limit", "proof.max_constraints must be positive")
                    .with_hint("use at least 1"),
            ));
        }
        if self.proof.backend == SolverBackend::Smt && self.proof.smt_program.trim().is_empty() {
            return Err(TheoError::Config(ErrorInfo::new(
                "missing-smt-program",
                "proof.smt_program must name an executable when backend = \"smt\"",
            )));
        }
        Ok(())
    }
}
