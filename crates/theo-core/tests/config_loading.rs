use std::io::Write;

use theo_core::{SolverBackend, TheoError, TheorisConfig};

#[test]
fn empty_document_yields_defaults() -> Result<(), TheoError> {
    let config = TheorisConfig::from_toml_str("")?;
    assert_eq!(config, TheorisConfig::default());
    assert_eq!(config.proof.timeout_ms, 5_000);
    assert_eq!(config.proof.backend, SolverBackend::Builtin);
    assert!(config.units.enforce);
    Ok(())
}

#[test]
fn partial_overrides_keep_other_defaults() -> Result<(), TheoError> {
    let config = TheorisConfig::from_toml_str(
        r#"
        [proof]
        timeout_ms = 250
        backend = "smt"

        [units]
        enforce = false
        "#,
    )?;
    assert_eq!(config.proof.timeout_ms, 250);
    assert_eq!(config.proof.backend, SolverBackend::Smt);
    assert_eq!(config.proof.smt_program, "z3");
    assert_eq!(config.proof.max_disjuncts, 64);
    assert!(!config.units.enforce);
    assert_eq!(config.codegen.external_module, "external");
    Ok(())
}

#[test]
fn zero_limits_are_rejected() {
    let err = TheorisConfig::from_toml_str("[proof]\nmax_disjuncts = 0\n").unwrap_err();
    assert!(matches!(err, TheoError::Config(info) if info.code == "invalid-limit"));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = TheorisConfig::from_toml_str("[proof\n").unwrap_err();
    assert_eq!(err.code(), "parse-config");
}

#[test]
fn load_reads_file_and_tags_path() -> Result<(), TheoError> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[codegen]\nmodule_doc = false").unwrap();
    let config = TheorisConfig::load(file.path())?;
    assert!(!config.codegen.module_doc);

    let missing = file.path().with_extension("absent");
    let err = TheorisConfig::load(&missing).unwrap_err();
    assert_eq!(err.code(), "read-config");
    assert!(err.info().context.contains_key("path"));
    Ok(())
}
