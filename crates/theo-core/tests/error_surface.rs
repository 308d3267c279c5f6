use theo_core::errors::{ErrorInfo, TheoError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("symbol", "T0")
        .with_context("reason", "example")
}

#[test]
fn cycle_error_surface() {
    let err = TheoError::CycleDetected(sample_info("cycle-detected", "T0 depends on itself"));
    assert_eq!(err.code(), "cycle-detected");
    assert!(err.info().context.contains_key("symbol"));
}

#[test]
fn missing_argument_surface() {
    let err = TheoError::MissingArgument(sample_info("missing-argument", "h is unbound"));
    assert_eq!(err.info().code, "missing-argument");
    assert!(err.to_string().starts_with("missing argument: h is unbound"));
}

#[test]
fn context_is_added_without_changing_family() {
    let err = TheoError::SolverUnavailable(ErrorInfo::new("spawn", "no z3"))
        .with_context("program", "z3");
    assert!(matches!(&err, TheoError::SolverUnavailable(info) if info.context["program"] == "z3"));
}

#[test]
fn display_includes_hint() {
    let info = ErrorInfo::new("incompatible-units", "K + m").with_hint("mark forced conversion");
    assert_eq!(
        info.to_string(),
        "K + m (code: incompatible-units) | hint: mark forced conversion"
    );
}

#[test]
fn errors_roundtrip_through_json() {
    let err = TheoError::IncompatibleUnits(sample_info("incompatible-units", "K vs m"));
    let json = serde_json::to_string(&err).unwrap();
    let back: TheoError = serde_json::from_str(&json).unwrap();
    assert_eq!(err, back);
}
