use kcorr_core::errors::{CorrError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("frame", 3)
        .with_context("reason", "example")
}

#[test]
fn config_error_surface() {
    let err = CorrError::Config(sample_info("block-period-mismatch", "not periodic"));
    assert_eq!(err.info().code, "block-period-mismatch");
    assert!(err.info().context.contains_key("frame"));
    assert!(err.to_string().starts_with("configuration error"));
}

#[test]
fn backend_error_surface() {
    let err = CorrError::backend("missing-accelerated-backend", "no kernel");
    assert_eq!(err.info().code, "missing-accelerated-backend");
    assert!(err.to_string().contains("no kernel"));
}

#[test]
fn cancelled_error_is_flagged() {
    let err = CorrError::Cancelled(sample_info("cancelled", "stop"));
    assert!(err.is_cancelled());
    assert!(!CorrError::config("x", "y").is_cancelled());
}

#[test]
fn display_includes_context_and_hint() {
    let err = CorrError::Config(sample_info("C001", "bad input").with_hint("fix it"));
    let text = err.to_string();
    assert!(text.contains("frame=3"));
    assert!(text.contains("hint: fix it"));
}

#[test]
fn errors_round_trip_json() {
    let err = CorrError::Numeric(sample_info("N001", "overflow"));
    let json = serde_json::to_string(&err).expect("serialize");
    let decoded: CorrError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}
