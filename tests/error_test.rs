use muninn::{MuninnError, Result};

#[test]
fn test_error_display() {
    let err = MuninnError::Refresh("graph offline".to_string());
    assert_eq!(err.to_string(), "entity refresh failed: graph offline");

    let err = MuninnError::Tracker("read-only".to_string());
    assert!(err.to_string().contains("read-only"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(MuninnError::Configuration("bad".into()))
    }
    assert!(returns_error().is_err());
}

#[test]
fn io_errors_convert() {
    fn read_missing() -> Result<String> {
        Ok(std::fs::read_to_string("/nonexistent/muninn/file")?)
    }
    assert!(matches!(read_missing(), Err(MuninnError::Io(_))));
}

#[test]
fn json_errors_convert() {
    fn parse() -> Result<serde_json::Value> {
        Ok(serde_json::from_str("{oops")?)
    }
    let err = parse().unwrap_err();
    assert!(matches!(err, MuninnError::Json(_)));
    assert!(err.to_string().starts_with("JSON error"));
}

#[test]
fn unsupported_cache_version_is_corrupt_state() {
    let err = muninn::cache::persist::parse_snapshot(r#"{"version": 2}"#).unwrap_err();
    assert!(matches!(err, MuninnError::CorruptState(_)));
    assert!(err.to_string().contains("unsupported cache version 2"));
}
