use super::*;

#[test]
fn defaults_are_valid() {
    let cfg = EngineConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.frame_interval(), Duration::from_millis(40));
    assert_eq!(cfg.clear_color(), Rgba8::WHITE);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg = EngineConfig::from_json_str(r#"{"dirty_areas": false, "time_increment_ms": 20}"#)
        .unwrap();
    assert!(!cfg.dirty_areas);
    assert_eq!(cfg.time_increment_ms, Some(20));
    assert_eq!(cfg.tile_min_size, DEFAULT_TILE_MIN_SIZE);
}

#[test]
fn rejects_bad_values() {
    assert!(EngineConfig::from_json_str(r#"{"frame_interval_ms": 0}"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{"tile_min_size": 0}"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{"time_increment_ms": -5}"#).is_err());
    assert!(matches!(
        EngineConfig::from_json_str(r#"{"fps": 30}"#),
        Err(SmilError::Serde(_))
    ));
    assert!(EngineConfig::from_path("/nonexistent/tinysmil.json").is_err());
}
