// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for session configuration

use framepipe::{PixelFormat, SessionConfig};

#[test]
fn test_config_default() {
    let config = SessionConfig::default();

    assert_eq!(config.format, PixelFormat::Bgra8888);
    assert!(!config.start_paused, "Preview should start live by default");
    assert!(
        !config.start_streaming,
        "Pixel streaming should be opt-in by default"
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_serde_roundtrip() {
    let config = SessionConfig {
        format: PixelFormat::Rgba8888,
        width: 640,
        height: 480,
        start_paused: true,
        start_streaming: true,
    };

    let json = serde_json::to_string(&config).expect("serialize");
    let parsed: SessionConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, config);
}
