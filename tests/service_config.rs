use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use vigil::config::AnalysisServiceConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "VIGIL_CONFIG",
        "VIGIL_API_ADDR",
        "VIGIL_SIMULATED_DELAY_MS",
        "VIGIL_STRICT_DETECTIONS",
        "VIGIL_MODEL_VERSION",
        "VIGIL_BACKEND",
        "VIGIL_MODEL_PATH",
        "VIGIL_MAX_BODY_BYTES",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "api": { "addr": "0.0.0.0:9000", "max_body_bytes": 1048576 },
        "analysis": { "simulated_delay_ms": 250, "model_version": "YOLOv8s" },
        "backend": { "name": "stub", "confidence_threshold": 0.4, "labels": ["person", "car"] }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("VIGIL_CONFIG", file.path());
    std::env::set_var("VIGIL_STRICT_DETECTIONS", "true");
    std::env::set_var("VIGIL_SIMULATED_DELAY_MS", "0");
    std::env::set_var("VIGIL_MAX_BODY_BYTES", "2048");
    std::env::set_var("VIGIL_MODEL_PATH", "/models/yolov8n.onnx");
    std::env::set_var("VIGIL_MODEL_VERSION", "YOLOv8m");
    std::env::set_var("VIGIL_BACKEND", "  STUB ");

    let cfg = AnalysisServiceConfig::load().expect("load config");

    assert_eq!(cfg.api_addr, "0.0.0.0:9000");
    assert_eq!(cfg.max_body_bytes, 2048);
    assert_eq!(cfg.simulated_delay.as_millis(), 0);
    assert!(cfg.strict_detections);
    assert_eq!(cfg.model_version, "YOLOv8m");
    assert_eq!(
        cfg.backend.model_path.as_deref(),
        Some(std::path::Path::new("/models/yolov8n.onnx"))
    );
    assert_eq!(cfg.backend.name, "stub");
    assert_eq!(cfg.backend.confidence_threshold, 0.4);
    assert_eq!(cfg.backend.labels, vec!["person", "car"]);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
[api]
addr = "127.0.0.1:9100"

[analysis]
simulated_delay_ms = 10
strict_detections = true

[backend]
name = "Stub"
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("VIGIL_CONFIG", file.path());

    let cfg = AnalysisServiceConfig::load().expect("load config");
    assert_eq!(cfg.api_addr, "127.0.0.1:9100");
    assert_eq!(cfg.simulated_delay.as_millis(), 10);
    assert!(cfg.strict_detections);
    assert_eq!(cfg.backend.name, "stub");

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("VIGIL_SIMULATED_DELAY_MS", "soon");
    assert!(AnalysisServiceConfig::load().is_err());
    clear_env();

    std::env::set_var("VIGIL_BACKEND", "mystery");
    assert!(AnalysisServiceConfig::load().is_err());
    clear_env();

    std::env::set_var("VIGIL_API_ADDR", "localhost");
    assert!(AnalysisServiceConfig::load().is_err());
    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AnalysisServiceConfig::load().expect("load defaults");
    assert_eq!(cfg.api_addr, "127.0.0.1:8787");
    assert_eq!(cfg.simulated_delay.as_millis(), 1500);
    assert!(!cfg.strict_detections);
}
