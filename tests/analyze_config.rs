use std::sync::Mutex;

use tempfile::NamedTempFile;

use urbansight::config::UrbansightConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "URBANSIGHT_CONFIG",
        "URBANSIGHT_DB_PATH",
        "URBANSIGHT_OUTPUT_DIR",
        "URBANSIGHT_DETECTOR_BACKEND",
        "URBANSIGHT_CROWD_THRESHOLD",
        "URBANSIGHT_VIOLENCE_THRESHOLD",
        "URBANSIGHT_MIN_DETECTION_AREA",
        "URBANSIGHT_SAMPLE_STRIDE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "urbansight_prod.db",
        "analysis": {
            "crowd_threshold": 12,
            "violence_threshold": 75.0,
            "sample_stride": 10
        },
        "detector": {
            "backend": "stub"
        },
        "redaction": {
            "output_dir": "processed",
            "blur_sigma": 20.0
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("URBANSIGHT_CONFIG", file.path());
    std::env::set_var("URBANSIGHT_CROWD_THRESHOLD", "20");
    std::env::set_var("URBANSIGHT_DB_PATH", "override.db");

    let cfg = UrbansightConfig::load().expect("load config");

    // Env wins over file, file wins over defaults.
    assert_eq!(cfg.db_path, "override.db");
    assert_eq!(cfg.analysis.crowd_threshold, 20);
    assert_eq!(cfg.analysis.violence_threshold, 75.0);
    assert_eq!(cfg.analysis.sample_stride, 10);
    assert_eq!(cfg.analysis.min_detection_area, 2000.0);
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.redaction.output_dir, "processed");
    assert_eq!(cfg.redaction.blur_sigma, 20.0);

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = UrbansightConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "urbansight.db");
    assert_eq!(cfg.analysis.crowd_threshold, 8);
    assert_eq!(cfg.analysis.violence_threshold, 50.0);
    assert_eq!(cfg.analysis.sample_stride, 5);
    assert_eq!(cfg.redaction.output_dir, "static/processed");
    assert_eq!(cfg.detector.backend, "descriptor");
    assert!(cfg.detector.model_path.is_none());
}

#[test]
fn invalid_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("URBANSIGHT_SAMPLE_STRIDE", "not-a-number");
    assert!(UrbansightConfig::load().is_err());

    std::env::set_var("URBANSIGHT_SAMPLE_STRIDE", "0");
    assert!(UrbansightConfig::load().is_err());

    clear_env();
}
