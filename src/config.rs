use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CROWD_THRESHOLD: u32 = 8;
pub const DEFAULT_VIOLENCE_THRESHOLD: f64 = 50.0;
pub const DEFAULT_MIN_DETECTION_AREA: f64 = 2000.0;
pub const DEFAULT_SAMPLE_STRIDE: u64 = 5;
const DEFAULT_DB_PATH: &str = "urbansight.db";
const DEFAULT_OUTPUT_DIR: &str = "static/processed";
const DEFAULT_DETECTOR_BACKEND: &str = "descriptor";
const DEFAULT_BLUR_SIGMA: f32 = 30.0;

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    db_path: Option<String>,
    analysis: Option<AnalysisConfigFile>,
    detector: Option<DetectorConfigFile>,
    redaction: Option<RedactionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct AnalysisConfigFile {
    crowd_threshold: Option<u32>,
    violence_threshold: Option<f64>,
    min_detection_area: Option<f64>,
    sample_stride: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct RedactionConfigFile {
    output_dir: Option<String>,
    face_model_path: Option<PathBuf>,
    blur_sigma: Option<f32>,
}

/// Numeric thresholds for the analysis loop. Absent configuration falls back
/// to the stated defaults exactly.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// People count above which a Crowd/Medium alert fires (ladder midpoint).
    pub crowd_threshold: u32,
    /// Mean movement magnitude (pixels per sampled frame) above which a
    /// Violence/Medium alert fires.
    pub violence_threshold: f64,
    /// Bounding boxes below this area (px^2) are noise, never tracked.
    pub min_detection_area: f64,
    /// Analyze every Nth frame.
    pub sample_stride: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            crowd_threshold: DEFAULT_CROWD_THRESHOLD,
            violence_threshold: DEFAULT_VIOLENCE_THRESHOLD,
            min_detection_area: DEFAULT_MIN_DETECTION_AREA,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_DETECTOR_BACKEND.to_string(),
            model_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedactionSettings {
    pub output_dir: String,
    /// Optional ONNX face model. When set but unloadable, the pipeline
    /// degrades to passthrough instead of failing.
    pub face_model_path: Option<PathBuf>,
    pub blur_sigma: f32,
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            face_model_path: None,
            blur_sigma: DEFAULT_BLUR_SIGMA,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UrbansightConfig {
    pub db_path: String,
    pub analysis: AnalysisSettings,
    pub detector: DetectorSettings,
    pub redaction: RedactionSettings,
}

impl UrbansightConfig {
    /// Layered load: JSON file addressed by `URBANSIGHT_CONFIG`, then env
    /// overrides, then validation. Every field has a hard default.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("URBANSIGHT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();
        let analysis = file.analysis.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let redaction = file.redaction.unwrap_or_default();
        Self {
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            analysis: AnalysisSettings {
                crowd_threshold: analysis
                    .crowd_threshold
                    .unwrap_or(defaults.analysis.crowd_threshold),
                violence_threshold: analysis
                    .violence_threshold
                    .unwrap_or(defaults.analysis.violence_threshold),
                min_detection_area: analysis
                    .min_detection_area
                    .unwrap_or(defaults.analysis.min_detection_area),
                sample_stride: analysis
                    .sample_stride
                    .unwrap_or(defaults.analysis.sample_stride),
            },
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
                model_path: detector.model_path,
            },
            redaction: RedactionSettings {
                output_dir: redaction
                    .output_dir
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
                face_model_path: redaction.face_model_path,
                blur_sigma: redaction.blur_sigma.unwrap_or(DEFAULT_BLUR_SIGMA),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("URBANSIGHT_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(dir) = std::env::var("URBANSIGHT_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.redaction.output_dir = dir;
            }
        }
        if let Ok(backend) = std::env::var("URBANSIGHT_DETECTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(value) = std::env::var("URBANSIGHT_CROWD_THRESHOLD") {
            self.analysis.crowd_threshold = value
                .parse()
                .map_err(|_| anyhow!("URBANSIGHT_CROWD_THRESHOLD must be an integer"))?;
        }
        if let Ok(value) = std::env::var("URBANSIGHT_VIOLENCE_THRESHOLD") {
            self.analysis.violence_threshold = value
                .parse()
                .map_err(|_| anyhow!("URBANSIGHT_VIOLENCE_THRESHOLD must be a number"))?;
        }
        if let Ok(value) = std::env::var("URBANSIGHT_MIN_DETECTION_AREA") {
            self.analysis.min_detection_area = value
                .parse()
                .map_err(|_| anyhow!("URBANSIGHT_MIN_DETECTION_AREA must be a number"))?;
        }
        if let Ok(value) = std::env::var("URBANSIGHT_SAMPLE_STRIDE") {
            self.analysis.sample_stride = value
                .parse()
                .map_err(|_| anyhow!("URBANSIGHT_SAMPLE_STRIDE must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.sample_stride == 0 {
            return Err(anyhow!("sample_stride must be at least 1"));
        }
        if self.analysis.violence_threshold <= 0.0 {
            return Err(anyhow!("violence_threshold must be greater than zero"));
        }
        if self.analysis.min_detection_area < 0.0 {
            return Err(anyhow!("min_detection_area must not be negative"));
        }
        if self.redaction.blur_sigma <= 0.0 {
            return Err(anyhow!("blur_sigma must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
