use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::detect::params::{DetectionParameters, MaxDetections, ScoreThreshold};
use crate::error::{OverlayError, Result};
use crate::overlay::palette::{default_palette, Color};

// 检测参数
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MAX_DETECTIONS: usize = 5;

// 轮询
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 33;
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

// 绘制
pub const DEFAULT_LINE_WIDTH: f32 = 2.0;
pub const DEFAULT_FONT_SIZE: f32 = 14.0;
pub const DEFAULT_LABEL_MARGIN: f32 = 20.0;

// 模型
pub const DEFAULT_MODEL_PATH: &str = "models/yolo11n.onnx";
pub const DEFAULT_INPUT_WIDTH: usize = 640;
pub const DEFAULT_INPUT_HEIGHT: usize = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.7;
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV: &str = "PERCEPT_CONFIG";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    detection: Option<DetectionFile>,
    #[serde(rename = "loop")]
    polling: Option<LoopFile>,
    overlay: Option<OverlayFile>,
    model: Option<ModelFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionFile {
    score_threshold: Option<f32>,
    max_detections: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LoopFile {
    poll_interval_ms: Option<u64>,
    debounce_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OverlayFile {
    line_width: Option<f32>,
    font_size: Option<f32>,
    label_margin: Option<f32>,
    mirror_webcam: Option<bool>,
    palette: Option<Vec<String>>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    path: Option<PathBuf>,
    input_width: Option<usize>,
    input_height: Option<usize>,
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
    intra_threads: Option<usize>,
}

/// 完整配置
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub detection: DetectionSettings,
    pub polling: LoopSettings,
    pub overlay: OverlaySettings,
    pub model: ModelSettings,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionSettings {
    pub score_threshold: ScoreThreshold,
    pub max_detections: MaxDetections,
}

impl DetectionSettings {
    pub fn params(&self) -> DetectionParameters {
        DetectionParameters::new(self.score_threshold, self.max_detections)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// 摄像头两次检测之间的最小间隔
    pub poll_interval: Duration,
    /// 参数变化的静默期，期间的多次修改只生效最后一次
    pub debounce: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub line_width: f32,
    pub font_size: f32,
    pub label_margin: f32,
    /// 摄像头画面是否水平翻转显示
    pub mirror_webcam: bool,
    pub palette: Vec<Color>,
    pub font_path: Option<PathBuf>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            font_size: DEFAULT_FONT_SIZE,
            label_margin: DEFAULT_LABEL_MARGIN,
            mirror_webcam: true,
            palette: default_palette(),
            font_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub input_width: usize,
    pub input_height: usize,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub intra_threads: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

impl Settings {
    /// 加载配置
    ///
    /// 未指定路径时读取 `PERCEPT_CONFIG` 环境变量，两者都没有时使用默认值。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    OverlayError::Config(format!("无法读取配置文件 {}: {}", path.display(), e))
                })?;
                log::debug!("加载配置文件 {}", path.display());
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: SettingsFile =
            toml::from_str(text).map_err(|e| OverlayError::Config(e.to_string()))?;
        let settings = Self::from_file(file)?;
        settings.validate()?;
        Ok(settings)
    }

    fn from_file(file: SettingsFile) -> Result<Self> {
        let defaults = Self::default();
        let detection = file.detection.unwrap_or_default();
        let polling = file.polling.unwrap_or_default();
        let overlay = file.overlay.unwrap_or_default();
        let model = file.model.unwrap_or_default();

        let score_threshold = match detection.score_threshold {
            Some(value) => ScoreThreshold::new(value).map_err(config_error)?,
            None => defaults.detection.score_threshold,
        };
        let max_detections = match detection.max_detections {
            Some(value) => MaxDetections::try_from(value).map_err(config_error)?,
            None => defaults.detection.max_detections,
        };
        let palette = match overlay.palette {
            Some(hexes) => hexes
                .iter()
                .map(|hex| hex.parse::<Color>())
                .collect::<Result<Vec<_>>>()?,
            None => defaults.overlay.palette,
        };

        Ok(Self {
            detection: DetectionSettings {
                score_threshold,
                max_detections,
            },
            polling: LoopSettings {
                poll_interval: polling
                    .poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.polling.poll_interval),
                debounce: polling
                    .debounce_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.polling.debounce),
            },
            overlay: OverlaySettings {
                line_width: overlay.line_width.unwrap_or(defaults.overlay.line_width),
                font_size: overlay.font_size.unwrap_or(defaults.overlay.font_size),
                label_margin: overlay.label_margin.unwrap_or(defaults.overlay.label_margin),
                mirror_webcam: overlay.mirror_webcam.unwrap_or(defaults.overlay.mirror_webcam),
                palette,
                font_path: overlay.font_path,
            },
            model: ModelSettings {
                path: model.path.unwrap_or(defaults.model.path),
                input_width: model.input_width.unwrap_or(defaults.model.input_width),
                input_height: model.input_height.unwrap_or(defaults.model.input_height),
                confidence_threshold: model
                    .confidence_threshold
                    .unwrap_or(defaults.model.confidence_threshold),
                nms_threshold: model.nms_threshold.unwrap_or(defaults.model.nms_threshold),
                intra_threads: model.intra_threads.unwrap_or(defaults.model.intra_threads),
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.poll_interval.is_zero() {
            return Err(OverlayError::Config("loop.poll_interval_ms 必须大于0".to_string()));
        }
        if !(self.overlay.line_width > 0.0) {
            return Err(OverlayError::Config("overlay.line_width 必须大于0".to_string()));
        }
        if !(self.overlay.font_size > 0.0) {
            return Err(OverlayError::Config("overlay.font_size 必须大于0".to_string()));
        }
        if !(self.overlay.label_margin >= 0.0) {
            return Err(OverlayError::Config("overlay.label_margin 不能为负数".to_string()));
        }
        if self.overlay.palette.is_empty() {
            return Err(OverlayError::Config("overlay.palette 不能为空".to_string()));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(OverlayError::Config("模型输入尺寸必须大于0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.model.confidence_threshold) {
            return Err(OverlayError::Config(
                "model.confidence_threshold 必须在 [0, 1] 之间".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.model.nms_threshold) {
            return Err(OverlayError::Config("model.nms_threshold 必须在 [0, 1] 之间".to_string()));
        }
        Ok(())
    }
}

fn config_error(err: OverlayError) -> OverlayError {
    OverlayError::Config(err.to_string())
}
