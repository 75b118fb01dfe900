//! 用户可调的检测参数
//!
//! 两个参数都以新类型表示，构造时即完成校验，非法值无法进入检测周期。

use std::fmt;
use std::str::FromStr;

use crate::config::{DEFAULT_MAX_DETECTIONS, DEFAULT_SCORE_THRESHOLD};
use crate::error::{OverlayError, Result};

/// 置信度阈值，取值范围 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ScoreThreshold(f32);

impl ScoreThreshold {
    /// 校验并创建阈值
    ///
    /// # 错误处理
    /// 超出 [0, 1] 或为 NaN 时返回 `InvalidParameter`
    pub fn new(value: f32) -> Result<Self> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(OverlayError::InvalidParameter(format!(
                "score_threshold 必须在 [0, 1] 之间，实际为 {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// 置信度是否达到阈值
    pub fn accepts(self, score: f32) -> bool {
        score >= self.0
    }
}

impl Default for ScoreThreshold {
    fn default() -> Self {
        Self(DEFAULT_SCORE_THRESHOLD)
    }
}

impl FromStr for ScoreThreshold {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().parse::<f32>().map_err(|e| {
            OverlayError::InvalidParameter(format!("无法解析 score_threshold {s:?}: {e}"))
        })?;
        Self::new(value)
    }
}

impl fmt::Display for ScoreThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// 最多显示的检测数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MaxDetections(usize);

impl MaxDetections {
    pub fn new(value: usize) -> Self {
        Self(value)
    }

    pub fn value(self) -> usize {
        self.0
    }
}

impl Default for MaxDetections {
    fn default() -> Self {
        Self(DEFAULT_MAX_DETECTIONS)
    }
}

impl TryFrom<i64> for MaxDetections {
    type Error = OverlayError;

    fn try_from(value: i64) -> Result<Self> {
        usize::try_from(value).map(Self).map_err(|_| {
            OverlayError::InvalidParameter(format!("max_detections 不能为负数，实际为 {value}"))
        })
    }
}

impl FromStr for MaxDetections {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().parse::<i64>().map_err(|e| {
            OverlayError::InvalidParameter(format!("无法解析 max_detections {s:?}: {e}"))
        })?;
        Self::try_from(value)
    }
}

impl fmt::Display for MaxDetections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 当前会话使用的检测参数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectionParameters {
    pub score_threshold: ScoreThreshold,
    pub max_detections: MaxDetections,
}

impl DetectionParameters {
    pub fn new(score_threshold: ScoreThreshold, max_detections: MaxDetections) -> Self {
        Self {
            score_threshold,
            max_detections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_bounds() {
        assert!(ScoreThreshold::new(0.0).is_ok());
        assert!(ScoreThreshold::new(1.0).is_ok());
        assert!(ScoreThreshold::new(1.01).is_err());
        assert!(ScoreThreshold::new(-0.1).is_err());
        assert!(ScoreThreshold::new(f32::NAN).is_err());
    }

    #[test]
    fn test_threshold_accepts_equal_score() {
        let t = ScoreThreshold::new(0.5).unwrap();
        assert!(t.accepts(0.5));
        assert!(!t.accepts(0.49));
    }

    #[test]
    fn test_parse_from_slider_text() {
        assert_eq!("0.35".parse::<ScoreThreshold>().unwrap().value(), 0.35);
        assert!("abc".parse::<ScoreThreshold>().is_err());
        assert_eq!(" 3 ".parse::<MaxDetections>().unwrap().value(), 3);
        assert!("-1".parse::<MaxDetections>().is_err());
    }

    #[test]
    fn test_defaults() {
        let params = DetectionParameters::default();
        assert_eq!(params.score_threshold.value(), 0.5);
        assert_eq!(params.max_detections.value(), 5);
    }
}
