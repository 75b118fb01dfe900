//! 错误类型定义

use thiserror::Error;

/// 叠加层流水线中的所有错误
///
/// - `DetectorUnavailable`：模型加载失败，在重新选择输入源之前不会启动任何检测周期
/// - `DetectionFailed` / `FrameNotReady`：只放弃当前这一次检测，轮询继续
/// - `InvalidParameter`：在设置参数时直接拒绝，原有参数保持不变
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("检测器不可用: {0}")]
    DetectorUnavailable(String),

    #[error("检测失败: {0}")]
    DetectionFailed(String),

    #[error("画面尚未就绪")]
    FrameNotReady,

    #[error("参数无效: {0}")]
    InvalidParameter(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("图像错误: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("控制器已停止")]
    ControllerStopped,
}

impl OverlayError {
    /// 该错误是否只影响当前这一次检测周期
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OverlayError::DetectionFailed(_) | OverlayError::FrameNotReady
        )
    }
}

impl From<ort::Error> for OverlayError {
    fn from(err: ort::Error) -> Self {
        OverlayError::DetectionFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;
