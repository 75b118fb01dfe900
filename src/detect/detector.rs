use async_trait::async_trait;

use crate::detect::bounds::DetectionRecord;
use crate::detect::posts::OutputOrder;
use crate::error::Result;
use crate::source::Frame;

/// 目标检测器接口
///
/// 检测器被视为黑盒：输入一帧画面，异步返回检测结果。
/// 调用失败时不会自动重试，由调用方记录日志后等待下一次轮询。
#[async_trait]
pub trait Detector: Send + Sync {
    /// 检测器名称（用于日志）
    fn name(&self) -> &str;

    /// 对一帧画面执行检测
    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectionRecord>>;

    /// 加载模型等预热操作，失败时返回 `DetectorUnavailable`
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }

    /// 输出结果的排列顺序
    fn output_order(&self) -> OutputOrder {
        OutputOrder::Descending
    }
}
