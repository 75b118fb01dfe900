//! 目标检测
//!
//! - 检测结果与边界框的数据结构
//! - 用户可调的检测参数（阈值、数量上限）
//! - 后处理：置信度过滤、截断、NMS
//! - Detector 接口以及基于ONNX Runtime的YOLO实现
//!
//! # 工作流程
//!
//! 1. 创建检测器并调用 `warm_up` 加载模型
//! 2. 对每一帧调用 `detect`
//! 3. 用 `post_process` 按当前参数过滤并截断

pub mod bounds;
pub mod detector;
pub mod infer;
pub mod labels;
pub mod model;
pub mod params;
pub mod posts;
pub mod prevs;
pub mod yolo;

pub use bounds::{BoundingBox, DetectionRecord};
pub use detector::Detector;
pub use model::load_model;
pub use params::{DetectionParameters, MaxDetections, ScoreThreshold};
pub use posts::{cap_detections, filter_by_score, post_process, OutputOrder};
pub use yolo::YoloDetector;
