pub mod config;
pub mod controller;
pub mod detect;
pub mod error;
pub mod overlay;
pub mod source;
pub mod utils;

// 重新导出常用类型和函数
pub use config::Settings;
pub use controller::{
    compose_overlay, run_detection_cycle, Controller, ControllerHandle, OverlayFrame, Status,
};
pub use detect::{
    BoundingBox, DetectionParameters, DetectionRecord, Detector, MaxDetections, ScoreThreshold,
};
pub use detect::{post_process, OutputOrder, YoloDetector};
pub use error::{OverlayError, Result};
pub use overlay::{
    Canvas, Color, ColorAssignment, DrawCommand, DrawList, Overlay, OverlayStyle, RasterCanvas,
    Rect,
};
pub use source::{
    Frame, FrameSize, FrameSource, ImageHandle, ImageSequence, InputSource, SourceCatalog,
};
