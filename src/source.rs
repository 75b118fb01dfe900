//! 输入源
//!
//! - `Frame`：已解码的一帧画面
//! - `InputSource`：摄像头或静态图像
//! - `FrameSource`：持续产出画面的来源（摄像头）
//! - `SourceCatalog`：输入源下拉框的选项

pub mod catalog;
pub mod frame;
pub mod still;
pub mod sequence;

pub use catalog::{Selection, SourceCatalog};
pub use frame::{Frame, FrameSize};
pub use still::{load_image, ImageHandle, InputSource};
pub use sequence::{FrameSource, ImageSequence};
