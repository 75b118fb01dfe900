//! 叠加层渲染
//!
//! 把检测结果转换为绘图命令：检测框、标签、镜像坐标和按类别分配的颜色。
//!
//! # 主要组件
//!
//! - Overlay：渲染器，持有会话级的颜色映射
//! - Canvas：绘图表面接口
//! - DrawList：离屏命令列表，整体回放到真正的画布上
//! - RasterCanvas：基于raqote的位图画布
//!
//! # 示例
//!
//! ```
//! use percept::{BoundingBox, DetectionRecord, DrawList, Overlay};
//!
//! let detections = vec![DetectionRecord::new(BoundingBox::new(10.0, 40.0, 50.0, 50.0), "cat", 0.9)];
//! let mut overlay = Overlay::default();
//! let mut list = DrawList::new();
//! overlay.render(&detections, &mut list, 640.0, 480.0, true);
//! assert_eq!(list.boxes().next().unwrap().0.x, 580.0);
//! ```

pub mod canvas;
pub mod palette;
pub mod raster;
pub mod render;

pub use canvas::{Canvas, DrawCommand, DrawList, Rect};
pub use palette::{Color, ColorAssignment};
pub use raster::RasterCanvas;
pub use render::{Overlay, OverlayStyle};
