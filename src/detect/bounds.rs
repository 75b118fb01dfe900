/// 边界框结构
///
/// 以源画面的像素坐标表示，左上角加宽高，尚未做镜像处理。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    /// 左上角x坐标
    pub x: f32,
    /// 左上角y坐标
    pub y: f32,
    /// 宽度
    pub width: f32,
    /// 高度
    pub height: f32,
}

impl BoundingBox {
    /// 创建一个新的边界框
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// 由左上角和右下角坐标创建边界框
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// 右边界
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// 下边界
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// 计算边界框的面积
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// 检查边界框是否有效（宽度和高度都大于0）
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// 两个边界框的交并比
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// 单帧中检测到的一个目标
///
/// 每次调用检测器都会重新生成，渲染完成后即丢弃。
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    /// 目标的边界框
    pub bbox: BoundingBox,
    /// 类别名称
    pub class_name: String,
    /// 置信度 (0.0 - 1.0)
    pub score: f32,
}

impl DetectionRecord {
    /// 创建一个新的检测结果
    pub fn new(bbox: BoundingBox, class_name: impl Into<String>, score: f32) -> Self {
        Self {
            bbox,
            class_name: class_name.into(),
            score,
        }
    }
}
