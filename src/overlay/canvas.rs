use crate::overlay::palette::Color;

/// 画布坐标系下的矩形
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// 绘图表面
///
/// 渲染器只通过这个接口绘图，具体实现可以是位图、浏览器画布或命令列表。
pub trait Canvas {
    /// 设置画布尺寸（与源画面的原始像素尺寸一致）
    fn resize(&mut self, width: u32, height: u32);

    /// 把矩形区域清为透明
    fn clear(&mut self, rect: Rect);

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// 以 (x, y) 为基线起点绘制文字
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color, font_size: f32);
}

/// 一条绘图命令
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Resize { width: u32, height: u32 },
    Clear(Rect),
    StrokeRect { rect: Rect, color: Color, line_width: f32 },
    FillRect { rect: Rect, color: Color },
    FillText { text: String, x: f32, y: f32, color: Color, font_size: f32 },
}

/// 记录绘图命令的离屏画布
///
/// 渲染先写入命令列表，完成后再整体回放到真正的画布上，
/// 观察者看到的要么是旧的完整叠加层，要么是新的完整叠加层。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 按顺序把所有命令回放到目标画布
    pub fn replay<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        for command in &self.commands {
            match command {
                DrawCommand::Resize { width, height } => canvas.resize(*width, *height),
                DrawCommand::Clear(rect) => canvas.clear(*rect),
                DrawCommand::StrokeRect { rect, color, line_width } => {
                    canvas.stroke_rect(*rect, *color, *line_width)
                }
                DrawCommand::FillRect { rect, color } => canvas.fill_rect(*rect, *color),
                DrawCommand::FillText { text, x, y, color, font_size } => {
                    canvas.fill_text(text, *x, *y, *color, *font_size)
                }
            }
        }
    }

    /// 所有描边矩形，按绘制顺序
    pub fn boxes(&self) -> impl Iterator<Item = (Rect, Color)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::StrokeRect { rect, color, .. } => Some((*rect, *color)),
            _ => None,
        })
    }

    /// 所有文字标签及其基线位置，按绘制顺序
    pub fn labels(&self) -> impl Iterator<Item = (&str, f32, f32)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::FillText { text, x, y, .. } => Some((text.as_str(), *x, *y)),
            _ => None,
        })
    }
}

impl Canvas for DrawList {
    fn resize(&mut self, width: u32, height: u32) {
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn clear(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::Clear(rect));
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) {
        self.commands.push(DrawCommand::StrokeRect { rect, color, line_width });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Color, font_size: f32) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            color,
            font_size,
        });
    }
}
