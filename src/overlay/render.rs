use crate::config::OverlaySettings;
use crate::detect::bounds::{BoundingBox, DetectionRecord};
use crate::overlay::canvas::{Canvas, Rect};
use crate::overlay::palette::{Color, ColorAssignment};

/// 叠加层的绘制样式
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// 检测框线宽，同一次渲染中所有框一致
    pub line_width: f32,
    pub font_size: f32,
    /// 框顶距画布顶部不超过该值时，标签改为放在画布顶边下方
    pub label_margin: f32,
    /// 标签基线与框顶的距离
    pub label_offset: f32,
    pub text_color: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            font_size: 14.0,
            label_margin: 20.0,
            label_offset: 5.0,
            text_color: Color::WHITE,
        }
    }
}

impl From<&OverlaySettings> for OverlayStyle {
    fn from(settings: &OverlaySettings) -> Self {
        Self {
            line_width: settings.line_width,
            font_size: settings.font_size,
            label_margin: settings.label_margin,
            ..Self::default()
        }
    }
}

/// 镜像后的显示坐标x
pub fn display_x(bbox: &BoundingBox, frame_width: f32, mirrored: bool) -> f32 {
    if mirrored {
        frame_width - bbox.x - bbox.width
    } else {
        bbox.x
    }
}

/// 标签文字，如 "cat 90%"
pub fn label_text(detection: &DetectionRecord) -> String {
    format!("{} {}%", detection.class_name, (detection.score * 100.0).round() as i32)
}

/// 叠加层渲染器
///
/// 除了颜色映射外不持有任何状态，也不读取阈值或数量上限：
/// 传进来的每一个检测结果都会被画出来。
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    colors: ColorAssignment,
    style: OverlayStyle,
}

impl Overlay {
    pub fn new(colors: ColorAssignment, style: OverlayStyle) -> Self {
        Self { colors, style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn colors(&self) -> &ColorAssignment {
        &self.colors
    }

    /// 绘制一帧的检测结果
    ///
    /// 先清空整个画布，再按输入顺序绘制每个检测框及其标签。
    ///
    /// # 参数
    /// * `detections` - 已过滤、已截断的检测结果
    /// * `canvas` - 绘图表面
    /// * `frame_width` / `frame_height` - 源画面尺寸
    /// * `mirrored` - 画面是否水平翻转显示
    pub fn render<C: Canvas + ?Sized>(
        &mut self,
        detections: &[DetectionRecord],
        canvas: &mut C,
        frame_width: f32,
        frame_height: f32,
        mirrored: bool,
    ) {
        canvas.clear(Rect::new(0.0, 0.0, frame_width, frame_height));

        for detection in detections {
            let bbox = &detection.bbox;
            let x = display_x(bbox, frame_width, mirrored);
            let color = self.colors.color_for(&detection.class_name);

            canvas.stroke_rect(
                Rect::new(x, bbox.y, bbox.width, bbox.height),
                color,
                self.style.line_width,
            );

            let text = label_text(detection);
            let (label_x, baseline) = self.label_anchor(x, bbox.y);
            canvas.fill_rect(self.label_tag(&text, label_x, baseline, bbox.y), color);
            canvas.fill_text(&text, label_x, baseline, self.style.text_color, self.style.font_size);
        }
    }

    /// 标签的起点和基线
    ///
    /// 默认在框顶上方；框顶距画布顶部不超过 `label_margin` 时，
    /// 标签移到框内，紧贴上边框的下方，不会超出画布也不会盖住边框。
    pub fn label_anchor(&self, x: f32, box_top: f32) -> (f32, f32) {
        if box_top > self.style.label_margin {
            (x, box_top - self.style.label_offset)
        } else {
            let inset = self.style.line_width / 2.0;
            (x + inset, box_top + inset + self.style.font_size)
        }
    }

    // 没有字体度量，按字符数估算宽度；下沿不越过上边框
    fn label_tag(&self, text: &str, x: f32, baseline: f32, box_top: f32) -> Rect {
        let font_size = self.style.font_size;
        let width = text.chars().count() as f32 * font_size * 0.6;
        let top = baseline - font_size;
        let mut bottom = baseline + font_size * 0.25;
        let stroke_top = box_top - self.style.line_width / 2.0;
        if top < stroke_top {
            bottom = bottom.min(stroke_top);
        }
        Rect::new(x, top, width, bottom - top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::canvas::{DrawCommand, DrawList};
    use crate::overlay::palette::default_palette;

    fn cat() -> DetectionRecord {
        DetectionRecord::new(BoundingBox::new(10.0, 40.0, 50.0, 50.0), "cat", 0.9)
    }

    fn draw(overlay: &mut Overlay, detections: &[DetectionRecord], mirrored: bool) -> DrawList {
        let mut list = DrawList::new();
        overlay.render(detections, &mut list, 640.0, 480.0, mirrored);
        list
    }

    #[test]
    fn test_clear_comes_first() {
        let mut overlay = Overlay::default();
        let list = draw(&mut overlay, &[cat()], false);
        assert_eq!(
            list.commands()[0],
            DrawCommand::Clear(Rect::new(0.0, 0.0, 640.0, 480.0))
        );
    }

    #[test]
    fn test_empty_input_only_clears() {
        let mut overlay = Overlay::default();
        let list = draw(&mut overlay, &[], true);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_renders_every_detection_given() {
        let mut overlay = Overlay::default();
        let low = DetectionRecord::new(BoundingBox::new(0.0, 0.0, 5.0, 5.0), "dog", 0.01);
        let list = draw(&mut overlay, &[cat(), low], false);
        assert_eq!(list.boxes().count(), 2);
        let labels: Vec<_> = list.labels().map(|(t, _, _)| t.to_string()).collect();
        assert_eq!(labels, vec!["cat 90%", "dog 1%"]);
    }

    #[test]
    fn test_mirroring_round_trip() {
        let mut overlay = Overlay::default();
        let plain = draw(&mut overlay, &[cat()], false);
        let mirrored = draw(&mut overlay, &[cat()], true);
        let back = draw(&mut overlay, &[cat()], false);

        let x = |list: &DrawList| list.boxes().next().unwrap().0.x;
        assert_eq!(x(&plain), 10.0);
        assert_eq!(x(&mirrored), 640.0 - 10.0 - 50.0);
        assert_eq!(x(&back), x(&plain));
        assert_eq!(mirrored.boxes().next().unwrap().0.y, 40.0);
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut overlay = Overlay::default();
        let cup = DetectionRecord::new(BoundingBox::new(300.0, 5.0, 20.0, 20.0), "cup", 0.55);
        let detections = vec![cat(), cup];
        let first = draw(&mut overlay, &detections, true);
        let second = draw(&mut overlay, &detections, true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_colors_stable_across_frames() {
        let mut overlay = Overlay::default();
        let palette = default_palette();
        let dog = DetectionRecord::new(BoundingBox::new(0.0, 30.0, 5.0, 5.0), "dog", 0.7);

        let first = draw(&mut overlay, &[dog.clone(), cat()], false);
        let second = draw(&mut overlay, &[cat(), dog], false);

        let colors = |list: &DrawList| list.boxes().map(|(_, c)| c).collect::<Vec<_>>();
        assert_eq!(colors(&first), vec![palette[0], palette[1]]);
        assert_eq!(colors(&second), vec![palette[1], palette[0]]);
    }

    #[test]
    fn test_label_above_box() {
        let mut overlay = Overlay::default();
        let list = draw(&mut overlay, &[cat()], false);
        assert_eq!(list.labels().next(), Some(("cat 90%", 10.0, 35.0)));
    }

    fn tags(list: &DrawList) -> Vec<Rect> {
        list.commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_label_clamped_near_top_edge() {
        let mut overlay = Overlay::default();
        let top = DetectionRecord::new(BoundingBox::new(10.0, 3.0, 50.0, 50.0), "person", 0.876);
        let list = draw(&mut overlay, &[top], true);
        let (text, x, y) = list.labels().next().unwrap();
        assert_eq!(text, "person 88%");
        // 镜像后框左边 580，线宽 2
        assert_eq!(x, 581.0);
        assert_eq!(y, 3.0 + 1.0 + 14.0);
        assert!(y - overlay.style().font_size >= 0.0);
    }

    #[test]
    fn test_label_tag_clears_top_stroke() {
        let mut overlay = Overlay::default();
        let half_line = overlay.style().line_width / 2.0;
        for top in [0.0, 3.0, 20.0, 21.0, 40.0] {
            let record = DetectionRecord::new(BoundingBox::new(10.0, top, 50.0, 50.0), "cat", 0.9);
            let list = draw(&mut overlay, &[record], false);
            let tag = tags(&list)[0];
            let above = tag.y + tag.height <= top - half_line;
            let below = tag.y >= top + half_line;
            assert!(above || below, "tag {:?} overlaps stroke at y={}", tag, top);
            assert!(tag.y >= 0.0);
        }
    }

    #[test]
    fn test_consistent_line_width() {
        let mut overlay = Overlay::default();
        let other = DetectionRecord::new(BoundingBox::new(100.0, 100.0, 5.0, 5.0), "dog", 0.7);
        let list = draw(&mut overlay, &[cat(), other], false);
        let widths: Vec<f32> = list
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeRect { line_width, .. } => Some(*line_width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![2.0, 2.0]);
    }
}
