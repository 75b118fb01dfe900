use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use raqote::SolidSource;

use crate::error::OverlayError;

/// 默认调色板：红、橙、绿、蓝、粉、紫
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#FF0000", "#FFA500", "#008000", "#0000FF", "#D300CF", "#9400D3",
];

/// 不带预乘的RGBA颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub fn to_source(self) -> SolidSource {
        SolidSource::from_unpremultiplied_argb(self.a, self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = OverlayError;

    /// 解析 `#RRGGBB` 格式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OverlayError::Config(format!("无效的颜色值: {s:?}"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        // from_str_radix 接受前导 '+'，这里只允许十六进制数字
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// 类别名称到颜色的映射
///
/// 只增不减：类别第一次出现时分配调色板中的下一个颜色，用完后从头循环。
/// 生命周期与会话相同，不会被隐式重置。
#[derive(Debug, Clone)]
pub struct ColorAssignment {
    palette: Vec<Color>,
    assigned: HashMap<String, Color>,
}

impl ColorAssignment {
    /// 使用给定调色板创建，调色板为空时退回默认调色板
    pub fn new(palette: Vec<Color>) -> Self {
        let palette = if palette.is_empty() {
            default_palette()
        } else {
            palette
        };
        Self {
            palette,
            assigned: HashMap::new(),
        }
    }

    /// 查找类别颜色，首次出现时分配新颜色
    pub fn color_for(&mut self, class_name: &str) -> Color {
        if let Some(color) = self.assigned.get(class_name) {
            return *color;
        }
        let color = self.palette[self.assigned.len() % self.palette.len()];
        self.assigned.insert(class_name.to_string(), color);
        color
    }

    /// 只查询，不分配
    pub fn get(&self, class_name: &str) -> Option<Color> {
        self.assigned.get(class_name).copied()
    }

    /// 已分配颜色的类别数量
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }
}

impl Default for ColorAssignment {
    fn default() -> Self {
        Self::new(default_palette())
    }
}

pub fn default_palette() -> Vec<Color> {
    DEFAULT_PALETTE
        .iter()
        .filter_map(|hex| hex.parse().ok())
        .collect()
}
