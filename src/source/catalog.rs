use crate::source::still::{ImageHandle, InputSource};

/// 下拉框中表示摄像头的值
pub const WEBCAM_OPTION: &str = "webcam";
/// 下拉框中打开文件选择器的值
pub const CHOOSE_FILE_OPTION: &str = "choose file";

/// 下拉框选中某一项后的结果
#[derive(Debug, Clone)]
pub enum Selection {
    Source(InputSource),
    /// 需要打开文件选择器
    ChooseFile,
}

/// 输入源下拉框的可选项
///
/// 包含摄像头、所有已上传过的图像以及"选择文件"。同名图像重新上传时替换旧的句柄。
#[derive(Debug, Default)]
pub struct SourceCatalog {
    images: Vec<(String, ImageHandle)>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 文件选择器选中文件后调用，返回对应的输入源
    pub fn add_image(&mut self, name: impl Into<String>, image: ImageHandle) -> InputSource {
        let name = name.into();
        match self.images.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = image.clone(),
            None => self.images.push((name.clone(), image.clone())),
        }
        InputSource::StaticImage { name, image }
    }

    /// 下拉框的所有选项，按显示顺序排列
    pub fn options(&self) -> Vec<&str> {
        let mut options = Vec::with_capacity(self.images.len() + 2);
        options.push(WEBCAM_OPTION);
        options.extend(self.images.iter().map(|(name, _)| name.as_str()));
        options.push(CHOOSE_FILE_OPTION);
        options
    }

    /// 根据下拉框的值查找选项，未知的值返回 None
    pub fn select(&self, value: &str) -> Option<Selection> {
        match value {
            WEBCAM_OPTION => Some(Selection::Source(InputSource::Webcam)),
            CHOOSE_FILE_OPTION => Some(Selection::ChooseFile),
            _ => self
                .images
                .iter()
                .find(|(name, _)| name == value)
                .map(|(name, image)| {
                    Selection::Source(InputSource::image(name.clone(), image.clone()))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    #[test]
    fn test_options_order() {
        let mut catalog = SourceCatalog::new();
        assert_eq!(catalog.options(), vec!["webcam", "choose file"]);

        catalog.add_image("desk.jpg", DynamicImage::new_rgb8(1, 1).into());
        catalog.add_image("street.png", DynamicImage::new_rgb8(1, 1).into());
        catalog.add_image("desk.jpg", DynamicImage::new_rgb8(2, 2).into());
        assert_eq!(catalog.options(), vec!["webcam", "desk.jpg", "street.png", "choose file"]);
    }

    #[test]
    fn test_select() {
        let mut catalog = SourceCatalog::new();
        catalog.add_image("desk.jpg", DynamicImage::new_rgb8(1, 1).into());

        assert!(matches!(catalog.select("webcam"), Some(Selection::Source(InputSource::Webcam))));
        assert!(matches!(catalog.select("choose file"), Some(Selection::ChooseFile)));
        match catalog.select("desk.jpg") {
            Some(Selection::Source(source)) => assert_eq!(source.label(), "desk.jpg"),
            other => panic!("unexpected selection: {other:?}"),
        }
        assert!(catalog.select("missing.jpg").is_none());
    }
}
