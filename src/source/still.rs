use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::error::{OverlayError, Result};
use crate::source::frame::Frame;

/// 加载图像文件
///
/// # 错误处理
/// 文件不存在时返回 `Io(NotFound)`，无法解码时返回 `Image`
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(OverlayError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("图像文件不存在: {}", path.display()),
        )));
    }
    Ok(image::open(path)?)
}

/// 可解码的图像句柄，对应文件选择器给出的文件
#[derive(Clone)]
pub enum ImageHandle {
    /// 本地文件路径
    Path(PathBuf),
    /// 尚未解码的文件内容
    Encoded(Arc<[u8]>),
    /// 已经解码的图像
    Decoded(Arc<DynamicImage>),
}

impl ImageHandle {
    /// 解码图像
    ///
    /// 解码在阻塞线程池中执行；返回时图像已完整解码。
    pub async fn decode(&self) -> Result<Frame> {
        let frame = match self {
            ImageHandle::Decoded(image) => Frame::from_shared(Arc::clone(image)),
            ImageHandle::Path(path) => {
                let path = path.clone();
                let image = tokio::task::spawn_blocking(move || load_image(&path))
                    .await
                    .map_err(|e| OverlayError::Io(io::Error::other(e)))??;
                Frame::new(image)
            }
            ImageHandle::Encoded(bytes) => {
                let bytes = Arc::clone(bytes);
                let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
                    .await
                    .map_err(|e| OverlayError::Io(io::Error::other(e)))??;
                Frame::new(image)
            }
        };
        Ok(frame)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageHandle::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ImageHandle::Encoded(bytes) => write!(f, "Encoded({} bytes)", bytes.len()),
            ImageHandle::Decoded(image) => {
                write!(f, "Decoded({}x{})", image.width(), image.height())
            }
        }
    }
}

impl From<PathBuf> for ImageHandle {
    fn from(path: PathBuf) -> Self {
        ImageHandle::Path(path)
    }
}

impl From<DynamicImage> for ImageHandle {
    fn from(image: DynamicImage) -> Self {
        ImageHandle::Decoded(Arc::new(image))
    }
}

/// 当前的输入源，同一时间只有一个处于激活状态
#[derive(Debug, Clone)]
pub enum InputSource {
    Webcam,
    StaticImage { name: String, image: ImageHandle },
}

impl InputSource {
    pub fn image(name: impl Into<String>, image: impl Into<ImageHandle>) -> Self {
        InputSource::StaticImage {
            name: name.into(),
            image: image.into(),
        }
    }

    /// 在下拉框中显示的名称
    pub fn label(&self) -> &str {
        match self {
            InputSource::Webcam => "webcam",
            InputSource::StaticImage { name, .. } => name,
        }
    }

    pub fn is_webcam(&self) -> bool {
        matches!(self, InputSource::Webcam)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    #[test]
    fn test_load_missing_image() {
        let err = load_image(Path::new("no/such/image.jpg")).unwrap_err();
        assert!(matches!(err, OverlayError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_decode_encoded_bytes() {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(12, 7)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let frame = ImageHandle::Encoded(bytes.into()).decode().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (12, 7));
        assert!(frame.is_ready());
    }

    #[tokio::test]
    async fn test_decode_garbage_fails() {
        let handle = ImageHandle::Encoded(Arc::from(&b"not an image"[..]));
        assert!(matches!(handle.decode().await, Err(OverlayError::Image(_))));
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(InputSource::Webcam.label(), "webcam");
        let source = InputSource::image("desk.jpg", DynamicImage::new_rgb8(1, 1));
        assert_eq!(source.label(), "desk.jpg");
        assert!(!source.is_webcam());
    }
}
