use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{OverlayError, Result};
use crate::source::frame::Frame;
use crate::source::still::load_image;

/// 连续画面的来源（摄像头）
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// 获取最新的一帧
    ///
    /// 画面尚未就绪（未解码或尺寸为0）时返回 `FrameNotReady`
    async fn next_frame(&self) -> Result<Frame>;
}

/// 循环播放一组图像，在没有摄像头时代替摄像头
pub struct ImageSequence {
    frames: Vec<Frame>,
    cursor: AtomicUsize,
}

impl ImageSequence {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            cursor: AtomicUsize::new(0),
        }
    }

    /// 按文件名顺序加载目录中所有可解码的图像
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            match load_image(&path) {
                Ok(image) => frames.push(Frame::new(image)),
                Err(e) => log::debug!("跳过无法解码的文件 {}: {}", path.display(), e),
            }
        }
        if frames.is_empty() {
            return Err(OverlayError::Config(format!(
                "目录中没有可用的图像: {}",
                dir.display()
            )));
        }
        log::info!("从 {} 加载了 {} 帧", dir.display(), frames.len());
        Ok(Self::new(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
impl FrameSource for ImageSequence {
    async fn next_frame(&self) -> Result<Frame> {
        if self.frames.is_empty() {
            return Err(OverlayError::FrameNotReady);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        let frame = self.frames[index].clone();
        if !frame.is_ready() {
            return Err(OverlayError::FrameNotReady);
        }
        Ok(frame)
    }
}
