use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use image::DynamicImage;
use ndarray::{Array2, Axis};
use ort::session::Session;

use crate::config::ModelSettings;
use crate::detect::bounds::{BoundingBox, DetectionRecord};
use crate::detect::detector::Detector;
use crate::detect::infer::run_inference;
use crate::detect::labels::class_name;
use crate::detect::model::load_model;
use crate::detect::posts::{apply_nms, sort_by_score};
use crate::detect::prevs::{image_to_tensor, resize_image};
use crate::error::{OverlayError, Result};
use crate::source::Frame;

/// YOLO目标检测器
///
/// 模型在 `warm_up` 时才加载，推理在阻塞线程池中执行，不会占用事件循环。
/// 输出已按置信度降序排列。
///
/// # 示例
///
/// ```no_run
/// use percept::{Detector, YoloDetector};
///
/// # async fn run() -> Result<(), percept::OverlayError> {
/// let detector = YoloDetector::new("models/yolo11n.onnx", 640, 640)
///     .with_confidence_threshold(0.25)
///     .with_nms_threshold(0.7);
/// detector.warm_up().await?;
/// # Ok(())
/// # }
/// ```
pub struct YoloDetector {
    model_path: PathBuf,
    /// 未加载时为 None
    session: Arc<Mutex<Option<Session>>>,
    input_width: usize,
    input_height: usize,
    /// 模型内部的候选框预过滤阈值，与界面上的阈值无关
    confidence_threshold: f32,
    nms_threshold: f32,
    intra_threads: usize,
}

impl YoloDetector {
    /// 创建新的YoloDetector实例（尚未加载模型）
    pub fn new(model_path: impl AsRef<Path>, input_width: usize, input_height: usize) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            session: Arc::new(Mutex::new(None)),
            input_width,
            input_height,
            confidence_threshold: 0.25,
            nms_threshold: 0.7,
            intra_threads: 4,
        }
    }

    /// 根据配置创建检测器
    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self::new(&settings.path, settings.input_width, settings.input_height)
            .with_confidence_threshold(settings.confidence_threshold)
            .with_nms_threshold(settings.nms_threshold)
            .with_intra_threads(settings.intra_threads)
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.nms_threshold = threshold;
        self
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads.max(1);
        self
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn input_height(&self) -> usize {
        self.input_height
    }

    pub fn is_loaded(&self) -> bool {
        self.session.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

#[async_trait]
impl Detector for YoloDetector {
    fn name(&self) -> &str {
        "yolo"
    }

    async fn warm_up(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let path = self.model_path.clone();
        let threads = self.intra_threads;
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let model = load_model(&path, threads)?;
            let mut slot = session
                .lock()
                .map_err(|_| OverlayError::DetectorUnavailable("模型锁已损坏".to_string()))?;
            *slot = Some(model);
            log::info!("模型加载完成: {}", path.display());
            Ok(())
        })
        .await
        .map_err(|e| OverlayError::DetectorUnavailable(e.to_string()))?
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectionRecord>> {
        let image = frame.image();
        let session = Arc::clone(&self.session);
        let (input_width, input_height) = (self.input_width, self.input_height);
        let (confidence_threshold, nms_threshold) = (self.confidence_threshold, self.nms_threshold);

        tokio::task::spawn_blocking(move || {
            let mut slot = session
                .lock()
                .map_err(|_| OverlayError::DetectionFailed("模型锁已损坏".to_string()))?;
            let model = slot
                .as_mut()
                .ok_or_else(|| OverlayError::DetectorUnavailable("模型尚未加载".to_string()))?;

            let start_time = Instant::now();
            let output = infer_image(model, &image, input_width, input_height)?;
            log::trace!("模型推理耗时: {:?}", start_time.elapsed());

            Ok(process_output(
                &output,
                image.width() as f32,
                image.height() as f32,
                input_width,
                input_height,
                confidence_threshold,
                nms_threshold,
            ))
        })
        .await
        .map_err(|e| OverlayError::DetectionFailed(e.to_string()))?
    }
}

fn infer_image(
    model: &mut Session,
    image: &DynamicImage,
    input_width: usize,
    input_height: usize,
) -> Result<Array2<f32>> {
    let resized = resize_image(image, input_width as u32, input_height as u32);
    let tensor = image_to_tensor(&resized, input_height, input_width);
    run_inference(model, &tensor)
}

/// 将模型输出转换为源画面坐标下的检测结果
///
/// 模型坐标相对于输入尺寸（如640x640），需要按比例还原到原始画面。
/// 结果按置信度降序排列并经过NMS。
pub fn process_output(
    output: &Array2<f32>,
    img_width: f32,
    img_height: f32,
    input_width: usize,
    input_height: usize,
    confidence_threshold: f32,
    nms_threshold: f32,
) -> Vec<DetectionRecord> {
    let scale_x = img_width / input_width as f32;
    let scale_y = img_height / input_height as f32;
    let mut detections = Vec::with_capacity(output.len_of(Axis(0)));

    for row in output.axis_iter(Axis(0)) {
        let score = row[4];
        if score < confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_corners(
            row[0] * scale_x,
            row[1] * scale_y,
            row[2] * scale_x,
            row[3] * scale_y,
        );
        if !bbox.is_valid() {
            continue;
        }

        let class_id = row[5].max(0.0).round() as usize;
        detections.push(DetectionRecord::new(bbox, class_name(class_id), score));
    }

    sort_by_score(&mut detections);
    apply_nms(detections, nms_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_process_output_scales_and_sorts() {
        let output = array![
            [0.0, 0.0, 320.0, 320.0, 0.6, 15.0],
            [320.0, 320.0, 640.0, 640.0, 0.9, 0.0],
            [10.0, 10.0, 20.0, 20.0, 0.1, 16.0],
        ];
        let detections = process_output(&output, 1280.0, 960.0, 640, 640, 0.25, 0.7);

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_name, "person");
        assert_eq!(detections[0].bbox, BoundingBox::new(640.0, 480.0, 640.0, 480.0));
        assert_eq!(detections[1].class_name, "cat");
        assert_eq!(detections[1].bbox, BoundingBox::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_process_output_drops_degenerate_boxes() {
        let output = array![[5.0, 5.0, 5.0, 50.0, 0.9, 0.0]];
        assert!(process_output(&output, 640.0, 640.0, 640, 640, 0.25, 0.7).is_empty());
    }

    #[tokio::test]
    async fn test_warm_up_missing_model() {
        let detector = YoloDetector::new("does/not/exist.onnx", 640, 640);
        let err = detector.warm_up().await.unwrap_err();
        assert!(matches!(err, OverlayError::DetectorUnavailable(_)));
        assert!(!detector.is_loaded());
    }

    #[tokio::test]
    async fn test_detect_before_warm_up() {
        let detector = YoloDetector::new("does/not/exist.onnx", 640, 640);
        let frame = Frame::new(DynamicImage::new_rgb8(8, 8));
        let err = detector.detect(&frame).await.unwrap_err();
        assert!(matches!(err, OverlayError::DetectorUnavailable(_)));
    }
}
