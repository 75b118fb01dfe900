//! percept - 在静态图像或图像序列上运行检测并输出叠加层

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;

use percept::detect::labels::COCO_CLASSES;
use percept::overlay::render::label_text;
use percept::source::load_image;
use percept::{
    Controller, FrameSource, ImageSequence, InputSource, OverlayFrame, RasterCanvas, Settings,
    Status, YoloDetector,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// 配置文件路径（未指定时由 Settings::load 读取 PERCEPT_CONFIG）
    #[arg(long)]
    config: Option<PathBuf>,
    /// ONNX模型路径，覆盖配置文件
    #[arg(long)]
    model: Option<PathBuf>,
    /// 检测单张图像
    #[arg(long, conflicts_with = "frames")]
    image: Option<PathBuf>,
    /// 把目录中的图像当作摄像头画面循环播放
    #[arg(long)]
    frames: Option<PathBuf>,
    /// 置信度阈值 [0, 1]
    #[arg(long)]
    threshold: Option<f32>,
    /// 最多显示的检测数量
    #[arg(long)]
    max_detections: Option<i64>,
    /// 摄像头画面不做镜像
    #[arg(long)]
    no_mirror: bool,
    /// 摄像头模式下运行的时间（毫秒）
    #[arg(long, default_value_t = 3000)]
    duration_ms: u64,
    /// 标签字体文件
    #[arg(long)]
    font: Option<PathBuf>,
    /// 把最后一帧叠加层保存为PNG
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("加载配置失败")?;
    if let Some(model) = &args.model {
        settings.model.path = model.clone();
    }
    if let Some(font) = &args.font {
        settings.overlay.font_path = Some(font.clone());
    }
    if args.no_mirror {
        settings.overlay.mirror_webcam = false;
    }
    log::info!("模型: {} ({} 个类别)", settings.model.path.display(), COCO_CLASSES.len());

    let detector = Arc::new(YoloDetector::from_settings(&settings.model));
    let camera: Arc<dyn FrameSource> = match &args.frames {
        Some(dir) => Arc::new(ImageSequence::from_dir(dir)?),
        None => Arc::new(ImageSequence::new(Vec::new())),
    };
    let initial = match &args.image {
        Some(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            InputSource::image(name, path.clone())
        }
        None => InputSource::Webcam,
    };

    let font_path = settings.overlay.font_path.clone();
    let (handle, task) = Controller::new(detector, camera, settings)
        .with_initial_source(initial)
        .spawn();
    if let Some(threshold) = args.threshold {
        handle.set_score_threshold(threshold)?;
    }
    if let Some(limit) = args.max_detections {
        handle.set_max_detections(limit)?;
    }

    let mut overlay = handle.overlay();
    let mut status = handle.status();
    let deadline = tokio::time::sleep(Duration::from_millis(args.duration_ms));
    tokio::pin!(deadline);

    let mut last = OverlayFrame::default();
    loop {
        tokio::select! {
            changed = overlay.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = overlay.borrow_and_update().clone();
                if frame.cycle == 0 {
                    continue;
                }
                let labels: Vec<String> = frame.detections.iter().map(label_text).collect();
                log::info!("#{} {}: [{}]", frame.cycle, frame.source, labels.join(", "));
                last = frame;
                // 静态图像只需要一次检测，但要等参数防抖生效
                let tuning = args.threshold.is_some() || args.max_detections.is_some();
                if args.image.is_some() && !tuning {
                    break;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                match current {
                    Status::DetectorUnavailable(msg) => {
                        handle.shutdown();
                        return Err(anyhow!("检测器不可用: {}", msg));
                    }
                    Status::SourceFailed(msg) => {
                        handle.shutdown();
                        return Err(anyhow!("输入源不可用: {}", msg));
                    }
                    other => log::debug!("状态: {:?}", other),
                }
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    task.await?;

    if let Some(output) = &args.output {
        if last.cycle == 0 {
            return Err(anyhow!("没有可保存的检测结果"));
        }
        let mut canvas = RasterCanvas::new(last.size.width, last.size.height);
        if let Some(font) = &font_path {
            canvas = canvas.with_font(font)?;
        }
        last.paint(&mut canvas);

        let image = match &args.image {
            Some(path) => canvas.compose_over(&load_image(path)?)?,
            None => canvas.to_image(),
        };
        image
            .save(output)
            .with_context(|| format!("无法保存 {}", output.display()))?;
        log::info!("已保存叠加层: {}", output.display());
    }
    Ok(())
}
