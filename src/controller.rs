//! 检测循环控制器
//!
//! 控制器是一个独立的事件循环任务，持有会话中所有可变状态：
//! 输入源、检测参数、检测器状态和颜色映射。界面通过 `ControllerHandle`
//! 发送命令，通过 watch 通道订阅完整的叠加层帧和状态。
//!
//! 所有耗时操作（获取画面、推理、图像解码、模型加载）都放在 `JoinSet` 中执行，
//! 完成后回到事件循环。每个检测任务都带有 `Ticket`：
//! - 切换输入源会使代数 `generation` 加一，旧代数的结果直接丢弃
//! - 同一代数内，编号不比已应用结果新的结果也会丢弃
//!
//! 摄像头轮询同一时间最多只有一个检测在执行，上一个完成后才会开始下一个。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::config::Settings;
use crate::detect::bounds::DetectionRecord;
use crate::detect::detector::Detector;
use crate::detect::params::{DetectionParameters, MaxDetections, ScoreThreshold};
use crate::detect::posts::{post_process, OutputOrder};
use crate::error::{OverlayError, Result};
use crate::overlay::canvas::{Canvas, DrawList, Rect};
use crate::overlay::palette::ColorAssignment;
use crate::overlay::render::{Overlay, OverlayStyle};
use crate::source::{Frame, FrameSize, FrameSource, InputSource};
use crate::utils::{Debouncer, Ticker};

/// 发布给界面的一帧完整叠加层
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    /// 输入源代数，每次切换输入源加一
    pub generation: u64,
    /// 产生该帧的检测编号，0 表示只清空了画布
    pub cycle: u64,
    /// 输入源名称
    pub source: String,
    pub size: FrameSize,
    pub mirrored: bool,
    /// 实际绘制的检测结果（已过滤、已截断）
    pub detections: Vec<DetectionRecord>,
    /// 先清空再绘制的完整命令列表
    pub draw_list: DrawList,
}

impl OverlayFrame {
    /// 把整帧回放到画布上
    pub fn paint<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        self.draw_list.replay(canvas);
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.detections.iter().map(|d| d.class_name.as_str()).collect()
    }
}

/// 控制器状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// 正在加载检测器
    Starting,
    Running,
    /// 检测器加载失败，重新选择输入源会重试
    DetectorUnavailable(String),
    /// 当前输入源无法使用（如图像无法解码）
    SourceFailed(String),
    Stopped,
}

#[derive(Debug)]
enum Command {
    SetSource(InputSource),
    SetScoreThreshold(ScoreThreshold),
    SetMaxDetections(MaxDetections),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    generation: u64,
    cycle: u64,
}

enum CycleOutput {
    Decoded {
        generation: u64,
        result: Result<Frame>,
    },
    Detected {
        ticket: Ticket,
        mirrored: bool,
        result: Result<(FrameSize, Vec<DetectionRecord>)>,
    },
}

enum Acquire {
    Camera(Arc<dyn FrameSource>),
    Still(Frame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Cold,
    Loading,
    Ready,
    Unavailable,
}

/// 按当前参数过滤、截断并渲染一次检测的结果
///
/// 渲染写入一个新的命令列表，开头先把画布尺寸同步为画面尺寸。
pub fn compose_overlay(
    records: Vec<DetectionRecord>,
    params: &DetectionParameters,
    order: OutputOrder,
    size: FrameSize,
    mirrored: bool,
    renderer: &mut Overlay,
) -> (Vec<DetectionRecord>, DrawList) {
    let detections = post_process(records, params, order);
    let mut draw_list = DrawList::new();
    draw_list.resize(size.width, size.height);
    renderer.render(
        &detections,
        &mut draw_list,
        size.width as f32,
        size.height as f32,
        mirrored,
    );
    (detections, draw_list)
}

/// 执行一次完整的检测周期：检测 -> 过滤 -> 截断 -> 渲染
///
/// # 错误处理
/// 画面尺寸为0时返回 `FrameNotReady`，检测器出错时原样返回
pub async fn run_detection_cycle(
    detector: &dyn Detector,
    frame: &Frame,
    params: &DetectionParameters,
    mirrored: bool,
    renderer: &mut Overlay,
) -> Result<(Vec<DetectionRecord>, DrawList)> {
    if !frame.is_ready() {
        return Err(OverlayError::FrameNotReady);
    }
    let records = detector.detect(frame).await?;
    Ok(compose_overlay(
        records,
        params,
        detector.output_order(),
        frame.size(),
        mirrored,
        renderer,
    ))
}

/// 检测循环控制器
pub struct Controller {
    detector: Arc<dyn Detector>,
    camera: Arc<dyn FrameSource>,
    settings: Settings,
    initial_source: InputSource,
}

impl Controller {
    pub fn new(
        detector: Arc<dyn Detector>,
        camera: Arc<dyn FrameSource>,
        settings: Settings,
    ) -> Self {
        Self {
            detector,
            camera,
            settings,
            initial_source: InputSource::Webcam,
        }
    }

    /// 启动时使用的输入源，默认为摄像头
    pub fn with_initial_source(mut self, source: InputSource) -> Self {
        self.initial_source = source;
        self
    }

    /// 在当前tokio运行时中启动事件循环
    pub fn spawn(self) -> (ControllerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (overlay_tx, overlay_rx) = watch::channel(OverlayFrame::default());
        let (status_tx, status_rx) = watch::channel(Status::Starting);

        let settings = self.settings;
        let renderer = Overlay::new(
            ColorAssignment::new(settings.overlay.palette.clone()),
            OverlayStyle::from(&settings.overlay),
        );
        let event_loop = EventLoop {
            order: self.detector.output_order(),
            detector: self.detector,
            camera: self.camera,
            commands: command_rx,
            overlay_tx,
            status_tx,
            cycles: JoinSet::new(),
            loading: JoinSet::new(),
            ticker: Ticker::new(settings.polling.poll_interval),
            threshold: Debouncer::new(settings.polling.debounce),
            limit: Debouncer::new(settings.polling.debounce),
            params: settings.detection.params(),
            renderer,
            mirror_webcam: settings.overlay.mirror_webcam,
            source: InputSource::Webcam,
            generation: 0,
            next_cycle: 0,
            applied_cycle: 0,
            in_flight: None,
            pending_pass: false,
            image: None,
            detector_state: DetectorState::Cold,
            canvas_size: FrameSize::default(),
        };

        let task = tokio::spawn(event_loop.run(self.initial_source));
        let handle = ControllerHandle {
            commands: command_tx,
            overlay: overlay_rx,
            status: status_rx,
        };
        (handle, task)
    }
}

/// 控制器的命令入口，可以克隆给多个界面组件
///
/// 参数在这里校验，非法值不会进入事件循环。
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    overlay: watch::Receiver<OverlayFrame>,
    status: watch::Receiver<Status>,
}

impl ControllerHandle {
    pub fn set_input_source(&self, source: InputSource) -> Result<()> {
        self.send(Command::SetSource(source))
    }

    /// 设置置信度阈值
    ///
    /// # 错误处理
    /// 超出 [0, 1] 时返回 `InvalidParameter`，原有阈值保持不变
    pub fn set_score_threshold(&self, value: f32) -> Result<()> {
        let threshold = ScoreThreshold::new(value)?;
        self.send(Command::SetScoreThreshold(threshold))
    }

    /// 设置最多显示的检测数量，负数返回 `InvalidParameter`
    pub fn set_max_detections(&self, value: i64) -> Result<()> {
        let limit = MaxDetections::try_from(value)?;
        self.send(Command::SetMaxDetections(limit))
    }

    /// 订阅叠加层帧
    pub fn overlay(&self) -> watch::Receiver<OverlayFrame> {
        self.overlay.clone()
    }

    /// 最近一次发布的叠加层帧
    pub fn latest(&self) -> OverlayFrame {
        self.overlay.borrow().clone()
    }

    pub fn status(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| OverlayError::ControllerStopped)
    }
}

struct EventLoop {
    detector: Arc<dyn Detector>,
    order: OutputOrder,
    camera: Arc<dyn FrameSource>,
    commands: mpsc::UnboundedReceiver<Command>,
    overlay_tx: watch::Sender<OverlayFrame>,
    status_tx: watch::Sender<Status>,
    /// 解码与检测任务，切换输入源时全部取消
    cycles: JoinSet<CycleOutput>,
    /// 检测器预热任务
    loading: JoinSet<Result<()>>,
    ticker: Ticker,
    threshold: Debouncer<ScoreThreshold>,
    limit: Debouncer<MaxDetections>,
    params: DetectionParameters,
    renderer: Overlay,
    mirror_webcam: bool,
    source: InputSource,
    generation: u64,
    next_cycle: u64,
    applied_cycle: u64,
    in_flight: Option<Ticket>,
    /// 检测进行中又需要重新检测静态图像
    pending_pass: bool,
    /// 当前代数下已解码的静态图像
    image: Option<Frame>,
    detector_state: DetectorState,
    canvas_size: FrameSize,
}

impl EventLoop {
    async fn run(mut self, initial_source: InputSource) {
        log::info!("控制器启动，检测器: {}", self.detector.name());
        self.begin_warm_up();
        self.switch_source(initial_source);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(joined) = self.cycles.join_next() => self.handle_cycle(joined),
                Some(joined) = self.loading.join_next() => self.finish_warm_up(joined),
                threshold = self.threshold.ready() => self.apply_threshold(threshold),
                limit = self.limit.ready() => self.apply_limit(limit),
                _ = self.ticker.tick(), if self.should_poll() => self.start_cycle(),
            }
        }

        self.ticker.stop();
        self.cycles.abort_all();
        self.loading.abort_all();
        self.status_tx.send_replace(Status::Stopped);
        log::info!("控制器已停止");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetSource(source) => {
                if self.detector_state == DetectorState::Unavailable {
                    log::info!("重新尝试加载检测器");
                    self.begin_warm_up();
                }
                self.switch_source(source);
            }
            Command::SetScoreThreshold(threshold) => self.threshold.push(threshold),
            Command::SetMaxDetections(limit) => self.limit.push(limit),
            Command::Shutdown => {}
        }
    }

    fn switch_source(&mut self, source: InputSource) {
        self.generation += 1;
        self.cycles.abort_all();
        self.in_flight = None;
        self.pending_pass = false;
        self.image = None;
        log::info!("切换输入源: {} (代数 {})", source.label(), self.generation);

        self.source = source;
        self.publish_cleared(self.canvas_size);
        // 清除上一个输入源留下的 SourceFailed
        if self.detector_state == DetectorState::Ready {
            self.status_tx.send_replace(Status::Running);
        }

        match &self.source {
            InputSource::Webcam => self.ticker.start(),
            InputSource::StaticImage { image, .. } => {
                self.ticker.stop();
                let generation = self.generation;
                let image = image.clone();
                self.cycles.spawn(async move {
                    CycleOutput::Decoded {
                        generation,
                        result: image.decode().await,
                    }
                });
            }
        }
    }

    fn should_poll(&self) -> bool {
        self.ticker.is_running()
            && self.source.is_webcam()
            && self.in_flight.is_none()
            && self.detector_state == DetectorState::Ready
    }

    fn mirrored(&self) -> bool {
        self.mirror_webcam && self.source.is_webcam()
    }

    /// 启动一次检测：摄像头取最新画面，静态图像使用已解码的画面
    fn start_cycle(&mut self) {
        let acquire = match &self.source {
            InputSource::Webcam => Acquire::Camera(Arc::clone(&self.camera)),
            InputSource::StaticImage { .. } => match &self.image {
                Some(frame) => Acquire::Still(frame.clone()),
                None => return,
            },
        };

        self.next_cycle += 1;
        let ticket = Ticket {
            generation: self.generation,
            cycle: self.next_cycle,
        };
        let mirrored = self.mirrored();
        let detector = Arc::clone(&self.detector);

        self.cycles.spawn(async move {
            let frame = match acquire {
                Acquire::Camera(camera) => camera.next_frame().await,
                Acquire::Still(frame) => Ok(frame),
            };
            let result = match frame {
                Ok(frame) if !frame.is_ready() => Err(OverlayError::FrameNotReady),
                Ok(frame) => detector
                    .detect(&frame)
                    .await
                    .map(|records| (frame.size(), records)),
                Err(e) => Err(e),
            };
            CycleOutput::Detected {
                ticket,
                mirrored,
                result,
            }
        });
        self.in_flight = Some(ticket);
    }

    /// 静态图像需要重新检测
    fn request_pass(&mut self) {
        if self.source.is_webcam()
            || self.image.is_none()
            || self.detector_state != DetectorState::Ready
        {
            return;
        }
        if self.in_flight.is_some() {
            self.pending_pass = true;
            return;
        }
        self.start_cycle();
    }

    fn handle_cycle(&mut self, joined: std::result::Result<CycleOutput, JoinError>) {
        let output = match joined {
            Ok(output) => output,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                log::error!("检测任务异常退出: {}", e);
                self.in_flight = None;
                return;
            }
        };

        match output {
            CycleOutput::Decoded { generation, result } => self.finish_decode(generation, result),
            CycleOutput::Detected {
                ticket,
                mirrored,
                result,
            } => {
                if self.in_flight == Some(ticket) {
                    self.in_flight = None;
                }
                self.finish_detection(ticket, mirrored, result);
                if self.pending_pass && self.in_flight.is_none() {
                    self.pending_pass = false;
                    self.request_pass();
                }
            }
        }
    }

    fn finish_decode(&mut self, generation: u64, result: Result<Frame>) {
        if generation != self.generation {
            log::debug!("丢弃过期的解码结果 (代数 {})", generation);
            return;
        }
        match result {
            Ok(frame) => {
                log::debug!("图像解码完成: {}x{}", frame.width(), frame.height());
                self.publish_cleared(frame.size());
                self.image = Some(frame);
                self.request_pass();
            }
            Err(e) => {
                log::warn!("无法加载图像 {}: {}", self.source.label(), e);
                self.status_tx.send_replace(Status::SourceFailed(e.to_string()));
            }
        }
    }

    fn finish_detection(
        &mut self,
        ticket: Ticket,
        mirrored: bool,
        result: Result<(FrameSize, Vec<DetectionRecord>)>,
    ) {
        if ticket.generation != self.generation || ticket.cycle <= self.applied_cycle {
            log::debug!(
                "丢弃过期的检测结果 (代数 {}, 编号 {})",
                ticket.generation,
                ticket.cycle
            );
            return;
        }

        match result {
            Ok((size, records)) => {
                self.applied_cycle = ticket.cycle;
                let (detections, draw_list) = compose_overlay(
                    records,
                    &self.params,
                    self.order,
                    size,
                    mirrored,
                    &mut self.renderer,
                );
                self.canvas_size = size;
                self.overlay_tx.send_replace(OverlayFrame {
                    generation: self.generation,
                    cycle: ticket.cycle,
                    source: self.source.label().to_string(),
                    size,
                    mirrored,
                    detections,
                    draw_list,
                });
            }
            Err(OverlayError::DetectorUnavailable(msg)) => self.mark_unavailable(msg),
            Err(OverlayError::FrameNotReady) => log::trace!("画面尚未就绪，跳过本次检测"),
            Err(e) if e.is_recoverable() => log::warn!("检测失败，跳过本次检测: {}", e),
            Err(e) => log::error!("检测出错，跳过本次检测: {}", e),
        }
    }

    fn apply_threshold(&mut self, threshold: ScoreThreshold) {
        log::debug!("置信度阈值: {}", threshold);
        self.params.score_threshold = threshold;
        self.request_pass();
    }

    fn apply_limit(&mut self, limit: MaxDetections) {
        log::debug!("最多显示数量: {}", limit);
        self.params.max_detections = limit;
        self.request_pass();
    }

    fn begin_warm_up(&mut self) {
        if matches!(self.detector_state, DetectorState::Loading | DetectorState::Ready) {
            return;
        }
        self.detector_state = DetectorState::Loading;
        self.status_tx.send_replace(Status::Starting);
        let detector = Arc::clone(&self.detector);
        self.loading.spawn(async move { detector.warm_up().await });
    }

    fn finish_warm_up(&mut self, joined: std::result::Result<Result<()>, JoinError>) {
        match joined {
            Ok(Ok(())) => {
                log::info!("检测器已就绪: {}", self.detector.name());
                self.detector_state = DetectorState::Ready;
                self.status_tx.send_replace(Status::Running);
                self.request_pass();
            }
            Ok(Err(e)) => self.mark_unavailable(e.to_string()),
            Err(e) => self.mark_unavailable(e.to_string()),
        }
    }

    fn mark_unavailable(&mut self, msg: String) {
        log::error!("检测器不可用: {}", msg);
        self.detector_state = DetectorState::Unavailable;
        self.status_tx.send_replace(Status::DetectorUnavailable(msg));
    }

    /// 发布只清空画布的一帧
    fn publish_cleared(&mut self, size: FrameSize) {
        let mut draw_list = DrawList::new();
        draw_list.resize(size.width, size.height);
        draw_list.clear(Rect::new(0.0, 0.0, size.width as f32, size.height as f32));
        self.canvas_size = size;
        self.overlay_tx.send_replace(OverlayFrame {
            generation: self.generation,
            cycle: 0,
            source: self.source.label().to_string(),
            size,
            mirrored: self.mirrored(),
            detections: Vec::new(),
            draw_list,
        });
    }
}
