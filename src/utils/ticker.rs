use std::time::Duration;

use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// 轮询节拍
///
/// 固定最小间隔触发；处理耗时超过间隔时顺延，不会补发积压的节拍。
#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
    running: bool,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            running: false,
        }
    }

    /// 开始轮询，第一个节拍立即触发
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.interval.reset_immediately();
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 等待下一个节拍；只应在 `is_running` 为真时调用
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
