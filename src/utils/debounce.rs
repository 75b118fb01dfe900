use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// 防抖器
///
/// 每次 `push` 都会取消尚未生效的旧值并重新计时，
/// 只有在静默期内没有新值时，`ready` 才会返回最后一次的值。
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// 提交新值并重新开始计时
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.quiet));
    }

    /// 等待静默期结束并取出值；没有待生效的值时永远不会返回
    ///
    /// 可以放在 `tokio::select!` 中：被取消时不会丢失待生效的值。
    pub async fn ready(&mut self) -> T {
        let deadline = match &self.pending {
            Some((_, deadline)) => *deadline,
            None => std::future::pending().await,
        };
        sleep_until(deadline).await;
        match self.pending.take() {
            Some((value, _)) => value,
            None => std::future::pending().await,
        }
    }
}
