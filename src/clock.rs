// clock.rs — 单调时钟与帧间隔计算

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 单调时钟，返回自任意起点起经过的时间
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// 手动推进的时钟，克隆出的句柄共享同一时间
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: f32) {
        self.advance(Duration::from_secs_f32(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// 记录上次更新时间，给出每帧 dt
#[derive(Debug, Clone)]
pub struct FrameClock<C: Clock> {
    clock: C,
    last_update: Duration,
}

impl<C: Clock> FrameClock<C> {
    pub fn new(clock: C) -> Self {
        let last_update = clock.now();
        Self { clock, last_update }
    }

    /// 距上次调用的秒数
    pub fn delta_seconds(&mut self) -> f32 {
        let now = self.clock.now();
        let delta = now.saturating_sub(self.last_update);
        self.last_update = now;
        delta.as_secs_f32()
    }

    /// 从后台恢复时调用，避免一次巨大的 dt
    pub fn reset(&mut self) {
        self.last_update = self.clock.now();
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
