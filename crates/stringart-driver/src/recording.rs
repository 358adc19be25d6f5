//! 运动录制回调
//!
//! 基于有界 Channel 的异步录制：节拍线程中只做 `try_send`，
//! 队列满时丢弃新事件并计数，不阻塞节拍。
//!
//! ```rust
//! use stringart_driver::recording::{MotionEvent, RecordingSink};
//! use stringart_driver::hooks::MotionCallback;
//!
//! let (sink, rx) = RecordingSink::with_capacity(2);
//! let dropped = sink.dropped_events().clone();
//!
//! sink.on_arm_moved(1, 1.0);
//! sink.on_arm_moved(2, 2.0);
//! sink.on_arm_moved(3, 3.0); // 队列已满
//!
//! assert_eq!(dropped.load(std::sync::atomic::Ordering::Relaxed), 1);
//! assert_eq!(rx.try_recv().unwrap(), MotionEvent::ArmMoved { tick: 1, angle: 1.0 });
//! ```

use crate::hooks::MotionCallback;
use crate::motion::Direction;
use crate::state::Axis;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 默认队列容量（约 3.5 分钟 @ 240Hz 双轴满负荷）
pub const DEFAULT_CAPACITY: usize = 100_000;

/// 录制的运动事件
#[derive(Debug, Clone, PartialEq)]
pub enum MotionEvent {
    ArmMoved {
        tick: u64,
        angle: f64,
    },
    TableStep {
        tick: u64,
        direction: Direction,
        angle: f64,
    },
    MotionComplete {
        tick: u64,
        axis: Axis,
    },
}

impl MotionEvent {
    /// 事件所在节拍
    pub fn tick(&self) -> u64 {
        match self {
            MotionEvent::ArmMoved { tick, .. }
            | MotionEvent::TableStep { tick, .. }
            | MotionEvent::MotionComplete { tick, .. } => *tick,
        }
    }
}

/// 录制回调（Bounded Queue）
pub struct RecordingSink {
    tx: Sender<MotionEvent>,
    dropped_events: Arc<AtomicU64>,
    event_counter: Arc<AtomicU64>,
}

impl RecordingSink {
    /// 创建默认容量的录制回调
    #[must_use]
    pub fn new() -> (Self, Receiver<MotionEvent>) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// 创建指定容量的录制回调
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<MotionEvent>) {
        let (tx, rx) = bounded(capacity);
        let sink = Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
            event_counter: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// 丢弃计数器（建议在注册前 clone 持有）
    #[must_use]
    pub fn dropped_events(&self) -> &Arc<AtomicU64> {
        &self.dropped_events
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// 成功入队计数器
    #[must_use]
    pub fn event_counter(&self) -> &Arc<AtomicU64> {
        &self.event_counter
    }

    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }

    #[inline]
    fn record(&self, event: MotionEvent) {
        if self.tx.try_send(event).is_err() {
            // 满了丢新事件，保留旧事件
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        } else {
            self.event_counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl MotionCallback for RecordingSink {
    fn on_arm_moved(&self, tick: u64, angle: f64) {
        self.record(MotionEvent::ArmMoved { tick, angle });
    }

    fn on_table_step(&self, tick: u64, direction: Direction, angle: f64) {
        self.record(MotionEvent::TableStep {
            tick,
            direction,
            angle,
        });
    }

    fn on_motion_complete(&self, tick: u64, axis: Axis) {
        self.record(MotionEvent::MotionComplete { tick, axis });
    }
}
