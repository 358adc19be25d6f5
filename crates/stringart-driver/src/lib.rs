//! 驱动层模块
//!
//! 本模块提供绕线机两个运动轴的节拍驱动，包括：
//! - 摆臂（舵机）：按转速拆分为等量增量
//! - 转台（步进电机）：整步运动 + 量化误差补偿
//! - 节拍线程管理（固定频率，绝对时间锚点）
//! - 状态同步（ArcSwap 无锁读取）
//! - 回调系统：运动录制、自定义显示
//!
//! # 使用场景
//!
//! 大多数用户应该使用 `stringart-client` 提供的指令执行器，
//! 只在需要直接控制轴时使用本 crate。

pub mod arm;
mod builder;
mod error;
pub mod hooks;
mod machine;
pub mod metrics;
pub mod motion;
pub mod pipeline;
pub mod recording;
pub mod signal;
pub mod state;
pub mod table;

pub use arm::ArmAxis;
pub use builder::MachineBuilder;
pub use error::DriverError;
pub use hooks::{MotionCallback, SinkManager};
pub use machine::{AxisHandle, Machine, WAIT_SLICE};
pub use metrics::{TickMetrics, TickMetricsSnapshot};
pub use motion::{Advance, Direction, MotionTask};
pub use pipeline::{MotionEngine, TickConfig, tick_loop};
pub use recording::{MotionEvent, RecordingSink};
pub use signal::AxisSignal;
pub use state::{Axis, CommandLabel, MachineContext, MachineSnapshot};
pub use table::{TableAxis, TablePlan};
