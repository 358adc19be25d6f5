//! 节拍循环模块
//!
//! 后台节拍线程以固定频率推进两个轴：每拍先取走邮箱中的新命令，
//! 再让每个轴最多前进一个增量，最后发布状态快照并触发回调。

use crate::arm::ArmAxis;
use crate::hooks::SinkManager;
use crate::motion::Advance;
use crate::state::{Axis, MachineContext, MachineSnapshot};
use crate::table::TableAxis;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use stringart_tools::MachineConfig;
use tracing::{debug, trace};

/// 节拍配置
///
/// # Example
///
/// ```
/// use stringart_driver::TickConfig;
///
/// let config = TickConfig::default();
/// assert_eq!(config.rate_hz, 240);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    /// 节拍频率（Hz）
    pub rate_hz: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { rate_hz: 240 }
    }
}

impl TickConfig {
    pub fn from_config(config: &MachineConfig) -> Self {
        Self {
            rate_hz: config.tick.rate_hz,
        }
    }

    /// 节拍周期
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.max(1)))
    }
}

/// 两轴运动引擎（节拍线程独占）
#[derive(Debug, Clone)]
pub struct MotionEngine {
    arm: ArmAxis,
    table: TableAxis,
    tick: u64,
}

impl MotionEngine {
    pub fn new(arm: ArmAxis, table: TableAxis) -> Self {
        Self {
            arm,
            table,
            tick: 0,
        }
    }

    pub fn arm(&self) -> &ArmAxis {
        &self.arm
    }

    pub fn table(&self) -> &TableAxis {
        &self.table
    }

    /// 已执行的节拍数
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            tick: self.tick,
            arm_angle: self.arm.angle(),
            arm_origin: self.arm.origin(),
            needle_length: self.arm.needle_length(),
            table_angle: self.table.angle(),
            table_error: self.table.accumulated_error(),
            table_net_steps: self.table.net_steps(),
            table_origin: self.table.origin(),
            table_radius: self.table.radius(),
            pin_count: self.table.pin_count(),
            arm_moving: self.arm.is_moving(),
            table_moving: self.table.is_moving(),
        }
    }

    /// 执行一拍
    ///
    /// 完成信号在快照发布和回调之后才发出，等待者被唤醒时看到的一定是最终状态。
    pub fn step(&mut self, ctx: &MachineContext) {
        self.tick += 1;
        let tick = self.tick;
        ctx.metrics.ticks.fetch_add(1, Ordering::Relaxed);

        // 回调列表只在注册时写入，拿不到读锁时本拍跳过回调
        let sinks = ctx.sinks.try_read();
        let mut arm_done = false;
        let mut table_done = false;

        if let Some(target) = ctx.arm_signal.take_command() {
            ctx.metrics.commands.fetch_add(1, Ordering::Relaxed);
            if !self.arm.begin_rotation(target) {
                debug!("Arm: snapped to {:.3}°", target);
                if let Some(sinks) = sinks.as_ref() {
                    sinks.trigger_arm_moved(tick, self.arm.angle());
                }
                arm_done = true;
            }
        }

        if let Some(target) = ctx.table_signal.take_command() {
            ctx.metrics.commands.fetch_add(1, Ordering::Relaxed);
            if self.table.begin_rotation(target).direction.is_none() {
                table_done = true;
            }
        }

        if let Some(advance) = self.arm.tick() {
            ctx.metrics.arm_increments.fetch_add(1, Ordering::Relaxed);
            if let Some(sinks) = sinks.as_ref() {
                sinks.trigger_arm_moved(tick, self.arm.angle());
            }
            arm_done = advance == Advance::Done;
        }

        if let Some((direction, advance)) = self.table.tick() {
            ctx.metrics.table_steps.fetch_add(1, Ordering::Relaxed);
            if let Some(sinks) = sinks.as_ref() {
                sinks.trigger_table_step(tick, direction, self.table.angle());
            }
            table_done = advance == Advance::Done;
        }

        ctx.snapshot.store(Arc::new(self.snapshot()));

        if arm_done {
            complete(ctx, sinks.as_deref(), tick, Axis::Arm);
        }
        if table_done {
            complete(ctx, sinks.as_deref(), tick, Axis::Table);
        }
    }
}

fn complete(ctx: &MachineContext, sinks: Option<&SinkManager>, tick: u64, axis: Axis) {
    if let Some(sinks) = sinks {
        sinks.trigger_motion_complete(tick, axis);
    }
    if ctx.signal(axis).complete() {
        trace!("{} idle at tick {}", axis, tick);
    }
}

/// 节拍线程主循环
///
/// # 参数
/// - `engine`: 运动引擎（移动到节拍线程）
/// - `ctx`: 共享状态上下文
/// - `config`: 节拍配置
/// - `is_running`: 运行标志（每拍检查一次）
pub fn tick_loop(
    mut engine: MotionEngine,
    ctx: Arc<MachineContext>,
    config: TickConfig,
    is_running: Arc<AtomicBool>,
) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::{info, warn};

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Tick thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set tick thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let period = config.period();
    // 绝对时间锚点，避免累计漂移
    let mut next_tick = Instant::now() + period;
    trace!("Tick thread: started at {} Hz", config.rate_hz);

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Tick thread: is_running flag is false, exiting");
            break;
        }

        engine.step(&ctx);

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
            next_tick += period;
        } else {
            ctx.metrics.overruns.fetch_add(1, Ordering::Relaxed);
            trace!(
                "Tick thread: overrun by {:?} at tick {}",
                now - next_tick,
                engine.tick_count()
            );
            next_tick = now + period;
        }
    }

    // 唤醒仍在等待的执行器
    ctx.arm_signal.wake_all();
    ctx.table_signal.wake_all();
    trace!("Tick thread: loop exited after {} ticks", engine.tick_count());
}
