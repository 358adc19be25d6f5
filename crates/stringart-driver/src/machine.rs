//! 绕线机驱动（对外 API）
//!
//! [`Machine`] 持有后台节拍线程，对外提供两个运动入口
//! `arm_to_angle` / `move_table_to`，以及无锁的状态快照读取。

use crate::error::DriverError;
use crate::hooks::MotionCallback;
use crate::metrics::TickMetricsSnapshot;
use crate::pipeline::{MotionEngine, TickConfig, tick_loop};
use crate::state::{Axis, CommandLabel, MachineContext, MachineSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, info};

/// 等待空闲时重新检查运行标志的间隔
pub const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Helper trait to add timeout capability to JoinHandle
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: std::marker::Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程负责 join，超时后继续在后台运行
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(std::boxed::Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(std::boxed::Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                )))
            },
        }
    }
}

/// 单轴运动入口
///
/// 执行器在构造时注入摆臂与转台两个句柄。可 Clone，可跨线程。
#[derive(Clone)]
pub struct AxisHandle {
    axis: Axis,
    ctx: Arc<MachineContext>,
    is_running: Arc<AtomicBool>,
}

impl AxisHandle {
    pub(crate) fn new(axis: Axis, ctx: Arc<MachineContext>, is_running: Arc<AtomicBool>) -> Self {
        Self {
            axis,
            ctx,
            is_running,
        }
    }

    /// 句柄对应的轴
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// 开始转向目标角度（替换未完成的任务）
    pub fn begin_rotation(&self, target: f64) -> Result<(), DriverError> {
        submit(&self.ctx, &self.is_running, self.axis, target)
    }

    /// 是否有待执行或进行中的任务
    pub fn is_busy(&self) -> bool {
        self.ctx.signal(self.axis).is_busy()
    }

    /// 节拍线程是否在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 阻塞直到轴空闲（返回 `false` 表示系统已停止）
    pub fn wait_idle(&self) -> bool {
        self.ctx.signal(self.axis).wait_idle(&self.is_running, WAIT_SLICE)
    }
}

impl std::fmt::Debug for AxisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisHandle")
            .field("axis", &self.axis)
            .field("busy", &self.is_busy())
            .finish()
    }
}

fn submit(
    ctx: &MachineContext,
    is_running: &AtomicBool,
    axis: Axis,
    target: f64,
) -> Result<(), DriverError> {
    if !target.is_finite() {
        return Err(DriverError::InvalidTarget {
            axis,
            value: target,
        });
    }
    if !is_running.load(Ordering::Acquire) {
        return Err(DriverError::NotRunning);
    }
    debug!("Submit {} -> {:.3}°", axis, target);
    ctx.signal(axis).submit(target);
    Ok(())
}

/// 绕线机驱动
pub struct Machine {
    ctx: Arc<MachineContext>,
    is_running: Arc<AtomicBool>,
    tick_thread: Option<JoinHandle<()>>,
    config: TickConfig,
}

impl Machine {
    /// 启动节拍线程
    ///
    /// # 错误
    /// - `DriverError::TickThread`: 线程创建失败
    pub fn new(engine: MotionEngine, config: TickConfig) -> Result<Self, DriverError> {
        Self::with_callbacks(engine, config, Vec::new())
    }

    /// 启动节拍线程，并在第一拍之前注册回调
    pub fn with_callbacks(
        engine: MotionEngine,
        config: TickConfig,
        callbacks: Vec<Arc<dyn MotionCallback>>,
    ) -> Result<Self, DriverError> {
        let ctx = Arc::new(MachineContext::new(engine.snapshot()));
        {
            let mut sinks = ctx.sinks.write();
            for callback in callbacks {
                sinks.add_callback(callback);
            }
        }

        let is_running = Arc::new(AtomicBool::new(true));

        let ctx_clone = ctx.clone();
        let is_running_clone = is_running.clone();
        let tick_thread = std::thread::Builder::new()
            .name("stringart-tick".to_string())
            .spawn(move || tick_loop(engine, ctx_clone, config, is_running_clone))
            .map_err(|e| DriverError::TickThread(e.to_string()))?;

        info!("Machine started ({} Hz)", config.rate_hz);

        Ok(Self {
            ctx,
            is_running,
            tick_thread: Some(tick_thread),
            config,
        })
    }

    /// 摆臂运动入口
    pub fn arm_to_angle(&self, degrees: f64) -> Result<(), DriverError> {
        submit(&self.ctx, &self.is_running, Axis::Arm, degrees)
    }

    /// 转台运动入口
    pub fn move_table_to(&self, degrees: f64) -> Result<(), DriverError> {
        submit(&self.ctx, &self.is_running, Axis::Table, degrees)
    }

    /// 获取单轴句柄（用于注入执行器）
    pub fn axis_handle(&self, axis: Axis) -> AxisHandle {
        AxisHandle::new(axis, self.ctx.clone(), self.is_running.clone())
    }

    pub fn arm_handle(&self) -> AxisHandle {
        self.axis_handle(Axis::Arm)
    }

    pub fn table_handle(&self) -> AxisHandle {
        self.axis_handle(Axis::Table)
    }

    /// 当前指令文本句柄
    pub fn command_label(&self) -> CommandLabel {
        self.ctx.command_label.clone()
    }

    /// 获取最新状态快照（无锁）
    pub fn snapshot(&self) -> MachineSnapshot {
        self.ctx.snapshot()
    }

    /// 获取节拍计数器快照
    pub fn metrics(&self) -> TickMetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 节拍配置
    pub fn tick_config(&self) -> TickConfig {
        self.config
    }

    /// 注册运动回调
    pub fn add_callback(&self, callback: Arc<dyn MotionCallback>) {
        self.ctx.sinks.write().add_callback(callback);
    }

    /// 运行标志（用于 Ctrl-C 等外部取消）
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.is_running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 节拍线程是否存活
    pub fn is_healthy(&self) -> bool {
        self.tick_thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 等待两个轴都空闲（返回 `false` 表示系统已停止）
    pub fn wait_idle(&self) -> bool {
        self.ctx.arm_signal.wait_idle(&self.is_running, WAIT_SLICE)
            && self.ctx.table_signal.wait_idle(&self.is_running, WAIT_SLICE)
    }

    /// 停止节拍线程（进行中的运动直接放弃）
    pub fn stop(&mut self) {
        // Release: 之前的写入对看到 false 的线程可见
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.tick_thread.take() {
            if let Err(_e) = handle.join_timeout(join_timeout) {
                error!(
                    "Tick thread panicked or failed to shut down within {:?}",
                    join_timeout
                );
            } else {
                info!("Machine stopped after {} ticks", self.metrics().ticks);
            }
        }
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmAxis;
    use crate::table::TableAxis;

    fn machine() -> Machine {
        let engine = MotionEngine::new(ArmAxis::new(0.0, 0.17, 1000), TableAxis::new(0.0, 1.8));
        Machine::new(engine, TickConfig { rate_hz: 1000 }).unwrap()
    }

    #[test]
    fn test_machine_moves_both_axes() {
        let machine = machine();
        machine.arm_to_angle(30.0).unwrap();
        machine.move_table_to(18.0).unwrap();
        assert!(machine.wait_idle());

        let snapshot = machine.snapshot();
        assert_eq!(snapshot.arm_angle, 30.0);
        assert!((snapshot.table_angle - 18.0).abs() < 1e-9);
        assert_eq!(snapshot.table_net_steps, 10);
        assert!(machine.is_healthy());
    }

    #[test]
    fn test_rejects_non_finite_target() {
        let machine = machine();
        let err = machine.move_table_to(f64::INFINITY).unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidTarget {
                axis: Axis::Table,
                ..
            }
        ));
        assert!(!machine.table_handle().is_busy());
    }

    #[test]
    fn test_stop_rejects_new_commands() {
        let mut machine = machine();
        let arm = machine.arm_handle();
        machine.stop();

        assert!(!machine.is_running());
        assert!(!machine.is_healthy());
        assert!(matches!(
            arm.begin_rotation(10.0),
            Err(DriverError::NotRunning)
        ));
    }

    #[test]
    fn test_stop_releases_waiters() {
        let mut machine = machine();
        let table = machine.table_handle();
        // 180° / 1.8° = 100 步 @ 1kHz
        table.begin_rotation(180.0).unwrap();

        let waiter = std::thread::spawn(move || table.wait_idle());
        machine.stop();
        // 要么已完成，要么因停止返回 false，都不能卡住
        let _ = waiter.join().unwrap();
    }

    #[test]
    fn test_command_label_handle() {
        let machine = machine();
        let label = machine.command_label();
        label.set("ROT i0 a10.0 s1 abs1");
        assert_eq!(
            machine.command_label().get().as_str(),
            "ROT i0 a10.0 s1 abs1"
        );
    }
}
