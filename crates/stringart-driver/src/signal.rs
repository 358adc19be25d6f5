//! 轴命令邮箱与完成信号
//!
//! 每个轴一个 [`AxisSignal`]：执行器写入目标角度并置忙，节拍线程取走命令，
//! 任务结束后清除忙标志并唤醒等待者。邮箱采用覆盖语义（最后一次命令生效）。
//!
//! 命令与忙标志共用一把锁，保证“取走命令后又收到新命令”时不会被提前置为空闲。

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct SlotState {
    command: Option<f64>,
    busy: bool,
}

/// 单轴命令邮箱 + 空闲信号
#[derive(Debug, Default)]
pub struct AxisSignal {
    state: Mutex<SlotState>,
    idle: Condvar,
}

impl AxisSignal {
    /// 创建空闲的信号
    pub fn new() -> Self {
        Self::default()
    }

    /// 投递目标角度并置忙（覆盖未取走的命令）
    pub fn submit(&self, target: f64) {
        let mut state = self.state.lock();
        state.command = Some(target);
        state.busy = true;
    }

    /// 取走待执行的命令（节拍线程调用）
    pub fn take_command(&self) -> Option<f64> {
        self.state.lock().command.take()
    }

    /// 标记当前任务完成
    ///
    /// 邮箱中仍有新命令时保持忙状态，返回是否真正变为空闲。
    pub fn complete(&self) -> bool {
        let mut state = self.state.lock();
        if state.command.is_some() {
            return false;
        }
        state.busy = false;
        drop(state);
        self.idle.notify_all();
        true
    }

    /// 是否有待执行或进行中的任务
    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// 唤醒所有等待者（停止时使用）
    pub fn wake_all(&self) {
        self.idle.notify_all();
    }

    /// 等待轴空闲
    ///
    /// 每隔 `slice` 重新检查一次 `is_running`。
    /// 返回 `true` 表示轴已空闲，`false` 表示系统已停止。
    pub fn wait_idle(&self, is_running: &AtomicBool, slice: Duration) -> bool {
        let mut state = self.state.lock();
        while state.busy {
            if !is_running.load(Ordering::Acquire) {
                return false;
            }
            let _ = self.idle.wait_for(&mut state, slice);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_submit_and_complete() {
        let signal = AxisSignal::new();
        assert!(!signal.is_busy());

        signal.submit(12.0);
        assert!(signal.is_busy());
        assert_eq!(signal.take_command(), Some(12.0));
        assert_eq!(signal.take_command(), None);
        assert!(signal.is_busy());

        assert!(signal.complete());
        assert!(!signal.is_busy());
    }

    #[test]
    fn test_mailbox_overwrites() {
        let signal = AxisSignal::new();
        signal.submit(1.0);
        signal.submit(2.0);
        assert_eq!(signal.take_command(), Some(2.0));
    }

    #[test]
    fn test_complete_keeps_busy_while_command_pending() {
        let signal = AxisSignal::new();
        signal.submit(1.0);
        signal.take_command();
        signal.submit(2.0);

        assert!(!signal.complete());
        assert!(signal.is_busy());
    }

    #[test]
    fn test_wait_idle_wakes_on_complete() {
        let signal = Arc::new(AxisSignal::new());
        let running = Arc::new(AtomicBool::new(true));
        signal.submit(5.0);

        let signal_clone = signal.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signal_clone.take_command();
            signal_clone.complete();
        });

        assert!(signal.wait_idle(&running, Duration::from_millis(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_idle_returns_false_when_stopped() {
        let signal = AxisSignal::new();
        let running = AtomicBool::new(false);
        signal.submit(5.0);
        assert!(!signal.wait_idle(&running, Duration::from_millis(1)));
    }

    #[test]
    fn test_wait_idle_on_idle_axis_ignores_running_flag() {
        let signal = AxisSignal::new();
        let running = AtomicBool::new(false);
        assert!(signal.wait_idle(&running, Duration::from_millis(1)));
    }
}
