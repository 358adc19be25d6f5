//! 蜂鸣输出
//!
//! 执行器负责 `BP` 指令的计时，[`Beeper`] 只负责开关声音。

use tracing::info;

/// 蜂鸣器
pub trait Beeper: Send {
    /// 开始鸣叫
    fn on(&mut self);

    /// 停止鸣叫
    fn off(&mut self) {}
}

/// 默认蜂鸣器：只打日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBeeper;

impl Beeper for LogBeeper {
    fn on(&mut self) {
        info!("beep");
    }
}
