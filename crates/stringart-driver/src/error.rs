//! 驱动层错误类型定义

use crate::state::Axis;
use stringart_tools::ConfigError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 机构配置非法
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 节拍线程已停止
    #[error("Machine is not running")]
    NotRunning,

    /// 目标角度不是有限值
    #[error("Invalid target for {axis}: {value}")]
    InvalidTarget { axis: Axis, value: f64 },

    /// 节拍线程错误
    #[error("Tick thread error: {0}")]
    TickThread(String),
}
