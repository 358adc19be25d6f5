//! 执行器错误类型定义

use stringart_driver::{Axis, DriverError};
use stringart_protocol::InstructionKind;
use thiserror::Error;

/// 执行器错误
#[derive(Error, Debug)]
pub enum ExecError {
    /// 运动入口未绑定（构造时检查）
    #[error("No motion entry point bound for the {0}")]
    UnboundAxis(Axis),

    /// 指令尚未实现（目前只有 PN）
    #[error("{0} instruction is not implemented")]
    NotImplemented(InstructionKind),

    /// 驱动层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 某条指令失败导致程序中止
    #[error("Instruction {index} ({text}) failed: {source}")]
    Aborted {
        index: usize,
        text: String,
        #[source]
        source: Box<ExecError>,
    },
}
