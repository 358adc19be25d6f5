//! 协议层错误类型定义

use crate::instruction::InstructionKind;
use thiserror::Error;

/// 单条指令解析/构造错误
///
/// 每种校验失败对应一个独立的变体，调用方可以据此区分错误原因。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// 旋转速度超出 1-255
    #[error("Speed {speed} not in range (1-255)")]
    InvalidSpeed { speed: i64 },

    /// 钉钉速率超出 1-255
    #[error("place_rate {rate} not in range 1-255 (inclusive)")]
    InvalidPlaceRate { rate: i64 },

    /// 回缩速率超出 1-255
    #[error("retract_rate {rate} not in range 1-255 (inclusive)")]
    InvalidRetractRate { rate: i64 },

    /// 持续时间为负
    #[error("Duration cannot be less than 0 (got {duration_ms})")]
    NegativeDuration { duration_ms: i64 },

    /// 间隔时间为负
    #[error("Off time cannot be less than 0 (got {off_time_ms})")]
    NegativeOffTime { off_time_ms: i64 },

    /// 重复次数为负
    #[error("Repeat cannot be less than 0 (got {repeat})")]
    NegativeRepeat { repeat: i64 },

    /// 未知工具 ID（只支持 0 = 转台，1 = 摆臂）
    #[error("Invalid tool id: {id}")]
    InvalidToolId { id: i64 },

    /// 字段值不是合法数字
    #[error("Invalid number for '{prefix}': {value:?}")]
    InvalidNumber { prefix: &'static str, value: String },

    /// 缺少必需字段
    #[error("{kind} instruction is missing required field '{field}'")]
    MissingField {
        kind: InstructionKind,
        field: &'static str,
    },

    /// 空行或纯注释行（仅 `FromStr` 返回）
    #[error("Empty instruction")]
    Empty,

    /// 未识别的指令关键字（仅 `FromStr` 返回，`parse_line` 会返回 Skip）
    #[error("Instruction \"{keyword}\" not recognized")]
    UnknownKeyword { keyword: String },
}

/// 程序解析错误（带行号）
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line_number}: {source} ({line:?})")]
pub struct ProgramError {
    /// 行号（从 1 开始）
    pub line_number: usize,
    /// 原始行文本
    pub line: String,
    /// 具体错误
    #[source]
    pub source: ParseError,
}
