//! # StringArt Protocol
//!
//! 绕线机指令语言定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `instruction`: 指令类型（旋转、钉钉、蜂鸣、休眠）及其规范文本
//! - `parser`: 单行/整段程序解析
//! - `error`: 解析错误
//!
//! ## 指令格式
//!
//! 每行一条指令，`#` 之后为注释：
//!
//! ```text
//! ROT i<tool_id> a<degrees> s<speed 1-255> abs<0|1>
//! PN  p<rate 1-255> r<rate 1-255>
//! BP  d<duration_ms> r<repeat_count> o<off_time_ms>
//! SP  d<duration_ms>
//! ```
//!
//! ```rust
//! use stringart_protocol::{Instruction, ToolId, parse_line};
//!
//! let parsed = parse_line("ROT i1 a90.0 s200 abs1 # 摆臂到 90°").unwrap();
//! match parsed {
//!     Some(Instruction::RotateTool(rot)) => {
//!         assert_eq!(rot.tool_id, ToolId::Arm);
//!         assert_eq!(rot.degrees, 90.0);
//!     },
//!     _ => unreachable!(),
//! }
//!
//! // 空行和纯注释行返回 None（Skip）
//! assert!(parse_line("   # comment").unwrap().is_none());
//! ```

mod error;
pub mod instruction;
pub mod parser;

pub use error::{ParseError, ProgramError};
pub use instruction::{Beep, Instruction, InstructionKind, PlaceNail, RotateTool, Sleep, ToolId};
pub use parser::{Program, parse_line, parse_program, parse_program_lenient};
