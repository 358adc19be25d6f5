//! 客户端接口模块
//!
//! 本模块把解析好的指令程序顺序下发到运动引擎：
//! - 执行器：等待轴空闲、发布指令文本、下发运动
//! - 蜂鸣器：`BP` 指令的输出端（可替换）
//! - 执行报告与进度事件
//!
//! 运动入口在构造时注入（见 [`ExecutorBuilder`]）。

pub mod beeper;
mod error;
pub mod executor;

pub use beeper::{Beeper, LogBeeper};
pub use error::ExecError;
pub use executor::{ExecutionEvent, ExecutionReport, Executor, ExecutorBuilder, ExecutorConfig};
