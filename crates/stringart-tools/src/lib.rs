//! # StringArt Tools - 共享配置结构
//!
//! **依赖原则**: 只依赖 serde/toml，不依赖 driver/client，避免引入运行时依赖
//!
//! ## 包含模块
//!
//! - `config` - 机构参数配置（舵机、步进电机、节拍频率、转台与摆臂几何）

pub mod config;

// 重新导出常用类型
pub use config::{
    ArmSettings, ConfigError, MachineConfig, ServoSettings, StepperSettings, TableSettings,
    TickSettings,
};
