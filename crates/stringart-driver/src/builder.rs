//! Builder 模式实现
//!
//! 提供链式构造 `Machine` 实例的便捷方式。

use crate::arm::ArmAxis;
use crate::error::DriverError;
use crate::hooks::MotionCallback;
use crate::machine::Machine;
use crate::pipeline::{MotionEngine, TickConfig};
use crate::table::TableAxis;
use std::sync::Arc;
use stringart_tools::MachineConfig;

/// Machine Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use stringart_driver::MachineBuilder;
/// use stringart_tools::MachineConfig;
///
/// // 使用默认配置
/// let machine = MachineBuilder::new().build().unwrap();
///
/// // 覆盖节拍频率
/// let machine = MachineBuilder::new()
///     .config(MachineConfig::default())
///     .tick_rate(120)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct MachineBuilder {
    /// 机构配置
    config: Option<MachineConfig>,
    /// 节拍频率覆盖
    tick_rate: Option<u32>,
    /// 启动前注册的回调
    callbacks: Vec<Arc<dyn MotionCallback>>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置机构配置（可选，默认 `MachineConfig::default()`）
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 覆盖节拍频率（同时影响舵机拆分的节拍数）
    pub fn tick_rate(mut self, rate_hz: u32) -> Self {
        self.tick_rate = Some(rate_hz);
        self
    }

    /// 添加运动回调（在第一拍之前注册）
    pub fn callback(mut self, callback: Arc<dyn MotionCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// 生成最终使用的配置
    pub fn resolve_config(&self) -> MachineConfig {
        let mut config = self.config.clone().unwrap_or_default();
        if let Some(rate) = self.tick_rate {
            config.tick.rate_hz = rate;
        }
        config
    }

    /// 校验配置并启动节拍线程
    pub fn build(self) -> Result<Machine, DriverError> {
        let config = self.resolve_config();
        config.validate()?;

        let engine = MotionEngine::new(ArmAxis::from_config(&config), TableAxis::from_config(&config));
        Machine::with_callbacks(engine, TickConfig::from_config(&config), self.callbacks)
    }
}
