//! # 机构配置
//!
//! 绕线机的舵机、步进电机、节拍频率以及转台/摆臂几何参数。
//!
//! 配置文件为 TOML，所有字段都有默认值，可以只写需要覆盖的部分：
//!
//! ```toml
//! [stepper]
//! micro_steps = 16
//!
//! [tick]
//! rate_hz = 120
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读写失败
    #[error("Config IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML 解析失败
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// 参数非法
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// 机构配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// 舵机（摆臂）参数
    pub servo: ServoSettings,

    /// 步进电机（转台）参数
    pub stepper: StepperSettings,

    /// 运动节拍
    pub tick: TickSettings,

    /// 转台几何
    pub table: TableSettings,

    /// 摆臂几何
    pub arm: ArmSettings,
}

/// 舵机参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoSettings {
    /// 舵机转动 60° 所需时间（秒）
    pub time_per_60_deg_s: f64,
}

impl Default for ServoSettings {
    fn default() -> Self {
        Self {
            time_per_60_deg_s: 0.17,
        }
    }
}

/// 步进电机参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperSettings {
    /// 每圈整步数
    pub base_steps_per_revolution: u32,

    /// 细分数（最小 1）
    pub micro_steps: u32,
}

impl Default for StepperSettings {
    fn default() -> Self {
        Self {
            base_steps_per_revolution: 200,
            micro_steps: 32,
        }
    }
}

/// 运动节拍参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickSettings {
    /// 节拍频率（Hz）
    pub rate_hz: u32,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self { rate_hz: 240 }
    }
}

/// 转台几何
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// 转台中心（显示坐标）
    pub origin: [f64; 2],

    /// 转台半径
    pub radius: f64,

    /// 钉子数量
    pub pin_count: u32,

    /// 初始角度（度）
    pub initial_angle_deg: f64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            origin: [250.0, 250.0],
            radius: 150.0,
            pin_count: 150,
            initial_angle_deg: 0.0,
        }
    }
}

/// 摆臂几何
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmSettings {
    /// 针长
    pub needle_length: f64,

    /// 摆臂支点相对转台边缘的偏移
    pub offset: f64,

    /// 初始角度（度）
    pub initial_angle_deg: f64,
}

impl Default for ArmSettings {
    fn default() -> Self {
        Self {
            needle_length: 60.0,
            offset: -10.0,
            initial_angle_deg: 0.0,
        }
    }
}

impl MachineConfig {
    /// 从 TOML 字符串解析（会执行 `validate()`）
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MachineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 检查参数合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.servo.time_per_60_deg_s.is_finite() && self.servo.time_per_60_deg_s > 0.0) {
            return Err(ConfigError::Invalid {
                field: "servo.time_per_60_deg_s",
                reason: format!("must be > 0, got {}", self.servo.time_per_60_deg_s),
            });
        }
        if self.stepper.base_steps_per_revolution == 0 {
            return Err(ConfigError::Invalid {
                field: "stepper.base_steps_per_revolution",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.stepper.micro_steps == 0 {
            return Err(ConfigError::Invalid {
                field: "stepper.micro_steps",
                reason: "must be >= 1".to_string(),
            });
        }
        if self
            .stepper
            .base_steps_per_revolution
            .checked_mul(self.stepper.micro_steps)
            .is_none()
        {
            return Err(ConfigError::Invalid {
                field: "stepper",
                reason: format!(
                    "base_steps_per_revolution × micro_steps overflows ({} × {})",
                    self.stepper.base_steps_per_revolution, self.stepper.micro_steps
                ),
            });
        }
        if self.tick.rate_hz == 0 {
            return Err(ConfigError::Invalid {
                field: "tick.rate_hz",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.table.pin_count == 0 {
            return Err(ConfigError::Invalid {
                field: "table.pin_count",
                reason: "must be >= 1".to_string(),
            });
        }
        if !self.table.initial_angle_deg.is_finite() || !self.arm.initial_angle_deg.is_finite() {
            return Err(ConfigError::Invalid {
                field: "initial_angle_deg",
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }

    /// 每圈总步数（整步数 × 细分）
    pub fn steps_per_revolution(&self) -> u64 {
        u64::from(self.stepper.base_steps_per_revolution) * u64::from(self.stepper.micro_steps)
    }

    /// 步距角（度）
    pub fn step_angle_deg(&self) -> f64 {
        360.0 / self.steps_per_revolution() as f64
    }

    /// 摆臂支点（转台左边缘 + 偏移）
    pub fn arm_origin(&self) -> [f64; 2] {
        [
            self.table.origin[0] - self.table.radius + self.arm.offset,
            self.table.origin[1],
        ]
    }
}
