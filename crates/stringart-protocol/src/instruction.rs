//! 指令类型定义
//!
//! 每种指令在构造时完成范围校验，构造成功的指令不可变。
//! 所有指令都实现 `Display`，输出规范文本（既用于重新序列化，也用于界面显示）。

use crate::error::ParseError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 工具（运动轴）ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ToolId {
    /// 转台（步进电机）
    Table = 0,
    /// 摆臂（舵机）
    Arm = 1,
}

impl ToolId {
    /// 从任意整数转换（超出范围返回 `InvalidToolId`）
    pub fn from_i64(id: i64) -> Result<Self, ParseError> {
        u8::try_from(id)
            .ok()
            .and_then(|raw| ToolId::try_from(raw).ok())
            .ok_or(ParseError::InvalidToolId { id })
    }

    /// 原始 ID
    pub fn id(self) -> u8 {
        self.into()
    }
}

/// 指令种类（对应行首关键字）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstructionKind {
    /// `ROT`
    RotateTool,
    /// `PN`
    PlaceNail,
    /// `BP`
    Beep,
    /// `SP`
    Sleep,
}

impl InstructionKind {
    /// 规范关键字（大写）
    pub fn keyword(self) -> &'static str {
        match self {
            InstructionKind::RotateTool => "ROT",
            InstructionKind::PlaceNail => "PN",
            InstructionKind::Beep => "BP",
            InstructionKind::Sleep => "SP",
        }
    }

    /// 按关键字查找（大小写不敏感）
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "rot" => Some(InstructionKind::RotateTool),
            "pn" => Some(InstructionKind::PlaceNail),
            "bp" => Some(InstructionKind::Beep),
            "sp" => Some(InstructionKind::Sleep),
            _ => None,
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// 1-255 速率校验
fn rate_in_range(value: i64) -> Option<u8> {
    u8::try_from(value).ok().filter(|v| *v >= 1)
}

/// 旋转工具指令 `ROT i{id} a{deg} s{speed} abs{0|1}`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotateTool {
    /// 目标工具
    pub tool_id: ToolId,
    /// 目标角度（度）
    pub degrees: f64,
    /// 速度（1-255）
    pub speed: u8,
    /// 绝对/相对标志
    ///
    /// 解析并校验，但执行时总是按绝对角度处理。
    pub absolute: bool,
}

impl RotateTool {
    /// 构造并校验
    ///
    /// # 错误
    /// - `InvalidSpeed`: 速度不在 1-255
    /// - `InvalidNumber`: 角度不是有限数
    pub fn new(
        tool_id: ToolId,
        degrees: f64,
        speed: i64,
        absolute: bool,
    ) -> Result<Self, ParseError> {
        let speed = rate_in_range(speed).ok_or(ParseError::InvalidSpeed { speed })?;
        if !degrees.is_finite() {
            return Err(ParseError::InvalidNumber {
                prefix: "a",
                value: degrees.to_string(),
            });
        }

        Ok(Self {
            tool_id,
            degrees,
            speed,
            absolute,
        })
    }
}

impl fmt::Display for RotateTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:?}` 对 f64 输出最短可回读形式，并保留 `.0`（如 `90.0`）
        write!(
            f,
            "ROT i{} a{:?} s{} abs{}",
            self.tool_id.id(),
            self.degrees,
            self.speed,
            u8::from(self.absolute)
        )
    }
}

/// 钉钉指令 `PN p{rate} r{rate}`
///
/// 目前没有钉钉机构的硬件模型，执行总是失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaceNail {
    /// 下压速率（1-255）
    pub place_rate: u8,
    /// 回缩速率（1-255）
    pub retract_rate: u8,
}

impl PlaceNail {
    /// 构造并校验
    pub fn new(place_rate: i64, retract_rate: i64) -> Result<Self, ParseError> {
        let place =
            rate_in_range(place_rate).ok_or(ParseError::InvalidPlaceRate { rate: place_rate })?;
        let retract = rate_in_range(retract_rate)
            .ok_or(ParseError::InvalidRetractRate { rate: retract_rate })?;

        Ok(Self {
            place_rate: place,
            retract_rate: retract,
        })
    }
}

impl fmt::Display for PlaceNail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PN p{} r{}", self.place_rate, self.retract_rate)
    }
}

/// 蜂鸣指令 `BP d{ms} r{n} o{ms}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Beep {
    /// 每次鸣叫时长（毫秒）
    pub duration_ms: u64,
    /// 鸣叫次数
    pub repeat: u32,
    /// 两次鸣叫之间的间隔（毫秒）
    pub off_time_ms: u64,
}

impl Beep {
    /// 默认鸣叫次数
    pub const DEFAULT_REPEAT: u32 = 1;

    /// 构造并校验（`repeat` 为 `None` 时取 1）
    pub fn new(
        duration_ms: i64,
        repeat: Option<i64>,
        off_time_ms: i64,
    ) -> Result<Self, ParseError> {
        let duration = u64::try_from(duration_ms)
            .map_err(|_| ParseError::NegativeDuration { duration_ms })?;
        let off_time = u64::try_from(off_time_ms)
            .map_err(|_| ParseError::NegativeOffTime { off_time_ms })?;
        let repeat = match repeat {
            Some(r) if r < 0 => return Err(ParseError::NegativeRepeat { repeat: r }),
            Some(r) => u32::try_from(r).map_err(|_| ParseError::InvalidNumber {
                prefix: "r",
                value: r.to_string(),
            })?,
            None => Self::DEFAULT_REPEAT,
        };

        Ok(Self {
            duration_ms: duration,
            repeat,
            off_time_ms: off_time,
        })
    }
}

impl fmt::Display for Beep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BP d{} r{} o{}",
            self.duration_ms, self.repeat, self.off_time_ms
        )
    }
}

/// 休眠指令 `SP d{ms}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sleep {
    /// 休眠时长（毫秒）
    pub duration_ms: u64,
}

impl Sleep {
    /// 构造并校验
    pub fn new(duration_ms: i64) -> Result<Self, ParseError> {
        let duration = u64::try_from(duration_ms)
            .map_err(|_| ParseError::NegativeDuration { duration_ms })?;
        Ok(Self {
            duration_ms: duration,
        })
    }
}

impl fmt::Display for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SP d{}", self.duration_ms)
    }
}

/// 指令（带标签的变体）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    RotateTool(RotateTool),
    PlaceNail(PlaceNail),
    Beep(Beep),
    Sleep(Sleep),
}

impl Instruction {
    /// 指令种类
    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::RotateTool(_) => InstructionKind::RotateTool,
            Instruction::PlaceNail(_) => InstructionKind::PlaceNail,
            Instruction::Beep(_) => InstructionKind::Beep,
            Instruction::Sleep(_) => InstructionKind::Sleep,
        }
    }

    /// 规范文本（等价于 `to_string()`）
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::RotateTool(i) => fmt::Display::fmt(i, f),
            Instruction::PlaceNail(i) => fmt::Display::fmt(i, f),
            Instruction::Beep(i) => fmt::Display::fmt(i, f),
            Instruction::Sleep(i) => fmt::Display::fmt(i, f),
        }
    }
}

impl From<RotateTool> for Instruction {
    fn from(value: RotateTool) -> Self {
        Instruction::RotateTool(value)
    }
}

impl From<PlaceNail> for Instruction {
    fn from(value: PlaceNail) -> Self {
        Instruction::PlaceNail(value)
    }
}

impl From<Beep> for Instruction {
    fn from(value: Beep) -> Self {
        Instruction::Beep(value)
    }
}

impl From<Sleep> for Instruction {
    fn from(value: Sleep) -> Self {
        Instruction::Sleep(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_id_conversions() {
        assert_eq!(ToolId::from_i64(0), Ok(ToolId::Table));
        assert_eq!(ToolId::from_i64(1), Ok(ToolId::Arm));
        assert_eq!(
            ToolId::from_i64(2),
            Err(ParseError::InvalidToolId { id: 2 })
        );
        assert_eq!(
            ToolId::from_i64(-99),
            Err(ParseError::InvalidToolId { id: -99 })
        );
        assert_eq!(ToolId::Arm.id(), 1);
    }

    #[test]
    fn test_keyword_case_insensitive() {
        assert_eq!(
            InstructionKind::from_keyword("ROT"),
            Some(InstructionKind::RotateTool)
        );
        assert_eq!(
            InstructionKind::from_keyword("rOt"),
            Some(InstructionKind::RotateTool)
        );
        assert_eq!(InstructionKind::from_keyword("Sp"), Some(InstructionKind::Sleep));
        assert_eq!(InstructionKind::from_keyword("jump"), None);
    }

    #[test]
    fn test_rotate_speed_bounds() {
        assert!(RotateTool::new(ToolId::Arm, 90.0, 1, true).is_ok());
        assert!(RotateTool::new(ToolId::Arm, 90.0, 255, true).is_ok());
        assert_eq!(
            RotateTool::new(ToolId::Arm, 90.0, 0, true),
            Err(ParseError::InvalidSpeed { speed: 0 })
        );
        assert_eq!(
            RotateTool::new(ToolId::Arm, 90.0, 256, true),
            Err(ParseError::InvalidSpeed { speed: 256 })
        );
        assert!(RotateTool::new(ToolId::Arm, f64::NAN, 10, true).is_err());
    }

    #[test]
    fn test_place_nail_bounds() {
        assert!(PlaceNail::new(1, 255).is_ok());
        assert_eq!(
            PlaceNail::new(0, 10),
            Err(ParseError::InvalidPlaceRate { rate: 0 })
        );
        assert_eq!(
            PlaceNail::new(10, 300),
            Err(ParseError::InvalidRetractRate { rate: 300 })
        );
    }

    #[test]
    fn test_beep_defaults_and_validation() {
        let beep = Beep::new(100, None, 50).unwrap();
        assert_eq!(beep.repeat, 1);

        assert_eq!(
            Beep::new(-1, None, 0),
            Err(ParseError::NegativeDuration { duration_ms: -1 })
        );
        assert_eq!(
            Beep::new(0, None, -5),
            Err(ParseError::NegativeOffTime { off_time_ms: -5 })
        );
        assert_eq!(
            Beep::new(0, Some(-2), 0),
            Err(ParseError::NegativeRepeat { repeat: -2 })
        );
        assert_eq!(Beep::new(0, Some(0), 0).unwrap().repeat, 0);
    }

    #[test]
    fn test_canonical_text() {
        let rot = RotateTool::new(ToolId::Arm, 90.0, 200, true).unwrap();
        assert_eq!(rot.to_string(), "ROT i1 a90.0 s200 abs1");

        let rot = RotateTool::new(ToolId::Table, -12.5, 3, false).unwrap();
        assert_eq!(rot.to_string(), "ROT i0 a-12.5 s3 abs0");

        assert_eq!(PlaceNail::new(5, 6).unwrap().to_string(), "PN p5 r6");
        assert_eq!(Beep::new(100, Some(3), 50).unwrap().to_string(), "BP d100 r3 o50");
        assert_eq!(Sleep::new(250).unwrap().to_string(), "SP d250");

        let instr = Instruction::from(Sleep::new(1).unwrap());
        assert_eq!(instr.canonical(), "SP d1");
        assert_eq!(instr.kind(), InstructionKind::Sleep);
    }
}
