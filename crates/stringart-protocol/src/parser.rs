//! 指令解析
//!
//! - `parse_line`: 单行解析，空行/注释行/未知关键字返回 `None`（Skip）
//! - `parse_program`: 严格模式，第一条非法指令即返回带行号的错误
//! - `parse_program_lenient`: 宽松模式，非法指令记录 warn 日志并作为 Skip

use crate::error::{ParseError, ProgramError};
use crate::instruction::{Beep, Instruction, InstructionKind, PlaceNail, RotateTool, Sleep, ToolId};
use std::str::FromStr;
use tracing::{debug, warn};

/// 去掉 `#` 注释并去掉行首空白
fn strip_comment(line: &str) -> &str {
    let code = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    code.trim_start()
}

/// 取关键字，返回（关键字，剩余字段）
fn split_keyword(code: &str) -> Option<(&str, impl Iterator<Item = &str>)> {
    let mut segments = code.split_whitespace();
    let keyword = segments.next()?;
    Some((keyword, segments))
}

fn parse_int(prefix: &'static str, value: &str) -> Result<i64, ParseError> {
    value.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
        prefix,
        value: value.to_string(),
    })
}

fn parse_float(prefix: &'static str, value: &str) -> Result<f64, ParseError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            prefix,
            value: value.to_string(),
        }),
    }
}

fn parse_flag(prefix: &'static str, value: &str) -> Result<bool, ParseError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ParseError::InvalidNumber {
            prefix,
            value: value.to_string(),
        }),
    }
}

fn require<T>(
    value: Option<T>,
    kind: InstructionKind,
    field: &'static str,
) -> Result<T, ParseError> {
    value.ok_or(ParseError::MissingField { kind, field })
}

/// `ROT i<id> a<deg> s<speed> abs<0|1>`
fn parse_rotate<'a>(segments: impl Iterator<Item = &'a str>) -> Result<RotateTool, ParseError> {
    let kind = InstructionKind::RotateTool;
    let mut tool_id = None;
    let mut degrees = None;
    let mut speed = None;
    let mut absolute = false;

    for segment in segments {
        let segment = segment.to_ascii_lowercase();
        // `abs` 必须先于 `a` 匹配
        if let Some(v) = segment.strip_prefix("abs") {
            absolute = parse_flag("abs", v)?;
        } else if let Some(v) = segment.strip_prefix('i') {
            tool_id = Some(parse_int("i", v)?);
        } else if let Some(v) = segment.strip_prefix('a') {
            degrees = Some(parse_float("a", v)?);
        } else if let Some(v) = segment.strip_prefix('s') {
            speed = Some(parse_int("s", v)?);
        }
    }

    let tool_id = ToolId::from_i64(require(tool_id, kind, "i")?)?;
    let degrees = require(degrees, kind, "a")?;
    let speed = require(speed, kind, "s")?;
    RotateTool::new(tool_id, degrees, speed, absolute)
}

/// `PN p<rate> r<rate>`
fn parse_place_nail<'a>(segments: impl Iterator<Item = &'a str>) -> Result<PlaceNail, ParseError> {
    let kind = InstructionKind::PlaceNail;
    let mut place_rate = None;
    let mut retract_rate = None;

    for segment in segments {
        let segment = segment.to_ascii_lowercase();
        if let Some(v) = segment.strip_prefix('p') {
            place_rate = Some(parse_int("p", v)?);
        } else if let Some(v) = segment.strip_prefix('r') {
            retract_rate = Some(parse_int("r", v)?);
        }
    }

    PlaceNail::new(
        require(place_rate, kind, "p")?,
        require(retract_rate, kind, "r")?,
    )
}

/// `BP d<ms> r<n> o<ms>`，`d`/`o` 缺省为 0，`r` 缺省为 1
fn parse_beep<'a>(segments: impl Iterator<Item = &'a str>) -> Result<Beep, ParseError> {
    let mut duration_ms = 0;
    let mut repeat = None;
    let mut off_time_ms = 0;

    for segment in segments {
        let segment = segment.to_ascii_lowercase();
        if let Some(v) = segment.strip_prefix('d') {
            duration_ms = parse_int("d", v)?;
        } else if let Some(v) = segment.strip_prefix('r') {
            repeat = Some(parse_int("r", v)?);
        } else if let Some(v) = segment.strip_prefix('o') {
            off_time_ms = parse_int("o", v)?;
        }
    }

    Beep::new(duration_ms, repeat, off_time_ms)
}

/// `SP d<ms>`
fn parse_sleep<'a>(segments: impl Iterator<Item = &'a str>) -> Result<Sleep, ParseError> {
    let mut duration_ms = None;

    for segment in segments {
        let segment = segment.to_ascii_lowercase();
        if let Some(v) = segment.strip_prefix('d') {
            duration_ms = Some(parse_int("d", v)?);
        }
    }

    Sleep::new(require(duration_ms, InstructionKind::Sleep, "d")?)
}

fn parse_kind<'a>(
    kind: InstructionKind,
    segments: impl Iterator<Item = &'a str>,
) -> Result<Instruction, ParseError> {
    debug!("Parsing {:?} instruction.", kind);
    let instruction: Instruction = match kind {
        InstructionKind::RotateTool => parse_rotate(segments)?.into(),
        InstructionKind::PlaceNail => parse_place_nail(segments)?.into(),
        InstructionKind::Beep => parse_beep(segments)?.into(),
        InstructionKind::Sleep => parse_sleep(segments)?.into(),
    };
    Ok(instruction)
}

/// 解析单行指令
///
/// # 返回
///
/// - `Ok(Some(instruction))`: 合法指令
/// - `Ok(None)`: Skip（空行、纯注释行、未知关键字；未知关键字会记录 warn 日志）
/// - `Err(..)`: 字段校验失败，这一行无法执行
///
/// # 示例
///
/// ```rust
/// use stringart_protocol::{ParseError, parse_line};
///
/// assert!(parse_line("").unwrap().is_none());
/// assert!(parse_line("FLY x1").unwrap().is_none());
/// assert_eq!(
///     parse_line("ROT i1 a90 s0"),
///     Err(ParseError::InvalidSpeed { speed: 0 })
/// );
/// ```
pub fn parse_line(line: &str) -> Result<Option<Instruction>, ParseError> {
    let code = strip_comment(line);
    let Some((keyword, segments)) = split_keyword(code) else {
        return Ok(None);
    };

    match InstructionKind::from_keyword(keyword) {
        Some(kind) => parse_kind(kind, segments).map(Some),
        None => {
            warn!("Instruction \"{}\" not recognized", keyword.to_ascii_lowercase());
            Ok(None)
        },
    }
}

impl FromStr for Instruction {
    type Err = ParseError;

    /// 严格解析：空行返回 `Empty`，未知关键字返回 `UnknownKeyword`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = strip_comment(s);
        let (keyword, segments) = split_keyword(code).ok_or(ParseError::Empty)?;
        let kind = InstructionKind::from_keyword(keyword).ok_or_else(|| {
            ParseError::UnknownKeyword {
                keyword: keyword.to_string(),
            }
        })?;
        parse_kind(kind, segments)
    }
}

/// 已解析的程序
///
/// 每个输入行对应一个条目，`None` 表示 Skip，顺序与输入一致。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    entries: Vec<Option<Instruction>>,
}

impl Program {
    /// 从条目构造
    pub fn from_entries(entries: Vec<Option<Instruction>>) -> Self {
        Self { entries }
    }

    /// 所有条目（含 Skip）
    pub fn entries(&self) -> &[Option<Instruction>] {
        &self.entries
    }

    /// 可执行指令（过滤掉 Skip）
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.entries.iter().flatten()
    }

    /// 消费并返回可执行指令
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.entries.into_iter().flatten().collect()
    }

    /// 输入行数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何行
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 可执行指令数量
    pub fn instruction_count(&self) -> usize {
        self.instructions().count()
    }

    /// Skip 行数量
    pub fn skipped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_none()).count()
    }

    /// 重新序列化为规范文本（每条指令一行，Skip 行省略）
    pub fn to_canonical_text(&self) -> String {
        self.instructions()
            .map(|i| format!("{}\n", i))
            .collect::<String>()
    }
}

/// 解析整段程序（严格模式）
///
/// 第一条校验失败的指令会终止解析，错误中带 1 起始的行号。
pub fn parse_program(text: &str) -> Result<Program, ProgramError> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let entry = parse_line(line).map_err(|source| ProgramError {
            line_number: idx + 1,
            line: line.to_string(),
            source,
        })?;
        entries.push(entry);
    }
    Ok(Program { entries })
}

/// 解析整段程序（宽松模式）
///
/// 校验失败的行记录 warn 日志后作为 Skip，程序继续解析。
pub fn parse_program_lenient(text: &str) -> Program {
    let entries = text
        .lines()
        .enumerate()
        .map(|(idx, line)| match parse_line(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping line {}: {} ({:?})", idx + 1, e, line);
                None
            },
        })
        .collect();
    Program { entries }
}
