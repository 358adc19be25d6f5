//! 运动任务与角度工具函数
//!
//! 每个轴最多只有一个进行中的 [`MotionTask`]，由节拍循环逐拍推进，
//! 每拍消耗一个增量，直到 [`Advance::Done`]。

use std::fmt;

/// 旋转方向
///
/// 角度增大为逆时针（CCW），减小为顺时针（CW）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// 顺时针（角度减小）
    Cw,
    /// 逆时针（角度增大）
    Ccw,
}

impl Direction {
    /// 由有符号量得到方向（0 返回 `None`）
    pub fn from_sign(value: f64) -> Option<Self> {
        if value > 0.0 {
            Some(Direction::Ccw)
        } else if value < 0.0 {
            Some(Direction::Cw)
        } else {
            None
        }
    }

    /// 方向符号：CCW = +1，CW = -1
    pub fn signum(self) -> i64 {
        match self {
            Direction::Cw => -1,
            Direction::Ccw => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Cw => f.write_str("CW"),
            Direction::Ccw => f.write_str("CCW"),
        }
    }
}

/// 单拍推进结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 还有剩余增量
    Continue,
    /// 本拍为最后一个增量
    Done,
}

/// 有限次等量增量的运动任务
#[derive(Debug, Clone, PartialEq)]
pub struct MotionTask {
    remaining: u64,
    increment: f64,
}

impl MotionTask {
    /// 创建运动任务（`count == 0` 时返回 `None`）
    pub fn new(count: u64, increment: f64) -> Option<Self> {
        if count == 0 {
            return None;
        }
        Some(Self {
            remaining: count,
            increment,
        })
    }

    /// 剩余增量数
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// 每拍增量
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// 消耗一个增量
    pub fn advance(&mut self) -> Advance {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            Advance::Done
        } else {
            Advance::Continue
        }
    }
}

/// 将角度归一化到 [0, 360)
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid 对极小负数会返回 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// `from` 到 `to` 的最短有符号角度差，范围 (-180, 180]
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    let delta = wrap_degrees(to - from);
    if delta > 180.0 { delta - 360.0 } else { delta }
}
