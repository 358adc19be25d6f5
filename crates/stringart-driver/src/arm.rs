//! 摆臂（舵机轴）
//!
//! 舵机转速由“转 60° 所需时间”决定，一次旋转被拆成若干节拍，
//! 每拍移动相同角度，最后一拍精确落在目标角度上。

use crate::motion::{Advance, MotionTask};
use stringart_tools::MachineConfig;
use tracing::debug;

/// 摆臂轴状态
#[derive(Debug, Clone)]
pub struct ArmAxis {
    angle: f64,
    target: f64,
    task: Option<MotionTask>,
    time_per_60_deg_s: f64,
    tick_rate_hz: f64,
    origin: [f64; 2],
    needle_length: f64,
}

impl ArmAxis {
    /// 创建摆臂轴
    ///
    /// - `initial_angle`: 初始角度（度）
    /// - `time_per_60_deg_s`: 舵机转 60° 所需时间（秒）
    /// - `tick_rate_hz`: 节拍频率
    pub fn new(initial_angle: f64, time_per_60_deg_s: f64, tick_rate_hz: u32) -> Self {
        Self {
            angle: initial_angle,
            target: initial_angle,
            task: None,
            time_per_60_deg_s,
            tick_rate_hz: f64::from(tick_rate_hz),
            origin: [0.0, 0.0],
            needle_length: 0.0,
        }
    }

    /// 按机构配置创建
    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(
            config.arm.initial_angle_deg,
            config.servo.time_per_60_deg_s,
            config.tick.rate_hz,
        )
        .with_origin(config.arm_origin())
        .with_needle_length(config.arm.needle_length)
    }

    /// 设置摆臂支点
    pub fn with_origin(mut self, origin: [f64; 2]) -> Self {
        self.origin = origin;
        self
    }

    /// 设置针长（仅用于显示）
    pub fn with_needle_length(mut self, needle_length: f64) -> Self {
        self.needle_length = needle_length;
        self
    }

    /// 当前角度
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// 最近一次目标角度
    pub fn target(&self) -> f64 {
        self.target
    }

    /// 摆臂支点
    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    pub fn needle_length(&self) -> f64 {
        self.needle_length
    }

    /// 是否有进行中的任务
    pub fn is_moving(&self) -> bool {
        self.task.is_some()
    }

    /// 剩余节拍数
    pub fn remaining_ticks(&self) -> u64 {
        self.task.as_ref().map_or(0, MotionTask::remaining)
    }

    /// 针尖相对支点的偏移
    pub fn needle_tip_offset(&self) -> f64 {
        self.needle_length * self.angle.to_radians().sin()
    }

    /// 舵机走完 `delta` 度所需的节拍数
    pub fn frames_for(&self, delta: f64) -> u64 {
        let duration_s = delta.abs() * self.time_per_60_deg_s / 60.0;
        (duration_s * self.tick_rate_hz).round() as u64
    }

    /// 开始转向 `target`（替换未完成的任务）
    ///
    /// 返回是否创建了任务；节拍数为 0 时直接到位并返回 `false`。
    pub fn begin_rotation(&mut self, target: f64) -> bool {
        if self.task.take().is_some() {
            debug!("Arm: replacing pending rotation to {:.3}°", self.target);
        }
        self.target = target;

        let delta = self.angle - target;
        let frames = self.frames_for(delta);
        match MotionTask::new(frames, delta / frames.max(1) as f64) {
            Some(task) => {
                debug!(
                    "Arm: {:.3}° -> {:.3}° over {} ticks",
                    self.angle, target, frames
                );
                self.task = Some(task);
                true
            },
            None => {
                self.angle = target;
                false
            },
        }
    }

    /// 推进一拍（空闲时返回 `None`）
    pub fn tick(&mut self) -> Option<Advance> {
        let task = self.task.as_mut()?;
        let advance = task.advance();
        match advance {
            Advance::Continue => self.angle -= task.increment(),
            Advance::Done => {
                self.angle = self.target;
                self.task = None;
            },
        }
        Some(advance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm() -> ArmAxis {
        ArmAxis::new(0.0, 0.17, 240)
    }

    fn run_to_idle(arm: &mut ArmAxis) -> u64 {
        let mut ticks = 0;
        while arm.tick().is_some() {
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn test_frame_count() {
        // 60° = 0.17s = 40.8 拍 -> 41
        assert_eq!(arm().frames_for(60.0), 41);
        assert_eq!(arm().frames_for(-60.0), 41);
        assert_eq!(arm().frames_for(0.0), 0);
        // 超出 u32 的节拍数不截断
        assert_eq!(arm().frames_for(1e12), 680_000_000_000);
    }

    #[test]
    fn test_zero_frame_move_snaps() {
        let mut arm = arm();
        // 0.5° -> 0.0034s -> 0.34 拍 -> 0
        assert!(!arm.begin_rotation(0.5));
        assert_eq!(arm.angle(), 0.5);
        assert!(!arm.is_moving());
        assert_eq!(arm.tick(), None);
    }

    #[test]
    fn test_rotation_lands_exactly_on_target() {
        let mut arm = arm();
        assert!(arm.begin_rotation(33.3));
        let frames = arm.remaining_ticks();
        assert_eq!(run_to_idle(&mut arm), frames);
        assert_eq!(arm.angle(), 33.3);
    }

    #[test]
    fn test_increments_are_uniform() {
        let mut arm = arm();
        arm.begin_rotation(-30.0);
        let first = arm.angle();
        arm.tick();
        let step = arm.angle() - first;
        arm.tick();
        assert!((arm.angle() - first - 2.0 * step).abs() < 1e-9);
        assert!(step < 0.0);
    }

    #[test]
    fn test_new_rotation_replaces_pending() {
        let mut arm = arm();
        arm.begin_rotation(90.0);
        for _ in 0..10 {
            arm.tick();
        }
        let midway = arm.angle();
        assert!(midway > 0.0 && midway < 90.0);

        arm.begin_rotation(0.0);
        assert_eq!(arm.remaining_ticks(), arm.frames_for(midway));
        run_to_idle(&mut arm);
        assert_eq!(arm.angle(), 0.0);
    }

    #[test]
    fn test_needle_tip_offset() {
        let mut arm = ArmAxis::new(0.0, 0.17, 240).with_needle_length(60.0);
        assert_eq!(arm.needle_tip_offset(), 0.0);
        arm.begin_rotation(90.0);
        run_to_idle(&mut arm);
        assert!((arm.needle_tip_offset() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_config() {
        let config = MachineConfig::default();
        let arm = ArmAxis::from_config(&config);
        assert_eq!(arm.angle(), 0.0);
        assert_eq!(arm.origin(), config.arm_origin());
        assert_eq!(arm.needle_length(), 60.0);
        assert_eq!(arm.frames_for(60.0), 41);
    }
}
