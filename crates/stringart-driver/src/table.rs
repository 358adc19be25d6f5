//! 转台（步进电机轴）
//!
//! 步进电机只能走整数步，每次旋转都会留下不足一步的量化误差。
//! 转台把误差累计在 `accumulated_error` 中（正值表示还欠逆时针方向的角度），
//! 下一次旋转时一并补偿，使长期漂移始终小于一个步距角。
//!
//! 除离散的 `current_angle` 外，转台还维护一个连续的 `commanded_angle`（理想位置）。
//! 空闲时满足 `commanded ≡ current + accumulated_error (mod 360)`，
//! 旋转量从理想位置计算，因此欠下的误差不会被重复计入。

use crate::motion::{Advance, Direction, MotionTask, shortest_delta, wrap_degrees};
use stringart_tools::MachineConfig;
use tracing::{debug, trace};

/// 一次旋转的规划结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TablePlan {
    /// 请求的最短角度差（度）
    pub requested: f64,
    /// 方向（0 步时为 `None`）
    pub direction: Option<Direction>,
    /// 步数（绝对值）
    pub steps: u64,
    /// 完成后剩余的量化误差
    pub residual_error: f64,
}

#[derive(Debug, Clone)]
struct TableTask {
    motion: MotionTask,
    direction: Direction,
    residual_error: f64,
}

/// 转台轴状态
#[derive(Debug, Clone)]
pub struct TableAxis {
    current_angle: f64,
    commanded_angle: f64,
    accumulated_error: f64,
    step_angle: f64,
    net_steps: i64,
    task: Option<TableTask>,
    origin: [f64; 2],
    radius: f64,
    pin_count: u32,
}

impl TableAxis {
    /// 创建转台轴
    ///
    /// - `initial_angle`: 初始角度（度）
    /// - `step_angle`: 步距角（度），即 `360 / (整步数 × 细分)`
    pub fn new(initial_angle: f64, step_angle: f64) -> Self {
        let initial = wrap_degrees(initial_angle);
        Self {
            current_angle: initial,
            commanded_angle: initial,
            accumulated_error: 0.0,
            step_angle,
            net_steps: 0,
            task: None,
            origin: [0.0, 0.0],
            radius: 0.0,
            pin_count: 1,
        }
    }

    /// 按机构配置创建
    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(config.table.initial_angle_deg, config.step_angle_deg()).with_geometry(
            config.table.origin,
            config.table.radius,
            config.table.pin_count,
        )
    }

    /// 设置转台几何参数
    pub fn with_geometry(mut self, origin: [f64; 2], radius: f64, pin_count: u32) -> Self {
        self.origin = origin;
        self.radius = radius;
        self.pin_count = pin_count.max(1);
        self
    }

    /// 当前（离散）角度，范围 [0, 360)
    pub fn angle(&self) -> f64 {
        self.current_angle
    }

    /// 理想角度（最近一次目标）
    pub fn commanded_angle(&self) -> f64 {
        self.commanded_angle
    }

    /// 累计量化误差（度，正值为欠逆时针）
    pub fn accumulated_error(&self) -> f64 {
        self.accumulated_error
    }

    /// 步距角
    pub fn step_angle(&self) -> f64 {
        self.step_angle
    }

    /// 已执行的有符号步数总和
    pub fn net_steps(&self) -> i64 {
        self.net_steps
    }

    /// 是否有进行中的任务
    pub fn is_moving(&self) -> bool {
        self.task.is_some()
    }

    /// 剩余步数
    pub fn remaining_steps(&self) -> u64 {
        self.task.as_ref().map_or(0, |t| t.motion.remaining())
    }

    /// 转台中心
    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    /// 转台半径
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// 钉子数量
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// 所有钉子的角度（从转台当前角度起均匀分布）
    pub fn pin_angles(&self) -> Vec<f64> {
        let spacing = 360.0 / f64::from(self.pin_count);
        (0..self.pin_count)
            .map(|i| wrap_degrees(self.current_angle + f64::from(i) * spacing))
            .collect()
    }

    /// 所有钉子在显示坐标系中的位置
    pub fn pin_positions(&self) -> Vec<[f64; 2]> {
        self.pin_angles()
            .into_iter()
            .map(|a| {
                let rad = a.to_radians();
                [
                    self.origin[0] + self.radius * rad.cos(),
                    self.origin[1] + self.radius * rad.sin(),
                ]
            })
            .collect()
    }

    /// 规划一次旋转（不修改状态）
    ///
    /// 最短路径从理想角度量起，欠下的误差只计入一次。
    pub fn plan(&self, target: f64) -> TablePlan {
        let requested = shortest_delta(self.commanded_angle, wrap_degrees(target));
        let desired = requested + self.accumulated_error;
        let steps = best_step_count(desired, self.step_angle);
        TablePlan {
            requested,
            direction: Direction::from_sign(steps as f64),
            steps: steps.unsigned_abs(),
            residual_error: desired - steps as f64 * self.step_angle,
        }
    }

    /// 开始转向 `target`（替换未完成的任务）
    ///
    /// 返回本次规划；0 步时误差立即入账且不创建任务。
    pub fn begin_rotation(&mut self, target: f64) -> TablePlan {
        if self.task.take().is_some() {
            // 放弃的任务已走过的部分保留在 current 中
            self.commanded_angle = wrap_degrees(self.current_angle + self.accumulated_error);
            debug!(
                "Table: replacing pending rotation at {:.5}°",
                self.current_angle
            );
        }

        let plan = self.plan(target);
        self.commanded_angle = wrap_degrees(target);

        match plan.direction {
            Some(direction) => {
                let increment = direction.signum() as f64 * self.step_angle;
                debug!(
                    "Table: {} {:.3}° ({} steps, residual {:+.5}°)",
                    direction, plan.requested, plan.steps, plan.residual_error
                );
                self.task = MotionTask::new(plan.steps, increment).map(|motion| TableTask {
                    motion,
                    direction,
                    residual_error: plan.residual_error,
                });
            },
            None => {
                trace!("Table: zero-step move, booking {:+.5}°", plan.residual_error);
                self.accumulated_error = plan.residual_error;
            },
        }
        plan
    }

    /// 推进一步（空闲时返回 `None`）
    pub fn tick(&mut self) -> Option<(Direction, Advance)> {
        let task = self.task.as_mut()?;
        let direction = task.direction;
        let residual = task.residual_error;
        self.current_angle = wrap_degrees(self.current_angle + task.motion.increment());
        self.net_steps += direction.signum();

        let advance = task.motion.advance();
        if advance == Advance::Done {
            self.accumulated_error = residual;
            self.task = None;
        }
        Some((direction, advance))
    }
}

/// 在 `round(desired / step)` 及其另一侧相邻整数中选取剩余误差更小者
fn best_step_count(desired: f64, step: f64) -> i64 {
    let exact = desired / step;
    let nearest = exact.round();
    let neighbour = if exact >= nearest {
        nearest + 1.0
    } else {
        nearest - 1.0
    };
    let err_nearest = (desired - nearest * step).abs();
    let err_neighbour = (desired - neighbour * step).abs();
    let best = if err_neighbour < err_nearest {
        neighbour
    } else {
        nearest
    };
    best as i64
}
