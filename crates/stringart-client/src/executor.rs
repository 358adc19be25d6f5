//! 指令执行器
//!
//! 按顺序执行指令：每条指令开始前等待两个轴都空闲，
//! 发布指令文本后再下发运动命令。系统停止时在指令边界处中止，已执行的运动不回滚。
//!
//! # 使用示例
//!
//! ```no_run
//! use stringart_client::{Executor, ExecutorConfig};
//! use stringart_driver::MachineBuilder;
//! use stringart_protocol::parse_program;
//!
//! let machine = MachineBuilder::new().build().unwrap();
//! let program = parse_program("ROT i1 a30 s100 abs1\nSP d100\n").unwrap();
//!
//! let mut executor = Executor::builder()
//!     .bind_machine(&machine)
//!     .config(ExecutorConfig::default())
//!     .build()
//!     .unwrap();
//! let report = executor.run_program(&program).unwrap();
//! assert_eq!(report.executed, 2);
//! ```

use crate::beeper::{Beeper, LogBeeper};
use crate::error::ExecError;
use crossbeam_channel::Sender;
use std::thread;
use std::time::{Duration, Instant};
use stringart_driver::{Axis, AxisHandle, CommandLabel, DriverError, Machine};
use stringart_protocol::{Beep, Instruction, InstructionKind, Program};
use tracing::{debug, error, info, warn};

/// 执行器配置
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// 失败时是否继续
    pub continue_on_error: bool,

    /// 第一条指令前的等待时间
    pub start_delay: Option<Duration>,
}

/// 执行结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// 指令总数
    pub total: usize,

    /// 成功执行的指令数
    pub executed: usize,

    /// 失败的指令索引和错误
    pub failed: Vec<(usize, String)>,

    /// 是否因系统停止而中止
    pub halted: bool,

    /// 执行时长
    pub duration: Duration,
}

impl ExecutionReport {
    /// 全部执行且没有失败
    pub fn is_complete(&self) -> bool {
        !self.halted && self.failed.is_empty() && self.executed == self.total
    }
}

/// 执行进度事件
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    Started { total: usize },
    Dispatched { index: usize, text: String },
    Failed { index: usize, message: String },
    Finished(ExecutionReport),
}

/// 指令执行器
pub struct Executor {
    arm: AxisHandle,
    table: AxisHandle,
    label: CommandLabel,
    beeper: Box<dyn Beeper>,
    config: ExecutorConfig,
    events: Option<Sender<ExecutionEvent>>,
}

/// 执行器 Builder
///
/// 摆臂和转台入口必须在构造时注入，缺任意一个 `build()` 都会失败。
#[derive(Default)]
pub struct ExecutorBuilder {
    arm: Option<AxisHandle>,
    table: Option<AxisHandle>,
    label: Option<CommandLabel>,
    beeper: Option<Box<dyn Beeper>>,
    config: ExecutorConfig,
    events: Option<Sender<ExecutionEvent>>,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定摆臂入口
    pub fn arm(mut self, handle: AxisHandle) -> Self {
        self.arm = Some(handle);
        self
    }

    /// 绑定转台入口
    pub fn table(mut self, handle: AxisHandle) -> Self {
        self.table = Some(handle);
        self
    }

    /// 绑定指令文本输出（默认使用独立的文本，不对外可见）
    pub fn label(mut self, label: CommandLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// 一次绑定机器的两个入口和指令文本
    pub fn bind_machine(self, machine: &Machine) -> Self {
        self.arm(machine.arm_handle())
            .table(machine.table_handle())
            .label(machine.command_label())
    }

    /// 设置蜂鸣器（默认 [`LogBeeper`]）
    pub fn beeper(mut self, beeper: impl Beeper + 'static) -> Self {
        self.beeper = Some(Box::new(beeper));
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// 订阅执行进度（非阻塞发送，通道满时丢弃）
    pub fn events(mut self, sender: Sender<ExecutionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn build(self) -> Result<Executor, ExecError> {
        let arm = self.arm.ok_or(ExecError::UnboundAxis(Axis::Arm))?;
        let table = self.table.ok_or(ExecError::UnboundAxis(Axis::Table))?;
        Ok(Executor {
            arm,
            table,
            label: self.label.unwrap_or_default(),
            beeper: self.beeper.unwrap_or_else(|| Box::new(LogBeeper)),
            config: self.config,
            events: self.events,
        })
    }
}

impl Executor {
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// 当前指令文本
    pub fn command_label(&self) -> &CommandLabel {
        &self.label
    }

    /// 两个轴对应的节拍线程是否都在运行
    pub fn is_running(&self) -> bool {
        self.arm.is_running() && self.table.is_running()
    }

    /// 执行解析后的程序（跳过的行不计入）
    pub fn run_program(&mut self, program: &Program) -> Result<ExecutionReport, ExecError> {
        let instructions: Vec<Instruction> = program.instructions().copied().collect();
        self.run(&instructions)
    }

    /// 按顺序执行指令
    ///
    /// # 错误
    /// - `ExecError::Aborted`: 未开启 `continue_on_error` 时某条指令失败
    pub fn run(&mut self, instructions: &[Instruction]) -> Result<ExecutionReport, ExecError> {
        let start = Instant::now();
        let total = instructions.len();
        let mut report = ExecutionReport {
            total,
            ..Default::default()
        };
        self.emit(ExecutionEvent::Started { total });
        info!("Executing {} instructions", total);

        if let Some(delay) = self.config.start_delay {
            debug!("Start delay {:?}", delay);
            thread::sleep(delay);
        }

        for (index, instruction) in instructions.iter().enumerate() {
            if !self.wait_for_axes() {
                warn!(
                    "Machine stopped, halting before instruction {}/{}",
                    index + 1,
                    total
                );
                report.halted = true;
                break;
            }

            let text = instruction.canonical();
            self.label.set(text.clone());
            info!("[{}/{}] {}", index + 1, total, text);
            self.emit(ExecutionEvent::Dispatched {
                index,
                text: text.clone(),
            });

            match self.execute_instruction(instruction) {
                Ok(()) => report.executed += 1,
                Err(ExecError::Driver(DriverError::NotRunning)) => {
                    warn!("Machine stopped while dispatching {}", text);
                    report.halted = true;
                    break;
                },
                Err(err) => {
                    error!("[{}/{}] {} failed: {}", index + 1, total, text, err);
                    let message = err.to_string();
                    report.failed.push((index, message.clone()));
                    self.emit(ExecutionEvent::Failed { index, message });

                    if !self.config.continue_on_error {
                        report.duration = start.elapsed();
                        self.emit(ExecutionEvent::Finished(report));
                        return Err(ExecError::Aborted {
                            index,
                            text,
                            source: Box::new(err),
                        });
                    }
                },
            }
        }

        // 等最后一个运动结束
        if !report.halted && !self.wait_for_axes() {
            report.halted = true;
        }

        report.duration = start.elapsed();
        info!(
            "Execution finished: {}/{} executed, {} failed{}",
            report.executed,
            total,
            report.failed.len(),
            if report.halted { ", halted" } else { "" }
        );
        self.emit(ExecutionEvent::Finished(report.clone()));
        Ok(report)
    }

    /// 执行单条指令（不等待运动完成）
    pub fn execute_instruction(&mut self, instruction: &Instruction) -> Result<(), ExecError> {
        match instruction {
            Instruction::RotateTool(rot) => {
                if !rot.absolute {
                    debug!("abs0 requested, rotating to absolute {:.3}°", rot.degrees);
                }
                self.handle(Axis::from(rot.tool_id))
                    .begin_rotation(rot.degrees)?;
                Ok(())
            },
            Instruction::PlaceNail(_) => Err(ExecError::NotImplemented(InstructionKind::PlaceNail)),
            Instruction::Beep(beep) => {
                self.beep(beep);
                Ok(())
            },
            Instruction::Sleep(sleep) => {
                thread::sleep(Duration::from_millis(sleep.duration_ms));
                Ok(())
            },
        }
    }

    fn handle(&self, axis: Axis) -> &AxisHandle {
        match axis {
            Axis::Arm => &self.arm,
            Axis::Table => &self.table,
        }
    }

    /// `repeat` 次鸣叫，每次 `duration_ms`，之间间隔 `off_time_ms`
    fn beep(&mut self, beep: &Beep) {
        let on = Duration::from_millis(beep.duration_ms);
        let off = Duration::from_millis(beep.off_time_ms);
        for i in 0..beep.repeat {
            self.beeper.on();
            thread::sleep(on);
            self.beeper.off();
            if i + 1 < beep.repeat {
                thread::sleep(off);
            }
        }
    }

    /// 等待两个轴都空闲（返回 `false` 表示系统已停止）
    fn wait_for_axes(&self) -> bool {
        self.arm.wait_idle() && self.table.wait_idle() && self.is_running()
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(event);
        }
    }
}
