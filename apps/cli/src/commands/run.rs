//! run 命令
//!
//! 启动运动引擎并执行指令文件，Ctrl+C 在下一个指令边界处停止

use super::config::load_machine_config;
use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use stringart_client::{ExecutionReport, Executor, ExecutorConfig};
use stringart_driver::{MachineBuilder, MachineSnapshot};
use stringart_protocol::{Program, parse_program, parse_program_lenient};
use tracing::warn;

/// 程序执行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 指令文件路径
    pub file: PathBuf,

    /// 机构配置文件（TOML）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 覆盖节拍频率（Hz）
    #[arg(long)]
    pub tick_rate: Option<u32>,

    /// 失败时继续执行
    #[arg(long)]
    pub continue_on_error: bool,

    /// 跳过无法解析的行（默认遇错即停止）
    #[arg(long)]
    pub lenient: bool,

    /// 第一条指令前等待（毫秒）
    #[arg(long, default_value_t = 0)]
    pub start_delay_ms: u64,

    /// 以指定频率（Hz）打印机构状态
    #[arg(short, long)]
    pub monitor: Option<u32>,
}

impl RunCommand {
    /// 解析指令文件
    pub fn load_program(&self) -> Result<Program> {
        let text = fs::read_to_string(&self.file)
            .with_context(|| format!("读取指令文件失败: {}", self.file.display()))?;

        if self.lenient {
            return Ok(parse_program_lenient(&text));
        }
        parse_program(&text).with_context(|| format!("解析 {} 失败", self.file.display()))
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            continue_on_error: self.continue_on_error,
            start_delay: (self.start_delay_ms > 0)
                .then(|| Duration::from_millis(self.start_delay_ms)),
        }
    }

    /// 执行程序
    pub fn execute(&self) -> Result<()> {
        let program = self.load_program()?;
        println!(
            "📜 {}: {} 条指令（跳过 {} 行）",
            self.file.display(),
            program.instruction_count(),
            program.skipped_count()
        );

        let config = load_machine_config(self.config.as_deref())?;
        let mut builder = MachineBuilder::new().config(config);
        if let Some(rate) = self.tick_rate {
            builder = builder.tick_rate(rate);
        }
        let machine = builder.build().context("启动运动引擎失败")?;

        // Ctrl+C 清除运行标志，节拍线程和执行器都会停下
        let running = machine.running_flag();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Release);
            eprintln!("\n收到退出信号，正在停止...");
        })
        .context("注册 Ctrl+C 处理失败")?;

        let mut executor = Executor::builder()
            .bind_machine(&machine)
            .config(self.executor_config())
            .build()?;

        let finished = AtomicBool::new(false);
        let result = std::thread::scope(|s| {
            if let Some(hz) = self.monitor.filter(|hz| *hz > 0) {
                let machine = &machine;
                let finished = &finished;
                s.spawn(move || {
                    let interval = Duration::from_secs_f64(1.0 / f64::from(hz));
                    while machine.is_running() && !finished.load(Ordering::Acquire) {
                        let label = machine.command_label().get();
                        println!("{}", format_snapshot(&machine.snapshot(), &label));
                        std::thread::sleep(interval);
                    }
                });
            }

            let result = executor.run_program(&program);
            finished.store(true, Ordering::Release);
            result
        });

        let report = result?;
        print_report(&report);
        if report.halted {
            warn!("Execution halted before the program finished");
        }
        Ok(())
    }
}

/// 单行状态输出
pub fn format_snapshot(snapshot: &MachineSnapshot, label: &str) -> String {
    format!(
        "[{:>7}] arm {:>8.3}°  table {:>8.3}° (err {:+.4}°)  {}",
        snapshot.tick, snapshot.arm_angle, snapshot.table_angle, snapshot.table_error, label
    )
}

fn print_report(report: &ExecutionReport) {
    println!();
    println!("📊 执行结果:");
    println!("  总指令数: {}", report.total);
    println!("  成功: {}", report.executed);
    println!("  失败: {}", report.failed.len());
    println!("  耗时: {:.2} 秒", report.duration.as_secs_f64());
    if report.halted {
        println!("  ⚠️  已中途停止");
    }

    if !report.failed.is_empty() {
        println!();
        println!("❌ 失败的指令:");
        for (idx, err) in &report.failed {
            println!("  指令 {}: {}", idx + 1, err);
        }
    }
}
