//! check 命令
//!
//! 逐行解析指令文件并打印规范文本，报告所有错误行（不会在第一个错误处停止）

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use stringart_protocol::{Instruction, ParseError, parse_line};

/// 检查命令参数
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// 指令文件路径
    pub file: PathBuf,

    /// 只打印错误
    #[arg(short, long)]
    pub quiet: bool,
}

/// 单行检查结果
#[derive(Debug, PartialEq)]
pub enum LineOutcome {
    Instruction(Instruction),
    Skip,
    Error(ParseError),
}

/// 逐行检查，返回 (行号, 原文, 结果)
pub fn check_text(text: &str) -> Vec<(usize, &str, LineOutcome)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let outcome = match parse_line(line) {
                Ok(Some(instruction)) => LineOutcome::Instruction(instruction),
                Ok(None) => LineOutcome::Skip,
                Err(err) => LineOutcome::Error(err),
            };
            (i + 1, line, outcome)
        })
        .collect()
}

impl CheckCommand {
    pub fn execute(&self) -> Result<()> {
        let text = fs::read_to_string(&self.file)
            .with_context(|| format!("读取指令文件失败: {}", self.file.display()))?;

        let results = check_text(&text);
        let mut instructions = 0usize;
        let mut errors = 0usize;

        for (line_number, line, outcome) in &results {
            match outcome {
                LineOutcome::Instruction(instruction) => {
                    instructions += 1;
                    if !self.quiet {
                        println!("{:>5}  {}", line_number, instruction);
                    }
                },
                LineOutcome::Skip => {},
                LineOutcome::Error(err) => {
                    errors += 1;
                    eprintln!("{:>5}  ❌ {} ({:?})", line_number, err, line.trim());
                },
            }
        }

        println!();
        println!(
            "📋 {} 行，{} 条指令，{} 个错误",
            results.len(),
            instructions,
            errors
        );

        if errors > 0 {
            anyhow::bail!("{} 中有 {} 行无法解析", self.file.display(), errors);
        }
        Ok(())
    }
}
