//! # StringArt CLI
//!
//! 绕线机指令程序的命令行工具。
//!
//! ```bash
//! # 检查程序文件
//! stringart-cli check horse.stringart
//!
//! # 执行程序（Ctrl+C 停止），每秒打印 5 次状态
//! stringart-cli run horse.stringart --monitor 5
//!
//! # 生成默认机构配置
//! stringart-cli config init stringart.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{CheckCommand, ConfigCommand, RunCommand};

/// StringArt CLI - 绕线机指令执行工具
#[derive(Parser, Debug)]
#[command(name = "stringart-cli")]
#[command(about = "Run and check StringArt plotter programs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 执行指令程序
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 检查指令程序（不执行）
    Check {
        #[command(flatten)]
        args: CheckCommand,
    },

    /// 机构配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stringart_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::Check { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "stringart-cli",
            "run",
            "horse.stringart",
            "--continue-on-error",
            "--monitor",
            "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { args } => {
                assert_eq!(args.file.to_str(), Some("horse.stringart"));
                assert!(args.continue_on_error);
                assert_eq!(args.monitor, Some(5));
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_config_init() {
        let cli = Cli::try_parse_from(["stringart-cli", "config", "init", "m.toml", "--force"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommand::Init { force: true, .. })
        ));
    }

    #[test]
    fn test_cli_requires_file_for_check() {
        assert!(Cli::try_parse_from(["stringart-cli", "check"]).is_err());
    }
}
