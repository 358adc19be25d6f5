//! 配置管理命令
//!
//! 查看或生成机构配置文件（TOML）

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use stringart_tools::MachineConfig;

/// 加载机构配置（未指定文件时使用默认值）
pub fn load_machine_config(path: Option<&Path>) -> Result<MachineConfig> {
    match path {
        Some(path) => MachineConfig::load_from_file(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display())),
        None => Ok(MachineConfig::default()),
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置
    Show {
        /// 配置文件路径（缺省为内置默认值）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 写出默认配置文件
    Init {
        /// 输出路径
        #[arg(default_value = "stringart.toml")]
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { config } => {
                print!("{}", render_config(config.as_deref())?);
                Ok(())
            },
            ConfigCommand::Init { path, force } => {
                init_config(&path, force)?;
                println!("✅ 已写入默认配置: {}", path.display());
                Ok(())
            },
        }
    }
}

fn render_config(path: Option<&Path>) -> Result<String> {
    let config = load_machine_config(path)?;
    let mut out = config.to_toml_string().context("序列化配置失败")?;
    out.push_str(&format!(
        "\n# step angle: {:.5}° ({} steps/rev)\n",
        config.step_angle_deg(),
        config.steps_per_revolution()
    ));
    Ok(out)
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} 已存在（使用 --force 覆盖）", path.display());
    }
    MachineConfig::default()
        .save_to_file(path)
        .with_context(|| format!("写入配置文件失败: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stringart.toml");

        init_config(&path, false).unwrap();
        let loaded = load_machine_config(Some(&path)).unwrap();
        assert_eq!(loaded, MachineConfig::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stringart.toml");
        std::fs::write(&path, "[tick]\nrate_hz = 60\n").unwrap();

        assert!(init_config(&path, false).is_err());
        assert_eq!(load_machine_config(Some(&path)).unwrap().tick.rate_hz, 60);

        init_config(&path, true).unwrap();
        assert_eq!(load_machine_config(Some(&path)).unwrap().tick.rate_hz, 240);
    }

    #[test]
    fn test_render_default_config() {
        let text = render_config(None).unwrap();
        assert!(text.contains("[stepper]"));
        assert!(text.contains("micro_steps = 32"));
        assert!(text.contains("0.05625"));
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = load_machine_config(Some(Path::new("/nonexistent/stringart.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stringart.toml"));
    }
}
