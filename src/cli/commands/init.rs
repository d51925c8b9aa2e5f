//! Implementation of the `edgewise init` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use tokio::fs;

use crate::cli::context::AppContext;
use crate::cli::display::{action_success, output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
    pub state_dir: PathBuf,
    pub responsibilities_seeded: usize,
    pub pipeline_tasks_queued: usize,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if !self.success {
            return self.message.clone();
        }
        let mut lines = vec![action_success(&self.message)];
        lines.push(format!("  Config: {}", self.config_path.display()));
        lines.push(format!("  State:  {}", self.state_dir.display()));
        if self.responsibilities_seeded > 0 {
            lines.push(format!(
                "  Seeded {} responsibility(ies)",
                self.responsibilities_seeded
            ));
        }
        if self.pipeline_tasks_queued > 0 {
            lines.push(format!(
                "  Queued {} recurring pipeline task(s)",
                self.pipeline_tasks_queued
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: Config, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let config_dir = target.join(CONFIG_DIR);
    let config_path = config_dir.join("config.yaml");
    let state_dir = resolve(&target, &config.state_dir);

    if config_path.exists() && !args.force {
        let out = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to overwrite the config.".to_string(),
            config_path,
            state_dir,
            responsibilities_seeded: 0,
            pipeline_tasks_queued: 0,
        };
        output(&out, json_mode);
        return Ok(());
    }

    fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize config")?;
    fs::write(&config_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let mut config = config;
    config.state_dir = state_dir.to_string_lossy().into_owned();
    let ctx = AppContext::open(config).await?;
    let responsibilities_seeded = ctx
        .responsibilities()
        .sync_from_config(&ctx.config.responsibilities)
        .await?;
    let pipeline_tasks_queued = ctx
        .tasks()
        .heal_recurring(&ctx.config.pipelines, Utc::now())
        .await?
        .len();

    tracing::info!(path = %target.display(), "Project initialized");
    let out = InitOutput {
        success: true,
        message: format!("Initialized edgewise in {}", target.display()),
        config_path,
        state_dir,
        responsibilities_seeded,
        pipeline_tasks_queued,
    };
    output(&out, json_mode);
    Ok(())
}

fn resolve(base: &Path, dir: &str) -> PathBuf {
    let dir = Path::new(dir);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}
