use tokio::{fs, io::AsyncWriteExt};

use crate::config::Config;

/// Initialize config.
#[derive(Debug, clap::Args)]
pub struct InitConfig {
    /// Replace if the config file already exists.
    #[arg(long, short)]
    force: bool,
}

impl super::Command for InitConfig {
    fn is_ledger_required(&self) -> bool {
        false
    }

    fn is_mutating(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let config_path = ctx.config_path();
        if fs::try_exists(config_path).await? && !self.force {
            eyre::bail!("Config file already exists. Use `--force` to overwrite it.");
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(config_path)
            .await?;

        let template = Config::template(ctx.config().state_path(config_path));
        let content = toml::to_string_pretty(&template)?;
        file.write_all(content.as_bytes()).await?;

        println!("config written to {}", config_path.display());
        Ok(())
    }
}
