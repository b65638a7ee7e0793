mod output;
mod params;

use std::path::PathBuf;

pub use output::{DisplayOptions, OutputFormat};
pub use params::{ParamsConfig, TierConfig};

const DEFAULT_STATE_FILE: &str = "state.json";

/// Configuration.
///
/// Unset fields fall back to the config file, then to the defaults.
#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone, Default)]
pub struct Config {
    /// Path to the ledger state file.
    #[arg(long, short, env = "REWARDNET_STATE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<PathBuf>,
    /// Output format.
    #[arg(long, short)]
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<OutputFormat>,
    /// Ledger parameters, only read from the config file.
    #[arg(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<ParamsConfig>,
}

impl Config {
    /// The config written by `init-config`.
    pub fn template(state: PathBuf) -> Self {
        Self {
            state: Some(state),
            output: Some(OutputFormat::default()),
            params: Some(ParamsConfig::default()),
        }
    }

    /// Returns the path to the state file.
    ///
    /// Defaults to `state.json` next to the config file.
    pub fn state_path(&self, config_path: &std::path::Path) -> PathBuf {
        match self.state.as_ref() {
            Some(path) => path.clone(),
            None => config_path
                .parent()
                .map(|dir| dir.join(DEFAULT_STATE_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
        }
    }

    /// Returns the output format.
    pub fn output(&self) -> OutputFormat {
        self.output.unwrap_or_default()
    }

    /// Returns the ledger parameters.
    pub fn params(&self) -> eyre::Result<rewardnet_model::LedgerParams> {
        self.params.clone().unwrap_or_default().to_params()
    }
}
