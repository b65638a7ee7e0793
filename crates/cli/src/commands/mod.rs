use std::path::Path;

use enum_dispatch::enum_dispatch;
use eyre::OptionExt;
use rewardnet_ledger::Ledger;

use crate::config::{Config, OutputFormat};

use init_config::InitConfig;
use member::{ClaimSalary, Release, RemoveAccount, Signup, Withdraw};
use operator::Operator;
use request::{Decide, Submit};
use show::Show;
use task::Task;

mod init_config;
mod member;
mod operator;
mod request;
mod show;
mod task;
mod view;

/// Commands.
#[enum_dispatch]
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Initialize config file.
    InitConfig(InitConfig),
    /// Create a member account.
    Signup(Signup),
    /// Remove a member account.
    RemoveAccount(RemoveAccount),
    /// Task commands.
    Task(Task),
    /// Submit a request for approval.
    Submit(Submit),
    /// Request a withdrawal.
    Withdraw(Withdraw),
    /// Decide a pending request.
    Decide(Decide),
    /// Release the pending commission of a member.
    Release(Release),
    /// Claim a monthly salary.
    ClaimSalary(ClaimSalary),
    /// Operator commands.
    Operator(Operator),
    /// Show ledger data.
    Show(Show),
}

#[enum_dispatch(Commands)]
pub(crate) trait Command {
    fn is_ledger_required(&self) -> bool {
        true
    }

    /// Whether the ledger state must be saved after the command.
    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()>;
}

pub(crate) struct Context<'a> {
    config_path: &'a Path,
    config: &'a Config,
    ledger: Option<&'a Ledger>,
}

impl<'a> Context<'a> {
    pub(super) fn new(config_path: &'a Path, config: &'a Config, ledger: Option<&'a Ledger>) -> Self {
        Self {
            config_path,
            config,
            ledger,
        }
    }

    pub(crate) fn config_path(&self) -> &Path {
        self.config_path
    }

    pub(crate) fn config(&self) -> &Config {
        self.config
    }

    pub(crate) fn ledger(&self) -> eyre::Result<&Ledger> {
        self.ledger.ok_or_eyre("ledger is not loaded")
    }

    pub(crate) fn output(&self) -> OutputFormat {
        self.config.output()
    }
}
