use rewardnet_model::{AccountId, Amount, TaskId};

use super::view::{CompletionView, TaskView};
use crate::config::DisplayOptions;

/// Task commands.
#[derive(Debug, clap::Args)]
pub struct Task {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Create a task.
    Create {
        reward: Amount,
        /// Where the member is sent to complete the task.
        #[arg(long)]
        redirect: String,
    },
    /// Complete a task on behalf of a member.
    Complete { member: AccountId, task: TaskId },
}

impl super::Command for Task {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let ledger = ctx.ledger()?;
        let output = ctx.output();
        match &self.command {
            Command::Create { reward, redirect } => {
                let task = ledger.create_task(*reward, redirect)?;
                println!(
                    "{}",
                    output.display_one(TaskView::from(&task), DisplayOptions::default())?
                );
            }
            Command::Complete { member, task } => {
                let completion = ledger.submit_task(*member, *task)?;
                if completion.distribution().is_none() {
                    tracing::warn!("referral shares deferred, run `operator retry-unsettled`");
                }
                println!(
                    "{}",
                    output.display_one(
                        CompletionView::from(&completion),
                        DisplayOptions::table_projection([
                            ("task", "Task"),
                            ("pending_credit", "Pending Credit"),
                            ("completed_today", "Completed Today"),
                            ("distribution.unallocated", "Unallocated"),
                        ]),
                    )?
                );
            }
        }
        Ok(())
    }
}
