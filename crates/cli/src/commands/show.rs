use rewardnet_model::{AccountId, RequestKind};

use super::view::{AccountView, EntryView, OperatorView, RequestView, TaskView, UnsettledView};
use crate::config::DisplayOptions;

/// Show ledger data.
#[derive(Debug, clap::Args)]
pub struct Show {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Show a member account.
    Account {
        member: AccountId,
        /// Show the transaction history instead.
        #[arg(long)]
        history: bool,
    },
    /// List member accounts.
    Accounts,
    /// Show referral counts of a member.
    Referrals { member: AccountId },
    /// Show the operator account.
    Operator {
        /// Show the transactions instead.
        #[arg(long)]
        history: bool,
    },
    /// List requests.
    Requests {
        /// Only requests of this kind.
        #[arg(long)]
        kind: Option<RequestKind>,
        /// List decided requests instead of pending ones.
        #[arg(long)]
        decided: bool,
    },
    /// List tasks.
    Tasks,
    /// List deferred postings.
    Unsettled,
}

impl super::Command for Show {
    fn is_mutating(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let ledger = ctx.ledger()?;
        let output = ctx.output();
        let rendered = match &self.command {
            Command::Account { member, history } => {
                let account = ledger.account(*member)?;
                if *history {
                    output.display_many(
                        account.history().iter().map(EntryView::from),
                        DisplayOptions::default(),
                    )?
                } else {
                    output.display_one(AccountView::from(&account), DisplayOptions::default())?
                }
            }
            Command::Accounts => output.display_many(
                ledger.store().accounts().iter().map(AccountView::from),
                AccountView::list_options(),
            )?,
            Command::Referrals { member } => {
                output.display_one(ledger.referral_counts(*member)?, DisplayOptions::default())?
            }
            Command::Operator { history } => {
                let operator = ledger.operator()?;
                if *history {
                    output.display_many(
                        operator.transactions().iter().map(EntryView::from),
                        DisplayOptions::default(),
                    )?
                } else {
                    output.display_one(OperatorView::from(&operator), DisplayOptions::default())?
                }
            }
            Command::Requests { kind, decided } => {
                let requests: Vec<_> = if *decided {
                    ledger
                        .terminal_requests()
                        .into_iter()
                        .filter(|request| kind.map_or(true, |kind| request.kind() == kind))
                        .collect()
                } else {
                    ledger.pending_requests(*kind)
                };
                output.display_many(
                    requests.iter().map(RequestView::from),
                    DisplayOptions::table_projection([
                        ("id", "ID"),
                        ("member", "Member"),
                        ("kind", "Kind"),
                        ("amount", "Amount"),
                        ("evidence", "Evidence"),
                        ("status", "Status"),
                        ("submitted_at", "Submitted At"),
                    ]),
                )?
            }
            Command::Tasks => output.display_many(
                ledger.tasks()?.iter().map(TaskView::from),
                DisplayOptions::default(),
            )?,
            Command::Unsettled => output.display_many(
                ledger.unsettled().iter().map(UnsettledView::from),
                DisplayOptions::default(),
            )?,
        };
        println!("{rendered}");
        Ok(())
    }
}
