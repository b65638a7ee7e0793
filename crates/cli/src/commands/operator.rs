/// Operator commands.
#[derive(Debug, clap::Args)]
pub struct Operator {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Close the month of the operator account.
    RollOverMonth,
    /// Apply deferred postings.
    RetryUnsettled,
}

impl super::Command for Operator {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let ledger = ctx.ledger()?;
        match &self.command {
            Command::RollOverMonth => {
                let closed = ledger.roll_over_month()?;
                println!("closed monthly profit of {closed}");
            }
            Command::RetryUnsettled => {
                let settled = ledger.retry_unsettled()?;
                let remaining = ledger.unsettled().len();
                println!("settled {settled}, remaining {remaining}");
            }
        }
        Ok(())
    }
}
