use rewardnet_model::{AccountId, Amount, PayoutDetails};

use super::view::{AccountView, RequestView};
use crate::config::DisplayOptions;

/// Create a member account.
#[derive(Debug, clap::Args)]
pub struct Signup {
    /// Unique handle.
    handle: String,
    /// Contact address notifications are sent to.
    #[arg(long)]
    contact: String,
    /// Referral code of the referrer.
    #[arg(long)]
    code: Option<String>,
}

impl super::Command for Signup {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let ledger = ctx.ledger()?;
        let account = ledger.signup(&self.handle, &self.contact, self.code.as_deref())?;
        println!(
            "{}",
            ctx.output()
                .display_one(AccountView::from(&account), DisplayOptions::default())?
        );
        Ok(())
    }
}

/// Remove a member account.
#[derive(Debug, clap::Args)]
pub struct RemoveAccount {
    member: AccountId,
}

impl super::Command for RemoveAccount {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let removed = ctx.ledger()?.remove_account(self.member)?;
        println!("removed {} ({})", removed.id(), removed.handle());
        Ok(())
    }
}

/// Request a withdrawal.
#[derive(Debug, clap::Args)]
pub struct Withdraw {
    member: AccountId,
    amount: Amount,
    /// Payout method.
    #[arg(long)]
    method: String,
    /// Name of the payout account holder.
    #[arg(long)]
    account_name: String,
    /// Payout account number.
    #[arg(long)]
    account_number: String,
}

impl super::Command for Withdraw {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let request = ctx.ledger()?.request_withdrawal(
            self.member,
            self.amount,
            PayoutDetails {
                method: self.method.clone(),
                account_name: self.account_name.clone(),
                account_number: self.account_number.clone(),
            },
        )?;
        println!(
            "{}",
            ctx.output()
                .display_one(RequestView::from(&request), DisplayOptions::default())?
        );
        Ok(())
    }
}

/// Release the pending commission of a member.
#[derive(Debug, clap::Args)]
pub struct Release {
    member: AccountId,
}

impl super::Command for Release {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let released = ctx.ledger()?.release_pending_commission(self.member)?;
        if released.is_zero() {
            println!("nothing to release");
        } else {
            println!("released {released}");
        }
        Ok(())
    }
}

/// Claim a monthly salary.
#[derive(Debug, clap::Args)]
pub struct ClaimSalary {
    member: AccountId,
    /// Salary tier.
    #[arg(long)]
    tier: u32,
}

impl super::Command for ClaimSalary {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let claim = ctx.ledger()?.claim_salary(self.member, self.tier)?;
        println!(
            "credited tier {} salary of {} (direct={}, indirect={})",
            claim.tier(),
            claim.amount(),
            claim.counts().direct,
            claim.counts().indirect,
        );
        if !claim.is_settled() {
            tracing::warn!("operator payout deferred, run `operator retry-unsettled`");
        }
        Ok(())
    }
}
