use rewardnet_model::{
    AccountId, Amount, Decision, EvidenceRef, PlanTerms, RequestId, RequestPayload,
};

use super::view::{DecisionView, RequestView};
use crate::config::DisplayOptions;

/// Submit a request for approval.
#[derive(Debug, clap::Args)]
pub struct Submit {
    #[command(subcommand)]
    command: SubmitCommand,
}

#[derive(Debug, clap::Subcommand)]
enum SubmitCommand {
    /// Training bonus.
    Training {
        member: AccountId,
        amount: Amount,
        /// Payment evidence reference.
        #[arg(long)]
        evidence: String,
    },
    /// Plan payment.
    Plan {
        member: AccountId,
        /// Plan price.
        amount: Amount,
        /// Payment evidence reference.
        #[arg(long)]
        evidence: String,
        /// Plan name.
        #[arg(long)]
        name: String,
        /// Daily tasks granted by the plan.
        #[arg(long)]
        daily_task_limit: u32,
        /// Bonus of the direct referrer.
        #[arg(long)]
        direct_bonus: Amount,
        /// Bonus of the indirect referrer.
        #[arg(long)]
        indirect_bonus: Amount,
    },
}

impl super::Command for Submit {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let ledger = ctx.ledger()?;
        let request = match &self.command {
            SubmitCommand::Training {
                member,
                amount,
                evidence,
            } => ledger.submit_request(
                *member,
                EvidenceRef::new(evidence.as_str())?,
                *amount,
                RequestPayload::TrainingBonus,
            )?,
            SubmitCommand::Plan {
                member,
                amount,
                evidence,
                name,
                daily_task_limit,
                direct_bonus,
                indirect_bonus,
            } => ledger.submit_request(
                *member,
                EvidenceRef::new(evidence.as_str())?,
                *amount,
                RequestPayload::PlanPayment(PlanTerms {
                    name: name.clone(),
                    daily_task_limit: *daily_task_limit,
                    direct_bonus: *direct_bonus,
                    indirect_bonus: *indirect_bonus,
                }),
            )?,
        };
        println!(
            "{}",
            ctx.output()
                .display_one(RequestView::from(&request), DisplayOptions::default())?
        );
        Ok(())
    }
}

/// Decide a pending request.
#[derive(Debug, clap::Args)]
pub struct Decide {
    #[command(subcommand)]
    command: DecideCommand,
}

#[derive(Debug, clap::Subcommand)]
enum DecideCommand {
    /// Approve the request and apply its effects.
    Approve { request: RequestId },
    /// Reject the request.
    Reject {
        request: RequestId,
        /// Feedback sent to the member.
        #[arg(long)]
        reason: String,
    },
}

impl super::Command for Decide {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let (request, decision) = match &self.command {
            DecideCommand::Approve { request } => (*request, Decision::Approve),
            DecideCommand::Reject { request, reason } => {
                (*request, Decision::reject(reason.as_str())?)
            }
        };
        let report = ctx.ledger()?.decide_request(request, decision)?;
        println!(
            "{}",
            ctx.output().display_one(
                DecisionView::from(&report),
                DisplayOptions::table_projection([
                    ("request.id", "Request"),
                    ("request.kind", "Kind"),
                    ("request.amount", "Amount"),
                    ("request.status", "Status"),
                    ("request.feedback", "Feedback"),
                    ("distribution.operator_residual", "Operator Residual"),
                ]),
            )?
        );
        Ok(())
    }
}
