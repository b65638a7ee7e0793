use rewardnet_ledger::{DecisionReport, TaskCompletion, Unsettled};
use rewardnet_model::{
    Account, DistributionReport, LedgerEntry, OperatorAccount, OperatorEntry, Request,
    RequestPayload, Task,
};
use serde::Serialize;

use crate::config::DisplayOptions;

fn fmt_time(at: time::OffsetDateTime) -> String {
    at.format(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]"
    ))
    .unwrap_or_else(|_| at.to_string())
}

#[derive(Serialize)]
pub(super) struct AccountView {
    id: u64,
    handle: String,
    contact: String,
    referral_code: String,
    referrer: Option<u64>,
    balance: String,
    pending_commission: String,
    bonus_balance: String,
    withdrawal_balance: String,
    daily_task_limit: u32,
    tasks_completed_today: u32,
    plan_active: bool,
    created_at: String,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id().get(),
            handle: account.handle().to_string(),
            contact: account.contact().to_string(),
            referral_code: account.referral_code().to_string(),
            referrer: account.referrer().map(|id| id.get()),
            balance: account.balance().to_string(),
            pending_commission: account.pending_commission().to_string(),
            bonus_balance: account.bonus_balance().to_string(),
            withdrawal_balance: account.withdrawal_balance().to_string(),
            daily_task_limit: account.daily_task_limit(),
            tasks_completed_today: account.tasks_completed_today(),
            plan_active: account.is_plan_active(),
            created_at: fmt_time(account.created_at()),
        }
    }
}

impl AccountView {
    pub(super) fn list_options() -> DisplayOptions {
        DisplayOptions::table_projection([
            ("id", "ID"),
            ("handle", "Handle"),
            ("referral_code", "Code"),
            ("referrer", "Referrer"),
            ("balance", "Balance"),
            ("pending_commission", "Pending"),
            ("plan_active", "Active"),
        ])
    }
}

#[derive(Serialize)]
pub(super) struct EntryView {
    at: String,
    kind: String,
    amount: String,
    description: String,
}

impl From<&LedgerEntry> for EntryView {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            at: fmt_time(entry.at),
            kind: entry.kind.to_string(),
            amount: entry.amount.to_string(),
            description: entry.description.clone(),
        }
    }
}

impl From<&OperatorEntry> for EntryView {
    fn from(entry: &OperatorEntry) -> Self {
        Self {
            at: fmt_time(entry.at),
            kind: entry.kind.to_string(),
            amount: entry.amount.to_string(),
            description: entry.description.clone(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct OperatorView {
    total_profit: String,
    monthly_profit: String,
    transactions: usize,
}

impl From<&OperatorAccount> for OperatorView {
    fn from(operator: &OperatorAccount) -> Self {
        Self {
            total_profit: operator.total_profit().to_string(),
            monthly_profit: operator.monthly_profit().to_string(),
            transactions: operator.transactions().len(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct RequestView {
    id: u64,
    member: u64,
    kind: String,
    amount: String,
    evidence: Option<String>,
    detail: String,
    status: String,
    submitted_at: String,
    feedback: Option<String>,
}

impl From<&Request> for RequestView {
    fn from(request: &Request) -> Self {
        let detail = match request.payload() {
            RequestPayload::TrainingBonus => String::new(),
            RequestPayload::PlanPayment(terms) => format!(
                "{} ({} tasks/day, bonuses {}/{})",
                terms.name, terms.daily_task_limit, terms.direct_bonus, terms.indirect_bonus
            ),
            RequestPayload::Withdrawal(payout) => format!(
                "{}: {} {}",
                payout.method, payout.account_name, payout.account_number
            ),
        };
        Self {
            id: request.id().get(),
            member: request.member().get(),
            kind: request.kind().to_string(),
            amount: request.amount().to_string(),
            evidence: request.evidence().map(|evidence| evidence.to_string()),
            detail,
            status: request.status().to_string(),
            submitted_at: fmt_time(request.submitted_at()),
            feedback: request.feedback().map(str::to_string),
        }
    }
}

#[derive(Serialize)]
pub(super) struct TaskView {
    id: u64,
    reward: String,
    redirect: String,
    completions: u64,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().get(),
            reward: task.reward().to_string(),
            redirect: task.redirect().to_string(),
            completions: task.completions(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct ShareView {
    level: u8,
    referrer: Option<u64>,
    amount: String,
    outcome: String,
}

#[derive(Serialize)]
pub(super) struct DistributionView {
    event: String,
    source: u64,
    amount: String,
    source_credit: String,
    shares: Vec<ShareView>,
    operator_residual: String,
    unallocated: String,
}

impl From<&DistributionReport> for DistributionView {
    fn from(report: &DistributionReport) -> Self {
        Self {
            event: report.event().to_string(),
            source: report.source().get(),
            amount: report.amount().to_string(),
            source_credit: report.source_credit().to_string(),
            shares: report
                .shares()
                .iter()
                .map(|share| ShareView {
                    level: share.level(),
                    referrer: share.referrer().map(|id| id.get()),
                    amount: share.amount().to_string(),
                    outcome: share.outcome().to_string(),
                })
                .collect(),
            operator_residual: report.operator_residual().to_string(),
            unallocated: report.unallocated().to_string(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct CompletionView {
    task: u64,
    pending_credit: String,
    completed_today: u32,
    distribution: Option<DistributionView>,
}

impl From<&TaskCompletion> for CompletionView {
    fn from(completion: &TaskCompletion) -> Self {
        Self {
            task: completion.task().id().get(),
            pending_credit: completion.pending_credit().to_string(),
            completed_today: completion.completed_today(),
            distribution: completion.distribution().map(DistributionView::from),
        }
    }
}

#[derive(Serialize)]
pub(super) struct DecisionView {
    request: RequestView,
    distribution: Option<DistributionView>,
}

impl From<&DecisionReport> for DecisionView {
    fn from(report: &DecisionReport) -> Self {
        Self {
            request: RequestView::from(report.request()),
            distribution: report.distribution().map(DistributionView::from),
        }
    }
}

#[derive(Serialize)]
pub(super) struct UnsettledView {
    kind: &'static str,
    member: Option<u64>,
    amount: String,
    detail: String,
}

impl From<&Unsettled> for UnsettledView {
    fn from(entry: &Unsettled) -> Self {
        match entry {
            Unsettled::TaskCommission {
                member,
                reward,
                event,
                ..
            } => Self {
                kind: "task_commission",
                member: Some(member.get()),
                amount: reward.to_string(),
                detail: format!("event #{event}"),
            },
            Unsettled::Operator { posting } => Self {
                kind: "operator",
                member: None,
                amount: posting.amount.to_string(),
                detail: posting.description.clone(),
            },
        }
    }
}
