use time::{UtcOffset, Weekday};
use typed_builder::TypedBuilder;

use crate::{
    amount::{Amount, Factor},
    request::PlanTerms,
};

/// How the share of a referrer is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Share {
    /// A fraction of the distributed amount.
    Factor(Factor),
    /// A fixed amount.
    Fixed(Amount),
}

impl Share {
    /// Get the share of the given amount.
    pub fn of(&self, amount: &Amount) -> crate::Result<Amount> {
        match self {
            Self::Factor(factor) => factor
                .apply(amount)
                .ok_or(crate::Error::Computation("applying share factor")),
            Self::Fixed(fixed) => Ok(*fixed),
        }
    }
}

/// What the source account of a distribution is credited with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCredit {
    /// Nothing.
    None,
    /// The full amount, to its pending commission.
    PendingCommission,
}

/// Where the part of the amount not credited to referrers goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidualTarget {
    /// To the operator profits.
    Operator,
    /// Nowhere. The referrer shares are funded on top of the amount.
    Unallocated,
}

/// Split rule of a commission cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct SplitRule {
    level_1: Share,
    level_2: Share,
    #[builder(default = SourceCredit::None)]
    source: SourceCredit,
    #[builder(default = ResidualTarget::Operator)]
    residual: ResidualTarget,
}

impl SplitRule {
    /// Rule of a task completion.
    pub fn task(split: &TaskSplit) -> Self {
        Self {
            level_1: Share::Factor(split.level_1),
            level_2: Share::Factor(split.level_2),
            source: SourceCredit::PendingCommission,
            residual: ResidualTarget::Unallocated,
        }
    }

    /// Rule of a plan purchase.
    pub fn plan(terms: &PlanTerms) -> Self {
        Self {
            level_1: Share::Fixed(terms.direct_bonus),
            level_2: Share::Fixed(terms.indirect_bonus),
            source: SourceCredit::None,
            residual: ResidualTarget::Operator,
        }
    }

    /// Get the share of the given level (1 or 2).
    pub fn share(&self, level: u8) -> Option<&Share> {
        match level {
            1 => Some(&self.level_1),
            2 => Some(&self.level_2),
            _ => None,
        }
    }

    /// Get the source credit.
    pub fn source(&self) -> SourceCredit {
        self.source
    }

    /// Get the residual target.
    pub fn residual(&self) -> ResidualTarget {
        self.residual
    }
}

/// Referral split of task rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct TaskSplit {
    level_1: Factor,
    level_2: Factor,
}

impl Default for TaskSplit {
    fn default() -> Self {
        Self {
            level_1: Factor::from_bps_unchecked(300),
            level_2: Factor::from_bps_unchecked(100),
        }
    }
}

impl TaskSplit {
    /// Get the level-1 factor.
    pub fn level_1(&self) -> Factor {
        self.level_1
    }

    /// Get the level-2 factor.
    pub fn level_2(&self) -> Factor {
        self.level_2
    }
}

/// When withdrawals may be requested, in local time.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct WithdrawalWindow {
    #[builder(default = vec![Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday, Weekday::Thursday])]
    days: Vec<Weekday>,
    #[builder(default = 10)]
    start_hour: u8,
    #[builder(default = 17)]
    end_hour: u8,
}

impl Default for WithdrawalWindow {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl WithdrawalWindow {
    /// Get the open days.
    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    /// Get the first open hour.
    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    /// Get the hour the window closes at (exclusive).
    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    /// Returns whether the window is open on the given day and hour.
    pub fn is_open(&self, day: Weekday, hour: u8) -> bool {
        self.days.contains(&day) && (self.start_hour..self.end_hour).contains(&hour)
    }
}

/// A salary tier.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SalaryTier {
    /// Tier id.
    pub id: u32,
    /// Required direct referrals with an active plan.
    pub direct_referrals: u32,
    /// Required indirect referrals with an active plan.
    pub indirect_referrals: u32,
    /// Monthly salary.
    pub amount: Amount,
}

/// Parameters of the ledger.
#[derive(Debug, Clone, TypedBuilder)]
pub struct LedgerParams {
    #[builder(default)]
    task_split: TaskSplit,
    #[builder(default)]
    withdrawal_window: WithdrawalWindow,
    #[builder(default)]
    salary_tiers: Vec<SalaryTier>,
    /// Offset of the local time used by the eligibility rules.
    #[builder(default = UtcOffset::UTC)]
    utc_offset: UtcOffset,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LedgerParams {
    /// Get the task split.
    pub fn task_split(&self) -> &TaskSplit {
        &self.task_split
    }

    /// Get the withdrawal window.
    pub fn withdrawal_window(&self) -> &WithdrawalWindow {
        &self.withdrawal_window
    }

    /// Get the salary tiers.
    pub fn salary_tiers(&self) -> &[SalaryTier] {
        &self.salary_tiers
    }

    /// Get the salary tier with the given id.
    pub fn salary_tier(&self, id: u32) -> crate::Result<&SalaryTier> {
        self.salary_tiers
            .iter()
            .find(|tier| tier.id == id)
            .ok_or_else(|| crate::Error::NotFound(crate::Entity::SalaryTier, id.to_string()))
    }

    /// Get the local time offset.
    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }
}
