use std::{collections::HashMap, fmt};

use time::{Date, OffsetDateTime};

use crate::{
    amount::{Amount, SignedAmount},
    eligibility,
    request::RequestId,
};

/// Account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AccountId(u64);

impl AccountId {
    /// Create from raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| crate::Error::InvalidArgument("account id must be a number"))
    }
}

/// The event a posting belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EventRef {
    /// A decision on an approval request.
    Request(RequestId),
    /// A direct event (task completion, salary claim, ...).
    Event(u64),
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(id) => write!(f, "request {id}"),
            Self::Event(id) => write!(f, "event {id}"),
        }
    }
}

/// The leg of an event a posting represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Leg {
    /// Credit of the source account.
    Source,
    /// Share of the referrer at the given level.
    Referrer(u8),
    /// Operator residual or payout.
    Operator,
    /// Plan activation of the member.
    Activation,
    /// Settlement of a withdrawal.
    Settlement,
}

/// Unique reference of a posting.
///
/// An account never applies two postings with the same reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PostingRef {
    /// Event.
    pub event: EventRef,
    /// Leg.
    pub leg: Leg,
}

impl PostingRef {
    /// Create a new reference.
    pub fn new(event: EventRef, leg: Leg) -> Self {
        Self { event, leg }
    }
}

/// Kind of a member ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntryKind {
    /// Referral bonus credited to the balance.
    ReferralBonus,
    /// Task reward credited to the pending commission.
    TaskCommission,
    /// Pending commission released to the balance.
    CommissionReleased,
    /// Withdrawal paid out.
    Withdrawal,
    /// Training bonus.
    TrainingBonus,
    /// Monthly salary.
    Salary,
    /// Plan activated.
    PlanActivated,
}

/// An entry of the transaction history of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerEntry {
    /// Kind.
    pub kind: EntryKind,
    /// Signed amount.
    pub amount: SignedAmount,
    /// Description.
    pub description: String,
    /// Time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub at: OffsetDateTime,
    /// Reference.
    pub reference: Option<PostingRef>,
}

/// A balance effect applied to a member account.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Effect {
    /// Credit `balance` and `bonus_balance`.
    ReferralBonus(Amount),
    /// Credit `pending_commission`.
    PendingCommission(Amount),
    /// Move the whole `pending_commission` into `balance`.
    ReleaseCommission,
    /// Debit `balance` and record the paid out amount in `withdrawal_balance`.
    Withdrawal(Amount),
    /// Credit `balance` and `bonus_balance`.
    TrainingBonus(Amount),
    /// Credit `balance`.
    Salary(Amount),
    /// Raise the daily task limit and stamp the activation time.
    PlanActivation {
        /// Additional daily tasks.
        daily_task_limit: u32,
    },
}

/// A posting to a member account.
#[derive(Debug, Clone)]
pub struct Posting {
    /// Reference used for deduplication.
    pub reference: Option<PostingRef>,
    /// Effect.
    pub effect: Effect,
    /// Description.
    pub description: String,
    /// Time.
    pub at: OffsetDateTime,
}

impl Posting {
    /// Create a new posting.
    pub fn new(
        reference: Option<PostingRef>,
        effect: Effect,
        description: impl Into<String>,
        at: OffsetDateTime,
    ) -> Self {
        Self {
            reference,
            effect,
            description: description.into(),
            at,
        }
    }
}

/// Outcome of applying a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The posting was applied, changing the ledger by the given amount.
    New(SignedAmount),
    /// A posting with the same reference has already been applied.
    Duplicate,
}

impl Applied {
    /// Returns whether the posting has already been applied before.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Parameters of a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Unique handle.
    pub handle: String,
    /// Contact info.
    pub contact: String,
    /// Own referral code.
    pub referral_code: String,
    /// The referrer.
    pub referrer: Option<AccountId>,
    /// Creation time.
    pub created_at: OffsetDateTime,
}

/// Member account.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
    id: AccountId,
    version: u64,
    handle: String,
    contact: String,
    referral_code: String,
    referrer: Option<AccountId>,
    balance: Amount,
    withdrawal_balance: Amount,
    bonus_balance: Amount,
    pending_commission: Amount,
    daily_task_limit: u32,
    tasks_completed_today: u32,
    last_completed_date: Option<Date>,
    last_salary_claim_date: Option<Date>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339::option"))]
    plan_activation_date: Option<OffsetDateTime>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    created_at: OffsetDateTime,
    history: Journal<LedgerEntry>,
}

impl Account {
    /// Create a new account record.
    pub fn new(id: AccountId, params: NewAccount) -> Self {
        Self {
            id,
            version: 0,
            handle: params.handle,
            contact: params.contact,
            referral_code: params.referral_code,
            referrer: params.referrer,
            balance: Amount::ZERO,
            withdrawal_balance: Amount::ZERO,
            bonus_balance: Amount::ZERO,
            pending_commission: Amount::ZERO,
            daily_task_limit: 0,
            tasks_completed_today: 0,
            last_completed_date: None,
            last_salary_claim_date: None,
            plan_activation_date: None,
            created_at: params.created_at,
            history: Journal::default(),
        }
    }

    /// Get the id.
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Get the version.
    ///
    /// Stores increment the version on every committed update.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Increment the version.
    pub fn increment_version(&mut self) -> crate::Result<()> {
        self.version = self.version.checked_add(1).ok_or(crate::Error::Overflow)?;
        Ok(())
    }

    /// Get the handle.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Get the contact info.
    pub fn contact(&self) -> &str {
        &self.contact
    }

    /// Get the referral code of this account.
    pub fn referral_code(&self) -> &str {
        &self.referral_code
    }

    /// Get the referrer.
    pub fn referrer(&self) -> Option<AccountId> {
        self.referrer
    }

    /// Get spendable balance.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Get total withdrawn amount.
    pub fn withdrawal_balance(&self) -> Amount {
        self.withdrawal_balance
    }

    /// Get bonus balance.
    pub fn bonus_balance(&self) -> Amount {
        self.bonus_balance
    }

    /// Get pending commission.
    pub fn pending_commission(&self) -> Amount {
        self.pending_commission
    }

    /// Get daily task limit.
    pub fn daily_task_limit(&self) -> u32 {
        self.daily_task_limit
    }

    /// Get the number of tasks completed on [`last_completed_date`](Self::last_completed_date).
    pub fn tasks_completed_today(&self) -> u32 {
        self.tasks_completed_today
    }

    /// Get the date of the last completed task.
    pub fn last_completed_date(&self) -> Option<Date> {
        self.last_completed_date
    }

    /// Get the date of the last salary claim.
    pub fn last_salary_claim_date(&self) -> Option<Date> {
        self.last_salary_claim_date
    }

    /// Get the plan activation time.
    pub fn plan_activation_date(&self) -> Option<OffsetDateTime> {
        self.plan_activation_date
    }

    /// Get creation time.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Get the transaction history.
    pub fn history(&self) -> &[LedgerEntry] {
        self.history.entries()
    }

    /// Returns whether the plan of this account is active.
    pub fn is_plan_active(&self) -> bool {
        self.daily_task_limit > 0
    }

    /// Returns whether a posting with the given reference has been applied.
    pub fn has_posting(&self, reference: &PostingRef) -> bool {
        self.history.contains(reference)
    }

    /// Count a task completion on `today`, enforcing the daily task cap.
    ///
    /// Returns the number of tasks completed today including this one.
    pub fn record_task_completion(&mut self, today: Date) -> crate::Result<u32> {
        let completed = eligibility::check_daily_task_cap(self, today)?;
        let completed = completed.checked_add(1).ok_or(crate::Error::Overflow)?;
        self.tasks_completed_today = completed;
        self.last_completed_date = Some(today);
        Ok(completed)
    }

    /// Stamp the salary claim date.
    pub fn record_salary_claim(&mut self, today: Date) {
        self.last_salary_claim_date = Some(today);
    }

    /// Apply a posting.
    ///
    /// Returns [`Applied::Duplicate`] without touching the account if a posting
    /// with the same reference has already been applied.
    pub fn apply(&mut self, posting: Posting) -> crate::Result<Applied> {
        if let Some(reference) = posting.reference.as_ref() {
            if self.has_posting(reference) {
                return Ok(Applied::Duplicate);
            }
        }
        let (kind, amount) = match posting.effect {
            Effect::ReferralBonus(amount) => {
                self.balance = add(&self.balance, &amount)?;
                self.bonus_balance = add(&self.bonus_balance, &amount)?;
                (EntryKind::ReferralBonus, amount.to_signed()?)
            }
            Effect::PendingCommission(amount) => {
                self.pending_commission = add(&self.pending_commission, &amount)?;
                (EntryKind::TaskCommission, amount.to_signed()?)
            }
            Effect::ReleaseCommission => {
                let amount = self.pending_commission;
                self.balance = add(&self.balance, &amount)?;
                self.pending_commission = Amount::ZERO;
                (EntryKind::CommissionReleased, amount.to_signed()?)
            }
            Effect::Withdrawal(amount) => {
                self.balance =
                    self.balance
                        .checked_sub(&amount)
                        .ok_or(crate::Error::InsufficientBalance {
                            required: amount,
                            available: self.balance,
                        })?;
                self.withdrawal_balance = add(&self.withdrawal_balance, &amount)?;
                (EntryKind::Withdrawal, amount.to_opposite_signed()?)
            }
            Effect::TrainingBonus(amount) => {
                self.balance = add(&self.balance, &amount)?;
                self.bonus_balance = add(&self.bonus_balance, &amount)?;
                (EntryKind::TrainingBonus, amount.to_signed()?)
            }
            Effect::Salary(amount) => {
                self.balance = add(&self.balance, &amount)?;
                (EntryKind::Salary, amount.to_signed()?)
            }
            Effect::PlanActivation { daily_task_limit } => {
                self.daily_task_limit = self
                    .daily_task_limit
                    .checked_add(daily_task_limit)
                    .ok_or(crate::Error::Overflow)?;
                self.plan_activation_date = Some(posting.at);
                (EntryKind::PlanActivated, SignedAmount::ZERO)
            }
        };
        self.history.push(LedgerEntry {
            kind,
            amount,
            description: posting.description,
            at: posting.at,
            reference: posting.reference,
        });
        Ok(Applied::New(amount))
    }
}

fn add(lhs: &Amount, rhs: &Amount) -> crate::Result<Amount> {
    lhs.checked_add(rhs).ok_or(crate::Error::Overflow)
}

/// Kind of an operator ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OperatorEntryKind {
    /// Residual of a commission split.
    CommissionResidual,
    /// Withdrawal payout.
    WithdrawalPayout,
    /// Training bonus payout.
    TrainingBonusPayout,
    /// Salary payout.
    SalaryPayout,
    /// Monthly profit closed.
    MonthClosed,
}

/// An entry of the operator transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatorEntry {
    /// Kind.
    pub kind: OperatorEntryKind,
    /// Signed amount.
    pub amount: SignedAmount,
    /// Description.
    pub description: String,
    /// Time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub at: OffsetDateTime,
    /// Reference.
    pub reference: Option<PostingRef>,
}

/// A posting to the operator account.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatorPosting {
    /// Reference used for deduplication.
    pub reference: Option<PostingRef>,
    /// Kind.
    pub kind: OperatorEntryKind,
    /// Signed amount added to the profits.
    pub amount: SignedAmount,
    /// Description.
    pub description: String,
    /// Time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub at: OffsetDateTime,
}

/// The platform operator account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatorAccount {
    version: u64,
    total_profit: SignedAmount,
    monthly_profit: SignedAmount,
    transactions: Journal<OperatorEntry>,
}

impl OperatorAccount {
    /// Get the version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Increment the version.
    pub fn increment_version(&mut self) -> crate::Result<()> {
        self.version = self.version.checked_add(1).ok_or(crate::Error::Overflow)?;
        Ok(())
    }

    /// Get total profit.
    pub fn total_profit(&self) -> SignedAmount {
        self.total_profit
    }

    /// Get profit of the current month.
    pub fn monthly_profit(&self) -> SignedAmount {
        self.monthly_profit
    }

    /// Get the transaction log.
    pub fn transactions(&self) -> &[OperatorEntry] {
        self.transactions.entries()
    }

    /// Returns whether a posting with the given reference has been applied.
    pub fn has_posting(&self, reference: &PostingRef) -> bool {
        self.transactions.contains(reference)
    }

    /// Get the entry of the posting with the given reference.
    pub fn posting(&self, reference: &PostingRef) -> Option<&OperatorEntry> {
        self.transactions.get(reference)
    }

    /// Apply a posting to both profit counters.
    pub fn apply(&mut self, posting: OperatorPosting) -> crate::Result<Applied> {
        if let Some(reference) = posting.reference.as_ref() {
            if self.has_posting(reference) {
                return Ok(Applied::Duplicate);
            }
        }
        self.total_profit = self
            .total_profit
            .checked_add(&posting.amount)
            .ok_or(crate::Error::Overflow)?;
        self.monthly_profit = self
            .monthly_profit
            .checked_add(&posting.amount)
            .ok_or(crate::Error::Overflow)?;
        self.transactions.push(OperatorEntry {
            kind: posting.kind,
            amount: posting.amount,
            description: posting.description,
            at: posting.at,
            reference: posting.reference,
        });
        Ok(Applied::New(posting.amount))
    }

    /// Close the current month, resetting the monthly profit.
    ///
    /// Returns the closed monthly profit.
    pub fn close_month(&mut self, at: OffsetDateTime) -> SignedAmount {
        let closed = std::mem::take(&mut self.monthly_profit);
        self.transactions.push(OperatorEntry {
            kind: OperatorEntryKind::MonthClosed,
            amount: closed,
            description: format!("monthly profit closed at {closed}"),
            at,
            reference: None,
        });
        closed
    }
}

/// Entries carrying an optional posting reference.
trait Referenced {
    fn reference(&self) -> Option<&PostingRef>;
}

impl Referenced for LedgerEntry {
    fn reference(&self) -> Option<&PostingRef> {
        self.reference.as_ref()
    }
}

impl Referenced for OperatorEntry {
    fn reference(&self) -> Option<&PostingRef> {
        self.reference.as_ref()
    }
}

/// Append-only entry log indexed by posting reference.
///
/// Only the entries are serialized. The index is rebuilt on deserialization.
#[derive(Debug, Clone)]
struct Journal<E> {
    entries: Vec<E>,
    index: HashMap<PostingRef, usize>,
}

impl<E> Default for Journal<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<E: Referenced> Journal<E> {
    fn from_entries(entries: Vec<E>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| entry.reference().map(|r| (*r, position)))
            .collect();
        Self { entries, index }
    }

    fn entries(&self) -> &[E] {
        &self.entries
    }

    fn contains(&self, reference: &PostingRef) -> bool {
        self.index.contains_key(reference)
    }

    fn get(&self, reference: &PostingRef) -> Option<&E> {
        self.index
            .get(reference)
            .and_then(|position| self.entries.get(*position))
    }

    fn push(&mut self, entry: E) {
        if let Some(reference) = entry.reference() {
            self.index.insert(*reference, self.entries.len());
        }
        self.entries.push(entry);
    }
}

impl<E: PartialEq> PartialEq for Journal<E> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<E: Eq> Eq for Journal<E> {}

#[cfg(feature = "serde")]
impl<E: serde::Serialize> serde::Serialize for Journal<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.entries.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, E> serde::Deserialize<'de> for Journal<E>
where
    E: serde::Deserialize<'de> + Referenced,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<E>::deserialize(deserializer).map(Self::from_entries)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    fn account() -> Account {
        Account::new(
            AccountId::new(1),
            NewAccount {
                handle: "alice".to_string(),
                contact: "alice@example.com".to_string(),
                referral_code: "ALICE001".to_string(),
                referrer: None,
                created_at: datetime!(2024-01-01 0:00 UTC),
            },
        )
    }

    #[test]
    fn duplicate_posting_is_ignored() -> crate::Result<()> {
        let mut account = account();
        let reference = PostingRef::new(EventRef::Event(7), Leg::Referrer(1));
        let posting = Posting::new(
            Some(reference),
            Effect::ReferralBonus(Amount::from_units(3)?),
            "level-1 referral bonus",
            datetime!(2024-01-02 10:00 UTC),
        );
        assert!(!account.apply(posting.clone())?.is_duplicate());
        assert!(account.apply(posting)?.is_duplicate());
        assert_eq!(account.balance(), Amount::from_units(3)?);
        assert_eq!(account.bonus_balance(), Amount::from_units(3)?);
        assert_eq!(account.history().len(), 1);
        Ok(())
    }

    #[test]
    fn references_are_indexed() -> crate::Result<()> {
        let mut account = account();
        let at = datetime!(2024-01-02 10:00 UTC);
        for event in 0..100 {
            account.apply(Posting::new(
                Some(PostingRef::new(EventRef::Event(event), Leg::Source)),
                Effect::PendingCommission(Amount::from_units(1)?),
                "task",
                at,
            ))?;
            account.apply(Posting::new(None, Effect::ReleaseCommission, "release", at))?;
        }
        assert!(account.has_posting(&PostingRef::new(EventRef::Event(0), Leg::Source)));
        assert!(account.has_posting(&PostingRef::new(EventRef::Event(99), Leg::Source)));
        assert!(!account.has_posting(&PostingRef::new(EventRef::Event(100), Leg::Source)));
        assert!(!account.has_posting(&PostingRef::new(EventRef::Event(0), Leg::Referrer(1))));
        assert_eq!(account.balance(), Amount::from_units(100)?);

        let mut operator = OperatorAccount::default();
        let reference = PostingRef::new(EventRef::Event(3), Leg::Operator);
        operator.apply(OperatorPosting {
            reference: Some(reference),
            kind: OperatorEntryKind::CommissionResidual,
            amount: SignedAmount::from_minor(250),
            description: "residual".to_string(),
            at,
        })?;
        operator.close_month(at);
        assert_eq!(
            operator.posting(&reference).map(|entry| entry.amount),
            Some(SignedAmount::from_minor(250))
        );
        assert!(operator.posting(&PostingRef::new(EventRef::Event(4), Leg::Operator)).is_none());
        Ok(())
    }

    #[test]
    fn withdrawal_requires_balance() -> crate::Result<()> {
        let mut account = account();
        let at = datetime!(2024-01-02 10:00 UTC);
        account.apply(Posting::new(
            None,
            Effect::Salary(Amount::from_units(10)?),
            "salary",
            at,
        ))?;
        let err = account
            .apply(Posting::new(
                None,
                Effect::Withdrawal(Amount::from_units(11)?),
                "withdrawal",
                at,
            ))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InsufficientBalance);
        account.apply(Posting::new(
            None,
            Effect::Withdrawal(Amount::from_units(4)?),
            "withdrawal",
            at,
        ))?;
        assert_eq!(account.balance(), Amount::from_units(6)?);
        assert_eq!(account.withdrawal_balance(), Amount::from_units(4)?);
        assert_eq!(account.history()[1].amount.minor(), -400);
        Ok(())
    }

    #[test]
    fn release_moves_pending_commission() -> crate::Result<()> {
        let mut account = account();
        let at = datetime!(2024-01-02 10:00 UTC);
        account.apply(Posting::new(
            None,
            Effect::PendingCommission(Amount::from_units(100)?),
            "task",
            at,
        ))?;
        let released = account.apply(Posting::new(None, Effect::ReleaseCommission, "release", at))?;
        assert_eq!(released, Applied::New(SignedAmount::from_minor(10_000)));
        assert_eq!(account.balance(), Amount::from_units(100)?);
        assert_eq!(account.pending_commission(), Amount::ZERO);
        Ok(())
    }

    #[test]
    fn task_completion_resets_on_new_day() -> crate::Result<()> {
        let mut account = account();
        account.apply(Posting::new(
            None,
            Effect::PlanActivation { daily_task_limit: 2 },
            "plan",
            datetime!(2024-01-01 9:00 UTC),
        ))?;
        assert_eq!(account.record_task_completion(date!(2024 - 01 - 02))?, 1);
        assert_eq!(account.record_task_completion(date!(2024 - 01 - 02))?, 2);
        assert!(account.record_task_completion(date!(2024 - 01 - 02)).is_err());
        assert_eq!(account.record_task_completion(date!(2024 - 01 - 03))?, 1);
        Ok(())
    }

    #[test]
    fn operator_close_month() -> crate::Result<()> {
        let mut operator = OperatorAccount::default();
        let at = datetime!(2024-01-31 23:00 UTC);
        operator.apply(OperatorPosting {
            reference: None,
            kind: OperatorEntryKind::CommissionResidual,
            amount: SignedAmount::from_minor(93_000),
            description: "residual".to_string(),
            at,
        })?;
        assert_eq!(operator.close_month(at), SignedAmount::from_minor(93_000));
        assert_eq!(operator.monthly_profit(), SignedAmount::ZERO);
        assert_eq!(operator.total_profit(), SignedAmount::from_minor(93_000));
        Ok(())
    }
}
