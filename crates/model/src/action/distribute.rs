use time::OffsetDateTime;

use crate::{
    account::{
        Account, AccountId, Applied, Effect, EventRef, Leg, OperatorEntryKind, OperatorPosting,
        Posting, PostingRef,
    },
    amount::Amount,
    params::{ResidualTarget, SourceCredit, SplitRule},
    referral::{self, COMMISSION_LEVELS},
    store::{AccountStore, OperatorStore},
};

use super::LedgerAction;

type Admission<'a> = Box<dyn FnOnce(&mut Account) -> crate::Result<()> + 'a>;

/// Commission cascade.
///
/// Splits `amount` across the source account, its referral chain and the
/// operator according to a [`SplitRule`]. Every posting is tagged with a
/// [`PostingRef`] derived from the event, so executing the same distribution
/// again after a partial failure credits each party at most once.
///
/// Once the operator residual of the event is recorded the split is settled:
/// a later execution credits no referrer that was not credited before and
/// reports the recorded residual.
#[must_use = "actions do nothing unless you `execute` them"]
pub struct Distribute<'a, S> {
    store: &'a S,
    source: AccountId,
    amount: Amount,
    rule: SplitRule,
    event: EventRef,
    at: OffsetDateTime,
    admission: Option<Admission<'a>>,
}

impl<'a, S> Distribute<'a, S> {
    /// Create a new distribution.
    pub fn new(
        store: &'a S,
        source: AccountId,
        amount: Amount,
        rule: SplitRule,
        event: EventRef,
        at: OffsetDateTime,
    ) -> Self {
        Self {
            store,
            source,
            amount,
            rule,
            event,
            at,
            admission: None,
        }
    }

    /// Run `admission` against the source account in the same atomic update
    /// that credits it. A failing admission aborts the distribution before any
    /// other account is touched.
    ///
    /// The admission is skipped when the source credit has already been
    /// applied by a previous execution of the same event.
    pub fn with_admission(
        mut self,
        admission: impl FnOnce(&mut Account) -> crate::Result<()> + 'a,
    ) -> Self {
        self.admission = Some(Box::new(admission));
        self
    }
}

/// What happened to the share of one referral level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShareOutcome {
    /// Credited to the referrer.
    Credited,
    /// Not distributed because the referrer had no active plan when the split
    /// was settled.
    Inactive,
    /// Not distributed because there is no referrer at this level.
    NoReferrer,
    /// The share is zero.
    Empty,
}

/// Share report of one referral level.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShareReport {
    level: u8,
    referrer: Option<AccountId>,
    amount: Amount,
    outcome: ShareOutcome,
}

impl ShareReport {
    /// Get the level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Get the referrer.
    pub fn referrer(&self) -> Option<AccountId> {
        self.referrer
    }

    /// Get the computed share.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Get the outcome.
    pub fn outcome(&self) -> ShareOutcome {
        self.outcome
    }

    /// Get the amount actually credited.
    pub fn credited(&self) -> Amount {
        match self.outcome {
            ShareOutcome::Credited => self.amount,
            _ => Amount::ZERO,
        }
    }
}

/// Distribution report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionReport {
    event: EventRef,
    source: AccountId,
    amount: Amount,
    source_credit: Amount,
    shares: Vec<ShareReport>,
    operator_residual: Amount,
    unallocated: Amount,
}

impl DistributionReport {
    /// Get the event.
    pub fn event(&self) -> EventRef {
        self.event
    }

    /// Get the source account.
    pub fn source(&self) -> AccountId {
        self.source
    }

    /// Get the distributed amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Get the amount credited to the source account.
    pub fn source_credit(&self) -> Amount {
        self.source_credit
    }

    /// Get the share reports, level 1 first.
    pub fn shares(&self) -> &[ShareReport] {
        &self.shares
    }

    /// Get the share report of the given level.
    pub fn share(&self, level: u8) -> Option<&ShareReport> {
        self.shares.iter().find(|share| share.level == level)
    }

    /// Get the sum of credited referrer shares.
    pub fn distributed(&self) -> crate::Result<Amount> {
        self.shares.iter().try_fold(Amount::ZERO, |acc, share| {
            acc.checked_add(&share.credited())
                .ok_or(crate::Error::Overflow)
        })
    }

    /// Get the residual credited to the operator.
    pub fn operator_residual(&self) -> Amount {
        self.operator_residual
    }

    /// Get the part of the amount credited to nobody.
    pub fn unallocated(&self) -> Amount {
        self.unallocated
    }

    fn accounted(&self) -> crate::Result<Amount> {
        self.distributed()?
            .checked_add(&self.operator_residual)
            .and_then(|sum| sum.checked_add(&self.unallocated))
            .ok_or(crate::Error::Overflow)
    }
}

impl<S: AccountStore + OperatorStore> Distribute<'_, S> {
    fn reference(&self, leg: Leg) -> PostingRef {
        PostingRef::new(self.event, leg)
    }

    fn validate_shares(&self) -> crate::Result<[Amount; COMMISSION_LEVELS]> {
        let mut shares = [Amount::ZERO; COMMISSION_LEVELS];
        let mut total = Amount::ZERO;
        for (share, level) in shares.iter_mut().zip(1u8..) {
            let rule = self
                .rule
                .share(level)
                .ok_or(crate::Error::Computation("missing share rule"))?;
            *share = rule.of(&self.amount)?;
            total = total.checked_add(share).ok_or(crate::Error::Overflow)?;
        }
        if total > self.amount {
            return Err(crate::Error::InvalidArgument(
                "referral shares exceed the distributed amount",
            ));
        }
        Ok(shares)
    }

    fn credit_source(&mut self) -> crate::Result<Amount> {
        let admission = self.admission.take();
        let (credit, posting) = match self.rule.source() {
            SourceCredit::None => (Amount::ZERO, None),
            SourceCredit::PendingCommission => {
                let reference = self.reference(Leg::Source);
                let posting = Posting::new(
                    Some(reference),
                    Effect::PendingCommission(self.amount),
                    format!("commission of {}", self.event),
                    self.at,
                );
                (self.amount, Some((reference, posting)))
            }
        };
        if posting.is_none() && admission.is_none() {
            return Ok(credit);
        }
        self.store.update_account(self.source, |account| {
            if let Some((reference, posting)) = posting {
                if account.has_posting(&reference) {
                    return Ok(Applied::Duplicate);
                }
                if let Some(admit) = admission {
                    admit(account)?;
                }
                account.apply(posting)
            } else {
                if let Some(admit) = admission {
                    admit(account)?;
                }
                Ok(Applied::Duplicate)
            }
        })?;
        Ok(credit)
    }

    /// Get the operator residual recorded by a previous execution.
    fn recorded_residual(&self) -> crate::Result<Option<Amount>> {
        if !matches!(self.rule.residual(), ResidualTarget::Operator) {
            return Ok(None);
        }
        let operator = self.store.operator()?;
        let Some(entry) = operator.posting(&self.reference(Leg::Operator)) else {
            return Ok(None);
        };
        let minor = u64::try_from(entry.amount.minor())
            .map_err(|_| crate::Error::Computation("negative commission residual"))?;
        Ok(Some(Amount::from_minor(minor)))
    }

    fn credit_referrer(
        &self,
        level: u8,
        referrer: Option<&Account>,
        share: Amount,
        source: &Account,
        settled: bool,
    ) -> crate::Result<ShareReport> {
        let mut report = ShareReport {
            level,
            referrer: referrer.map(Account::id),
            amount: share,
            outcome: ShareOutcome::NoReferrer,
        };
        let Some(referrer) = referrer else {
            return Ok(report);
        };
        if share.is_zero() {
            report.outcome = ShareOutcome::Empty;
            return Ok(report);
        }
        let reference = self.reference(Leg::Referrer(level));
        let posting = Posting::new(
            Some(reference),
            Effect::ReferralBonus(share),
            format!(
                "level-{level} referral bonus from {} ({})",
                source.handle(),
                self.event
            ),
            self.at,
        );
        let result = self.store.update_account(referrer.id(), |account| {
            // The receiver must have an active plan, unless the share was
            // already credited by a previous attempt.
            if account.has_posting(&reference) {
                return Ok(ShareOutcome::Credited);
            }
            if settled || !account.is_plan_active() {
                return Ok(ShareOutcome::Inactive);
            }
            account.apply(posting)?;
            Ok(ShareOutcome::Credited)
        });
        report.outcome = match result {
            Ok((_, outcome)) => outcome,
            Err(crate::Error::NotFound(..)) => ShareOutcome::NoReferrer,
            Err(err) => return Err(err),
        };
        Ok(report)
    }
}

impl<S: AccountStore + OperatorStore> LedgerAction for Distribute<'_, S> {
    type Report = DistributionReport;

    fn execute(mut self) -> crate::Result<Self::Report> {
        if self.amount.is_zero() {
            return Err(crate::Error::InvalidArgument("empty distribution"));
        }
        let shares = self.validate_shares()?;

        let source_credit = self.credit_source()?;

        let recorded = self.recorded_residual()?;
        let source = self.store.account(self.source)?;
        let chain = referral::resolve_chain(self.store, &source)?;
        let mut reports = Vec::with_capacity(COMMISSION_LEVELS);
        for (share, level) in shares.into_iter().zip(1u8..) {
            reports.push(self.credit_referrer(
                level,
                chain.level(level),
                share,
                &source,
                recorded.is_some(),
            )?);
        }

        let mut report = DistributionReport {
            event: self.event,
            source: self.source,
            amount: self.amount,
            source_credit,
            shares: reports,
            operator_residual: Amount::ZERO,
            unallocated: Amount::ZERO,
        };

        let residual = match recorded {
            Some(recorded) => recorded,
            None => self
                .amount
                .checked_sub(&report.distributed()?)
                .ok_or(crate::Error::Computation("calculating residual"))?,
        };
        match self.rule.residual() {
            ResidualTarget::Operator => {
                if recorded.is_none() && !residual.is_zero() {
                    self.store.post_to_operator(OperatorPosting {
                        reference: Some(self.reference(Leg::Operator)),
                        kind: OperatorEntryKind::CommissionResidual,
                        amount: residual.to_signed()?,
                        description: format!("commission residual of {}", self.event),
                        at: self.at,
                    })?;
                }
                report.operator_residual = residual;
            }
            ResidualTarget::Unallocated => {
                report.unallocated = residual;
            }
        }

        let accounted = report.accounted()?;
        if accounted != self.amount {
            return Err(crate::Error::Conservation {
                amount: self.amount,
                accounted,
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        amount::Factor,
        params::{Share, TaskSplit},
        request::{PlanTerms, RequestId},
        test::TestStore,
        ErrorKind, OperatorStore,
    };

    use super::*;

    const AT: OffsetDateTime = datetime!(2024-03-05 11:00 UTC);

    fn units(units: u64) -> Amount {
        Amount::from_units(units).unwrap()
    }

    /// Member `m` with referrer `r1` whose referrer is `r2`.
    fn chain(store: &TestStore, r1_active: bool, r2_active: bool) -> crate::Result<[AccountId; 3]> {
        let r2 = store.signup("r2", None)?.id();
        let r1 = store.signup("r1", Some(r2))?.id();
        let m = store.signup("m", Some(r1))?.id();
        if r1_active {
            store.activate(r1, 10)?;
        }
        if r2_active {
            store.activate(r2, 10)?;
        }
        Ok([m, r1, r2])
    }

    #[test]
    fn task_completion_scenario() -> crate::Result<()> {
        let store = TestStore::default();
        let [m, r1, r2] = chain(&store, true, true)?;
        let report = Distribute::new(
            &store,
            m,
            units(100),
            SplitRule::task(&TaskSplit::default()),
            EventRef::Event(1),
            AT,
        )
        .execute()?;

        assert_eq!(store.account(r1)?.balance(), units(3));
        assert_eq!(store.account(r2)?.balance(), units(1));
        assert_eq!(store.account(m)?.pending_commission(), units(100));
        assert_eq!(store.operator()?.total_profit().minor(), 0);
        assert_eq!(report.source_credit(), units(100));
        assert_eq!(report.operator_residual(), Amount::ZERO);
        assert_eq!(report.unallocated(), units(96));
        Ok(())
    }

    #[test]
    fn plan_purchase_scenario() -> crate::Result<()> {
        let store = TestStore::default();
        let [m, r1, r2] = chain(&store, true, true)?;
        let terms = PlanTerms {
            name: "basic".to_string(),
            daily_task_limit: 5,
            direct_bonus: units(50),
            indirect_bonus: units(20),
        };
        let report = Distribute::new(
            &store,
            m,
            units(1000),
            SplitRule::plan(&terms),
            EventRef::Event(1),
            AT,
        )
        .execute()?;
        assert_eq!(store.account(r1)?.balance(), units(50));
        assert_eq!(store.account(r1)?.bonus_balance(), units(50));
        assert_eq!(store.account(r2)?.balance(), units(20));
        assert_eq!(store.operator()?.total_profit().minor(), 93_000);
        assert_eq!(store.operator()?.monthly_profit().minor(), 93_000);
        assert_eq!(report.operator_residual(), units(930));
        assert_eq!(store.account(m)?.balance(), Amount::ZERO);
        Ok(())
    }

    #[test]
    fn conservation_for_every_chain() -> crate::Result<()> {
        let rules = [
            SplitRule::task(&TaskSplit::default()),
            SplitRule::builder()
                .level_1(Share::Factor(Factor::from_bps(1_250)?))
                .level_2(Share::Factor(Factor::from_bps(333)?))
                .build(),
            SplitRule::builder()
                .level_1(Share::Fixed(units(50)))
                .level_2(Share::Fixed(units(20)))
                .build(),
        ];
        let amounts = [Amount::from_minor(7_001), units(100), Amount::from_minor(99_999)];
        let mut event = 0;
        for rule in rules {
            for amount in amounts {
                for length in 0..=2 {
                    for (r1_active, r2_active) in
                        [(true, true), (true, false), (false, true), (false, false)]
                    {
                        let store = TestStore::default();
                        let [m, r1, r2] = chain(&store, r1_active, r2_active)?;
                        let source = match length {
                            0 => r2,
                            1 => r1,
                            _ => m,
                        };
                        event += 1;
                        let report = Distribute::new(
                            &store,
                            source,
                            amount,
                            rule,
                            EventRef::Event(event),
                            AT,
                        )
                        .execute()?;
                        let operator = store.operator()?.total_profit().minor();
                        let credited: u64 = [m, r1, r2]
                            .iter()
                            .map(|id| store.account(*id).unwrap().balance().minor())
                            .sum();
                        assert_eq!(
                            credited + operator as u64 + report.unallocated().minor(),
                            amount.minor(),
                            "rule={rule:?} amount={amount} length={length}"
                        );
                        assert_eq!(report.distributed()?.minor(), credited);
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn inactive_share_is_not_reassigned() -> crate::Result<()> {
        let store = TestStore::default();
        let [m, r1, r2] = chain(&store, false, true)?;
        let terms = PlanTerms {
            name: "basic".to_string(),
            daily_task_limit: 5,
            direct_bonus: units(50),
            indirect_bonus: units(20),
        };
        let report = Distribute::new(
            &store,
            m,
            units(1000),
            SplitRule::plan(&terms),
            EventRef::Event(1),
            AT,
        )
        .execute()?;
        assert_eq!(report.share(1).map(ShareReport::outcome), Some(ShareOutcome::Inactive));
        assert_eq!(report.share(2).map(ShareReport::outcome), Some(ShareOutcome::Credited));
        assert_eq!(store.account(r1)?.balance(), Amount::ZERO);
        assert_eq!(store.account(r2)?.balance(), units(20));
        Ok(())
    }

    #[test]
    fn rerun_does_not_double_credit() -> crate::Result<()> {
        let store = TestStore::default();
        let [m, r1, r2] = chain(&store, true, true)?;
        let rule = SplitRule::task(&TaskSplit::default());
        for _ in 0..3 {
            Distribute::new(&store, m, units(100), rule, EventRef::Event(9), AT).execute()?;
        }
        assert_eq!(store.account(r1)?.balance(), units(3));
        assert_eq!(store.account(r2)?.balance(), units(1));
        assert_eq!(store.account(m)?.pending_commission(), units(100));
        Ok(())
    }

    #[test]
    fn settled_split_is_not_redistributed() -> crate::Result<()> {
        let store = TestStore::default();
        let [m, r1, r2] = chain(&store, false, true)?;
        let terms = PlanTerms {
            name: "basic".to_string(),
            daily_task_limit: 5,
            direct_bonus: units(50),
            indirect_bonus: units(20),
        };
        let rule = SplitRule::plan(&terms);
        let event = EventRef::Request(RequestId::new(7));
        let first = Distribute::new(&store, m, units(1000), rule, event, AT).execute()?;
        assert_eq!(first.operator_residual(), units(980));

        store.activate(r1, 10)?;
        let rerun = Distribute::new(&store, m, units(1000), rule, event, AT).execute()?;
        assert_eq!(rerun, first);
        assert_eq!(store.account(r1)?.balance(), Amount::ZERO);
        assert_eq!(store.account(r2)?.balance(), units(20));
        assert_eq!(store.operator()?.total_profit().minor(), 98_000);
        assert_eq!(store.operator()?.transactions().len(), 1);
        Ok(())
    }

    #[test]
    fn admission_guards_source_credit() -> crate::Result<()> {
        let store = TestStore::default();
        let [m, r1, _] = chain(&store, true, true)?;
        let err = Distribute::new(
            &store,
            m,
            units(100),
            SplitRule::task(&TaskSplit::default()),
            EventRef::Event(1),
            AT,
        )
        .with_admission(|account| account.record_task_completion(AT.date()).map(|_| ()))
        .execute()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DailyLimitReached);
        assert_eq!(store.account(m)?.pending_commission(), Amount::ZERO);
        assert_eq!(store.account(r1)?.balance(), Amount::ZERO);
        Ok(())
    }

    #[test]
    fn shares_exceeding_amount_are_rejected() -> crate::Result<()> {
        let store = TestStore::default();
        let [m, ..] = chain(&store, true, true)?;
        let rule = SplitRule::builder()
            .level_1(Share::Fixed(units(80)))
            .level_2(Share::Fixed(units(30)))
            .build();
        let err = Distribute::new(&store, m, units(100), rule, EventRef::Event(1), AT)
            .execute()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.operator()?.transactions().len(), 0);
        Ok(())
    }

    #[test]
    fn concurrent_distributions_credit_the_same_referrer() -> crate::Result<()> {
        use std::{sync::Arc, thread};

        let store = Arc::new(TestStore::default());
        let r1 = store.signup("r1", None)?.id();
        store.activate(r1, 10)?;
        let members = (0..16)
            .map(|i| store.signup(&format!("m{i}"), Some(r1)).map(|a| a.id()))
            .collect::<crate::Result<Vec<_>>>()?;
        let rule = SplitRule::builder()
            .level_1(Share::Fixed(units(5)))
            .level_2(Share::Fixed(Amount::ZERO))
            .build();

        let handles: Vec<_> = members
            .into_iter()
            .zip(1u64..)
            .map(|(member, event)| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    Distribute::new(&*store, member, units(100), rule, EventRef::Event(event), AT)
                        .execute()
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.account(r1)?.balance(), units(5 * 16));
        assert_eq!(store.operator()?.total_profit().minor(), 95 * 100 * 16);
        Ok(())
    }
}
