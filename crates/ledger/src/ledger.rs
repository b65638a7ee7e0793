use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use rand::{distributions::Alphanumeric, Rng};
use rewardnet_model::{
    action::LedgerAction, eligibility, referral, Account, AccountId, AccountStore,
    AccountStoreExt, Amount, Clock, Decision, Distribute, DistributionReport, Effect, EventRef,
    EvidenceRef, LedgerParams, Leg, NewAccount, NewRequest, NewTask, OperatorAccount,
    OperatorEntryKind, OperatorPosting, OperatorStore, PayoutDetails, Posting, PostingRef,
    ReferralCounts, Request, RequestId, RequestKind, RequestPayload, ShareOutcome, SignedAmount,
    SplitRule, SystemClock, Task, TaskId, TaskStore,
};
use time::OffsetDateTime;

use crate::{
    memory::MemoryStore,
    notify::{Notification, Notifier, TracingNotifier},
    queue::RequestQueue,
    snapshot::Snapshot,
};

/// Length of generated referral codes.
pub const REFERRAL_CODE_LEN: usize = 8;

const MAX_CODE_ATTEMPTS: usize = 16;

/// Follow-up postings of a committed event that failed to apply.
///
/// They are kept by the ledger and applied by
/// [`Ledger::retry_unsettled`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unsettled {
    /// Referral shares of a task reward already credited to the member.
    TaskCommission {
        /// The member who completed the task.
        member: AccountId,
        /// Task reward.
        reward: Amount,
        /// Event id.
        event: u64,
        /// Completion time.
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
    /// Operator side of a payout already credited to the member.
    Operator {
        /// The posting.
        posting: OperatorPosting,
    },
}

impl Unsettled {
    fn member(&self) -> Option<AccountId> {
        match self {
            Self::TaskCommission { member, .. } => Some(*member),
            Self::Operator { .. } => None,
        }
    }
}

/// Outcome of a task completion.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    task: Task,
    completed_today: u32,
    distribution: Option<DistributionReport>,
}

impl TaskCompletion {
    /// Get the task.
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Get the amount credited to the pending commission.
    pub fn pending_credit(&self) -> Amount {
        self.task.reward()
    }

    /// Get the number of tasks the member completed today.
    pub fn completed_today(&self) -> u32 {
        self.completed_today
    }

    /// Get the distribution report.
    ///
    /// Returns `None` if the referral shares were deferred, see
    /// [`Ledger::retry_unsettled`].
    pub fn distribution(&self) -> Option<&DistributionReport> {
        self.distribution.as_ref()
    }
}

/// Outcome of a decision.
#[derive(Debug, Clone)]
pub struct DecisionReport {
    request: Request,
    distribution: Option<DistributionReport>,
}

impl DecisionReport {
    /// Get the decided request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Get the distribution report of an approved plan payment.
    pub fn distribution(&self) -> Option<&DistributionReport> {
        self.distribution.as_ref()
    }
}

/// Outcome of a salary claim.
#[derive(Debug, Clone)]
pub struct SalaryClaim {
    tier: u32,
    amount: Amount,
    counts: ReferralCounts,
    settled: bool,
}

impl SalaryClaim {
    /// Get the tier id.
    pub fn tier(&self) -> u32 {
        self.tier
    }

    /// Get the credited amount.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Get the referral counts the claim was checked against.
    pub fn counts(&self) -> ReferralCounts {
        self.counts
    }

    /// Returns whether the operator payout has been recorded.
    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

/// The commission ledger.
pub struct Ledger<S = MemoryStore> {
    store: S,
    queue: RequestQueue,
    params: LedgerParams,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    unsettled: Mutex<Vec<Unsettled>>,
    last_event: AtomicU64,
}

impl<S> Ledger<S> {
    /// Create a new ledger over the given store.
    pub fn new(store: S, params: LedgerParams) -> Self {
        Self {
            store,
            queue: RequestQueue::default(),
            params,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
            unsettled: Mutex::default(),
            last_event: AtomicU64::new(0),
        }
    }

    /// Set the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Get the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the approval queue.
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Get the params.
    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Get the postings waiting for [`retry_unsettled`](Self::retry_unsettled).
    pub fn unsettled(&self) -> Vec<Unsettled> {
        self.unsettled.lock().clone()
    }

    fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    fn local(&self, at: OffsetDateTime) -> OffsetDateTime {
        at.to_offset(self.params.utc_offset())
    }

    fn next_event(&self) -> crate::Result<u64> {
        let last = self.last_event.fetch_add(1, Ordering::SeqCst);
        Ok(last.checked_add(1).ok_or(rewardnet_model::Error::Overflow)?)
    }

    fn notify(&self, member: AccountId, notification: Notification) {
        if let Err(err) = self.notifier.notify(member, &notification) {
            tracing::warn!(%member, %err, "failed to send notification");
        }
    }

    fn defer(&self, entry: Unsettled) {
        self.unsettled.lock().push(entry);
    }
}

impl<S> Ledger<S>
where
    S: AccountStore + OperatorStore + TaskStore,
{
    /// Get an account.
    pub fn account(&self, id: AccountId) -> crate::Result<Account> {
        Ok(self.store.account(id)?)
    }

    /// Get the operator account.
    pub fn operator(&self) -> crate::Result<OperatorAccount> {
        Ok(self.store.operator()?)
    }

    /// Create a member account.
    ///
    /// The referrer is resolved from `referral_code` and never changes
    /// afterwards. A unique referral code is generated for the new account.
    pub fn signup(
        &self,
        handle: &str,
        contact: &str,
        referral_code: Option<&str>,
    ) -> crate::Result<Account> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(rewardnet_model::Error::InvalidArgument("handle must not be empty").into());
        }
        let referrer = match referral_code {
            Some(code) => {
                let referrer = self
                    .store
                    .account_by_referral_code(&normalize_referral_code(code))?;
                referral::validate_referrer(&self.store, handle, &referrer)?;
                Some(referrer.id())
            }
            None => None,
        };
        for _ in 0..MAX_CODE_ATTEMPTS {
            let params = NewAccount {
                handle: handle.to_string(),
                contact: contact.trim().to_string(),
                referral_code: generate_referral_code(),
                referrer,
                created_at: self.now(),
            };
            match self.store.create_account(params) {
                Ok(account) => {
                    tracing::info!(
                        account=%account.id(),
                        handle=%account.handle(),
                        referrer=?account.referrer(),
                        "signed up"
                    );
                    return Ok(account);
                }
                Err(rewardnet_model::Error::Conflict("referral code", code)) => {
                    tracing::debug!(%code, "referral code taken, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(rewardnet_model::Error::Conflict(
            "referral code",
            "no free referral code found".to_string(),
        )
        .into())
    }

    /// Remove an account.
    ///
    /// Only accounts without referees, pending requests and unsettled
    /// postings can be removed.
    pub fn remove_account(&self, id: AccountId) -> crate::Result<Account> {
        if !self.store.referees(id)?.is_empty() {
            return Err(rewardnet_model::Error::InvalidState("the account has referees").into());
        }
        if self.queue.has_pending(id) {
            return Err(
                rewardnet_model::Error::InvalidState("the account has pending requests").into(),
            );
        }
        if self
            .unsettled
            .lock()
            .iter()
            .any(|entry| entry.member() == Some(id))
        {
            return Err(
                rewardnet_model::Error::InvalidState("the account has unsettled postings").into(),
            );
        }
        let removed = self.store.remove_account(id)?;
        tracing::info!(account=%id, handle=%removed.handle(), "account removed");
        Ok(removed)
    }

    /// Count the referees with an active plan.
    pub fn referral_counts(&self, member: AccountId) -> crate::Result<ReferralCounts> {
        self.store.account(member)?;
        let mut direct = 0usize;
        let mut indirect = 0usize;
        for referee in self.store.referees(member)? {
            if referee.is_plan_active() {
                direct = direct.saturating_add(1);
            }
            let active = self
                .store
                .referees(referee.id())?
                .iter()
                .filter(|account| account.is_plan_active())
                .count();
            indirect = indirect.saturating_add(active);
        }
        Ok(ReferralCounts {
            direct: u32::try_from(direct).unwrap_or(u32::MAX),
            indirect: u32::try_from(indirect).unwrap_or(u32::MAX),
        })
    }

    /// Create a task.
    pub fn create_task(&self, reward: Amount, redirect: &str) -> crate::Result<Task> {
        let task = self.store.create_task(NewTask {
            reward,
            redirect: redirect.trim().to_string(),
            created_at: self.now(),
        })?;
        tracing::info!(task=%task.id(), reward=%task.reward(), "task created");
        Ok(task)
    }

    /// Get a task.
    pub fn task(&self, id: TaskId) -> crate::Result<Task> {
        Ok(self.store.task(id)?)
    }

    /// List tasks.
    pub fn tasks(&self) -> crate::Result<Vec<Task>> {
        Ok(self.store.tasks()?)
    }

    /// Complete a task.
    ///
    /// The daily task cap is checked and the reward is credited to the
    /// pending commission of the member in one atomic update. The referral
    /// shares follow; if they cannot be applied, they are deferred instead
    /// of failing the completion.
    pub fn submit_task(&self, member: AccountId, task: TaskId) -> crate::Result<TaskCompletion> {
        let task = self.store.task(task)?;
        let now = self.now();
        let today = self.local(now).date();
        let event = self.next_event()?;

        let mut completed_today = None;
        let result = Distribute::new(
            &self.store,
            member,
            task.reward(),
            SplitRule::task(self.params.task_split()),
            EventRef::Event(event),
            now,
        )
        .with_admission(|account| {
            completed_today = Some(account.record_task_completion(today)?);
            Ok(())
        })
        .execute();

        let distribution = match result {
            Ok(report) => Some(report),
            Err(err) => {
                let source = PostingRef::new(EventRef::Event(event), Leg::Source);
                let credited = match self.store.account(member) {
                    Ok(account) => account.has_posting(&source),
                    Err(_) => completed_today.is_some(),
                };
                if !credited {
                    return Err(err.into());
                }
                tracing::warn!(%member, %event, %err, "task commission deferred");
                self.defer(Unsettled::TaskCommission {
                    member,
                    reward: task.reward(),
                    event,
                    at: now,
                });
                None
            }
        };

        let task = match self.store.record_task_completion(task.id()) {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(task=%task.id(), %err, "failed to count task completion");
                task
            }
        };
        let completed_today = completed_today.unwrap_or_default();
        tracing::info!(
            %member,
            task=%task.id(),
            reward=%task.reward(),
            %completed_today,
            "task completed"
        );
        if let Some(report) = distribution.as_ref() {
            tracing::debug!(?report, "task commission distributed");
            self.notify_referral_bonus(report);
        }
        self.notify(
            member,
            Notification::TaskCompleted {
                task: task.id(),
                reward: task.reward(),
            },
        );
        Ok(TaskCompletion {
            task,
            completed_today,
            distribution,
        })
    }

    /// Submit a training bonus or plan payment request.
    pub fn submit_request(
        &self,
        member: AccountId,
        evidence: EvidenceRef,
        amount: Amount,
        payload: RequestPayload,
    ) -> crate::Result<Request> {
        if amount.is_zero() {
            return Err(
                rewardnet_model::Error::InvalidArgument("request amount must be positive").into(),
            );
        }
        match &payload {
            RequestPayload::Withdrawal(_) => {
                return Err(rewardnet_model::Error::InvalidArgument(
                    "withdrawals are requested with `request_withdrawal`",
                )
                .into());
            }
            RequestPayload::PlanPayment(terms) => {
                if terms.daily_task_limit == 0 {
                    return Err(rewardnet_model::Error::InvalidArgument(
                        "a plan must grant at least one daily task",
                    )
                    .into());
                }
                let bonuses = terms
                    .direct_bonus
                    .checked_add(&terms.indirect_bonus)
                    .ok_or(rewardnet_model::Error::Overflow)?;
                if bonuses > amount {
                    return Err(rewardnet_model::Error::InvalidArgument(
                        "referral bonuses exceed the plan price",
                    )
                    .into());
                }
            }
            RequestPayload::TrainingBonus => {}
        }
        self.store.account(member)?;
        let request = self.queue.submit(
            NewRequest {
                member,
                evidence: Some(evidence),
                amount,
                payload,
            },
            self.now(),
            |_| Ok(()),
        )?;
        tracing::info!(
            request=%request.id(),
            %member,
            kind=%request.kind(),
            %amount,
            "request submitted"
        );
        Ok(request)
    }

    /// Request a withdrawal.
    pub fn request_withdrawal(
        &self,
        member: AccountId,
        amount: Amount,
        payout: PayoutDetails,
    ) -> crate::Result<Request> {
        let account = self.store.account(member)?;
        let now = self.now();
        let local_now = self.local(now);
        let offset = self.params.utc_offset();
        let window = self.params.withdrawal_window();
        let request = self.queue.submit(
            NewRequest {
                member,
                evidence: None,
                amount,
                payload: RequestPayload::Withdrawal(payout),
            },
            now,
            |live| {
                let today = live
                    .iter()
                    .filter(|request| {
                        request.member() == member
                            && request.kind() == RequestKind::Withdrawal
                            && request.submitted_at().to_offset(offset).date() == local_now.date()
                    })
                    .count();
                eligibility::check_withdrawal(&account, &amount, window, local_now, today)
            },
        )?;
        tracing::info!(request=%request.id(), %member, %amount, "withdrawal requested");
        Ok(request)
    }

    /// Decide a pending request.
    ///
    /// The request is claimed, the effects of the decision are applied and
    /// the request is finally moved to the terminal log. If applying the
    /// effects fails, the request stays pending and the decision can be
    /// retried without crediting anyone twice.
    pub fn decide_request(
        &self,
        id: RequestId,
        decision: Decision,
    ) -> crate::Result<DecisionReport> {
        if let Decision::Reject { reason } = &decision {
            if reason.trim().is_empty() {
                return Err(rewardnet_model::Error::InvalidArgument(
                    "rejection requires a non-empty reason",
                )
                .into());
            }
        }
        let request = self.queue.claim(id).inspect_err(|err| {
            tracing::warn!(request=%id, %err, "cannot decide request");
        })?;
        let now = self.now();
        let distribution = match self.apply_decision(&request, &decision, now) {
            Ok(distribution) => distribution,
            Err(err) => {
                self.queue.release(id);
                tracing::warn!(request=%id, %err, "failed to apply decision, request released");
                return Err(err);
            }
        };
        let request = match self.queue.commit(id, &decision, now) {
            Ok(request) => request,
            Err(err) => {
                self.queue.release(id);
                return Err(err.into());
            }
        };
        tracing::info!(
            request=%id,
            member=%request.member(),
            kind=%request.kind(),
            status=%request.status(),
            "request decided"
        );

        let notification = match &decision {
            Decision::Approve => Notification::RequestApproved {
                request: id,
                kind: request.kind(),
                amount: request.amount(),
            },
            Decision::Reject { reason } => Notification::RequestRejected {
                request: id,
                kind: request.kind(),
                reason: reason.clone(),
            },
        };
        self.notify(request.member(), notification);
        if let Some(report) = distribution.as_ref() {
            tracing::debug!(?report, "plan payment distributed");
            self.notify_referral_bonus(report);
        }
        Ok(DecisionReport {
            request,
            distribution,
        })
    }

    fn apply_decision(
        &self,
        request: &Request,
        decision: &Decision,
        at: OffsetDateTime,
    ) -> crate::Result<Option<DistributionReport>> {
        if !matches!(decision, Decision::Approve) {
            return Ok(None);
        }
        let event = EventRef::Request(request.id());
        let member = request.member();
        let amount = request.amount();
        match request.payload() {
            RequestPayload::TrainingBonus => {
                self.store.post(
                    member,
                    Posting::new(
                        Some(PostingRef::new(event, Leg::Source)),
                        Effect::TrainingBonus(amount),
                        format!("training bonus ({event})"),
                        at,
                    ),
                )?;
                self.store.post_to_operator(OperatorPosting {
                    reference: Some(PostingRef::new(event, Leg::Operator)),
                    kind: OperatorEntryKind::TrainingBonusPayout,
                    amount: amount.to_opposite_signed()?,
                    description: format!("training bonus payout to {member} ({event})"),
                    at,
                })?;
                Ok(None)
            }
            RequestPayload::Withdrawal(payout) => {
                self.store.post(
                    member,
                    Posting::new(
                        Some(PostingRef::new(event, Leg::Settlement)),
                        Effect::Withdrawal(amount),
                        format!("withdrawal to {} ({event})", payout.method),
                        at,
                    ),
                )?;
                self.store.post_to_operator(OperatorPosting {
                    reference: Some(PostingRef::new(event, Leg::Operator)),
                    kind: OperatorEntryKind::WithdrawalPayout,
                    amount: amount.to_opposite_signed()?,
                    description: format!("withdrawal payout to {member} ({event})"),
                    at,
                })?;
                Ok(None)
            }
            RequestPayload::PlanPayment(terms) => {
                let report = Distribute::new(
                    &self.store,
                    member,
                    amount,
                    SplitRule::plan(terms),
                    event,
                    at,
                )
                .execute()?;
                self.store.post(
                    member,
                    Posting::new(
                        Some(PostingRef::new(event, Leg::Activation)),
                        Effect::PlanActivation {
                            daily_task_limit: terms.daily_task_limit,
                        },
                        format!("plan `{}` activated ({event})", terms.name),
                        at,
                    ),
                )?;
                Ok(Some(report))
            }
        }
    }

    /// Move the pending commission of the member into the balance.
    ///
    /// Returns the released amount.
    pub fn release_pending_commission(&self, member: AccountId) -> crate::Result<Amount> {
        let event = self.next_event()?;
        let now = self.now();
        let (_, released) = self.store.update_account(member, |account| {
            let pending = account.pending_commission();
            if pending.is_zero() {
                return Ok(Amount::ZERO);
            }
            account.apply(Posting::new(
                Some(PostingRef::new(EventRef::Event(event), Leg::Source)),
                Effect::ReleaseCommission,
                "pending commission released",
                now,
            ))?;
            Ok(pending)
        })?;
        if !released.is_zero() {
            tracing::info!(%member, %released, "commission released");
            self.notify(member, Notification::CommissionReleased { amount: released });
        }
        Ok(released)
    }

    /// Claim the monthly salary of a tier.
    pub fn claim_salary(&self, member: AccountId, tier: u32) -> crate::Result<SalaryClaim> {
        let tier = self.params.salary_tier(tier)?.clone();
        let counts = self.referral_counts(member)?;
        let now = self.now();
        let today = self.local(now).date();
        let event = EventRef::Event(self.next_event()?);

        self.store.update_account(member, |account| {
            eligibility::check_salary_claim(account, &tier, &counts, today)?;
            account.record_salary_claim(today);
            account.apply(Posting::new(
                Some(PostingRef::new(event, Leg::Source)),
                Effect::Salary(tier.amount),
                format!("tier {} salary ({event})", tier.id),
                now,
            ))?;
            Ok(())
        })?;

        let settled = self.post_to_operator_or_defer(OperatorPosting {
            reference: Some(PostingRef::new(event, Leg::Operator)),
            kind: OperatorEntryKind::SalaryPayout,
            amount: tier.amount.to_opposite_signed()?,
            description: format!("tier {} salary payout to {member} ({event})", tier.id),
            at: now,
        });
        tracing::info!(%member, tier=%tier.id, amount=%tier.amount, "salary claimed");
        self.notify(
            member,
            Notification::SalaryCredited {
                tier: tier.id,
                amount: tier.amount,
            },
        );
        Ok(SalaryClaim {
            tier: tier.id,
            amount: tier.amount,
            counts,
            settled,
        })
    }

    /// Close the month of the operator account.
    ///
    /// Returns the closed monthly profit.
    pub fn roll_over_month(&self) -> crate::Result<SignedAmount> {
        let now = self.now();
        let (_, closed) = self
            .store
            .update_operator(|operator| Ok(operator.close_month(now)))?;
        tracing::info!(%closed, "month closed");
        Ok(closed)
    }

    /// Apply deferred postings.
    ///
    /// Returns the number of postings applied. Postings that fail again stay
    /// deferred.
    pub fn retry_unsettled(&self) -> crate::Result<usize> {
        let entries = std::mem::take(&mut *self.unsettled.lock());
        let mut settled = 0usize;
        let mut remaining = Vec::new();
        for entry in entries {
            match self.settle(&entry) {
                Ok(()) => settled = settled.saturating_add(1),
                Err(err) => {
                    tracing::warn!(?entry, %err, "still unsettled");
                    remaining.push(entry);
                }
            }
        }
        self.unsettled.lock().extend(remaining);
        if settled > 0 {
            tracing::info!(%settled, "unsettled postings applied");
        }
        Ok(settled)
    }

    fn settle(&self, entry: &Unsettled) -> crate::Result<()> {
        match entry {
            Unsettled::TaskCommission {
                member,
                reward,
                event,
                at,
            } => {
                let report = Distribute::new(
                    &self.store,
                    *member,
                    *reward,
                    SplitRule::task(self.params.task_split()),
                    EventRef::Event(*event),
                    *at,
                )
                .execute()?;
                self.notify_referral_bonus(&report);
            }
            Unsettled::Operator { posting } => {
                self.store.post_to_operator(posting.clone())?;
            }
        }
        Ok(())
    }

    fn post_to_operator_or_defer(&self, posting: OperatorPosting) -> bool {
        match self.store.post_to_operator(posting.clone()) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(?posting.reference, %err, "operator posting deferred");
                self.defer(Unsettled::Operator { posting });
                false
            }
        }
    }

    fn notify_referral_bonus(&self, report: &DistributionReport) {
        let from = match self.store.account(report.source()) {
            Ok(account) => account.handle().to_string(),
            Err(_) => report.source().to_string(),
        };
        for share in report.shares() {
            if share.outcome() != ShareOutcome::Credited {
                continue;
            }
            let Some(referrer) = share.referrer() else {
                continue;
            };
            self.notify(
                referrer,
                Notification::ReferralBonus {
                    level: share.level(),
                    from: from.clone(),
                    amount: share.amount(),
                },
            );
        }
    }

    /// Get a request.
    pub fn request(&self, id: RequestId) -> crate::Result<Request> {
        Ok(self.queue.request(id)?)
    }

    /// Get pending requests, optionally of one kind.
    pub fn pending_requests(&self, kind: Option<RequestKind>) -> Vec<Request> {
        self.queue.pending(kind)
    }

    /// Get decided requests.
    pub fn terminal_requests(&self) -> Vec<Request> {
        self.queue.terminal()
    }
}

impl Ledger<MemoryStore> {
    /// Take a snapshot of the ledger state.
    ///
    /// The snapshot is consistent only if no operation runs concurrently.
    pub fn snapshot(&self) -> crate::Result<Snapshot> {
        Ok(Snapshot {
            format: Snapshot::FORMAT,
            counters: self.store.counters(),
            last_request_id: self.queue.last_id(),
            last_event_id: self.last_event.load(Ordering::SeqCst),
            accounts: self.store.accounts(),
            operator: self.store.operator()?,
            tasks: self.store.tasks()?,
            pending: self.queue.pending(None),
            terminal: self.queue.terminal(),
            unsettled: self.unsettled(),
        })
    }

    /// Restore a ledger from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot, params: LedgerParams) -> crate::Result<Self> {
        if snapshot.format != Snapshot::FORMAT {
            return Err(crate::Error::invalid_snapshot(format!(
                "unsupported format {}",
                snapshot.format
            )));
        }
        let store = MemoryStore::from_records(
            snapshot.accounts,
            snapshot.operator,
            snapshot.tasks,
            snapshot.counters,
        )?;
        let queue =
            RequestQueue::from_records(snapshot.pending, snapshot.terminal, snapshot.last_request_id)?;
        let mut ledger = Self::new(store, params);
        ledger.queue = queue;
        ledger.unsettled = Mutex::new(snapshot.unsettled);
        ledger.last_event = AtomicU64::new(snapshot.last_event_id);
        Ok(ledger)
    }
}

fn generate_referral_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

fn normalize_referral_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_code_shape() {
        let code = generate_referral_code();
        assert_eq!(code.len(), REFERRAL_CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn referral_codes_are_case_insensitive() -> crate::Result<()> {
        let ledger = Ledger::new(MemoryStore::default(), LedgerParams::default());
        let alice = ledger.signup("alice", "alice@example.com", None)?;
        let code = format!(" {} ", alice.referral_code().to_lowercase());
        let bob = ledger.signup("bob", "bob@example.com", Some(&code))?;
        assert_eq!(bob.referrer(), Some(alice.id()));
        Ok(())
    }

    #[test]
    fn next_event_is_monotonic() -> crate::Result<()> {
        let ledger = Ledger::new(MemoryStore::default(), LedgerParams::default());
        assert_eq!(ledger.next_event()?, 1);
        assert_eq!(ledger.next_event()?, 2);
        Ok(())
    }
}
