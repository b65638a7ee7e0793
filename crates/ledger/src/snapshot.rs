use rewardnet_model::{Account, OperatorAccount, Request, Task};

use crate::{ledger::Unsettled, memory::Counters};

/// Serialized state of a [`Ledger`](crate::Ledger) over a
/// [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub format: u32,
    /// Id counters of the store.
    pub counters: Counters,
    /// The last assigned request id.
    pub last_request_id: u64,
    /// The last assigned event id.
    pub last_event_id: u64,
    /// Member accounts.
    pub accounts: Vec<Account>,
    /// The operator account.
    pub operator: OperatorAccount,
    /// Tasks.
    pub tasks: Vec<Task>,
    /// Pending requests, in submission order.
    pub pending: Vec<Request>,
    /// Terminal log, in decision order.
    pub terminal: Vec<Request>,
    /// Deferred postings.
    #[serde(default)]
    pub unsettled: Vec<Unsettled>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            format: Self::FORMAT,
            counters: Counters::default(),
            last_request_id: 0,
            last_event_id: 0,
            accounts: Vec::new(),
            operator: OperatorAccount::default(),
            tasks: Vec::new(),
            pending: Vec::new(),
            terminal: Vec::new(),
            unsettled: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Current format version.
    pub const FORMAT: u32 = 1;

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rewardnet_model::{
        AccountStoreExt, Amount, Decision, Effect, ErrorKind, EventRef, EvidenceRef, FixedClock,
        LedgerParams, Leg, Posting, PostingRef, RequestPayload,
    };
    use time::macros::datetime;

    use crate::{Ledger, MemoryStore};

    use super::*;

    #[test]
    fn restore_keeps_state_and_counters() -> crate::Result<()> {
        let clock = Arc::new(FixedClock::new(datetime!(2024-03-05 11:00 UTC)));
        let ledger = Ledger::new(MemoryStore::default(), LedgerParams::default())
            .with_clock(clock.clone());
        let alice = ledger.signup("alice", "alice@example.com", None)?;
        let bob = ledger.signup("bob", "bob@example.com", Some(alice.referral_code()))?;
        let approved = ledger.submit_request(
            bob.id(),
            EvidenceRef::new("TX-1")?,
            Amount::from_units(10)?,
            RequestPayload::TrainingBonus,
        )?;
        ledger.decide_request(approved.id(), Decision::Approve)?;
        let pending = ledger.submit_request(
            bob.id(),
            EvidenceRef::new("TX-2")?,
            Amount::from_units(10)?,
            RequestPayload::TrainingBonus,
        )?;
        let carol = ledger.signup("carol", "carol@example.com", None)?;
        ledger.remove_account(carol.id())?;

        let json = ledger.snapshot()?.to_json()?;
        let restored =
            Ledger::from_snapshot(Snapshot::from_json(&json)?, LedgerParams::default())?
                .with_clock(clock);

        assert_eq!(restored.snapshot()?, ledger.snapshot()?);
        assert_eq!(restored.account(bob.id())?.balance(), Amount::from_units(10)?);
        assert_eq!(
            restored
                .decide_request(approved.id(), Decision::Approve)
                .unwrap_err()
                .kind(),
            ErrorKind::AlreadyProcessed
        );
        // Posting references survive the round trip.
        let bonus = PostingRef::new(EventRef::Request(approved.id()), Leg::Source);
        let applied = restored.store().post(
            bob.id(),
            Posting::new(
                Some(bonus),
                Effect::TrainingBonus(Amount::from_units(10)?),
                "training bonus",
                datetime!(2024-03-05 12:00 UTC),
            ),
        )?;
        assert!(applied.is_duplicate());
        let payout = PostingRef::new(EventRef::Request(approved.id()), Leg::Operator);
        assert_eq!(
            restored
                .operator()?
                .posting(&payout)
                .map(|entry| entry.amount.minor()),
            Some(-1_000)
        );
        restored.decide_request(pending.id(), Decision::Approve)?;

        // Ids are not reused after a restore.
        let dave = restored.signup("dave", "dave@example.com", None)?;
        assert!(dave.id() > carol.id());
        let next = restored.submit_request(
            bob.id(),
            EvidenceRef::new("TX-3")?,
            Amount::from_units(10)?,
            RequestPayload::TrainingBonus,
        )?;
        assert!(next.id() > pending.id());
        Ok(())
    }

    #[test]
    fn rejects_unknown_format() -> crate::Result<()> {
        let snapshot = Snapshot {
            format: 99,
            ..Default::default()
        };
        let err = Ledger::from_snapshot(snapshot, LedgerParams::default())
            .err()
            .map(|err| err.kind());
        assert_eq!(err, Some(ErrorKind::InvalidArgument));
        Ok(())
    }
}
