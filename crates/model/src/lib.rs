#![deny(missing_docs)]
#![deny(unreachable_pub)]
#![warn(clippy::arithmetic_side_effects)]

//! Domain model of the Rewardnet commission ledger.
//!
//! This crate holds the records (accounts, the operator account, approval
//! requests and tasks), the rules that gate mutations of them, and the
//! commission cascade that splits a monetary event across a two-level
//! referral chain. Persistence is abstracted behind the traits in [`store`].

/// Money types.
pub mod amount;

/// Member and operator accounts.
pub mod account;

/// Approval requests.
pub mod request;

/// Tasks.
pub mod task;

/// Referral graph.
pub mod referral;

/// Eligibility rules.
pub mod eligibility;

/// Ledger params.
pub mod params;

/// Actions.
pub mod action;

/// Store traits.
pub mod store;

/// Clock.
pub mod clock;

/// Error type.
pub mod error;

/// Utils for testing.
#[cfg(any(test, feature = "test"))]
pub mod test;

pub use account::{
    Account, AccountId, Applied, Effect, EntryKind, EventRef, Leg, LedgerEntry, NewAccount,
    OperatorAccount, OperatorEntry, OperatorEntryKind, OperatorPosting, Posting, PostingRef,
};
pub use action::distribute::{Distribute, DistributionReport, ShareOutcome, ShareReport};
pub use amount::{Amount, Factor, SignedAmount};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Entity, Error, ErrorKind};
pub use params::{
    LedgerParams, ResidualTarget, SalaryTier, Share, SourceCredit, SplitRule, TaskSplit,
    WithdrawalWindow,
};
pub use eligibility::ReferralCounts;
pub use referral::ReferralChain;
pub use request::{
    Decision, DecisionRecord, EvidenceRef, NewRequest, PayoutDetails, PlanTerms, Request,
    RequestId, RequestKind, RequestPayload, RequestStatus,
};
pub use store::{AccountStore, AccountStoreExt, OperatorStore, TaskStore};
pub use task::{NewTask, Task, TaskId};

/// Alias for result.
pub type Result<T> = std::result::Result<T, Error>;
