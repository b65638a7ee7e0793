#![deny(missing_docs)]
#![deny(unreachable_pub)]

//! Commission ledger and approval-workflow engine.
//!
//! [`Ledger`] is the entry point: it owns a store of accounts and tasks, the
//! approval [`RequestQueue`](queue::RequestQueue) and the collaborators the
//! engine talks to (a [`Clock`](rewardnet_model::Clock) and a
//! [`Notifier`](notify::Notifier)).
//!
//! ```
//! use rewardnet_ledger::{Ledger, MemoryStore};
//! use rewardnet_model::LedgerParams;
//!
//! let ledger = Ledger::new(MemoryStore::default(), LedgerParams::default());
//! let alice = ledger.signup("alice", "alice@example.com", None)?;
//! let bob = ledger.signup("bob", "bob@example.com", Some(alice.referral_code()))?;
//! assert_eq!(bob.referrer(), Some(alice.id()));
//! # Ok::<_, rewardnet_ledger::Error>(())
//! ```

/// In-memory store.
pub mod memory;

/// Approval queue.
pub mod queue;

/// Notification collaborator.
pub mod notify;

/// The ledger service.
pub mod ledger;

/// Snapshot persistence.
pub mod snapshot;

/// Error type.
pub mod error;

pub use error::Error;
pub use ledger::{DecisionReport, Ledger, SalaryClaim, TaskCompletion, Unsettled};
pub use memory::{Counters, MemoryStore};
pub use notify::{Notification, Notifier, NoopNotifier, TracingNotifier};
pub use queue::RequestQueue;
pub use snapshot::Snapshot;

/// Re-export of the domain model.
pub use rewardnet_model as model;

/// Alias for result.
pub type Result<T> = std::result::Result<T, Error>;
