use std::fmt;

use time::OffsetDateTime;

use crate::amount::Amount;

/// Task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TaskId(u64);

impl TaskId {
    /// Create from raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| crate::Error::InvalidArgument("task id must be a number"))
    }
}

/// Parameters of a new task.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Reward per completion.
    pub reward: Amount,
    /// Where the member is sent to complete the task.
    pub redirect: String,
    /// Creation time.
    pub created_at: OffsetDateTime,
}

/// Task.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Task {
    id: TaskId,
    reward: Amount,
    redirect: String,
    completions: u64,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    created_at: OffsetDateTime,
}

impl Task {
    /// Create a new task record.
    pub fn new(id: TaskId, params: NewTask) -> crate::Result<Self> {
        if params.reward.is_zero() {
            return Err(crate::Error::InvalidArgument("task reward must be positive"));
        }
        Ok(Self {
            id,
            reward: params.reward,
            redirect: params.redirect,
            completions: 0,
            created_at: params.created_at,
        })
    }

    /// Get the id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the reward.
    pub fn reward(&self) -> Amount {
        self.reward
    }

    /// Get the redirect target.
    pub fn redirect(&self) -> &str {
        &self.redirect
    }

    /// Get the number of completions.
    pub fn completions(&self) -> u64 {
        self.completions
    }

    /// Get creation time.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Count a completion.
    pub fn record_completion(&mut self) -> crate::Result<u64> {
        self.completions = self
            .completions
            .checked_add(1)
            .ok_or(crate::Error::Overflow)?;
        Ok(self.completions)
    }
}
