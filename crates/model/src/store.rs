use crate::{
    account::{Account, AccountId, Applied, NewAccount, OperatorAccount, OperatorPosting, Posting},
    task::{NewTask, Task, TaskId},
};

/// Persisted member accounts.
///
/// Implementations must serialize updates of the same account: the function
/// passed to [`update_account`](AccountStore::update_account) always sees the
/// latest committed state, so two concurrent updates both take effect.
pub trait AccountStore {
    /// Get an account.
    fn account(&self, id: AccountId) -> crate::Result<Account>;

    /// Get an account by its referral code.
    fn account_by_referral_code(&self, code: &str) -> crate::Result<Account>;

    /// Create an account.
    ///
    /// Fails with [`Error::Conflict`](crate::Error::Conflict) if the handle
    /// or the referral code is taken.
    fn create_account(&self, params: NewAccount) -> crate::Result<Account>;

    /// Atomically replace an account by a function of its current state.
    ///
    /// Nothing is written if `f` fails.
    fn update_account<T>(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut Account) -> crate::Result<T>,
    ) -> crate::Result<(Account, T)>;

    /// Accounts directly referred by the given account.
    fn referees(&self, id: AccountId) -> crate::Result<Vec<Account>>;

    /// Remove an account.
    fn remove_account(&self, id: AccountId) -> crate::Result<Account>;
}

/// Extension trait for [`AccountStore`] with utils.
pub trait AccountStoreExt: AccountStore {
    /// Atomically apply a posting to an account.
    fn post(&self, id: AccountId, posting: Posting) -> crate::Result<Applied> {
        let (_, applied) = self.update_account(id, |account| account.apply(posting))?;
        Ok(applied)
    }
}

impl<S: AccountStore + ?Sized> AccountStoreExt for S {}

/// The singleton operator account.
pub trait OperatorStore {
    /// Get the operator account.
    fn operator(&self) -> crate::Result<OperatorAccount>;

    /// Atomically replace the operator account by a function of its current state.
    fn update_operator<T>(
        &self,
        f: impl FnOnce(&mut OperatorAccount) -> crate::Result<T>,
    ) -> crate::Result<(OperatorAccount, T)>;

    /// Atomically apply a posting to the operator account.
    fn post_to_operator(&self, posting: OperatorPosting) -> crate::Result<Applied> {
        let (_, applied) = self.update_operator(|operator| operator.apply(posting))?;
        Ok(applied)
    }
}

/// Persisted tasks.
pub trait TaskStore {
    /// Get a task.
    fn task(&self, id: TaskId) -> crate::Result<Task>;

    /// List all tasks.
    fn tasks(&self) -> crate::Result<Vec<Task>>;

    /// Create a task.
    fn create_task(&self, params: NewTask) -> crate::Result<Task>;

    /// Atomically count a completion of the task.
    fn record_task_completion(&self, id: TaskId) -> crate::Result<Task>;
}
