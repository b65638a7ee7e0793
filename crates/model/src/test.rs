use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use time::{macros::datetime, OffsetDateTime};

use crate::{
    account::{Account, AccountId, Effect, NewAccount, OperatorAccount, Posting},
    amount::Amount,
    store::{AccountStore, AccountStoreExt, OperatorStore, TaskStore},
    task::{NewTask, Task, TaskId},
};

/// Time used by the test helpers.
pub const TEST_TIME: OffsetDateTime = datetime!(2024-03-04 12:00 UTC);

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    operator: OperatorAccount,
    tasks: BTreeMap<TaskId, Task>,
    next_account: u64,
    next_task: u64,
}

/// Test Store.
///
/// Every operation locks the whole store.
#[derive(Debug, Default)]
pub struct TestStore {
    state: Mutex<State>,
}

impl TestStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Create an account with the given handle, using the upper-cased handle
    /// as its referral code.
    pub fn signup(&self, handle: &str, referrer: Option<AccountId>) -> crate::Result<Account> {
        self.create_account(NewAccount {
            handle: handle.to_string(),
            contact: format!("{handle}@example.com"),
            referral_code: handle.to_uppercase(),
            referrer,
            created_at: TEST_TIME,
        })
    }

    /// Activate a plan with the given daily task limit.
    pub fn activate(&self, id: AccountId, daily_task_limit: u32) -> crate::Result<Account> {
        self.post(
            id,
            Posting::new(
                None,
                Effect::PlanActivation { daily_task_limit },
                "test plan",
                TEST_TIME,
            ),
        )?;
        self.account(id)
    }

    /// Credit the balance.
    pub fn fund(&self, id: AccountId, amount: Amount) -> crate::Result<Account> {
        self.post(
            id,
            Posting::new(None, Effect::Salary(amount), "test funds", TEST_TIME),
        )?;
        self.account(id)
    }
}

impl AccountStore for TestStore {
    fn account(&self, id: AccountId) -> crate::Result<Account> {
        self.state()
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| crate::Error::account_not_found(id))
    }

    fn account_by_referral_code(&self, code: &str) -> crate::Result<Account> {
        self.state()
            .accounts
            .values()
            .find(|account| account.referral_code() == code)
            .cloned()
            .ok_or_else(|| crate::Error::NotFound(crate::Entity::ReferralCode, code.to_string()))
    }

    fn create_account(&self, params: NewAccount) -> crate::Result<Account> {
        let mut state = self.state();
        for account in state.accounts.values() {
            if account.handle() == params.handle {
                return Err(crate::Error::Conflict("handle", params.handle));
            }
            if account.referral_code() == params.referral_code {
                return Err(crate::Error::Conflict("referral code", params.referral_code));
            }
        }
        state.next_account = state
            .next_account
            .checked_add(1)
            .ok_or(crate::Error::Overflow)?;
        let id = AccountId::new(state.next_account);
        let account = Account::new(id, params);
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn update_account<T>(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut Account) -> crate::Result<T>,
    ) -> crate::Result<(Account, T)> {
        let mut state = self.state();
        let current = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| crate::Error::account_not_found(id))?;
        let mut next = current.clone();
        let output = f(&mut next)?;
        next.increment_version()?;
        *current = next.clone();
        Ok((next, output))
    }

    fn referees(&self, id: AccountId) -> crate::Result<Vec<Account>> {
        Ok(self
            .state()
            .accounts
            .values()
            .filter(|account| account.referrer() == Some(id))
            .cloned()
            .collect())
    }

    fn remove_account(&self, id: AccountId) -> crate::Result<Account> {
        self.state()
            .accounts
            .remove(&id)
            .ok_or_else(|| crate::Error::account_not_found(id))
    }
}

impl OperatorStore for TestStore {
    fn operator(&self) -> crate::Result<OperatorAccount> {
        Ok(self.state().operator.clone())
    }

    fn update_operator<T>(
        &self,
        f: impl FnOnce(&mut OperatorAccount) -> crate::Result<T>,
    ) -> crate::Result<(OperatorAccount, T)> {
        let mut state = self.state();
        let mut next = state.operator.clone();
        let output = f(&mut next)?;
        next.increment_version()?;
        state.operator = next.clone();
        Ok((next, output))
    }
}

impl TaskStore for TestStore {
    fn task(&self, id: TaskId) -> crate::Result<Task> {
        self.state()
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| crate::Error::NotFound(crate::Entity::Task, id.to_string()))
    }

    fn tasks(&self) -> crate::Result<Vec<Task>> {
        Ok(self.state().tasks.values().cloned().collect())
    }

    fn create_task(&self, params: NewTask) -> crate::Result<Task> {
        let mut state = self.state();
        let next = state.next_task.checked_add(1).ok_or(crate::Error::Overflow)?;
        let task = Task::new(TaskId::new(next), params)?;
        state.next_task = next;
        state.tasks.insert(task.id(), task.clone());
        Ok(task)
    }

    fn record_task_completion(&self, id: TaskId) -> crate::Result<Task> {
        let mut state = self.state();
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| crate::Error::NotFound(crate::Entity::Task, id.to_string()))?;
        task.record_completion()?;
        Ok(task.clone())
    }
}

fn standalone(handle: &str) -> Account {
    Account::new(
        AccountId::new(1),
        NewAccount {
            handle: handle.to_string(),
            contact: format!("{handle}@example.com"),
            referral_code: handle.to_uppercase(),
            referrer: None,
            created_at: TEST_TIME,
        },
    )
}

/// An account with an active plan and the given balance.
pub fn active_account(daily_task_limit: u32, balance: Amount) -> crate::Result<Account> {
    let mut account = inactive_account(balance)?;
    account.apply(Posting::new(
        None,
        Effect::PlanActivation { daily_task_limit },
        "test plan",
        TEST_TIME,
    ))?;
    Ok(account)
}

/// An account without a plan and the given balance.
pub fn inactive_account(balance: Amount) -> crate::Result<Account> {
    let mut account = standalone("member");
    if !balance.is_zero() {
        account.apply(Posting::new(
            None,
            Effect::Salary(balance),
            "test funds",
            TEST_TIME,
        ))?;
    }
    Ok(account)
}
