use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use rewardnet_model::{
    Account, AccountId, AccountStore, Entity, NewAccount, NewTask, OperatorAccount, OperatorStore,
    Task, TaskId, TaskStore,
};

type Slot<T> = Arc<Mutex<T>>;

#[derive(Debug, Default)]
struct Accounts {
    by_id: BTreeMap<AccountId, Slot<Account>>,
    by_handle: HashMap<String, AccountId>,
    by_code: HashMap<String, AccountId>,
    referees: HashMap<AccountId, BTreeSet<AccountId>>,
    last_id: u64,
}

impl Accounts {
    fn insert(&mut self, account: Account) -> rewardnet_model::Result<()> {
        let id = account.id();
        if self.by_id.contains_key(&id) {
            return Err(rewardnet_model::Error::Conflict("account id", id.to_string()));
        }
        if self.by_handle.contains_key(account.handle()) {
            return Err(rewardnet_model::Error::Conflict(
                "handle",
                account.handle().to_string(),
            ));
        }
        if self.by_code.contains_key(account.referral_code()) {
            return Err(rewardnet_model::Error::Conflict(
                "referral code",
                account.referral_code().to_string(),
            ));
        }
        self.by_handle.insert(account.handle().to_string(), id);
        self.by_code.insert(account.referral_code().to_string(), id);
        if let Some(referrer) = account.referrer() {
            self.referees.entry(referrer).or_default().insert(id);
        }
        self.last_id = self.last_id.max(id.get());
        self.by_id.insert(id, Arc::new(Mutex::new(account)));
        Ok(())
    }

    fn slot(&self, id: &AccountId) -> rewardnet_model::Result<&Slot<Account>> {
        self.by_id
            .get(id)
            .ok_or_else(|| rewardnet_model::Error::NotFound(Entity::Account, id.to_string()))
    }
}

#[derive(Debug, Default)]
struct Tasks {
    by_id: BTreeMap<TaskId, Task>,
    last_id: u64,
}

/// Id counters of a [`MemoryStore`].
///
/// Ids of removed records are never reused, so the counters are persisted
/// along with the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Counters {
    /// The last assigned account id.
    pub last_account_id: u64,
    /// The last assigned task id.
    pub last_task_id: u64,
}

/// In-memory store of accounts, the operator account and tasks.
///
/// Every account lives in its own slot guarded by a mutex, so updates of
/// the same account are serialized while updates of different accounts run
/// in parallel. Each committed update increments the version of the record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<Accounts>,
    operator: Mutex<OperatorAccount>,
    tasks: RwLock<Tasks>,
}

impl MemoryStore {
    /// Restore a store from its records.
    pub fn from_records(
        accounts: impl IntoIterator<Item = Account>,
        operator: OperatorAccount,
        tasks: impl IntoIterator<Item = Task>,
        counters: Counters,
    ) -> rewardnet_model::Result<Self> {
        let mut restored_accounts = Accounts::default();
        for account in accounts {
            restored_accounts.insert(account)?;
        }
        restored_accounts.last_id = restored_accounts.last_id.max(counters.last_account_id);

        let mut restored_tasks = Tasks::default();
        for task in tasks {
            let id = task.id();
            if restored_tasks.by_id.insert(id, task).is_some() {
                return Err(rewardnet_model::Error::Conflict("task id", id.to_string()));
            }
            restored_tasks.last_id = restored_tasks.last_id.max(id.get());
        }
        restored_tasks.last_id = restored_tasks.last_id.max(counters.last_task_id);

        Ok(Self {
            accounts: RwLock::new(restored_accounts),
            operator: Mutex::new(operator),
            tasks: RwLock::new(restored_tasks),
        })
    }

    /// Get the id counters.
    pub fn counters(&self) -> Counters {
        Counters {
            last_account_id: self.accounts.read().last_id,
            last_task_id: self.tasks.read().last_id,
        }
    }

    /// Get all accounts, ordered by id.
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts
            .read()
            .by_id
            .values()
            .map(|slot| slot.lock().clone())
            .collect()
    }

    /// Get the account with the given handle.
    pub fn account_by_handle(&self, handle: &str) -> rewardnet_model::Result<Account> {
        let accounts = self.accounts.read();
        let id = accounts
            .by_handle
            .get(handle)
            .ok_or_else(|| rewardnet_model::Error::NotFound(Entity::Account, handle.to_string()))?;
        let account = accounts.slot(id)?.lock().clone();
        Ok(account)
    }
}

impl AccountStore for MemoryStore {
    fn account(&self, id: AccountId) -> rewardnet_model::Result<Account> {
        let accounts = self.accounts.read();
        let account = accounts.slot(&id)?.lock().clone();
        Ok(account)
    }

    fn account_by_referral_code(&self, code: &str) -> rewardnet_model::Result<Account> {
        let accounts = self.accounts.read();
        let id = accounts.by_code.get(code).ok_or_else(|| {
            rewardnet_model::Error::NotFound(Entity::ReferralCode, code.to_string())
        })?;
        let account = accounts.slot(id)?.lock().clone();
        Ok(account)
    }

    fn create_account(&self, params: NewAccount) -> rewardnet_model::Result<Account> {
        let mut accounts = self.accounts.write();
        let next = accounts
            .last_id
            .checked_add(1)
            .ok_or(rewardnet_model::Error::Overflow)?;
        let account = Account::new(AccountId::new(next), params);
        accounts.insert(account.clone())?;
        Ok(account)
    }

    fn update_account<T>(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut Account) -> rewardnet_model::Result<T>,
    ) -> rewardnet_model::Result<(Account, T)> {
        // The read guard keeps the slot from being removed while it is updated.
        let accounts = self.accounts.read();
        let mut current = accounts.slot(&id)?.lock();
        let mut next = current.clone();
        let output = f(&mut next)?;
        next.increment_version()?;
        *current = next.clone();
        Ok((next, output))
    }

    fn referees(&self, id: AccountId) -> rewardnet_model::Result<Vec<Account>> {
        let accounts = self.accounts.read();
        let Some(referees) = accounts.referees.get(&id) else {
            return Ok(Vec::new());
        };
        referees
            .iter()
            .map(|referee| Ok(accounts.slot(referee)?.lock().clone()))
            .collect()
    }

    fn remove_account(&self, id: AccountId) -> rewardnet_model::Result<Account> {
        let mut accounts = self.accounts.write();
        let slot = accounts
            .by_id
            .remove(&id)
            .ok_or_else(|| rewardnet_model::Error::NotFound(Entity::Account, id.to_string()))?;
        let account = slot.lock().clone();
        accounts.by_handle.remove(account.handle());
        accounts.by_code.remove(account.referral_code());
        accounts.referees.remove(&id);
        if let Some(referrer) = account.referrer() {
            if let Some(siblings) = accounts.referees.get_mut(&referrer) {
                siblings.remove(&id);
            }
        }
        Ok(account)
    }
}

impl OperatorStore for MemoryStore {
    fn operator(&self) -> rewardnet_model::Result<OperatorAccount> {
        Ok(self.operator.lock().clone())
    }

    fn update_operator<T>(
        &self,
        f: impl FnOnce(&mut OperatorAccount) -> rewardnet_model::Result<T>,
    ) -> rewardnet_model::Result<(OperatorAccount, T)> {
        let mut current = self.operator.lock();
        let mut next = current.clone();
        let output = f(&mut next)?;
        next.increment_version()?;
        *current = next.clone();
        Ok((next, output))
    }
}

impl TaskStore for MemoryStore {
    fn task(&self, id: TaskId) -> rewardnet_model::Result<Task> {
        self.tasks
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| rewardnet_model::Error::NotFound(Entity::Task, id.to_string()))
    }

    fn tasks(&self) -> rewardnet_model::Result<Vec<Task>> {
        Ok(self.tasks.read().by_id.values().cloned().collect())
    }

    fn create_task(&self, params: NewTask) -> rewardnet_model::Result<Task> {
        let mut tasks = self.tasks.write();
        let next = tasks
            .last_id
            .checked_add(1)
            .ok_or(rewardnet_model::Error::Overflow)?;
        let task = Task::new(TaskId::new(next), params)?;
        tasks.last_id = next;
        tasks.by_id.insert(task.id(), task.clone());
        Ok(task)
    }

    fn record_task_completion(&self, id: TaskId) -> rewardnet_model::Result<Task> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .by_id
            .get_mut(&id)
            .ok_or_else(|| rewardnet_model::Error::NotFound(Entity::Task, id.to_string()))?;
        task.record_completion()?;
        Ok(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rewardnet_model::{AccountStoreExt, Amount, Effect, ErrorKind, Posting};
    use time::OffsetDateTime;

    use super::*;

    fn new_account(handle: &str, referrer: Option<AccountId>) -> NewAccount {
        NewAccount {
            handle: handle.to_string(),
            contact: format!("{handle}@example.com"),
            referral_code: handle.to_uppercase(),
            referrer,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn uniqueness() -> rewardnet_model::Result<()> {
        let store = MemoryStore::default();
        let alice = store.create_account(new_account("alice", None))?;
        let err = store.create_account(new_account("alice", None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let mut same_code = new_account("bob", None);
        same_code.referral_code = alice.referral_code().to_string();
        let err = store.create_account(same_code).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.account_by_referral_code("ALICE")?.id(), alice.id());
        assert_eq!(store.account_by_handle("alice")?.id(), alice.id());
        Ok(())
    }

    #[test]
    fn failed_update_writes_nothing() -> rewardnet_model::Result<()> {
        let store = MemoryStore::default();
        let alice = store.create_account(new_account("alice", None))?;
        let err = store
            .update_account(alice.id(), |account| {
                account.apply(Posting::new(
                    None,
                    Effect::Salary(Amount::from_units(1)?),
                    "salary",
                    OffsetDateTime::UNIX_EPOCH,
                ))?;
                Err::<(), _>(rewardnet_model::Error::StorageUnavailable(
                    "injected".to_string(),
                ))
            })
            .unwrap_err();
        assert!(err.is_retryable());
        let alice = store.account(alice.id())?;
        assert_eq!(alice.balance(), Amount::ZERO);
        assert_eq!(alice.version(), 0);
        Ok(())
    }

    #[test]
    fn removal_updates_indexes() -> rewardnet_model::Result<()> {
        let store = MemoryStore::default();
        let alice = store.create_account(new_account("alice", None))?;
        let bob = store.create_account(new_account("bob", Some(alice.id())))?;
        assert_eq!(store.referees(alice.id())?.len(), 1);
        store.remove_account(bob.id())?;
        assert!(store.referees(alice.id())?.is_empty());
        assert_eq!(
            store.account(bob.id()).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        // The handle is free again, but the id is never reused.
        let bob2 = store.create_account(new_account("bob", None))?;
        assert_ne!(bob2.id(), bob.id());
        Ok(())
    }

    #[test]
    fn concurrent_updates_do_not_lose_writes() -> rewardnet_model::Result<()> {
        let store = Arc::new(MemoryStore::default());
        let alice = store.create_account(new_account("alice", None))?.id();
        let handles = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || -> rewardnet_model::Result<()> {
                    for _ in 0..100 {
                        store.post(
                            alice,
                            Posting::new(
                                None,
                                Effect::Salary(Amount::from_minor(1)),
                                "salary",
                                OffsetDateTime::UNIX_EPOCH,
                            ),
                        )?;
                    }
                    Ok(())
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("worker panicked")?;
        }
        let alice = store.account(alice)?;
        assert_eq!(alice.balance(), Amount::from_minor(800));
        assert_eq!(alice.version(), 800);
        Ok(())
    }
}
