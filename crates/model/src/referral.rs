use crate::{
    account::{Account, AccountId},
    store::AccountStore,
};

/// Number of referral levels that earn commissions.
pub const COMMISSION_LEVELS: usize = 2;

/// Upper bound of the ancestor walk performed when validating a new referrer.
const MAX_ANCESTOR_DEPTH: usize = 1024;

/// The referrers of an account, nearest first.
#[derive(Debug, Clone, Default)]
pub struct ReferralChain {
    level_1: Option<Account>,
    level_2: Option<Account>,
}

impl ReferralChain {
    /// Get the referrer at the given level (1 or 2).
    pub fn level(&self, level: u8) -> Option<&Account> {
        match level {
            1 => self.level_1.as_ref(),
            2 => self.level_2.as_ref(),
            _ => None,
        }
    }

    /// Get the length of the chain.
    pub fn len(&self) -> usize {
        match (&self.level_1, &self.level_2) {
            (None, _) => 0,
            (Some(_), None) => 1,
            (Some(_), Some(_)) => 2,
        }
    }

    /// Returns whether the account has no referrer.
    pub fn is_empty(&self) -> bool {
        self.level_1.is_none()
    }

    /// Iterate over `(level, referrer)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Account)> {
        [(1, self.level_1.as_ref()), (2, self.level_2.as_ref())]
            .into_iter()
            .filter_map(|(level, account)| Some((level, account?)))
    }
}

/// Resolve the up-to-two-level referral chain of the given account.
///
/// The walk stops early when a referrer is absent, including a referrer
/// that has been removed from the store.
pub fn resolve_chain<S: AccountStore + ?Sized>(
    store: &S,
    account: &Account,
) -> crate::Result<ReferralChain> {
    let level_1 = lookup(store, account.referrer())?;
    let level_2 = match level_1.as_ref() {
        Some(referrer) => lookup(store, referrer.referrer())?,
        None => None,
    };
    Ok(ReferralChain { level_1, level_2 })
}

fn lookup<S: AccountStore + ?Sized>(
    store: &S,
    id: Option<AccountId>,
) -> crate::Result<Option<Account>> {
    let Some(id) = id else {
        return Ok(None);
    };
    match store.account(id) {
        Ok(account) => Ok(Some(account)),
        Err(crate::Error::NotFound(..)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Validate that `referrer` may become the referrer of the account with
/// the given handle.
///
/// Rejects self referral and any ancestor chain that leads back to the
/// account.
pub fn validate_referrer<S: AccountStore + ?Sized>(
    store: &S,
    handle: &str,
    referrer: &Account,
) -> crate::Result<()> {
    if referrer.handle() == handle {
        return Err(crate::Error::SelfReferral);
    }
    let mut next = referrer.referrer();
    for _ in 0..MAX_ANCESTOR_DEPTH {
        let Some(id) = next else {
            return Ok(());
        };
        if id == referrer.id() {
            return Err(crate::Error::ReferralCycle);
        }
        let ancestor = match store.account(id) {
            Ok(ancestor) => ancestor,
            Err(crate::Error::NotFound(..)) => return Ok(()),
            Err(err) => return Err(err),
        };
        if ancestor.handle() == handle {
            return Err(crate::Error::ReferralCycle);
        }
        next = ancestor.referrer();
    }
    Err(crate::Error::ReferralCycle)
}

#[cfg(test)]
mod tests {
    use crate::test::TestStore;

    use super::*;

    #[test]
    fn chain_lengths() -> crate::Result<()> {
        let store = TestStore::default();
        let r2 = store.signup("r2", None)?;
        let r1 = store.signup("r1", Some(r2.id()))?;
        let m = store.signup("m", Some(r1.id()))?;
        let leaf = store.signup("leaf", Some(m.id()))?;

        assert_eq!(resolve_chain(&store, &r2)?.len(), 0);
        assert_eq!(resolve_chain(&store, &r1)?.len(), 1);

        let chain = resolve_chain(&store, &m)?;
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.level(1).map(Account::id), Some(r1.id()));
        assert_eq!(chain.level(2).map(Account::id), Some(r2.id()));

        // Deeper ancestors exist but are not part of the chain.
        let chain = resolve_chain(&store, &leaf)?;
        assert_eq!(chain.iter().map(|(_, a)| a.id()).collect::<Vec<_>>(), vec![m.id(), r1.id()]);
        Ok(())
    }

    #[test]
    fn removed_referrer_shortens_chain() -> crate::Result<()> {
        let store = TestStore::default();
        let r2 = store.signup("r2", None)?;
        let r1 = store.signup("r1", Some(r2.id()))?;
        let m = store.signup("m", Some(r1.id()))?;
        store.remove_account(r2.id())?;
        assert_eq!(resolve_chain(&store, &m)?.len(), 1);
        Ok(())
    }

    #[test]
    fn self_referral_is_rejected() -> crate::Result<()> {
        let store = TestStore::default();
        let alice = store.signup("alice", None)?;
        let bob = store.signup("bob", Some(alice.id()))?;
        assert_eq!(
            validate_referrer(&store, "alice", &alice),
            Err(crate::Error::SelfReferral)
        );
        assert_eq!(
            validate_referrer(&store, "alice", &bob),
            Err(crate::Error::ReferralCycle)
        );
        validate_referrer(&store, "carol", &bob)?;
        Ok(())
    }
}
