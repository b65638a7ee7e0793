//! Eligibility rules.
//!
//! The rules are pure functions of the state observed when a request is
//! submitted or a balance is about to be mutated. They are never re-evaluated
//! when a queued request is decided.

use time::{Date, OffsetDateTime};

use crate::{
    account::Account,
    amount::Amount,
    params::{SalaryTier, WithdrawalWindow},
};

/// Number of referees with an active plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferralCounts {
    /// Level-1 referees.
    pub direct: u32,
    /// Level-2 referees.
    pub indirect: u32,
}

/// Check the daily task cap.
///
/// The counter of completed tasks is considered reset when the last
/// completion did not happen on `today`. Returns the number of tasks
/// already completed today.
pub fn check_daily_task_cap(account: &Account, today: Date) -> crate::Result<u32> {
    let completed = if account.last_completed_date() == Some(today) {
        account.tasks_completed_today()
    } else {
        0
    };
    if completed >= account.daily_task_limit() {
        return Err(crate::Error::DailyLimitReached(account.daily_task_limit()));
    }
    Ok(completed)
}

/// Check that `local_now` is inside the withdrawal window.
pub fn check_withdrawal_window(
    window: &WithdrawalWindow,
    local_now: OffsetDateTime,
) -> crate::Result<()> {
    if window.is_open(local_now.weekday(), local_now.hour()) {
        Ok(())
    } else {
        Err(crate::Error::OutsideWindow(
            window.start_hour(),
            window.end_hour(),
        ))
    }
}

/// Check a withdrawal request.
///
/// `withdrawals_today` is the number of pending or approved withdrawals the
/// member submitted on the local date of `local_now`.
pub fn check_withdrawal(
    account: &Account,
    amount: &Amount,
    window: &WithdrawalWindow,
    local_now: OffsetDateTime,
    withdrawals_today: usize,
) -> crate::Result<()> {
    if amount.is_zero() {
        return Err(crate::Error::InvalidArgument(
            "withdrawal amount must be positive",
        ));
    }
    check_withdrawal_window(window, local_now)?;
    if !account.is_plan_active() {
        return Err(crate::Error::NotActivated);
    }
    if account.balance() < *amount {
        return Err(crate::Error::InsufficientBalance {
            required: *amount,
            available: account.balance(),
        });
    }
    if withdrawals_today > 0 {
        return Err(crate::Error::DuplicateWithdrawalToday);
    }
    Ok(())
}

/// Check the monthly salary cooldown.
pub fn check_salary_cooldown(account: &Account, today: Date) -> crate::Result<()> {
    match account.last_salary_claim_date() {
        Some(last) if last.year() == today.year() && last.month() == today.month() => {
            Err(crate::Error::AlreadyClaimedThisPeriod)
        }
        _ => Ok(()),
    }
}

/// Check a salary claim against the cooldown and the tier thresholds.
pub fn check_salary_claim(
    account: &Account,
    tier: &SalaryTier,
    counts: &ReferralCounts,
    today: Date,
) -> crate::Result<()> {
    check_salary_cooldown(account, today)?;
    if counts.direct < tier.direct_referrals || counts.indirect < tier.indirect_referrals {
        return Err(crate::Error::ThresholdNotMet {
            required_direct: tier.direct_referrals,
            required_indirect: tier.indirect_referrals,
            direct: counts.direct,
            indirect: counts.indirect,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use crate::{
        test::{active_account, inactive_account},
        ErrorKind,
    };

    use super::*;

    #[test]
    fn daily_cap_resets_on_new_day() -> crate::Result<()> {
        let mut account = active_account(1, Amount::ZERO)?;
        let today = date!(2024 - 03 - 05);
        assert_eq!(check_daily_task_cap(&account, today)?, 0);
        account.record_task_completion(today)?;
        assert_eq!(
            check_daily_task_cap(&account, today).unwrap_err().kind(),
            ErrorKind::DailyLimitReached
        );
        assert_eq!(check_daily_task_cap(&account, date!(2024 - 03 - 06))?, 0);
        Ok(())
    }

    #[test]
    fn inactive_account_has_no_tasks() -> crate::Result<()> {
        let account = inactive_account(Amount::ZERO)?;
        assert_eq!(
            check_daily_task_cap(&account, date!(2024 - 03 - 05))
                .unwrap_err()
                .kind(),
            ErrorKind::DailyLimitReached
        );
        Ok(())
    }

    #[test]
    fn withdrawal_window_boundaries() {
        let window = WithdrawalWindow::default();
        // 2024-03-04 is a Monday.
        assert!(check_withdrawal_window(&window, datetime!(2024-03-04 10:00 UTC)).is_ok());
        assert!(check_withdrawal_window(&window, datetime!(2024-03-04 16:59 UTC)).is_ok());
        assert!(check_withdrawal_window(&window, datetime!(2024-03-04 9:59 UTC)).is_err());
        assert!(check_withdrawal_window(&window, datetime!(2024-03-04 17:00 UTC)).is_err());
        assert!(check_withdrawal_window(&window, datetime!(2024-03-07 12:00 UTC)).is_ok());
        assert!(check_withdrawal_window(&window, datetime!(2024-03-08 12:00 UTC)).is_err());
        assert!(check_withdrawal_window(&window, datetime!(2024-03-10 12:00 UTC)).is_err());
    }

    #[test]
    fn withdrawal_rules_in_order() -> crate::Result<()> {
        let window = WithdrawalWindow::default();
        let friday = datetime!(2024-03-08 12:00 UTC);
        let tuesday = datetime!(2024-03-05 11:00 UTC);
        let amount = Amount::from_units(50)?;

        let account = active_account(1, Amount::from_units(100)?)?;
        let kind = |r: crate::Result<()>| r.unwrap_err().kind();
        assert_eq!(
            kind(check_withdrawal(&account, &amount, &window, friday, 0)),
            ErrorKind::OutsideWindow
        );
        check_withdrawal(&account, &amount, &window, tuesday, 0)?;
        assert_eq!(
            kind(check_withdrawal(&account, &amount, &window, tuesday, 1)),
            ErrorKind::DuplicateWithdrawalToday
        );
        assert_eq!(
            kind(check_withdrawal(
                &account,
                &Amount::from_units(101)?,
                &window,
                tuesday,
                0
            )),
            ErrorKind::InsufficientBalance
        );

        let inactive = inactive_account(Amount::from_units(100)?)?;
        assert_eq!(
            kind(check_withdrawal(&inactive, &amount, &window, tuesday, 0)),
            ErrorKind::NotActivated
        );
        Ok(())
    }

    #[test]
    fn salary_cooldown_is_monthly() -> crate::Result<()> {
        let tier = SalaryTier::builder()
            .id(1)
            .direct_referrals(2)
            .indirect_referrals(1)
            .amount(Amount::from_units(30)?)
            .build();
        let counts = ReferralCounts {
            direct: 2,
            indirect: 1,
        };
        let mut account = active_account(1, Amount::ZERO)?;
        let today = date!(2024 - 03 - 31);
        check_salary_claim(&account, &tier, &counts, today)?;
        account.record_salary_claim(today);
        assert_eq!(
            check_salary_claim(&account, &tier, &counts, date!(2024 - 03 - 01))
                .unwrap_err()
                .kind(),
            ErrorKind::AlreadyClaimedThisPeriod
        );
        check_salary_claim(&account, &tier, &counts, date!(2024 - 04 - 01))?;
        // Same month of another year.
        check_salary_claim(&account, &tier, &counts, date!(2025 - 03 - 10))?;

        let short = ReferralCounts {
            direct: 2,
            indirect: 0,
        };
        assert_eq!(
            check_salary_claim(&account, &tier, &short, date!(2024 - 04 - 01))
                .unwrap_err()
                .kind(),
            ErrorKind::ThresholdNotMet
        );
        Ok(())
    }
}
