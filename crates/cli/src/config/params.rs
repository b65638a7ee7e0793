use eyre::OptionExt;
use rewardnet_model::{
    Amount, Factor, LedgerParams, SalaryTier, TaskSplit, WithdrawalWindow,
};
use time::{UtcOffset, Weekday};

/// Ledger parameters as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    /// Level-1 share of task rewards, in basis points.
    pub task_level_1_bps: u32,
    /// Level-2 share of task rewards, in basis points.
    pub task_level_2_bps: u32,
    /// Days withdrawals may be requested on.
    pub withdrawal_days: Vec<String>,
    /// First hour of the withdrawal window.
    pub withdrawal_start_hour: u8,
    /// Hour the withdrawal window closes at.
    pub withdrawal_end_hour: u8,
    /// Offset of the local time, in hours.
    pub utc_offset_hours: i8,
    /// Salary tiers.
    pub salary_tiers: Vec<TierConfig>,
}

/// A salary tier as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TierConfig {
    /// Tier id.
    pub id: u32,
    /// Required direct referrals with an active plan.
    pub direct_referrals: u32,
    /// Required indirect referrals with an active plan.
    pub indirect_referrals: u32,
    /// Monthly salary, as a decimal string.
    pub amount: String,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        let split = TaskSplit::default();
        let window = WithdrawalWindow::default();
        Self {
            task_level_1_bps: split.level_1().bps(),
            task_level_2_bps: split.level_2().bps(),
            withdrawal_days: window
                .days()
                .iter()
                .map(|day| day.to_string().to_lowercase())
                .collect(),
            withdrawal_start_hour: window.start_hour(),
            withdrawal_end_hour: window.end_hour(),
            utc_offset_hours: 0,
            salary_tiers: vec![
                TierConfig {
                    id: 1,
                    direct_referrals: 5,
                    indirect_referrals: 10,
                    amount: "50".to_string(),
                },
                TierConfig {
                    id: 2,
                    direct_referrals: 10,
                    indirect_referrals: 25,
                    amount: "150".to_string(),
                },
            ],
        }
    }
}

impl ParamsConfig {
    /// Build the ledger params.
    pub fn to_params(&self) -> eyre::Result<LedgerParams> {
        let task_split = TaskSplit::builder()
            .level_1(Factor::from_bps(self.task_level_1_bps)?)
            .level_2(Factor::from_bps(self.task_level_2_bps)?)
            .build();
        if self.withdrawal_start_hour >= self.withdrawal_end_hour || self.withdrawal_end_hour > 24
        {
            eyre::bail!(
                "invalid withdrawal window: {}:00 to {}:00",
                self.withdrawal_start_hour,
                self.withdrawal_end_hour
            );
        }
        let withdrawal_window = WithdrawalWindow::builder()
            .days(
                self.withdrawal_days
                    .iter()
                    .map(|day| parse_weekday(day))
                    .collect::<eyre::Result<Vec<_>>>()?,
            )
            .start_hour(self.withdrawal_start_hour)
            .end_hour(self.withdrawal_end_hour)
            .build();
        let salary_tiers = self
            .salary_tiers
            .iter()
            .map(|tier| {
                Ok(SalaryTier::builder()
                    .id(tier.id)
                    .direct_referrals(tier.direct_referrals)
                    .indirect_referrals(tier.indirect_referrals)
                    .amount(tier.amount.parse::<Amount>()?)
                    .build())
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        let utc_offset = UtcOffset::from_hms(self.utc_offset_hours, 0, 0)?;
        Ok(LedgerParams::builder()
            .task_split(task_split)
            .withdrawal_window(withdrawal_window)
            .salary_tiers(salary_tiers)
            .utc_offset(utc_offset)
            .build())
    }
}

fn parse_weekday(day: &str) -> eyre::Result<Weekday> {
    const DAYS: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];
    DAYS.into_iter()
        .find(|weekday| weekday.to_string().eq_ignore_ascii_case(day.trim()))
        .ok_or_eyre(format!("unknown weekday `{day}`"))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn defaults_match_ledger_defaults() -> eyre::Result<()> {
        let params = ParamsConfig::default().to_params()?;
        assert_eq!(params.task_split(), &TaskSplit::default());
        assert_eq!(params.withdrawal_window(), &WithdrawalWindow::default());
        assert_eq!(params.salary_tiers().len(), 2);
        assert_eq!(params.salary_tier(2)?.amount, Amount::from_units(150)?);
        Ok(())
    }

    #[test]
    fn rejects_bad_values() {
        let bad_day = ParamsConfig {
            withdrawal_days: vec!["someday".to_string()],
            ..Default::default()
        };
        assert!(bad_day.to_params().is_err());

        let bad_window = ParamsConfig {
            withdrawal_start_hour: 17,
            withdrawal_end_hour: 10,
            ..Default::default()
        };
        assert!(bad_window.to_params().is_err());

        let bad_split = ParamsConfig {
            task_level_1_bps: 20_000,
            ..Default::default()
        };
        assert!(bad_split.to_params().is_err());
    }

    #[test]
    fn tier_amounts_are_decimal() -> eyre::Result<()> {
        let config = ParamsConfig {
            salary_tiers: vec![TierConfig {
                id: 3,
                direct_referrals: 1,
                indirect_referrals: 0,
                amount: "12.5".to_string(),
            }],
            ..Default::default()
        };
        let params = config.to_params()?;
        assert_eq!(
            params.salary_tier(3)?.amount,
            Amount::from_decimal(dec!(12.50))?
        );
        assert!(ParamsConfig {
            salary_tiers: vec![TierConfig {
                id: 3,
                direct_referrals: 1,
                indirect_referrals: 0,
                amount: "-1".to_string(),
            }],
            ..Default::default()
        }
        .to_params()
        .is_err());
        Ok(())
    }

    #[test]
    fn weekdays_are_case_insensitive() -> eyre::Result<()> {
        assert_eq!(parse_weekday(" Friday ")?, Weekday::Friday);
        assert_eq!(parse_weekday("sunday")?, Weekday::Sunday);
        Ok(())
    }
}
