//! Trade, protocol and fund fee computation
//!
//! Rates are parts per [`FEE_RATE_DENOMINATOR`] (1_000_000 = 100%). The trade
//! fee rounds up. Protocol and fund shares are carved out of the trade fee
//! rounding down; whatever remains stays in the pool as LP yield.

use crate::error::{AmmError, AmmResult};
use crate::fixed_point::{mul_div, to_u64, Rounding};
use serde::{Deserialize, Serialize};

/// 100% expressed as a fee rate
pub const FEE_RATE_DENOMINATOR: u64 = 1_000_000;

/// Breakdown of one trade fee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub trade_fee: u64,
    pub protocol_fee: u64,
    pub fund_fee: u64,
}

impl FeeSplit {
    /// Portion of the trade fee retained by liquidity providers
    pub fn lp_fee(&self) -> u64 {
        // protocol_fee + fund_fee <= trade_fee whenever the rates sum to <= 100%
        self.trade_fee - self.protocol_fee - self.fund_fee
    }
}

/// Fee computations over the 1_000_000 denominator
pub struct FeeModel;

impl FeeModel {
    /// Reject any rate above 100%
    pub fn validate_rate(rate: u64) -> AmmResult<()> {
        if rate > FEE_RATE_DENOMINATOR {
            return Err(AmmError::InvalidFeeRate {
                rate,
                reason: "rate exceeds 100%",
            });
        }
        Ok(())
    }

    /// Validate a protocol/fund rate pair, including their sum
    pub fn validate_split_rates(protocol_rate: u64, fund_rate: u64) -> AmmResult<()> {
        Self::validate_rate(protocol_rate)?;
        Self::validate_rate(fund_rate)?;
        let combined = protocol_rate + fund_rate;
        if combined > FEE_RATE_DENOMINATOR {
            return Err(AmmError::InvalidFeeRate {
                rate: combined,
                reason: "protocol and fund rates sum past 100%",
            });
        }
        Ok(())
    }

    /// `ceil(amount * rate / 1_000_000)`
    pub fn compute_trade_fee(amount: u64, fee_rate: u64) -> AmmResult<u64> {
        Self::validate_rate(fee_rate)?;
        let fee = mul_div(
            u128::from(amount),
            u128::from(fee_rate),
            u128::from(FEE_RATE_DENOMINATOR),
            Rounding::Up,
        )?;
        to_u64(fee, "trade fee")
    }

    /// Split a trade fee into `(protocol_fee, fund_fee)`, each rounded down
    pub fn split_protocol_and_fund_fee(
        trade_fee: u64,
        protocol_rate: u64,
        fund_rate: u64,
    ) -> AmmResult<(u64, u64)> {
        Self::validate_split_rates(protocol_rate, fund_rate)?;
        let share = |rate: u64| -> AmmResult<u64> {
            let amount = mul_div(
                u128::from(trade_fee),
                u128::from(rate),
                u128::from(FEE_RATE_DENOMINATOR),
                Rounding::Down,
            )?;
            to_u64(amount, "fee share")
        };
        Ok((share(protocol_rate)?, share(fund_rate)?))
    }

    /// Build a full [`FeeSplit`] for a trade fee
    pub fn split(trade_fee: u64, protocol_rate: u64, fund_rate: u64) -> AmmResult<FeeSplit> {
        let (protocol_fee, fund_fee) =
            Self::split_protocol_and_fund_fee(trade_fee, protocol_rate, fund_rate)?;
        Ok(FeeSplit {
            trade_fee,
            protocol_fee,
            fund_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_fee_rounds_up() {
        // 0.25% of 1001 = 2.5025 -> 3
        assert_eq!(FeeModel::compute_trade_fee(1001, 2_500).unwrap(), 3);
        // 10% of 100_000_000
        assert_eq!(
            FeeModel::compute_trade_fee(100_000_000, 100_000).unwrap(),
            10_000_000
        );
        // Any non-zero rate charges at least one unit
        assert_eq!(FeeModel::compute_trade_fee(1, 1).unwrap(), 1);
        assert_eq!(FeeModel::compute_trade_fee(0, 2_500).unwrap(), 0);
        assert_eq!(FeeModel::compute_trade_fee(12_345, 0).unwrap(), 0);
    }

    #[test]
    fn test_trade_fee_full_rate() {
        assert_eq!(
            FeeModel::compute_trade_fee(u64::MAX, FEE_RATE_DENOMINATOR).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn test_invalid_rate_rejected() {
        assert!(matches!(
            FeeModel::compute_trade_fee(100, FEE_RATE_DENOMINATOR + 1),
            Err(AmmError::InvalidFeeRate { rate: 1_000_001, .. })
        ));
        assert!(FeeModel::split_protocol_and_fund_fee(100, 600_000, 500_000).is_err());
        assert!(FeeModel::split_protocol_and_fund_fee(100, 2_000_000, 0).is_err());
    }

    #[test]
    fn test_split_rounds_down() {
        // 12% protocol, 4% fund of a 999 unit fee
        let (protocol, fund) =
            FeeModel::split_protocol_and_fund_fee(999, 120_000, 40_000).unwrap();
        assert_eq!(protocol, 119);
        assert_eq!(fund, 39);

        let split = FeeModel::split(999, 120_000, 40_000).unwrap();
        assert_eq!(split.lp_fee(), 999 - 119 - 39);
    }

    #[test]
    fn test_split_full_allocation() {
        let split = FeeModel::split(1_000, 750_000, 250_000).unwrap();
        assert_eq!(split.protocol_fee, 750);
        assert_eq!(split.fund_fee, 250);
        assert_eq!(split.lp_fee(), 0);
    }
}
