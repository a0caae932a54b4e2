//! Fee configuration shared by every pool created under one index

use crate::curve::TradeDirection;
use crate::error::AmmResult;
use crate::fees::FeeModel;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Protocol fee configuration, keyed by `index`
///
/// All rates are parts per 1_000_000. Construct through [`AmmConfig::new`]
/// or validate deserialized values with [`AmmConfig::validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmConfig {
    pub index: u16,
    /// Fee charged on token0 -> token1 trades
    pub trade_fee_rate_zero_to_one: u64,
    /// Fee charged on token1 -> token0 trades
    pub trade_fee_rate_one_to_zero: u64,
    /// Share of the trade fee accrued to the protocol
    pub protocol_fee_rate: u64,
    /// Share of the trade fee accrued to the fund
    pub fund_fee_rate: u64,
    /// Flat pool creation fee, charged by the caller's environment
    pub create_pool_fee: u64,
    #[serde(default)]
    pub disable_create_pool: bool,
}

/// A single validated change to an [`AmmConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigUpdate {
    TradeFeeRateZeroToOne(u64),
    TradeFeeRateOneToZero(u64),
    ProtocolFeeRate(u64),
    FundFeeRate(u64),
    CreatePoolFee(u64),
    DisableCreatePool(bool),
}

impl AmmConfig {
    pub fn new(
        index: u16,
        trade_fee_rate_zero_to_one: u64,
        trade_fee_rate_one_to_zero: u64,
        protocol_fee_rate: u64,
        fund_fee_rate: u64,
        create_pool_fee: u64,
    ) -> AmmResult<Self> {
        let config = Self {
            index,
            trade_fee_rate_zero_to_one,
            trade_fee_rate_one_to_zero,
            protocol_fee_rate,
            fund_fee_rate,
            create_pool_fee,
            disable_create_pool: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every rate invariant
    pub fn validate(&self) -> AmmResult<()> {
        FeeModel::validate_rate(self.trade_fee_rate_zero_to_one)?;
        FeeModel::validate_rate(self.trade_fee_rate_one_to_zero)?;
        FeeModel::validate_split_rates(self.protocol_fee_rate, self.fund_fee_rate)
    }

    /// Trade fee rate for the given direction
    pub fn trade_fee_rate(&self, direction: TradeDirection) -> u64 {
        match direction {
            TradeDirection::ZeroForOne => self.trade_fee_rate_zero_to_one,
            TradeDirection::OneForZero => self.trade_fee_rate_one_to_zero,
        }
    }

    /// Apply a reconfiguration; on error `self` is left unchanged
    pub fn apply_update(&mut self, update: ConfigUpdate) -> AmmResult<()> {
        let mut next = *self;
        match update {
            ConfigUpdate::TradeFeeRateZeroToOne(rate) => next.trade_fee_rate_zero_to_one = rate,
            ConfigUpdate::TradeFeeRateOneToZero(rate) => next.trade_fee_rate_one_to_zero = rate,
            ConfigUpdate::ProtocolFeeRate(rate) => next.protocol_fee_rate = rate,
            ConfigUpdate::FundFeeRate(rate) => next.fund_fee_rate = rate,
            ConfigUpdate::CreatePoolFee(fee) => next.create_pool_fee = fee,
            ConfigUpdate::DisableCreatePool(disabled) => next.disable_create_pool = disabled,
        }
        next.validate()?;
        info!(index = self.index, ?update, "AMM config updated");
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AmmError;

    #[test]
    fn test_new_validates_rates() {
        assert!(AmmConfig::new(0, 2_500, 2_500, 120_000, 40_000, 0).is_ok());
        assert!(matches!(
            AmmConfig::new(0, 1_000_001, 2_500, 0, 0, 0),
            Err(AmmError::InvalidFeeRate { .. })
        ));
        assert!(matches!(
            AmmConfig::new(0, 2_500, 2_500, 700_000, 300_001, 0),
            Err(AmmError::InvalidFeeRate { rate: 1_000_001, .. })
        ));
    }

    #[test]
    fn test_direction_specific_rate() {
        let config = AmmConfig::new(3, 1_000, 100_000, 0, 0, 0).unwrap();
        assert_eq!(config.trade_fee_rate(TradeDirection::ZeroForOne), 1_000);
        assert_eq!(config.trade_fee_rate(TradeDirection::OneForZero), 100_000);
    }

    #[test]
    fn test_invalid_update_leaves_config_unchanged() {
        let mut config = AmmConfig::new(1, 2_500, 2_500, 500_000, 400_000, 10).unwrap();
        let before = config;

        let result = config.apply_update(ConfigUpdate::FundFeeRate(600_000));
        assert!(result.is_err());
        assert_eq!(config, before);

        config
            .apply_update(ConfigUpdate::TradeFeeRateOneToZero(3_000))
            .unwrap();
        assert_eq!(config.trade_fee_rate_one_to_zero, 3_000);

        config
            .apply_update(ConfigUpdate::DisableCreatePool(true))
            .unwrap();
        assert!(config.disable_create_pool);
    }
}
