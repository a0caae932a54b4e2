//! Constant-product curve pricing for exact-input and exact-output swaps
//!
//! Reserves passed to these functions are tradable balances: accumulated
//! protocol and fund fees are never part of them. Pricing is pure; slippage
//! bounds are enforced by the ledger that commits the quote.

use crate::amm_config::AmmConfig;
use crate::error::{AmmError, AmmResult};
use crate::fees::{FeeModel, FeeSplit, FEE_RATE_DENOMINATOR};
use crate::fixed_point::{mul_div, to_u64, Rounding};
use serde::{Deserialize, Serialize};

/// Which token is sold into the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    /// Sell token0, receive token1
    ZeroForOne,
    /// Sell token1, receive token0
    OneForZero,
}

impl TradeDirection {
    /// Order `(reserve_0, reserve_1)` as `(reserve_in, reserve_out)`
    pub fn reserves_in_out(self, reserve_0: u64, reserve_1: u64) -> (u64, u64) {
        match self {
            Self::ZeroForOne => (reserve_0, reserve_1),
            Self::OneForZero => (reserve_1, reserve_0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::ZeroForOne => Self::OneForZero,
            Self::OneForZero => Self::ZeroForOne,
        }
    }
}

impl TryFrom<u8> for TradeDirection {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::ZeroForOne),
            1 => Ok(Self::OneForZero),
            other => Err(other),
        }
    }
}

/// Which side of the trade the caller fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapMode {
    ExactInput,
    ExactOutput,
}

/// Priced swap, not yet committed to any pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub direction: TradeDirection,
    pub mode: SwapMode,
    /// Amount the caller fixed (input for exact-in, output for exact-out)
    pub amount_specified: u64,
    /// Amount solved for (output for exact-in, gross input for exact-out)
    pub computed_counter_amount: u64,
    /// Gross amount the trader pays in
    pub amount_in: u64,
    /// Amount the trader receives
    pub amount_out: u64,
    pub trade_fee: u64,
    pub protocol_fee: u64,
    pub fund_fee: u64,
}

impl SwapQuote {
    /// Share of the trade fee left in the pool for liquidity providers
    pub fn lp_fee(&self) -> u64 {
        self.trade_fee - self.protocol_fee - self.fund_fee
    }

    /// Amount credited to the tradable input reserve
    ///
    /// Everything paid in except the protocol and fund shares, which move
    /// to their accumulators.
    pub fn reserve_in_credit(&self) -> u64 {
        self.amount_in - self.protocol_fee - self.fund_fee
    }

    fn new(
        direction: TradeDirection,
        mode: SwapMode,
        amount_in: u64,
        amount_out: u64,
        fees: FeeSplit,
    ) -> Self {
        let (amount_specified, computed_counter_amount) = match mode {
            SwapMode::ExactInput => (amount_in, amount_out),
            SwapMode::ExactOutput => (amount_out, amount_in),
        };
        Self {
            direction,
            mode,
            amount_specified,
            computed_counter_amount,
            amount_in,
            amount_out,
            trade_fee: fees.trade_fee,
            protocol_fee: fees.protocol_fee,
            fund_fee: fees.fund_fee,
        }
    }
}

/// Constant-product (x * y = k) swap pricing
pub struct SwapEngine;

impl SwapEngine {
    /// Output for a fixed input: returns `(amount_out, trade_fee)`
    ///
    /// `amount_out = floor(reserve_out * after_fee / (reserve_in + after_fee))`
    /// where `after_fee = amount_in - ceil(amount_in * fee_rate / 1e6)`.
    pub fn compute_exact_input(
        reserve_in: u64,
        reserve_out: u64,
        amount_in: u64,
        fee_rate: u64,
    ) -> AmmResult<(u64, u64)> {
        if amount_in == 0 {
            return Err(AmmError::ZeroInputAmount);
        }

        let trade_fee = FeeModel::compute_trade_fee(amount_in, fee_rate)?;
        let amount_in_after_fee = u128::from(amount_in - trade_fee);

        let amount_out = mul_div(
            u128::from(reserve_out),
            amount_in_after_fee,
            u128::from(reserve_in) + amount_in_after_fee,
            Rounding::Down,
        )?;
        // amount_out <= reserve_out, so it always fits
        let amount_out = to_u64(amount_out, "exact input amount out")?;

        if amount_out == 0 || amount_out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity {
                requested: amount_out,
                reserve: reserve_out,
            });
        }
        Ok((amount_out, trade_fee))
    }

    /// Input for a fixed output: returns `(amount_in_gross, trade_fee)`
    ///
    /// `after_fee = ceil(reserve_in * amount_out / (reserve_out - amount_out))`,
    /// then the fee is inverted with `gross = ceil(after_fee * 1e6 / (1e6 - fee_rate))`.
    pub fn compute_exact_output(
        reserve_in: u64,
        reserve_out: u64,
        amount_out: u64,
        fee_rate: u64,
    ) -> AmmResult<(u64, u64)> {
        if fee_rate >= FEE_RATE_DENOMINATOR {
            return Err(AmmError::InvalidFeeRate {
                rate: fee_rate,
                reason: "exact output requires a rate below 100%",
            });
        }
        if amount_out == 0 {
            return Err(AmmError::ZeroOutputAmount);
        }
        if amount_out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity {
                requested: amount_out,
                reserve: reserve_out,
            });
        }

        let amount_in_after_fee = mul_div(
            u128::from(reserve_in),
            u128::from(amount_out),
            u128::from(reserve_out - amount_out),
            Rounding::Up,
        )?;
        let amount_in_gross = mul_div(
            amount_in_after_fee,
            u128::from(FEE_RATE_DENOMINATOR),
            u128::from(FEE_RATE_DENOMINATOR - fee_rate),
            Rounding::Up,
        )?;

        let amount_in_gross = to_u64(amount_in_gross, "exact output amount in")?;
        // after_fee <= gross, so the narrowing above covers it
        let trade_fee = amount_in_gross - amount_in_after_fee as u64;
        Ok((amount_in_gross, trade_fee))
    }

    /// Quote a fixed-input swap against `(reserve_0, reserve_1)`
    pub fn quote_exact_input(
        direction: TradeDirection,
        reserve_0: u64,
        reserve_1: u64,
        amount_in: u64,
        config: &AmmConfig,
    ) -> AmmResult<SwapQuote> {
        let (reserve_in, reserve_out) = direction.reserves_in_out(reserve_0, reserve_1);
        let (amount_out, trade_fee) = Self::compute_exact_input(
            reserve_in,
            reserve_out,
            amount_in,
            config.trade_fee_rate(direction),
        )?;
        let fees = FeeModel::split(trade_fee, config.protocol_fee_rate, config.fund_fee_rate)?;
        Ok(SwapQuote::new(
            direction,
            SwapMode::ExactInput,
            amount_in,
            amount_out,
            fees,
        ))
    }

    /// Quote a fixed-output swap against `(reserve_0, reserve_1)`
    pub fn quote_exact_output(
        direction: TradeDirection,
        reserve_0: u64,
        reserve_1: u64,
        amount_out: u64,
        config: &AmmConfig,
    ) -> AmmResult<SwapQuote> {
        let (reserve_in, reserve_out) = direction.reserves_in_out(reserve_0, reserve_1);
        let (amount_in, trade_fee) = Self::compute_exact_output(
            reserve_in,
            reserve_out,
            amount_out,
            config.trade_fee_rate(direction),
        )?;
        let fees = FeeModel::split(trade_fee, config.protocol_fee_rate, config.fund_fee_rate)?;
        Ok(SwapQuote::new(
            direction,
            SwapMode::ExactOutput,
            amount_in,
            amount_out,
            fees,
        ))
    }

    /// Curve invariant `reserve_0 * reserve_1`
    pub fn invariant(reserve_0: u64, reserve_1: u64) -> u128 {
        u128::from(reserve_0) * u128::from(reserve_1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESERVE_IN: u64 = 1_000_000_000;
    const RESERVE_OUT: u64 = 24_000_000_000;

    #[test]
    fn test_exact_input_reference_trade() {
        // 10% fee on 100_000_000 in against 1e9 / 24e9 reserves
        let (amount_out, trade_fee) =
            SwapEngine::compute_exact_input(RESERVE_IN, RESERVE_OUT, 100_000_000, 100_000)
                .unwrap();
        assert_eq!(trade_fee, 10_000_000);
        // floor(24e9 * 9e7 / 1.09e9)
        assert_eq!(amount_out, 1_981_651_376);
    }

    #[test]
    fn test_exact_input_zero_amount() {
        assert_eq!(
            SwapEngine::compute_exact_input(RESERVE_IN, RESERVE_OUT, 0, 2_500),
            Err(AmmError::ZeroInputAmount)
        );
    }

    #[test]
    fn test_exact_input_dust_produces_nothing() {
        // One unit in against a pool priced far above it rounds to zero out
        let result = SwapEngine::compute_exact_input(RESERVE_OUT, RESERVE_IN, 10, 0);
        assert!(matches!(
            result,
            Err(AmmError::InsufficientLiquidity { requested: 0, .. })
        ));
    }

    #[test]
    fn test_exact_input_full_fee_consumes_everything() {
        // 100% fee leaves nothing to trade
        assert!(matches!(
            SwapEngine::compute_exact_input(RESERVE_IN, RESERVE_OUT, 1_000, 1_000_000),
            Err(AmmError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_exact_output_reference_trade() {
        let (amount_in, trade_fee) =
            SwapEngine::compute_exact_output(RESERVE_IN, RESERVE_OUT, 1_981_651_376, 100_000)
                .unwrap();
        // ceil(1e9 * 1_981_651_376 / (24e9 - 1_981_651_376)) = 90_000_000
        assert_eq!(amount_in - trade_fee, 90_000_000);
        assert_eq!(amount_in, 100_000_000);
        assert_eq!(trade_fee, 10_000_000);
    }

    #[test]
    fn test_exact_output_guards() {
        assert!(matches!(
            SwapEngine::compute_exact_output(RESERVE_IN, RESERVE_OUT, 1, 1_000_000),
            Err(AmmError::InvalidFeeRate { .. })
        ));
        assert_eq!(
            SwapEngine::compute_exact_output(RESERVE_IN, RESERVE_OUT, 0, 2_500),
            Err(AmmError::ZeroOutputAmount)
        );
        assert_eq!(
            SwapEngine::compute_exact_output(RESERVE_IN, RESERVE_OUT, RESERVE_OUT, 2_500),
            Err(AmmError::InsufficientLiquidity {
                requested: RESERVE_OUT,
                reserve: RESERVE_OUT,
            })
        );
    }

    #[test]
    fn test_exact_output_fee_inversion() {
        // 1 / 1 pool, buy 1 of 1_000_001 => after_fee = ceil(1e6 * 1 / 1e6) = 1
        let (amount_in, trade_fee) =
            SwapEngine::compute_exact_output(1_000_000, 1_000_001, 1, 500_000).unwrap();
        assert_eq!(amount_in, 2);
        assert_eq!(trade_fee, 1);
    }

    #[test]
    fn test_quote_uses_direction_rate_and_split() {
        let config = AmmConfig::new(0, 100_000, 2_500, 200_000, 100_000, 0).unwrap();

        let quote = SwapEngine::quote_exact_input(
            TradeDirection::ZeroForOne,
            RESERVE_IN,
            RESERVE_OUT,
            100_000_000,
            &config,
        )
        .unwrap();
        assert_eq!(quote.mode, SwapMode::ExactInput);
        assert_eq!(quote.amount_specified, 100_000_000);
        assert_eq!(quote.computed_counter_amount, 1_981_651_376);
        assert_eq!(quote.trade_fee, 10_000_000);
        assert_eq!(quote.protocol_fee, 2_000_000);
        assert_eq!(quote.fund_fee, 1_000_000);
        assert_eq!(quote.lp_fee(), 7_000_000);
        assert_eq!(quote.reserve_in_credit(), 97_000_000);

        // Reverse direction reads the other rate and flips reserves
        let quote = SwapEngine::quote_exact_input(
            TradeDirection::OneForZero,
            RESERVE_IN,
            RESERVE_OUT,
            2_400_000_000,
            &config,
        )
        .unwrap();
        assert_eq!(quote.trade_fee, 6_000_000);
        assert!(quote.amount_out < RESERVE_IN);
    }

    #[test]
    fn test_quote_exact_output_fields() {
        let config = AmmConfig::new(0, 2_500, 2_500, 0, 0, 0).unwrap();
        let quote = SwapEngine::quote_exact_output(
            TradeDirection::OneForZero,
            RESERVE_IN,
            RESERVE_OUT,
            1_000_000,
            &config,
        )
        .unwrap();
        assert_eq!(quote.mode, SwapMode::ExactOutput);
        assert_eq!(quote.amount_specified, 1_000_000);
        assert_eq!(quote.amount_out, 1_000_000);
        assert_eq!(quote.computed_counter_amount, quote.amount_in);
        assert_eq!(quote.lp_fee(), quote.trade_fee);
    }

    #[test]
    fn test_direction_from_u8() {
        assert_eq!(TradeDirection::try_from(0), Ok(TradeDirection::ZeroForOne));
        assert_eq!(TradeDirection::try_from(1), Ok(TradeDirection::OneForZero));
        assert_eq!(TradeDirection::try_from(7), Err(7));
        assert_eq!(
            TradeDirection::ZeroForOne.opposite(),
            TradeDirection::OneForZero
        );
    }
}
