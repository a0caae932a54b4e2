//! Pool ledger
//!
//! [`PoolState`] holds the tradable reserves and the protocol / fund fee
//! accumulators of one pool. [`PoolLedger`] pairs it with the pool's
//! [`ObservationState`] and applies swaps transactionally: the new state and
//! the oracle update are both staged on copies and written only after every
//! check passes.
//!
//! Reserves never include accrued protocol or fund fees. The vault balance of
//! each token is `reserve + protocol_fees + fund_fees`.

use crate::identifiers::PoolId;
use crate::oracle::ObservationState;
use cpswap_amm::{
    price_x32, AmmConfig, AmmError, AmmResult, SwapEngine, SwapMode, SwapQuote, TradeDirection,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Status bit: swaps disabled
pub const STATUS_SWAP_DISABLED: u8 = 1 << 0;

/// Lifecycle of a pool; `Uninitialized -> Active` only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolStatus {
    #[default]
    Uninitialized,
    Active,
}

/// Complete accounting state of a single pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub pool_id: PoolId,
    /// Index of the governing [`AmmConfig`]
    pub amm_config: u16,
    /// Key of the pool's observation ring
    pub observation_key: PoolId,
    pub status: PoolStatus,
    /// Bit flags set by an external authority, see [`STATUS_SWAP_DISABLED`]
    pub status_bits: u8,
    /// Swaps are accepted strictly after this timestamp
    pub open_time: i64,

    pub token_0_reserve: u64,
    pub token_1_reserve: u64,

    pub protocol_fees_token_0: u64,
    pub protocol_fees_token_1: u64,
    pub fund_fees_token_0: u64,
    pub fund_fees_token_1: u64,
}

impl PoolState {
    /// Create an `Active` pool with non-zero initial reserves
    pub fn initialize(
        pool_id: PoolId,
        config: &AmmConfig,
        reserve_0: u64,
        reserve_1: u64,
        open_time: i64,
    ) -> AmmResult<Self> {
        config.validate()?;
        if config.disable_create_pool {
            return Err(AmmError::PoolCreationDisabled {
                index: config.index,
            });
        }
        if reserve_0 == 0 || reserve_1 == 0 {
            return Err(AmmError::InvalidReserves {
                reserve_0,
                reserve_1,
            });
        }

        Ok(Self {
            pool_id,
            amm_config: config.index,
            observation_key: pool_id,
            status: PoolStatus::Active,
            status_bits: 0,
            open_time,
            token_0_reserve: reserve_0,
            token_1_reserve: reserve_1,
            ..Self::default()
        })
    }

    pub fn reserves(&self) -> (u64, u64) {
        (self.token_0_reserve, self.token_1_reserve)
    }

    pub fn invariant(&self) -> u128 {
        SwapEngine::invariant(self.token_0_reserve, self.token_1_reserve)
    }

    pub fn swaps_enabled(&self) -> bool {
        self.status_bits & STATUS_SWAP_DISABLED == 0
    }

    /// Reject swaps on inactive, frozen or not-yet-open pools
    pub fn ensure_swappable(&self, timestamp: i64) -> AmmResult<()> {
        if self.status != PoolStatus::Active || !self.swaps_enabled() {
            return Err(AmmError::PoolNotActive {
                status_bits: self.status_bits,
            });
        }
        if timestamp <= self.open_time {
            return Err(AmmError::PoolNotOpen {
                open_time: self.open_time,
                timestamp,
            });
        }
        Ok(())
    }

    pub fn set_status_bits(&mut self, bits: u8) {
        info!(
            pool = %self.pool_id.short(),
            old = self.status_bits,
            new = bits,
            "Pool status bits updated"
        );
        self.status_bits = bits;
    }

    /// Q32 spot prices `(token0 in token1, token1 in token0)`
    pub fn spot_prices_x32(&self) -> AmmResult<(u128, u128)> {
        Ok((
            price_x32(self.token_1_reserve, self.token_0_reserve)?,
            price_x32(self.token_0_reserve, self.token_1_reserve)?,
        ))
    }

    /// Spot price of token0 denominated in token1
    pub fn spot_price(&self) -> Option<Decimal> {
        Decimal::from(self.token_1_reserve).checked_div(Decimal::from(self.token_0_reserve))
    }

    /// Per-token vault balances: reserves plus unclaimed fees
    pub fn vault_balances(&self) -> AmmResult<(u64, u64)> {
        let vault_0 = self
            .token_0_reserve
            .checked_add(self.protocol_fees_token_0)
            .and_then(|v| v.checked_add(self.fund_fees_token_0))
            .ok_or_else(|| AmmError::overflow("token0 vault balance"))?;
        let vault_1 = self
            .token_1_reserve
            .checked_add(self.protocol_fees_token_1)
            .and_then(|v| v.checked_add(self.fund_fees_token_1))
            .ok_or_else(|| AmmError::overflow("token1 vault balance"))?;
        Ok((vault_0, vault_1))
    }

    /// State after applying `quote`, computed on a copy
    ///
    /// The quote must have been priced against this state's reserves.
    pub fn stage_swap(&self, quote: &SwapQuote) -> AmmResult<PoolState> {
        let mut next = *self;
        let (reserve_in, reserve_out, protocol_fees, fund_fees, protocol_name, fund_name) =
            match quote.direction {
                TradeDirection::ZeroForOne => (
                    &mut next.token_0_reserve,
                    &mut next.token_1_reserve,
                    &mut next.protocol_fees_token_0,
                    &mut next.fund_fees_token_0,
                    "protocol_fees_token_0",
                    "fund_fees_token_0",
                ),
                TradeDirection::OneForZero => (
                    &mut next.token_1_reserve,
                    &mut next.token_0_reserve,
                    &mut next.protocol_fees_token_1,
                    &mut next.fund_fees_token_1,
                    "protocol_fees_token_1",
                    "fund_fees_token_1",
                ),
            };

        *reserve_in = reserve_in
            .checked_add(quote.reserve_in_credit())
            .ok_or_else(|| AmmError::overflow("input reserve credit"))?;

        let current_out = *reserve_out;
        *reserve_out = current_out
            .checked_sub(quote.amount_out)
            .filter(|remaining| *remaining > 0)
            .ok_or(AmmError::InsufficientLiquidity {
                requested: quote.amount_out,
                reserve: current_out,
            })?;

        *protocol_fees = accumulate(protocol_name, *protocol_fees, quote.protocol_fee)?;
        *fund_fees = accumulate(fund_name, *fund_fees, quote.fund_fee)?;

        next.vault_balances()?;

        let (before, after) = (self.invariant(), next.invariant());
        if after < before {
            return Err(AmmError::InvariantViolation { before, after });
        }
        Ok(next)
    }

    /// Withdraw up to the requested protocol fees, returning the amounts taken
    pub fn collect_protocol_fee(&mut self, amount_0_requested: u64, amount_1_requested: u64) -> (u64, u64) {
        let amount_0 = amount_0_requested.min(self.protocol_fees_token_0);
        let amount_1 = amount_1_requested.min(self.protocol_fees_token_1);
        self.protocol_fees_token_0 -= amount_0;
        self.protocol_fees_token_1 -= amount_1;
        info!(
            pool = %self.pool_id.short(),
            amount_0,
            amount_1,
            "Collected protocol fees"
        );
        (amount_0, amount_1)
    }

    /// Withdraw up to the requested fund fees, returning the amounts taken
    pub fn collect_fund_fee(&mut self, amount_0_requested: u64, amount_1_requested: u64) -> (u64, u64) {
        let amount_0 = amount_0_requested.min(self.fund_fees_token_0);
        let amount_1 = amount_1_requested.min(self.fund_fees_token_1);
        self.fund_fees_token_0 -= amount_0;
        self.fund_fees_token_1 -= amount_1;
        info!(
            pool = %self.pool_id.short(),
            amount_0,
            amount_1,
            "Collected fund fees"
        );
        (amount_0, amount_1)
    }
}

fn accumulate(accumulator: &'static str, current: u64, delta: u64) -> AmmResult<u64> {
    current
        .checked_add(delta)
        .ok_or(AmmError::FeeAccumulatorOverflow {
            accumulator,
            current,
            delta,
        })
}

/// Amount the caller fixes plus the bound on the side solved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapKind {
    ExactInput {
        amount_in: u64,
        minimum_amount_out: u64,
    },
    ExactOutput {
        amount_out: u64,
        maximum_amount_in: u64,
    },
}

/// Swap instruction against one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub direction: TradeDirection,
    pub kind: SwapKind,
}

impl SwapRequest {
    pub fn exact_input(direction: TradeDirection, amount_in: u64, minimum_amount_out: u64) -> Self {
        Self {
            direction,
            kind: SwapKind::ExactInput {
                amount_in,
                minimum_amount_out,
            },
        }
    }

    pub fn exact_output(direction: TradeDirection, amount_out: u64, maximum_amount_in: u64) -> Self {
        Self {
            direction,
            kind: SwapKind::ExactOutput {
                amount_out,
                maximum_amount_in,
            },
        }
    }

    pub fn mode(&self) -> SwapMode {
        match self.kind {
            SwapKind::ExactInput { .. } => SwapMode::ExactInput,
            SwapKind::ExactOutput { .. } => SwapMode::ExactOutput,
        }
    }

    fn check_slippage(&self, quote: &SwapQuote) -> AmmResult<()> {
        match self.kind {
            SwapKind::ExactInput {
                minimum_amount_out, ..
            } if quote.amount_out < minimum_amount_out => Err(AmmError::SlippageExceeded {
                quoted: quote.amount_out,
                bound: minimum_amount_out,
            }),
            SwapKind::ExactOutput {
                maximum_amount_in, ..
            } if quote.amount_in > maximum_amount_in => Err(AmmError::SlippageExceeded {
                quoted: quote.amount_in,
                bound: maximum_amount_in,
            }),
            _ => Ok(()),
        }
    }
}

/// Outcome of a committed swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub direction: TradeDirection,
    pub mode: SwapMode,
    pub amount_in: u64,
    pub amount_out: u64,
    pub trade_fee: u64,
    pub protocol_fee_delta: u64,
    pub fund_fee_delta: u64,
    /// `(token_0_reserve, token_1_reserve)` after the swap
    pub new_reserves: (u64, u64),
    pub timestamp: i64,
}

impl SwapReceipt {
    pub fn lp_fee(&self) -> u64 {
        self.trade_fee - self.protocol_fee_delta - self.fund_fee_delta
    }
}

/// Pool state and its oracle, updated together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedger {
    state: PoolState,
    oracle: ObservationState,
}

impl PoolLedger {
    /// Initialize a pool and seed its oracle at `open_time`
    pub fn initialize(
        pool_id: PoolId,
        config: &AmmConfig,
        reserve_0: u64,
        reserve_1: u64,
        open_time: i64,
        observation_capacity: usize,
    ) -> AmmResult<Self> {
        let state = PoolState::initialize(pool_id, config, reserve_0, reserve_1, open_time)?;
        let mut oracle = ObservationState::with_capacity(state.observation_key, observation_capacity);
        let (price_0, price_1) = state.spot_prices_x32()?;
        oracle.record(open_time, price_0, price_1)?;

        info!(
            pool = %pool_id,
            config = config.index,
            reserve_0,
            reserve_1,
            open_time,
            "Pool initialized"
        );
        Ok(Self { state, oracle })
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn oracle(&self) -> &ObservationState {
        &self.oracle
    }

    /// Price `request` against current reserves without checking bounds
    pub fn quote(&self, request: &SwapRequest, config: &AmmConfig) -> AmmResult<SwapQuote> {
        let (reserve_0, reserve_1) = self.state.reserves();
        match request.kind {
            SwapKind::ExactInput { amount_in, .. } => SwapEngine::quote_exact_input(
                request.direction,
                reserve_0,
                reserve_1,
                amount_in,
                config,
            ),
            SwapKind::ExactOutput { amount_out, .. } => SwapEngine::quote_exact_output(
                request.direction,
                reserve_0,
                reserve_1,
                amount_out,
                config,
            ),
        }
    }

    /// Price, validate and commit a swap; nothing changes on error
    ///
    /// `config` must be the pool's own [`AmmConfig`].
    pub fn apply_swap(
        &mut self,
        request: &SwapRequest,
        config: &AmmConfig,
        timestamp: i64,
    ) -> AmmResult<SwapReceipt> {
        self.state.ensure_swappable(timestamp)?;

        let quote = self.quote(request, config)?;
        if let Err(e) = request.check_slippage(&quote) {
            warn!(
                pool = %self.state.pool_id.short(),
                direction = ?request.direction,
                error = %e,
                "Swap rejected"
            );
            return Err(e);
        }

        let next_state = self.state.stage_swap(&quote)?;
        let (price_0, price_1) = next_state.spot_prices_x32()?;
        let staged_observation = self.oracle.stage(timestamp, price_0, price_1)?;
        if staged_observation.is_noop() {
            debug!(timestamp, "Oracle already observed this timestamp");
        }

        self.state = next_state;
        self.oracle.commit(staged_observation);

        let receipt = SwapReceipt {
            direction: quote.direction,
            mode: quote.mode,
            amount_in: quote.amount_in,
            amount_out: quote.amount_out,
            trade_fee: quote.trade_fee,
            protocol_fee_delta: quote.protocol_fee,
            fund_fee_delta: quote.fund_fee,
            new_reserves: self.state.reserves(),
            timestamp,
        };
        info!(
            pool = %self.state.pool_id.short(),
            direction = ?receipt.direction,
            mode = ?receipt.mode,
            amount_in = receipt.amount_in,
            amount_out = receipt.amount_out,
            trade_fee = receipt.trade_fee,
            reserve_0 = receipt.new_reserves.0,
            reserve_1 = receipt.new_reserves.1,
            timestamp,
            "swap"
        );
        Ok(receipt)
    }

    pub fn collect_protocol_fee(&mut self, amount_0_requested: u64, amount_1_requested: u64) -> (u64, u64) {
        self.state
            .collect_protocol_fee(amount_0_requested, amount_1_requested)
    }

    pub fn collect_fund_fee(&mut self, amount_0_requested: u64, amount_1_requested: u64) -> (u64, u64) {
        self.state.collect_fund_fee(amount_0_requested, amount_1_requested)
    }

    pub fn set_status_bits(&mut self, bits: u8) {
        self.state.set_status_bits(bits);
    }
}
