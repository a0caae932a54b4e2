//! Settlement errors for swap pricing, fee accounting and oracle updates
//!
//! Every failure is local and synchronous. Variants carry the values that
//! triggered them so callers can log or surface them without re-deriving
//! the pre-failure state.

use thiserror::Error;

/// Errors produced by the settlement core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    /// Intermediate or final value does not fit the target width
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    /// Division with a zero denominator
    #[error("Division by zero in {operation}")]
    DivisionByZero { operation: &'static str },

    /// Fee rate outside the 0..=1_000_000 range, or rates that sum past 100%
    #[error("Invalid fee rate {rate}: {reason} (denominator 1_000_000)")]
    InvalidFeeRate { rate: u64, reason: &'static str },

    /// Exact-input swap with a zero input amount
    #[error("Input amount must be greater than zero")]
    ZeroInputAmount,

    /// Exact-output swap with a zero output amount
    #[error("Output amount must be greater than zero")]
    ZeroOutputAmount,

    /// Trade would empty the output reserve or produce nothing
    #[error("Insufficient liquidity: requested {requested} against reserve {reserve}")]
    InsufficientLiquidity { requested: u64, reserve: u64 },

    /// Quoted counter-amount violates the caller's bound
    #[error("Slippage exceeded: quoted {quoted}, bound {bound}")]
    SlippageExceeded { quoted: u64, bound: u64 },

    /// Protocol or fund fee accumulator would overflow u64
    #[error("Fee accumulator overflow: {accumulator} at {current} cannot absorb {delta}")]
    FeeAccumulatorOverflow {
        accumulator: &'static str,
        current: u64,
        delta: u64,
    },

    /// Oracle timestamp earlier than the latest recorded observation
    #[error("Non-monotonic timestamp {timestamp}: latest observation is at {latest}")]
    NonMonotonicTimestamp { timestamp: i64, latest: i64 },

    /// Staged reserves would shrink the constant product
    #[error("Curve invariant decreased from {before} to {after}")]
    InvariantViolation { before: u128, after: u128 },

    /// Pool is not initialized or swaps are disabled
    #[error("Pool is not active (status bits {status_bits:#04b})")]
    PoolNotActive { status_bits: u8 },

    /// Swap attempted at or before the pool's open time
    #[error("Pool opens after {open_time}, swap timestamp {timestamp}")]
    PoolNotOpen { open_time: i64, timestamp: i64 },

    /// Initial reserves must both be non-zero
    #[error("Invalid initial reserves: token0={reserve_0}, token1={reserve_1}")]
    InvalidReserves { reserve_0: u64, reserve_1: u64 },

    /// Config does not allow new pools
    #[error("Pool creation disabled for config {index}")]
    PoolCreationDisabled { index: u16 },
}

impl AmmError {
    pub fn overflow(operation: &'static str) -> Self {
        Self::ArithmeticOverflow { operation }
    }

    pub fn division_by_zero(operation: &'static str) -> Self {
        Self::DivisionByZero { operation }
    }
}

/// Result alias used across the settlement core
pub type AmmResult<T> = Result<T, AmmError>;
