//! # cpswap AMM Library - Constant-Product Settlement Mathematics
//!
//! ## Purpose
//!
//! Deterministic integer mathematics for a two-reserve constant-product pool:
//! exact-input and exact-output swap pricing, trade/protocol/fund fee
//! splitting, and overflow-safe fixed-point primitives. Every function here is
//! pure; state transitions live in `cpswap-state`.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Tradable reserves (fee accumulators excluded) and an [`AmmConfig`]
//! - **Output Destinations**: Pool ledger commits, off-chain quote simulation
//! - **Precision**: `u64` amounts, `u128` products, 256-bit intermediates for mul-div
//! - **Fee Basis**: All rates are parts per 1_000_000 ([`FEE_RATE_DENOMINATOR`])
//!
//! ## Rounding Policy
//!
//! ```text
//! trade fee        ceil(amount * rate / 1e6)           favours the pool
//! protocol / fund  floor(trade_fee * rate / 1e6)       remainder stays with LPs
//! exact-in output  floor(R_out * a / (R_in + a))       invariant never decreases
//! exact-out input  ceil(...) then ceil(fee inversion)  trader never underpays
//! ```

pub mod amm_config;
pub mod curve;
pub mod error;
pub mod fees;
pub mod fixed_point;

pub use amm_config::{AmmConfig, ConfigUpdate};
pub use curve::{SwapEngine, SwapMode, SwapQuote, TradeDirection};
pub use error::{AmmError, AmmResult};
pub use fees::{FeeModel, FeeSplit, FEE_RATE_DENOMINATOR};
pub use fixed_point::{ceil_div, mul_div, price_x32, x32_to_decimal, Rounding, Q32};

/// Common types for price display
pub use rust_decimal::Decimal;
