//! # cpswap State - Pool Ledgers, Price Oracle and Registry
//!
//! ## Purpose
//!
//! Transactional state for constant-product pools: reserves and fee
//! accumulators per pool, a bounded ring of cumulative Q32 price
//! observations, and a concurrent registry that serializes writes per pool.
//! Pricing is delegated to `cpswap-amm`; this crate decides what gets
//! committed.
//!
//! ## Integration Points
//!
//! - **Input Sources**: [`SwapRequest`]s with slippage bounds, caller-supplied timestamps
//! - **Output Destinations**: [`SwapReceipt`]s, [`PoolState`] snapshots, oracle history
//! - **Identity**: Opaque 32-byte [`PoolId`] supplied by the addressing layer
//! - **Serialization**: Every state type implements `serde` traits; encoding is the caller's choice
//!
//! ## Architecture Role
//!
//! ```text
//! SwapRequest → [PoolStateManager] → [PoolLedger] → SwapReceipt
//!                     ↓                   ↓
//!               per-pool RwLock     stage state + oracle
//!               AmmConfig lookup    commit both or neither
//! ```

pub mod error;
pub mod identifiers;
pub mod manager;
pub mod oracle;
pub mod pool_state;

pub use error::{PoolStateError, PoolStateResult};
pub use identifiers::PoolId;
pub use manager::{ManagerStats, PoolStateManager};
pub use oracle::{
    time_weighted_average, time_weighted_average_decimal, Observation, ObservationRecord,
    ObservationRingError, ObservationState, StagedObservation, OBSERVATION_NUM,
};
pub use pool_state::{
    PoolLedger, PoolState, PoolStatus, SwapKind, SwapReceipt, SwapRequest, STATUS_SWAP_DISABLED,
};
