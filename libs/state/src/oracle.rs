//! Cumulative price oracle
//!
//! A fixed-capacity ring of time-weighted cumulative Q32 prices. At most one
//! slot is written per distinct timestamp; once the ring is full the oldest
//! slot is overwritten. Cumulative values wrap modulo 2^128, so consumers
//! must difference two observations with wrapping arithmetic (see
//! [`time_weighted_average`]).

use crate::identifiers::PoolId;
use cpswap_amm::{x32_to_decimal, AmmError, AmmResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default ring capacity
pub const OBSERVATION_NUM: usize = 100;

/// One oracle slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub block_timestamp: i64,
    /// Sum of token0 price (in token1, Q32) times seconds elapsed
    pub cumulative_token_0_price_x32: u128,
    /// Sum of token1 price (in token0, Q32) times seconds elapsed
    pub cumulative_token_1_price_x32: u128,
}

/// Validated but not yet written oracle update
///
/// `None` means the timestamp matched the latest slot and nothing will be
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct StagedObservation(Option<Observation>);

impl StagedObservation {
    pub fn is_noop(&self) -> bool {
        self.0.is_none()
    }

    pub fn observation(&self) -> Option<&Observation> {
        self.0.as_ref()
    }
}

/// Rejected shape of a deserialized observation ring
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObservationRingError {
    #[error("Observation ring has no slots")]
    EmptyRing,

    #[error("Populated length {len} exceeds capacity {capacity}")]
    LengthOutOfRange { len: usize, capacity: usize },

    #[error("Cursor {index} outside capacity {capacity}")]
    CursorOutOfRange { index: usize, capacity: usize },

    #[error("Initialized flag {initialized} disagrees with length {len}")]
    InitializedMismatch { initialized: bool, len: usize },

    #[error("Cursor {index} is not the newest slot of a partial ring of length {len}")]
    CursorMismatch { index: usize, len: usize },
}

/// Unvalidated serialized form of [`ObservationState`]
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationRecord {
    pub pool_id: PoolId,
    pub initialized: bool,
    pub observation_index: usize,
    pub len: usize,
    pub observations: Vec<Observation>,
}

impl TryFrom<ObservationRecord> for ObservationState {
    type Error = ObservationRingError;

    fn try_from(record: ObservationRecord) -> Result<Self, Self::Error> {
        let capacity = record.observations.len();
        if capacity == 0 {
            return Err(ObservationRingError::EmptyRing);
        }
        if record.len > capacity {
            return Err(ObservationRingError::LengthOutOfRange {
                len: record.len,
                capacity,
            });
        }
        if record.observation_index >= capacity {
            return Err(ObservationRingError::CursorOutOfRange {
                index: record.observation_index,
                capacity,
            });
        }
        if record.initialized != (record.len > 0) {
            return Err(ObservationRingError::InitializedMismatch {
                initialized: record.initialized,
                len: record.len,
            });
        }
        // Until the ring fills, slots are written in order from zero
        if record.initialized && record.len < capacity && record.observation_index != record.len - 1 {
            return Err(ObservationRingError::CursorMismatch {
                index: record.observation_index,
                len: record.len,
            });
        }

        Ok(Self {
            pool_id: record.pool_id,
            initialized: record.initialized,
            observation_index: record.observation_index,
            len: record.len,
            observations: record.observations,
        })
    }
}

/// Bounded observation history for one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ObservationRecord")]
pub struct ObservationState {
    pub pool_id: PoolId,
    initialized: bool,
    /// Slot holding the most recent observation
    observation_index: usize,
    /// Number of populated slots, saturating at capacity
    len: usize,
    observations: Vec<Observation>,
}

impl ObservationState {
    pub fn new(pool_id: PoolId) -> Self {
        Self::with_capacity(pool_id, OBSERVATION_NUM)
    }

    /// Ring with `capacity` slots (at least one)
    pub fn with_capacity(pool_id: PoolId, capacity: usize) -> Self {
        Self {
            pool_id,
            initialized: false,
            observation_index: 0,
            len: 0,
            observations: vec![Observation::default(); capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.observations.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recent observation
    pub fn latest(&self) -> Option<&Observation> {
        self.initialized
            .then(|| &self.observations[self.observation_index])
    }

    /// Validate an update without writing it
    ///
    /// # Errors
    /// `NonMonotonicTimestamp` if `timestamp` precedes the latest slot.
    pub fn stage(
        &self,
        timestamp: i64,
        price_0_x32: u128,
        price_1_x32: u128,
    ) -> AmmResult<StagedObservation> {
        let Some(last) = self.latest() else {
            return Ok(StagedObservation(Some(Observation {
                block_timestamp: timestamp,
                cumulative_token_0_price_x32: 0,
                cumulative_token_1_price_x32: 0,
            })));
        };

        if timestamp < last.block_timestamp {
            return Err(AmmError::NonMonotonicTimestamp {
                timestamp,
                latest: last.block_timestamp,
            });
        }
        if timestamp == last.block_timestamp {
            return Ok(StagedObservation(None));
        }

        // i64 difference of ordered timestamps is non-negative and fits u64
        let elapsed = u128::from(timestamp.abs_diff(last.block_timestamp));
        Ok(StagedObservation(Some(Observation {
            block_timestamp: timestamp,
            cumulative_token_0_price_x32: last
                .cumulative_token_0_price_x32
                .wrapping_add(price_0_x32.wrapping_mul(elapsed)),
            cumulative_token_1_price_x32: last
                .cumulative_token_1_price_x32
                .wrapping_add(price_1_x32.wrapping_mul(elapsed)),
        })))
    }

    /// Write a staged update, advancing the ring cursor
    pub fn commit(&mut self, staged: StagedObservation) {
        let Some(observation) = staged.0 else {
            return;
        };

        if self.initialized {
            self.observation_index = (self.observation_index + 1) % self.capacity();
        } else {
            self.observation_index = 0;
            self.initialized = true;
        }
        self.observations[self.observation_index] = observation;
        self.len = (self.len + 1).min(self.capacity());

        debug!(
            pool = %self.pool_id.short(),
            slot = self.observation_index,
            timestamp = observation.block_timestamp,
            "Recorded oracle observation"
        );
    }

    /// Stage and commit in one step
    pub fn record(&mut self, timestamp: i64, price_0_x32: u128, price_1_x32: u128) -> AmmResult<()> {
        let staged = self.stage(timestamp, price_0_x32, price_1_x32)?;
        self.commit(staged);
        Ok(())
    }

    /// Populated slots, oldest first
    pub fn observations(&self) -> Vec<Observation> {
        if self.len < self.capacity() {
            return self.observations[..self.len].to_vec();
        }
        let oldest = (self.observation_index + 1) % self.capacity();
        self.observations[oldest..]
            .iter()
            .chain(&self.observations[..oldest])
            .copied()
            .collect()
    }

    /// Average prices across the whole retained window
    pub fn window_average(&self) -> Option<(u128, u128)> {
        let history = self.observations();
        let (oldest, newest) = (history.first()?, history.last()?);
        time_weighted_average(oldest, newest)
    }
}

/// Q32 average `(token0 price, token1 price)` between two observations
///
/// Returns `None` if `newer` is not strictly later than `older`.
pub fn time_weighted_average(older: &Observation, newer: &Observation) -> Option<(u128, u128)> {
    if newer.block_timestamp <= older.block_timestamp {
        return None;
    }
    let elapsed = u128::from(newer.block_timestamp.abs_diff(older.block_timestamp));
    let price_0 = newer
        .cumulative_token_0_price_x32
        .wrapping_sub(older.cumulative_token_0_price_x32)
        / elapsed;
    let price_1 = newer
        .cumulative_token_1_price_x32
        .wrapping_sub(older.cumulative_token_1_price_x32)
        / elapsed;
    Some((price_0, price_1))
}

/// Decimal form of a [`time_weighted_average`] for reporting
pub fn time_weighted_average_decimal(
    older: &Observation,
    newer: &Observation,
) -> Option<(Decimal, Decimal)> {
    let (price_0, price_1) = time_weighted_average(older, newer)?;
    Some((x32_to_decimal(price_0)?, x32_to_decimal(price_1)?))
}
