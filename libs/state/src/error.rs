//! Registry errors

use crate::identifiers::PoolId;
use cpswap_amm::AmmError;
use thiserror::Error;

/// Failures from [`PoolStateManager`](crate::PoolStateManager) lookups and
/// the settlement operations it forwards
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolStateError {
    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("Pool {0} already exists")]
    PoolAlreadyExists(PoolId),

    #[error("AMM config {0} not registered")]
    ConfigNotFound(u16),

    #[error(transparent)]
    Amm(#[from] AmmError),
}

pub type PoolStateResult<T> = Result<T, PoolStateError>;
