//! Pool State Manager
//!
//! Registry of every pool ledger and AMM config. Each pool sits behind its
//! own `RwLock`, so swaps on different pools never contend and a reader sees
//! either the pre-swap or the post-swap state of a pool, never a mix.

use crate::error::{PoolStateError, PoolStateResult};
use crate::identifiers::PoolId;
use crate::oracle::{Observation, OBSERVATION_NUM};
use crate::pool_state::{PoolLedger, PoolState, SwapReceipt, SwapRequest};
use cpswap_amm::{AmmConfig, ConfigUpdate, SwapQuote, TradeDirection};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ManagerStats {
    pub total_pools: usize,
    pub total_configs: usize,
    pub swaps_applied: u64,
    pub swaps_rejected: u64,
    pub last_swap_timestamp: i64,
}

/// Manages state for all pools
pub struct PoolStateManager {
    pools: DashMap<PoolId, Arc<RwLock<PoolLedger>>>,
    configs: DashMap<u16, AmmConfig>,
    observation_capacity: usize,
    stats: Arc<RwLock<ManagerStats>>,
}

impl Default for PoolStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolStateManager {
    pub fn new() -> Self {
        Self::with_observation_capacity(OBSERVATION_NUM)
    }

    /// Manager whose pools keep `capacity` oracle slots
    pub fn with_observation_capacity(capacity: usize) -> Self {
        Self {
            pools: DashMap::new(),
            configs: DashMap::new(),
            observation_capacity: capacity,
            stats: Arc::new(RwLock::new(ManagerStats::default())),
        }
    }

    pub fn observation_capacity(&self) -> usize {
        self.observation_capacity
    }

    /// Register or replace a config after validating it
    pub fn register_config(&self, config: AmmConfig) -> PoolStateResult<()> {
        config.validate()?;
        if self.configs.insert(config.index, config).is_none() {
            self.stats.write().total_configs += 1;
        }
        info!(
            index = config.index,
            trade_fee_rate_zero_to_one = config.trade_fee_rate_zero_to_one,
            trade_fee_rate_one_to_zero = config.trade_fee_rate_one_to_zero,
            protocol_fee_rate = config.protocol_fee_rate,
            fund_fee_rate = config.fund_fee_rate,
            "Registered AMM config"
        );
        Ok(())
    }

    /// Apply one validated change to a registered config
    pub fn update_config(&self, index: u16, update: ConfigUpdate) -> PoolStateResult<AmmConfig> {
        let mut config = self
            .configs
            .get_mut(&index)
            .ok_or(PoolStateError::ConfigNotFound(index))?;
        config.apply_update(update)?;
        Ok(*config)
    }

    pub fn config(&self, index: u16) -> Option<AmmConfig> {
        self.configs.get(&index).map(|c| *c)
    }

    /// Create a pool against a registered config
    pub fn initialize_pool(
        &self,
        pool_id: PoolId,
        config_index: u16,
        initial_reserves: (u64, u64),
        open_time: i64,
    ) -> PoolStateResult<()> {
        let config = self
            .config(config_index)
            .ok_or(PoolStateError::ConfigNotFound(config_index))?;

        match self.pools.entry(pool_id) {
            Entry::Occupied(_) => Err(PoolStateError::PoolAlreadyExists(pool_id)),
            Entry::Vacant(slot) => {
                let ledger = PoolLedger::initialize(
                    pool_id,
                    &config,
                    initial_reserves.0,
                    initial_reserves.1,
                    open_time,
                    self.observation_capacity,
                )?;
                slot.insert(Arc::new(RwLock::new(ledger)));
                self.stats.write().total_pools += 1;
                Ok(())
            }
        }
    }

    fn ledger(&self, pool_id: &PoolId) -> PoolStateResult<Arc<RwLock<PoolLedger>>> {
        // Clone the Arc so the shard lock is released before the pool lock is taken
        self.pools
            .get(pool_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PoolStateError::PoolNotFound(*pool_id))
    }

    fn pool_config(&self, state: &PoolState) -> PoolStateResult<AmmConfig> {
        self.config(state.amm_config)
            .ok_or(PoolStateError::ConfigNotFound(state.amm_config))
    }

    pub fn quote_exact_input(
        &self,
        pool_id: &PoolId,
        direction: TradeDirection,
        amount_in: u64,
    ) -> PoolStateResult<SwapQuote> {
        self.quote(pool_id, &SwapRequest::exact_input(direction, amount_in, 0))
    }

    pub fn quote_exact_output(
        &self,
        pool_id: &PoolId,
        direction: TradeDirection,
        amount_out: u64,
    ) -> PoolStateResult<SwapQuote> {
        self.quote(pool_id, &SwapRequest::exact_output(direction, amount_out, u64::MAX))
    }

    fn quote(&self, pool_id: &PoolId, request: &SwapRequest) -> PoolStateResult<SwapQuote> {
        let ledger = self.ledger(pool_id)?;
        let ledger = ledger.read();
        let config = self.pool_config(ledger.state())?;
        Ok(ledger.quote(request, &config)?)
    }

    /// Apply a swap under the pool's write lock
    pub fn apply_swap(
        &self,
        pool_id: &PoolId,
        request: &SwapRequest,
        timestamp: i64,
    ) -> PoolStateResult<SwapReceipt> {
        let result = {
            let ledger = self.ledger(pool_id)?;
            let mut ledger = ledger.write();
            let config = self.pool_config(ledger.state())?;
            ledger.apply_swap(request, &config, timestamp)
        };

        // Pool lock released before stats are touched
        let mut stats = self.stats.write();
        match result {
            Ok(receipt) => {
                stats.swaps_applied += 1;
                stats.last_swap_timestamp = stats.last_swap_timestamp.max(timestamp);
                Ok(receipt)
            }
            Err(e) => {
                stats.swaps_rejected += 1;
                debug!(pool = %pool_id.short(), error = %e, "Swap failed");
                Err(e.into())
            }
        }
    }

    /// Snapshot of a pool's state
    pub fn pool_state(&self, pool_id: &PoolId) -> Option<PoolState> {
        let ledger = self.ledger(pool_id).ok()?;
        let state = *ledger.read().state();
        Some(state)
    }

    /// Oracle history, oldest first
    pub fn observations(&self, pool_id: &PoolId) -> PoolStateResult<Vec<Observation>> {
        let ledger = self.ledger(pool_id)?;
        let history = ledger.read().oracle().observations();
        Ok(history)
    }

    pub fn collect_protocol_fee(
        &self,
        pool_id: &PoolId,
        amount_0_requested: u64,
        amount_1_requested: u64,
    ) -> PoolStateResult<(u64, u64)> {
        let ledger = self.ledger(pool_id)?;
        let collected = ledger
            .write()
            .collect_protocol_fee(amount_0_requested, amount_1_requested);
        Ok(collected)
    }

    pub fn collect_fund_fee(
        &self,
        pool_id: &PoolId,
        amount_0_requested: u64,
        amount_1_requested: u64,
    ) -> PoolStateResult<(u64, u64)> {
        let ledger = self.ledger(pool_id)?;
        let collected = ledger
            .write()
            .collect_fund_fee(amount_0_requested, amount_1_requested);
        Ok(collected)
    }

    pub fn set_pool_status(&self, pool_id: &PoolId, status_bits: u8) -> PoolStateResult<()> {
        let ledger = self.ledger(pool_id)?;
        ledger.write().set_status_bits(status_bits);
        Ok(())
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.pools.iter().map(|entry| *entry.key()).collect()
    }

    pub fn stats(&self) -> ManagerStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_state::STATUS_SWAP_DISABLED;
    use cpswap_amm::AmmError;

    fn pool(n: u8) -> PoolId {
        PoolId::from_bytes([n; 32])
    }

    fn manager() -> PoolStateManager {
        let manager = PoolStateManager::with_observation_capacity(4);
        manager
            .register_config(AmmConfig::new(0, 2_500, 2_500, 120_000, 40_000, 0).unwrap())
            .unwrap();
        manager
            .initialize_pool(pool(1), 0, (1_000_000_000, 24_000_000_000), 0)
            .unwrap();
        manager
    }

    #[test]
    fn test_registry_errors() {
        let manager = manager();
        assert_eq!(
            manager.initialize_pool(pool(1), 0, (1, 1), 0),
            Err(PoolStateError::PoolAlreadyExists(pool(1)))
        );
        assert_eq!(
            manager.initialize_pool(pool(2), 9, (1, 1), 0),
            Err(PoolStateError::ConfigNotFound(9))
        );
        assert_eq!(
            manager.initialize_pool(pool(2), 0, (0, 1), 0),
            Err(PoolStateError::Amm(AmmError::InvalidReserves {
                reserve_0: 0,
                reserve_1: 1,
            }))
        );
        assert!(manager.pool_state(&pool(2)).is_none());
        assert_eq!(
            manager.observations(&pool(3)),
            Err(PoolStateError::PoolNotFound(pool(3)))
        );
        assert_eq!(manager.stats().total_pools, 1);
    }

    #[test]
    fn test_quote_matches_applied_swap() {
        let manager = manager();
        let quote = manager
            .quote_exact_input(&pool(1), TradeDirection::OneForZero, 240_000_000)
            .unwrap();
        let receipt = manager
            .apply_swap(
                &pool(1),
                &SwapRequest::exact_input(TradeDirection::OneForZero, 240_000_000, quote.amount_out),
                10,
            )
            .unwrap();
        assert_eq!(receipt.amount_out, quote.amount_out);

        let state = manager.pool_state(&pool(1)).unwrap();
        assert_eq!(state.reserves(), receipt.new_reserves);
        assert_eq!(state.protocol_fees_token_1, quote.protocol_fee);
        assert_eq!(manager.observations(&pool(1)).unwrap().len(), 2);
        assert_eq!(manager.stats().swaps_applied, 1);
    }

    #[test]
    fn test_config_update_changes_pricing() {
        let manager = manager();
        let before = manager
            .quote_exact_output(&pool(1), TradeDirection::ZeroForOne, 1_000_000)
            .unwrap();
        manager
            .update_config(0, ConfigUpdate::TradeFeeRateZeroToOne(30_000))
            .unwrap();
        let after = manager
            .quote_exact_output(&pool(1), TradeDirection::ZeroForOne, 1_000_000)
            .unwrap();
        assert!(after.amount_in > before.amount_in);

        assert!(matches!(
            manager.update_config(0, ConfigUpdate::ProtocolFeeRate(2_000_000)),
            Err(PoolStateError::Amm(AmmError::InvalidFeeRate { .. }))
        ));
        assert_eq!(manager.config(0).unwrap().protocol_fee_rate, 120_000);
        assert_eq!(
            manager.update_config(5, ConfigUpdate::FundFeeRate(0)),
            Err(PoolStateError::ConfigNotFound(5))
        );
    }

    #[test]
    fn test_freeze_and_collect() {
        let manager = manager();
        manager.set_pool_status(&pool(1), STATUS_SWAP_DISABLED).unwrap();
        let request = SwapRequest::exact_input(TradeDirection::ZeroForOne, 10_000_000, 0);
        assert_eq!(
            manager.apply_swap(&pool(1), &request, 5),
            Err(PoolStateError::Amm(AmmError::PoolNotActive { status_bits: 1 }))
        );
        assert_eq!(manager.stats().swaps_rejected, 1);

        manager.set_pool_status(&pool(1), 0).unwrap();
        let receipt = manager.apply_swap(&pool(1), &request, 5).unwrap();
        let (protocol_0, _) = manager.collect_protocol_fee(&pool(1), u64::MAX, u64::MAX).unwrap();
        let (fund_0, _) = manager.collect_fund_fee(&pool(1), u64::MAX, u64::MAX).unwrap();
        assert_eq!(protocol_0, receipt.protocol_fee_delta);
        assert_eq!(fund_0, receipt.fund_fee_delta);

        let state = manager.pool_state(&pool(1)).unwrap();
        assert_eq!(state.protocol_fees_token_0, 0);
        assert_eq!(state.fund_fees_token_0, 0);
    }

    #[test]
    fn test_pool_lock_released_while_stats_busy() {
        let manager = manager();
        let before = manager.pool_state(&pool(1)).unwrap().reserves();
        let request = SwapRequest::exact_input(TradeDirection::ZeroForOne, 10_000_000, 0);

        let stats_guard = manager.stats.write();
        let (observed, receipt) = std::thread::scope(|scope| {
            let swap = scope.spawn(|| manager.apply_swap(&pool(1), &request, 5));

            // The swap commits and then parks on the stats lock; readers of
            // the pool must not be blocked meanwhile
            let ledger = manager.ledger(&pool(1)).unwrap();
            let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
            let observed = loop {
                if let Some(guard) = ledger.try_read() {
                    let reserves = guard.state().reserves();
                    if reserves != before {
                        break reserves;
                    }
                }
                assert!(
                    std::time::Instant::now() < deadline,
                    "pool lock held while waiting for stats"
                );
                std::thread::sleep(std::time::Duration::from_millis(1));
            };

            drop(stats_guard);
            (observed, swap.join().unwrap().unwrap())
        });

        assert_eq!(observed, receipt.new_reserves);
        assert_eq!(manager.stats().swaps_applied, 1);
    }

    #[test]
    fn test_pool_ids() {
        let manager = manager();
        manager
            .initialize_pool(pool(2), 0, (5_000_000, 5_000_000), 0)
            .unwrap();

        let mut ids = manager.pool_ids();
        ids.sort_by_key(|id| *id.as_bytes());
        assert_eq!(ids, vec![pool(1), pool(2)]);
    }
}
