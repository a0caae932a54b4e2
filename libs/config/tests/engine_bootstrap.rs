//! Engine bootstrap from the shipped configuration file

use cpswap_amm::TradeDirection;
use cpswap_config::EngineConfig;
use cpswap_state::{PoolId, SwapRequest};
use std::path::PathBuf;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/cpswap.toml")
}

#[test]
fn shipped_config_drives_a_pool() {
    let config = EngineConfig::load(shipped_config()).unwrap();
    assert_eq!(config.oracle.capacity, 100);
    assert_eq!(config.amm_configs.len(), 2);

    let manager = config.build_manager().unwrap();
    let pool = PoolId::from_bytes([0x42; 32]);
    manager
        .initialize_pool(pool, 1, (1_000_000_000, 24_000_000_000), 0)
        .unwrap();

    let quote = manager
        .quote_exact_input(&pool, TradeDirection::ZeroForOne, 100_000_000)
        .unwrap();
    // 1% of 1e8, split 12% protocol / 4% fund
    assert_eq!(quote.trade_fee, 1_000_000);
    assert_eq!(quote.protocol_fee, 120_000);
    assert_eq!(quote.fund_fee, 40_000);

    let receipt = manager
        .apply_swap(
            &pool,
            &SwapRequest::exact_input(TradeDirection::ZeroForOne, 100_000_000, quote.amount_out),
            1,
        )
        .unwrap();
    assert_eq!(receipt.amount_out, quote.amount_out);
    assert_eq!(manager.observations(&pool).unwrap().len(), 2);
}
