//! Run command - one full bot invocation
//!
//! Load state, fetch the current price, advance the state machine one step,
//! persist, exit. Repetition comes from the external scheduler; any failure
//! exits non-zero and the next scheduled run is the retry.

use anyhow::{Context, Result};
use tracing::info;

use dca_ladder::binance::{BinanceClient, Credentials, Exchange};
use dca_ladder::engine::{DcaEngine, StepOutcome};
use dca_ladder::state::{StatePersist, StateStore};
use dca_ladder::StrategyConfig;

pub fn run(config_path: String, state_path: String) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_invocation(config_path, state_path))
}

async fn run_invocation(config_path: String, state_path: String) -> Result<()> {
    // Credentials may come from a local .env during development
    dotenv::dotenv().ok();

    let config = StrategyConfig::from_file(&config_path)
        .with_context(|| format!("loading strategy config from {}", config_path))?;
    info!(
        "strategy: {} trigger={:.2} levels={} base={:.2} drop={}% tp={}% ts={}%",
        config.symbol,
        config.trigger_price,
        config.num_levels,
        config.base_amount,
        config.drop_pct,
        config.take_profit_pct,
        config.trailing_stop_pct
    );

    let credentials = Credentials::from_env().context("loading API credentials")?;
    let client = BinanceClient::new(credentials);

    let store = StateStore::new(&state_path);
    let _lock = store.lock().context("acquiring state lock")?;
    let mut state = store.load().context("loading persisted state")?;
    info!("current status: {:?}", state.status);

    let current_price = client
        .get_price(&config.symbol)
        .await
        .context("fetching current price")?;
    info!("{} price: {:.4}", config.symbol, current_price);

    let engine = DcaEngine::new(&config, &client, &store);
    let outcome = engine.step(&mut state, current_price).await?;

    store.persist(&state).context("saving final state")?;

    println!(
        "{}: {} ({} of {} levels complete, held {:.4})",
        config.symbol,
        outcome,
        state.completed_levels(),
        state.levels.len(),
        state.total_quantity_held
    );

    if outcome == StepOutcome::Stopped {
        info!("cycle complete, no further action until operator resets state");
    }

    Ok(())
}
