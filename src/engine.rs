//! DCA strategy engine
//!
//! The state machine at the core of the bot. Each invocation advances it by
//! exactly one step: arm the ladder when the trigger price is reached, place
//! any missing buy orders, reconcile fills against the open-orders snapshot,
//! and manage the global trailing stop. Repetition comes from the external
//! scheduler, never from an internal loop.
//!
//! Every state mutation is persisted before the next externally-visible
//! action, so a crash between steps loses at most an unrecorded placement
//! (re-placed next run) and never an already-confirmed one.

use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use crate::binance::Exchange;
use crate::config::StrategyConfig;
use crate::state::StatePersist;
use crate::types::{BotStatus, Level, OrderType, RunState, Side, TrailingStop};

/// What one invocation concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Waiting for the trigger price
    Idle,
    /// Ladder is working; orders placed or being watched
    Active,
    /// Run finished (trailing stop fired now or on an earlier invocation)
    Stopped,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Idle => write!(f, "idle, waiting for trigger price"),
            StepOutcome::Active => write!(f, "active, ladder in progress"),
            StepOutcome::Stopped => write!(f, "stopped, cycle complete"),
        }
    }
}

/// Compute the DCA ladder for a configuration: level i (0-based) buys at
/// trigger * (1 - drop/100)^i, spending `base_amount` quote at each level.
pub fn build_levels(config: &StrategyConfig) -> Vec<Level> {
    (0..config.num_levels)
        .map(|i| {
            let buy_price = config.trigger_price * (1.0 - config.drop_pct / 100.0).powi(i as i32);
            Level::new(i + 1, buy_price, config.base_amount / buy_price)
        })
        .collect()
}

/// One-step strategy driver; owns no state of its own
pub struct DcaEngine<'a, E, S> {
    config: &'a StrategyConfig,
    exchange: &'a E,
    store: &'a S,
}

impl<'a, E: Exchange, S: StatePersist> DcaEngine<'a, E, S> {
    pub fn new(config: &'a StrategyConfig, exchange: &'a E, store: &'a S) -> Self {
        Self {
            config,
            exchange,
            store,
        }
    }

    /// Advance the state machine by one invocation
    pub async fn step(
        &self,
        state: &mut RunState,
        current_price: f64,
    ) -> anyhow::Result<StepOutcome> {
        match state.status {
            BotStatus::Idle => {
                if !self.try_activate(state, current_price)? {
                    debug!(
                        "price {:.2} above trigger {:.2}, staying idle",
                        current_price, self.config.trigger_price
                    );
                    return Ok(StepOutcome::Idle);
                }
            }
            BotStatus::Stopped => {
                // A finished run stays finished unless the operator opted
                // into automatic re-arming.
                if !self.config.reactivate_after_stop
                    || !self.try_activate(state, current_price)?
                {
                    return Ok(StepOutcome::Stopped);
                }
            }
            BotStatus::Active => {}
        }

        self.place_missing_buys(state).await?;

        // One snapshot per invocation; an id missing from it is the fill signal
        let open = self.exchange.open_order_ids(&self.config.symbol).await?;

        self.detect_buy_fills(state, &open).await?;
        let sell_filled = self.detect_sell_fills(state, &open)?;

        if sell_filled && !state.trailing_stop.active {
            state.trailing_stop.activate(current_price);
            info!(
                "first take-profit filled, trailing stop armed at peak {:.2}",
                current_price
            );
            self.store.persist(state)?;
        }

        if state.trailing_stop.active {
            if state.trailing_stop.observe(current_price) {
                info!("new trailing stop peak: {:.2}", current_price);
                self.store.persist(state)?;
            }

            if state
                .trailing_stop
                .is_triggered(current_price, self.config.trailing_stop_pct)
            {
                self.liquidate(state, current_price).await?;
                return Ok(StepOutcome::Stopped);
            }
        }

        Ok(StepOutcome::Active)
    }

    /// Arm the ladder if the trigger price has been reached
    fn try_activate(&self, state: &mut RunState, current_price: f64) -> anyhow::Result<bool> {
        if current_price > self.config.trigger_price {
            return Ok(false);
        }

        state.status = BotStatus::Active;
        state.levels = build_levels(self.config);
        state.trailing_stop = TrailingStop::default();
        state.total_quantity_held = 0.0;
        self.store.persist(state)?;

        info!(
            "trigger price {:.2} reached at {:.2}, {} ladder levels armed",
            self.config.trigger_price,
            current_price,
            state.levels.len()
        );
        Ok(true)
    }

    /// Place a limit buy for every level that does not have one yet.
    ///
    /// Placement is unconditional on the current price and persisted per
    /// order, so a mid-loop crash leaves only already-placed orders recorded.
    async fn place_missing_buys(&self, state: &mut RunState) -> anyhow::Result<()> {
        for i in 0..state.levels.len() {
            if state.levels[i].buy_order_id.is_some() {
                continue;
            }

            let (quantity, buy_price) = (state.levels[i].quantity, state.levels[i].buy_price);
            let order_id = self
                .exchange
                .place_order(
                    &self.config.symbol,
                    Side::Buy,
                    OrderType::Limit,
                    quantity,
                    Some(buy_price),
                )
                .await?;
            state.levels[i].buy_order_id = Some(order_id);
            self.store.persist(state)?;
        }
        Ok(())
    }

    /// Treat a buy whose order id left the open set as filled: book the
    /// quantity and place the level's take-profit sell.
    async fn detect_buy_fills(
        &self,
        state: &mut RunState,
        open: &HashSet<String>,
    ) -> anyhow::Result<()> {
        for i in 0..state.levels.len() {
            let level = &state.levels[i];
            let buy_filled = level
                .buy_order_id
                .as_ref()
                .is_some_and(|id| !open.contains(id))
                && level.sell_order_id.is_none();
            if !buy_filled {
                continue;
            }

            let (index, quantity, buy_price) = (level.index, level.quantity, level.buy_price);
            let sell_price = buy_price * (1.0 + self.config.take_profit_pct / 100.0);
            info!(
                "level {} buy filled at {:.2}, placing take-profit at {:.2}",
                index, buy_price, sell_price
            );

            state.total_quantity_held += quantity;
            let order_id = self
                .exchange
                .place_order(
                    &self.config.symbol,
                    Side::Sell,
                    OrderType::Limit,
                    quantity,
                    Some(sell_price),
                )
                .await?;
            state.levels[i].sell_order_id = Some(order_id);
            self.store.persist(state)?;
        }
        Ok(())
    }

    /// Mark levels whose take-profit sell left the open set as complete.
    /// Returns true if any level completed for the first time this run.
    fn detect_sell_fills(
        &self,
        state: &mut RunState,
        open: &HashSet<String>,
    ) -> anyhow::Result<bool> {
        let mut any_filled = false;
        for i in 0..state.levels.len() {
            let level = &state.levels[i];
            let sell_filled = level
                .sell_order_id
                .as_ref()
                .is_some_and(|id| !open.contains(id))
                && !level.is_complete;
            if !sell_filled {
                continue;
            }

            info!("level {} take-profit filled", level.index);
            state.levels[i].is_complete = true;
            state.total_quantity_held -= state.levels[i].quantity;
            any_filled = true;
            self.store.persist(state)?;
        }
        Ok(any_filled)
    }

    /// Cancel remaining take-profit orders, dump the held position at
    /// market, and end the run.
    async fn liquidate(&self, state: &mut RunState, current_price: f64) -> anyhow::Result<()> {
        info!(
            "trailing stop triggered at {:.2} (peak {:.2}, stop {:.2}), liquidating",
            current_price,
            state.trailing_stop.peak_price,
            state.trailing_stop.stop_price(self.config.trailing_stop_pct)
        );

        self.exchange.cancel_all_orders(&self.config.symbol).await?;

        if state.total_quantity_held > 0.0 {
            self.exchange
                .place_order(
                    &self.config.symbol,
                    Side::Sell,
                    OrderType::Market,
                    state.total_quantity_held,
                    None,
                )
                .await?;
        }

        state.status = BotStatus::Stopped;
        self.store.persist(state)?;
        info!("run stopped, cycle complete");
        Ok(())
    }
}
