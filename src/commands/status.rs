//! Status command - print the persisted state without touching the exchange

use anyhow::{Context, Result};

use dca_ladder::state::StateStore;
use dca_ladder::types::BotStatus;

pub fn run(state_path: String) -> Result<()> {
    // Read-only: no lock taken, safe to run alongside a live invocation
    let store = StateStore::new(&state_path);
    let state = store.load().context("loading persisted state")?;

    println!("{}", "=".repeat(60));
    println!("DCA LADDER STATE ({})", state_path);
    println!("{}", "=".repeat(60));
    println!("Status:         {:?}", state.status);

    if state.status == BotStatus::Idle {
        println!("No run in progress.");
        return Ok(());
    }

    for level in &state.levels {
        let stage = if level.is_complete {
            "complete"
        } else if level.sell_order_id.is_some() {
            "awaiting take-profit"
        } else if level.buy_order_id.is_some() {
            "awaiting buy fill"
        } else {
            "not yet placed"
        };
        println!(
            "Level {}:        {:.4} @ {:.2} - {}",
            level.index, level.quantity, level.buy_price, stage
        );
    }

    println!("Held quantity:  {:.4}", state.total_quantity_held);
    if state.trailing_stop.active {
        println!("Trailing stop:  active, peak {:.2}", state.trailing_stop.peak_price);
    } else {
        println!("Trailing stop:  inactive");
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
