//! Binance exchange API client
//!
//! Signed REST access to the handful of endpoints the strategy needs:
//! ticker price, open orders, order placement and bulk cancellation.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::Credentials;
pub use client::BinanceClient;

use std::collections::HashSet;

use crate::types::{ExchangeError, OrderType, Side};

/// REST surface the strategy engine drives.
///
/// Failures abort the current invocation; the externally scheduled next run
/// is the retry mechanism. Fill detection relies on an order id disappearing
/// from `open_order_ids`, not on fill events.
#[allow(async_fn_in_trait)]
pub trait Exchange {
    async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError>;

    async fn open_order_ids(&self, symbol: &str) -> Result<HashSet<String>, ExchangeError>;

    /// Place an order and return its exchange-assigned id.
    /// `price` is required for limit orders and ignored for market orders.
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<String, ExchangeError>;

    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), ExchangeError>;
}
