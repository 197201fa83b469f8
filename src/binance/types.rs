//! Wire types for the Binance REST API

use serde::Deserialize;

/// Response from GET /api/v3/ticker/price
#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    /// Binance returns prices as decimal strings
    pub price: String,
}

/// One entry from GET /api/v3/openOrders
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub order_id: u64,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
}

/// Acknowledgement from POST /api/v3/order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderAck {
    pub order_id: u64,
    pub symbol: String,
}

/// Error body returned by Binance on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ticker_price() {
        let json = r#"{"symbol":"SOLUSDT","price":"99.50000000"}"#;
        let ticker: TickerPrice = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.symbol, "SOLUSDT");
        assert_eq!(ticker.price.parse::<f64>().unwrap(), 99.5);
    }

    #[test]
    fn parses_open_order() {
        let json = r#"{
            "orderId": 123456,
            "symbol": "SOLUSDT",
            "side": "BUY",
            "type": "LIMIT",
            "price": "99.00000000",
            "origQty": "0.20000000"
        }"#;
        let order: OpenOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_id, 123456);
        assert_eq!(order.side, "BUY");
    }

    #[test]
    fn parses_error_body() {
        let json = r#"{"code":-2010,"msg":"Account has insufficient balance"}"#;
        let err: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(err.code, -2010);
        assert!(err.msg.contains("insufficient"));
    }
}
