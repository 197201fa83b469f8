//! HTTP client for the Binance REST API

use chrono::Utc;
use reqwest::Method;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use super::auth::Credentials;
use super::types::{ApiErrorBody, NewOrderAck, OpenOrder, TickerPrice};
use super::Exchange;
use crate::types::{ExchangeError, OrderType, Side};

/// Request timeout; a hung call must not block the invocation indefinitely
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BinanceClient {
    credentials: Credentials,
    client: reqwest::Client,
}

impl BinanceClient {
    pub fn new(credentials: Credentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        BinanceClient {
            credentials,
            client,
        }
    }

    /// Append a millisecond timestamp and HMAC signature to the query params
    fn signed_query(&self, params: &[(&str, String)]) -> String {
        let timestamp = Utc::now().timestamp_millis();
        let mut query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!("timestamp={}", timestamp));
        let signature = self.credentials.sign(&query);
        format!("{}&signature={}", query, signature)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, ExchangeError> {
        let url = format!(
            "{}{}?{}",
            self.credentials.endpoint(),
            path,
            self.signed_query(params)
        );

        debug!("{} {}", method, path);

        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", self.credentials.api_key())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Surface the exchange's own message when the body parses
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.msg)
                .unwrap_or(body);
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

impl Exchange for BinanceClient {
    async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        let params = [("symbol", symbol.to_string())];
        let response = self
            .request(Method::GET, "/api/v3/ticker/price", &params)
            .await?;

        let ticker: TickerPrice = response.json().await?;
        ticker
            .price
            .parse::<f64>()
            .map_err(|e| ExchangeError::Parse(format!("bad ticker price {:?}: {}", ticker.price, e)))
    }

    async fn open_order_ids(&self, symbol: &str) -> Result<HashSet<String>, ExchangeError> {
        let params = [("symbol", symbol.to_string())];
        let response = self
            .request(Method::GET, "/api/v3/openOrders", &params)
            .await?;

        let orders: Vec<OpenOrder> = response.json().await?;
        Ok(orders.into_iter().map(|o| o.order_id.to_string()).collect())
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<String, ExchangeError> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("side", side.as_str().to_string()),
            ("type", order_type.as_str().to_string()),
            ("quantity", format!("{:.8}", quantity)),
            ("timeInForce", "GTC".to_string()),
        ];
        if let (OrderType::Limit, Some(price)) = (order_type, price) {
            params.push(("price", format!("{:.8}", price)));
        }

        info!(
            "placing {} {} order: {:.4} {} {}",
            side.as_str(),
            order_type.as_str(),
            quantity,
            symbol,
            price
                .map(|p| format!("@ {:.2}", p))
                .unwrap_or_else(|| "@ market".to_string())
        );

        let response = self.request(Method::POST, "/api/v3/order", &params).await?;
        let ack: NewOrderAck = response.json().await?;
        Ok(ack.order_id.to_string())
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), ExchangeError> {
        let params = [("symbol", symbol.to_string())];
        info!("cancelling all open {} orders", symbol);
        self.request(Method::DELETE, "/api/v3/openOrders", &params)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> BinanceClient {
        BinanceClient::new(Credentials::new("key", "secret", "https://example.invalid"))
    }

    #[test]
    fn signed_query_carries_timestamp_and_signature() {
        let client = test_client();
        let query = client.signed_query(&[("symbol", "SOLUSDT".to_string())]);
        assert!(query.starts_with("symbol=SOLUSDT&timestamp="));
        assert!(query.contains("&signature="));
        // hex HMAC-SHA256 is 64 chars
        let signature = query.rsplit("signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn signed_query_without_params_still_signed() {
        let client = test_client();
        let query = client.signed_query(&[]);
        assert!(query.starts_with("timestamp="));
        assert!(query.contains("&signature="));
    }
}
