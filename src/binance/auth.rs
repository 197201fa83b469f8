//! Authentication for the Binance REST API
//!
//! Every authenticated call carries a millisecond timestamp parameter and an
//! HMAC-SHA256 hex signature computed over the canonical query string, with
//! the API key sent in the `X-MBX-APIKEY` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::types::ConfigError;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_ENDPOINT: &str = "https://api.binance.us";

/// Generate an HMAC-SHA256 signature over a canonical query string
pub fn sign_query(query: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// API credentials and endpoint, sourced from the environment
#[derive(Debug, Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    endpoint: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Read `BINANCE_API_KEY`, `BINANCE_SECRET_KEY` and optionally
    /// `BINANCE_ENDPOINT` from the environment. Missing key or secret is a
    /// fatal startup error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("BINANCE_API_KEY")
            .map_err(|_| ConfigError::MissingCredential("BINANCE_API_KEY"))?;
        let api_secret = std::env::var("BINANCE_SECRET_KEY")
            .map_err(|_| ConfigError::MissingCredential("BINANCE_SECRET_KEY"))?;
        let endpoint =
            std::env::var("BINANCE_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Ok(Self::new(api_key, api_secret, endpoint))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sign a canonical query string with the API secret
    pub fn sign(&self, query: &str) -> String {
        sign_query(query, &self.api_secret)
    }
}
