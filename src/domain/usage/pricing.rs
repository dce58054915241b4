//! Token pricing for cost-savings accounting

use serde::{Deserialize, Serialize};

const NANOS_PER_USD: f64 = 1_000_000_000.0;

/// Published generation rate, 0.000045 USD per token
pub const DEFAULT_PRICE_PER_TOKEN_NANOS: u64 = 45_000;

/// Flat per-token generation price
///
/// Held as integer nano-dollars so that cost arithmetic is exact up to the
/// final conversion to USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPricing {
    price_per_token_nanos: u64,
}

impl Default for TokenPricing {
    fn default() -> Self {
        Self::from_nanos(DEFAULT_PRICE_PER_TOKEN_NANOS)
    }
}

impl TokenPricing {
    pub fn from_nanos(price_per_token_nanos: u64) -> Self {
        Self {
            price_per_token_nanos,
        }
    }

    /// Build from a USD-per-token rate; negative rates are treated as zero
    pub fn from_usd(price_per_token: f64) -> Self {
        Self::from_nanos((price_per_token.max(0.0) * NANOS_PER_USD).round() as u64)
    }

    pub fn price_per_token_nanos(&self) -> u64 {
        self.price_per_token_nanos
    }

    /// Price per token in USD
    pub fn price_per_token(&self) -> f64 {
        self.price_per_token_nanos as f64 / NANOS_PER_USD
    }

    /// Cost of `tokens` in nano-dollars
    pub fn cost_nanos(&self, tokens: u64) -> u128 {
        tokens as u128 * self.price_per_token_nanos as u128
    }

    /// Cost of `tokens` in USD
    pub fn calculate_cost(&self, tokens: u64) -> f64 {
        self.cost_nanos(tokens) as f64 / NANOS_PER_USD
    }
}
