//! Usage pricing

mod pricing;

pub use pricing::{TokenPricing, DEFAULT_PRICE_PER_TOKEN_NANOS};
