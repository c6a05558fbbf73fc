use serde::{Deserialize, Serialize};

use crate::models::Availability;
use crate::price::parse_price;

/// Placeholder shown when a card has no readable name.
pub const MISSING_NAME: &str = "—";
/// Placeholder shown when a card has no readable price.
pub const MISSING_PRICE: &str = "Not available";

/// One matching catalog card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    /// Price text as displayed on the page.
    pub price: String,
    /// `f64::INFINITY` when `price` carries no number.
    pub price_value: f64,
    pub availability: Availability,
    pub source: String,
}

impl ProductRecord {
    pub fn new(name: String, price: String, availability: Availability, source: &str) -> Self {
        let price_value = parse_price(&price);
        Self {
            name,
            price,
            price_value,
            availability,
            source: source.to_string(),
        }
    }

    pub fn is_priced(&self) -> bool {
        self.price_value.is_finite()
    }
}
