//! Catalogue products (robots, accessories, spare parts).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CurrencyCode, Price, ProductId};

/// A product offered for outright purchase.
///
/// Immutable from this client's point of view; stock is decremented by the
/// API when a purchase is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    /// Unit price in rupiah.
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub stock_quantity: u32,
}

impl Product {
    /// Price as a displayable rupiah amount.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::new(self.price, CurrencyCode::IDR)
    }

    /// Whether the product can be ordered right now.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.is_available && self.stock_quantity > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Product {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_decode_float_price() {
        let product = decode(
            r#"{"id": 1, "name": "Sealen CleanBot", "category": "Robot",
                "price": 125000000.0, "is_available": true, "stock_quantity": 4,
                "features": ["Solar", "AI vision"]}"#,
        );
        assert_eq!(product.price, Decimal::from(125_000_000));
        assert_eq!(product.unit_price().to_string(), "Rp 125.000.000");
        assert_eq!(product.features.len(), 2);
        assert!(product.in_stock());
    }

    #[test]
    fn test_out_of_stock_or_unavailable() {
        let empty = decode(
            r#"{"id": 2, "name": "Net", "category": "Aksesori", "price": 750000,
                "is_available": true, "stock_quantity": 0}"#,
        );
        assert!(!empty.in_stock());

        let withdrawn = decode(
            r#"{"id": 3, "name": "Old Hull", "category": "Spare Part", "price": 50000,
                "is_available": false, "stock_quantity": 9}"#,
        );
        assert!(!withdrawn.in_stock());
    }
}
