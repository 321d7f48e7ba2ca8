//! Cart line types shared by the guest cart and the server cart.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::sku::Sku;

/// Product name used when a stored or returned line has none.
pub const PLACEHOLDER_PRODUCT_NAME: &str = "Untitled product";

/// One SKU-quantity-price record within a cart.
///
/// Serialized in the guest cart storage format:
/// `{sku, productName, variantName, price, quantity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Identity and merge key, unique within a cart.
    pub sku: Sku,
    /// Display name, never empty.
    pub product_name: String,
    /// Variant display name (e.g., "Large / Red").
    pub variant_name: Option<String>,
    /// Unit price hint. Not authoritative.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Strictly positive quantity.
    pub quantity: u32,
}

impl CartLine {
    /// Create a line with placeholder metadata and a zero price.
    #[must_use]
    pub fn new(sku: Sku, quantity: u32) -> Self {
        Self {
            sku,
            product_name: PLACEHOLDER_PRODUCT_NAME.to_string(),
            variant_name: None,
            price: Decimal::ZERO,
            quantity,
        }
    }

    /// Set the display metadata for this line.
    #[must_use]
    pub fn with_product(
        mut self,
        product_name: impl Into<String>,
        variant_name: Option<String>,
    ) -> Self {
        let name = product_name.into();
        if !name.trim().is_empty() {
            self.product_name = name;
        }
        self.variant_name = variant_name;
        self
    }

    /// Set the unit price hint for this line.
    #[must_use]
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    /// Unit price multiplied by quantity, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Whether this line still carries the placeholder product name.
    #[must_use]
    pub fn has_placeholder_name(&self) -> bool {
        self.product_name == PLACEHOLDER_PRODUCT_NAME
    }
}

/// Item count and subtotal for a list of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Sum of line quantities.
    pub item_count: u32,
    /// Sum of line totals.
    pub subtotal: Decimal,
}

impl CartTotals {
    /// Compute totals by simple summation over `lines`.
    ///
    /// Both sums saturate; stored prices are unbounded display hints.
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        lines.iter().fold(Self::default(), |acc, line| Self {
            item_count: acc.item_count.saturating_add(line.quantity),
            subtotal: acc.subtotal.saturating_add(line.line_total()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sku(s: &str) -> Sku {
        Sku::parse(s).unwrap()
    }

    #[test]
    fn test_storage_format_is_camel_case_with_numeric_price() {
        let line = CartLine::new(sku("A"), 2)
            .with_product("Tee", Some("Large".to_string()))
            .with_price(Decimal::new(1250, 2));

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["sku"], "A");
        assert_eq!(json["productName"], "Tee");
        assert_eq!(json["variantName"], "Large");
        assert_eq!(json["quantity"], 2);
        assert!(json["price"].is_number());
    }

    #[test]
    fn test_with_product_keeps_placeholder_for_blank_name() {
        let line = CartLine::new(sku("A"), 1).with_product("  ", None);
        assert!(line.has_placeholder_name());
    }

    #[test]
    fn test_totals() {
        let lines = vec![
            CartLine::new(sku("A"), 2).with_price(Decimal::new(500, 2)),
            CartLine::new(sku("B"), 1).with_price(Decimal::new(1999, 2)),
        ];
        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.subtotal, Decimal::new(2999, 2));
    }

    #[test]
    fn test_totals_saturate_on_huge_prices() {
        let huge = Decimal::from_str_exact("70000000000000000000000000000").unwrap();
        let lines = vec![
            CartLine::new(sku("A"), 5).with_price(huge),
            CartLine::new(sku("B"), u32::MAX).with_price(Decimal::MAX),
            CartLine::new(sku("C"), 1).with_price(Decimal::ONE),
        ];

        assert_eq!(lines[0].line_total(), Decimal::MAX);
        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.item_count, u32::MAX);
        assert_eq!(totals.subtotal, Decimal::MAX);
    }

    #[test]
    fn test_negative_price_saturates_low() {
        let line = CartLine::new(sku("A"), 2).with_price(Decimal::MIN);
        assert_eq!(line.line_total(), Decimal::MIN);
    }

    #[test]
    fn test_totals_empty() {
        assert_eq!(CartTotals::from_lines(&[]), CartTotals::default());
    }
}
