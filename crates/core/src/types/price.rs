//! Price formatting using decimal arithmetic.
//!
//! Prices on guest cart lines are display hints only; the server recomputes
//! every amount at checkout.

use rust_decimal::Decimal;
use serde::Serialize;

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Format an amount for display (e.g., "$19.99").
    #[must_use]
    pub fn format(self, amount: Decimal) -> String {
        format!("{}{:.2}", self.symbol(), amount.round_dp(2))
    }
}

/// Format an amount in the store's default currency.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    CurrencyCode::default().format(amount)
}
