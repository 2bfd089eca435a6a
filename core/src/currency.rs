//! The two native denominations

use serde::{Deserialize, Serialize};

pub const DECIMALS: u32 = 18;

pub const THETA_SYMBOL: &str = "THETA";
pub const TFUEL_SYMBOL: &str = "TFUEL";

/// Rosetta currency object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
}

/// Which of the two coins an amount is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denom {
    Theta,
    TFuel,
}

impl Denom {
    pub const ALL: [Denom; 2] = [Denom::Theta, Denom::TFuel];

    pub fn symbol(self) -> &'static str {
        match self {
            Denom::Theta => THETA_SYMBOL,
            Denom::TFuel => TFUEL_SYMBOL,
        }
    }

    /// Coin identifier used by `/account/coins`
    pub fn coin_identifier(self) -> &'static str {
        match self {
            Denom::Theta => "ThetaWei",
            Denom::TFuel => "TFuelWei",
        }
    }

    pub fn currency(self) -> Currency {
        Currency {
            symbol: self.symbol().to_string(),
            decimals: DECIMALS,
        }
    }

    /// Symbols compare case-insensitively; the wei denomination names are
    /// accepted as aliases.
    pub fn from_symbol(symbol: &str) -> Option<Denom> {
        Denom::ALL.into_iter().find(|d| {
            symbol.eq_ignore_ascii_case(d.symbol()) || symbol.eq_ignore_ascii_case(d.coin_identifier())
        })
    }

    pub fn from_currency(currency: &Currency) -> Option<Denom> {
        if currency.decimals != DECIMALS {
            return None;
        }
        Denom::from_symbol(&currency.symbol)
    }
}

impl From<Denom> for Currency {
    fn from(d: Denom) -> Self {
        d.currency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_lookup() {
        assert_eq!(Denom::from_symbol("theta"), Some(Denom::Theta));
        assert_eq!(Denom::from_symbol("TFuelWei"), Some(Denom::TFuel));
        assert_eq!(Denom::from_symbol("ETH"), None);

        let wrong_decimals = Currency {
            symbol: "TFUEL".to_string(),
            decimals: 6,
        };
        assert_eq!(Denom::from_currency(&wrong_decimals), None);
    }
}
