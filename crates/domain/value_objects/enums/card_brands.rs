use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Unknown,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Amex => "amex",
            CardBrand::Unknown => "unknown",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "visa" => CardBrand::Visa,
            "mastercard" => CardBrand::Mastercard,
            "amex" => CardBrand::Amex,
            _ => CardBrand::Unknown,
        }
    }

    /// Brand is taken from the leading digit only, never from caller input.
    pub fn from_card_number(digits: &str) -> Self {
        match digits.chars().next() {
            Some('4') => CardBrand::Visa,
            Some('5') | Some('2') => CardBrand::Mastercard,
            Some('3') => CardBrand::Amex,
            _ => CardBrand::Unknown,
        }
    }
}

impl Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
