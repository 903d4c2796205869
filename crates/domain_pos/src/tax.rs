//! Tax primitives

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_kernel::{round_amount, Rate, TaxId, STORAGE_DP};

/// Whether a tax is already contained in the price or added on top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    Inclusive,
    Exclusive,
}

impl TaxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxMode::Inclusive => "inclusive",
            TaxMode::Exclusive => "exclusive",
        }
    }
}

impl FromStr for TaxMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inclusive" => Ok(TaxMode::Inclusive),
            "exclusive" => Ok(TaxMode::Exclusive),
            other => Err(format!("unknown tax mode: {other}")),
        }
    }
}

/// A configured tax rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
    pub id: TaxId,
    pub name: String,
    /// Rate in percent (15 for 15%)
    pub rate: Decimal,
    pub mode: TaxMode,
}

impl Tax {
    pub fn exclusive(id: TaxId, name: impl Into<String>, rate: Decimal) -> Self {
        Self { id, name: name.into(), rate, mode: TaxMode::Exclusive }
    }

    pub fn inclusive(id: TaxId, name: impl Into<String>, rate: Decimal) -> Self {
        Self { id, name: name.into(), rate, mode: TaxMode::Inclusive }
    }

    pub fn is_inclusive(&self) -> bool {
        self.mode == TaxMode::Inclusive
    }

    pub fn as_rate(&self) -> Rate {
        Rate::from_percentage(self.rate)
    }

    /// Unrounded tax for a net line amount
    pub(crate) fn raw_amount(&self, base: Decimal) -> Decimal {
        let rate = self.as_rate();
        match self.mode {
            TaxMode::Inclusive => base - base / (Decimal::ONE + rate.as_decimal()),
            TaxMode::Exclusive => rate.of(base),
        }
    }
}

/// Tax contained in or added to `base`, rounded to 4 decimals
///
/// - inclusive: `base − base / (1 + rate/100)`
/// - exclusive: `base × rate/100`
/// - no tax: zero
pub fn tax_amount_for(base: Decimal, tax: Option<&Tax>) -> Decimal {
    let Some(tax) = tax else {
        return Decimal::ZERO;
    };
    round_amount(tax.raw_amount(base), STORAGE_DP)
}

/// `base` plus exclusive tax; inclusive or absent tax leaves `base` unchanged
pub fn total_with_tax(base: Decimal, tax: Option<&Tax>) -> Decimal {
    match tax {
        Some(t) if t.mode == TaxMode::Exclusive => base + tax_amount_for(base, tax),
        _ => base,
    }
}
