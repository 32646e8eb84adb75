use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A three-letter currency code, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Invalid currency code '{code}'"
            )))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fiat amount tagged with its currency.
///
/// Arithmetic and comparison only make sense between amounts of the same
/// currency, so every binary operation is checked and reports
/// [`PaymentError::CurrencyMismatch`] instead of silently mixing currencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiatAmount {
    pub currency: Currency,
    pub value: Decimal,
}

impl FiatAmount {
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { currency, value }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Builds an amount that must be strictly positive, as requested amounts are.
    pub fn positive(value: Decimal, currency: Currency) -> Result<Self> {
        let amount = Self::new(value, currency);
        amount.ensure_positive()?;
        Ok(amount)
    }

    pub fn ensure_positive(&self) -> Result<()> {
        if self.value > Decimal::ZERO {
            Ok(())
        } else {
            Err(PaymentError::ValidationError(format!(
                "Amount must be positive, got {self}"
            )))
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn ensure_same_currency(&self, other: &FiatAmount) -> Result<()> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(PaymentError::CurrencyMismatch {
                expected: self.currency.clone(),
                found: other.currency.clone(),
            })
        }
    }

    /// Fails on a currency mismatch or when the sum leaves the `Decimal` range.
    pub fn checked_add(&self, other: &FiatAmount) -> Result<FiatAmount> {
        self.ensure_same_currency(other)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or_else(|| overflow("+", self, other))?;
        Ok(Self::new(value, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &FiatAmount) -> Result<FiatAmount> {
        self.ensure_same_currency(other)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or_else(|| overflow("-", self, other))?;
        Ok(Self::new(value, self.currency.clone()))
    }

    pub fn try_cmp(&self, other: &FiatAmount) -> Result<Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.value.cmp(&other.value))
    }

    /// Clamps negative amounts to zero.
    pub fn non_negative(self) -> FiatAmount {
        if self.value.is_sign_negative() {
            Self::zero(self.currency)
        } else {
            self
        }
    }
}

impl fmt::Display for FiatAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

fn overflow(op: &str, lhs: &FiatAmount, rhs: &FiatAmount) -> PaymentError {
    PaymentError::ValidationError(format!("Amount overflow: {lhs} {op} {rhs}"))
}
