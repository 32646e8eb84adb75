use crate::domain::money::{Currency, FiatAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Last known gateway balance for one currency.
///
/// `stale` is advisory: it tells observers the amount has not been refreshed
/// since the last failed poll, but reservations are still checked against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub amount: FiatAmount,
    pub stale: bool,
}

impl BalanceEntry {
    /// Entry for a currency the gateway has never reported.
    pub fn unknown(currency: Currency) -> Self {
        Self {
            amount: FiatAmount::zero(currency),
            stale: true,
        }
    }
}

/// Per-currency cache of the balances reported by the gateway.
///
/// Every mutator returns the entries it actually changed so callers can
/// notify observers once per change.
#[derive(Debug, Default)]
pub struct BalanceCache {
    entries: BTreeMap<Currency, BalanceEntry>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, currency: &Currency) -> BalanceEntry {
        self.entries
            .get(currency)
            .cloned()
            .unwrap_or_else(|| BalanceEntry::unknown(currency.clone()))
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.entries.contains_key(currency)
    }

    /// Stores a fresh amount for its currency.
    pub fn update(&mut self, amount: FiatAmount) -> Option<BalanceEntry> {
        let entry = BalanceEntry {
            amount,
            stale: false,
        };
        if self.entries.get(&entry.amount.currency) == Some(&entry) {
            return None;
        }
        self.entries
            .insert(entry.amount.currency.clone(), entry.clone());
        Some(entry)
    }

    /// Applies a full poll result. Currencies missing from `balances` keep
    /// their previous entry untouched.
    pub fn apply(&mut self, balances: Vec<FiatAmount>) -> Vec<BalanceEntry> {
        balances
            .into_iter()
            .filter_map(|amount| self.update(amount))
            .collect()
    }

    pub fn mark_stale(&mut self, currency: &Currency) -> Option<BalanceEntry> {
        let entry = self.entries.get_mut(currency)?;
        if entry.stale {
            return None;
        }
        entry.stale = true;
        Some(entry.clone())
    }

    pub fn mark_all_stale(&mut self) -> Vec<BalanceEntry> {
        self.entries
            .values_mut()
            .filter(|entry| !entry.stale)
            .map(|entry| {
                entry.stale = true;
                entry.clone()
            })
            .collect()
    }

    /// Snapshot of every tracked currency, ordered by currency code.
    pub fn entries(&self) -> Vec<BalanceEntry> {
        self.entries.values().cloned().collect()
    }
}
