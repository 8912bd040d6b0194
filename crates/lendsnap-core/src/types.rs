//! Event rows and the per-borrower position accumulator.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::Address;

// ─── Event rows ───────────────────────────────────────────────────────────────

/// A borrow event from the upstream indexer.
///
/// Immutable, externally sourced, ordered by `time` within its stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowEvent {
    /// Account the debt was taken on behalf of.
    pub on_behalf_of: Address,
    /// Reserve (asset) that was borrowed.
    pub reserve: Address,
    /// Ordering key assigned by the upstream indexer.
    pub time: i64,
}

/// A supply event from the upstream indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyEvent {
    /// Account the collateral was supplied on behalf of.
    pub on_behalf_of: Address,
    /// Asset that was supplied.
    pub asset: Address,
    /// Ordering key assigned by the upstream indexer.
    pub time: i64,
}

// ─── BorrowerPosition ─────────────────────────────────────────────────────────

/// Accumulated collateral and debt sets for one borrower.
///
/// A position is created only when an address first appears in a borrow
/// event, so `debt` is non-empty by construction. `collateral` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerPosition {
    /// The borrower, in normalized lowercase form.
    pub address: Address,
    /// Distinct assets ever supplied by this address.
    pub collateral: BTreeSet<Address>,
    /// Distinct reserves ever borrowed by this address.
    pub debt: BTreeSet<Address>,
}

impl BorrowerPosition {
    /// New position opened by a borrow of `reserve`.
    pub fn opened_by(address: Address, reserve: Address) -> Self {
        Self {
            address,
            collateral: BTreeSet::new(),
            debt: BTreeSet::from([reserve]),
        }
    }
}
