// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 acb-ledger contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error types for ledger processing.
//!
//! Everything here is fatal: a transaction that cannot be priced would
//! corrupt every subsequent cost-base figure for its asset, so the run is
//! aborted rather than the record skipped. Recoverable conditions (disposal
//! from an empty ledger, a balance dipping negative) are reported through
//! [`crate::diagnostics`] instead.

use crate::base::Asset;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Ledger processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The upstream price resolver supplied no value for a transaction
    #[error("no resolved value for {asset} transaction at {time}")]
    UnpricedTransaction { asset: Asset, time: NaiveDateTime },

    /// A non-zero fee has no resolved monetary value
    #[error("no resolved value for {asset} fee at {time}")]
    UnpricedFee { asset: Asset, time: NaiveDateTime },

    /// Fee quantities must be non-negative
    #[error("negative fee amount on {asset} transaction at {time}")]
    NegativeFeeAmount { asset: Asset, time: NaiveDateTime },

    /// Disposal from an empty ledger, under the strict zero-balance policy
    #[error("disposal from empty {asset} ledger at {time}")]
    ZeroBalanceDisposal { asset: Asset, time: NaiveDateTime },

    /// Carry-forward entry is not an `ASSET:balance:acb` triple
    #[error("malformed carry-forward entry '{0}' (expected ASSET:balance:acb)")]
    InvalidForwardSpec(String),

    /// Carry-forward numeric field did not parse as a decimal
    #[error("invalid {field} '{value}' in carry-forward spec")]
    InvalidForwardNumber { field: &'static str, value: String },
}
