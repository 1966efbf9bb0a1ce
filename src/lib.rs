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

//! # ACB Ledger
//!
//! This library computes Canadian-style capital-gains figures for
//! crypto-asset trading using the Adjusted Cost Base (ACB) method: a
//! moving-average cost base per asset, proportional fee treatment, and the
//! 50% inclusion rate on realized gains.
//!
//! ## Core Components
//!
//! - [`LedgerEngine`]: folds a time-ordered transaction sequence into
//!   per-asset ledgers and finalizes a [`CapitalGains`] snapshot
//! - [`Ledger`]: per-asset running cost base, balance, and dispositions
//! - [`Transaction`]: normalized, already-priced input record
//! - [`Forward`]: carry-forward seed linking adjacent reporting periods
//! - [`DiagnosticSink`]: receiver for recoverable data-quality warnings
//!
//! ## Example
//!
//! ```
//! use acb_ledger::{EngineConfig, LedgerEngine, Transaction};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let t1 = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let t2 = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!
//! let mut engine = LedgerEngine::new(EngineConfig::default());
//!
//! // Acquire 1 BTC for 10,000, later dispose half for 6,000.
//! engine.process(Transaction::new("BTC", dec!(1.0), dec!(10000), t1)).unwrap();
//! engine.process(Transaction::new("BTC", dec!(-0.5), dec!(6000), t2)).unwrap();
//!
//! let (gains, _log) = engine.finalize();
//! assert_eq!(gains.aggregate_disposition.gain, dec!(1000));
//! assert_eq!(gains.taxable_gain, dec!(500));
//! ```
//!
//! ## Ordering
//!
//! The engine is a strictly sequential, single-owner fold: transactions
//! must already be merged into one global chronological order upstream.
//! There is no internal reordering, no locking, and exactly one writer.

pub mod base;
pub mod diagnostics;
mod engine;
pub mod error;
pub mod forward;
pub mod ledger;
mod transaction;

pub use base::Asset;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog, DiagnosticSink, NullSink};
pub use engine::{CapitalGains, EngineConfig, LedgerEngine};
pub use error::LedgerError;
pub use forward::{CARRY_FORWARD_TOLERANCE, Forward};
pub use ledger::{
    AggregateDisposition, BalanceSample, Disposition, Ledger, LedgerStore,
    NEGATIVE_BALANCE_TOLERANCE, NegativeBalanceRecord,
};
pub use transaction::Transaction;
