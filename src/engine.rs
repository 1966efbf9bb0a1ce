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

//! ACB ledger engine.
//!
//! The [`LedgerEngine`] is the central component: it folds a time-ordered
//! sequence of [`Transaction`]s into per-asset ledgers and finalizes the run
//! into a single [`CapitalGains`] snapshot.
//!
//! # Transaction Processing
//!
//! - **Acquisitions** (`amount >= 0`): capitalize `value + fee_value` into
//!   the asset's cost base.
//! - **Disposals** (`amount < 0`): realize a [`Disposition`] at the current
//!   average cost per unit and reduce the cost base proportionally (the
//!   moving-average ACB method, not FIFO/LIFO).
//! - **Foreign-asset fees**: decrement the fee asset's own ledger as a
//!   micro-disposal, when that ledger exists.
//!
//! # Ordering and Lifecycle
//!
//! The engine is a single-threaded, strictly sequential fold. It never
//! reorders input; chronological order is an upstream guarantee, and
//! violating it silently produces wrong cost-base math. The run moves
//! Empty → Accumulating ([`LedgerEngine::process`], one self-loop per
//! transaction) → Finalized ([`LedgerEngine::finalize`], which consumes the
//! engine — a new run requires a new engine, optionally seeded with the
//! prior run's carry-forward output).

use crate::base::Asset;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog, DiagnosticSink};
use crate::error::LedgerError;
use crate::forward::{CARRY_FORWARD_TOLERANCE, Forward};
use crate::ledger::{AggregateDisposition, Disposition, Ledger, LedgerStore};
use crate::transaction::Transaction;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;

/// Capital-gains inclusion rate: half of the net gain is taxable.
const INCLUSION_RATE: Decimal = dec!(0.5);

/// Engine configuration with explicit defaults: empty carry-forward map,
/// foreign-asset fee settlement on, lenient zero-balance policy.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Opening `{balance, acb}` per asset from the prior period.
    pub forward: HashMap<Asset, Forward>,
    /// Settle fees paid in a foreign asset against that asset's ledger.
    /// Turn off to reproduce historical runs that never settled them.
    pub settle_foreign_fees: bool,
    /// Treat a disposal from an empty ledger as a fatal error instead of a
    /// zero-cost-base disposition with a diagnostic.
    pub strict_zero_balance: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            forward: HashMap::new(),
            settle_foreign_fees: true,
            strict_zero_balance: false,
        }
    }

    pub fn with_forward(mut self, forward: HashMap<Asset, Forward>) -> Self {
        self.forward = forward;
        self
    }
}

// Manual impl: a derived Default would turn fee settlement off.
impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateful ACB ledger engine for one reporting period.
///
/// # Invariants
///
/// - Each asset's `balance` equals its forward balance plus the signed sum
///   of applied amounts, minus foreign-fee settlements.
/// - `acb` changes only through acquisition capitalization, disposition
///   consumption, and fee settlement.
/// - The ledger store has exactly one writer (this engine) and no
///   concurrent readers, so no synchronization is involved.
pub struct LedgerEngine<S = DiagnosticLog> {
    config: EngineConfig,
    store: LedgerStore,
    /// Every processed transaction, kept for the audit section of the
    /// final report.
    transactions: Vec<Transaction>,
    sink: S,
}

impl LedgerEngine<DiagnosticLog> {
    /// Creates an engine collecting diagnostics into a [`DiagnosticLog`].
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sink(config, DiagnosticLog::new())
    }
}

impl Default for LedgerEngine<DiagnosticLog> {
    fn default() -> Self {
        Self::new(EngineConfig::new())
    }
}

impl<S: DiagnosticSink> LedgerEngine<S> {
    /// Creates an engine delivering diagnostics to the given sink.
    pub fn with_sink(config: EngineConfig, sink: S) -> Self {
        let store = LedgerStore::seeded(&config.forward);
        LedgerEngine {
            config,
            store,
            transactions: Vec::new(),
            sink,
        }
    }

    /// Applies one transaction to its asset's ledger.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnpricedTransaction`] / [`LedgerError::UnpricedFee`]
    ///   - the upstream resolver left a value unpriced. Fatal: continuing
    ///   would silently corrupt every later figure for the asset.
    /// - [`LedgerError::NegativeFeeAmount`] - malformed input.
    /// - [`LedgerError::ZeroBalanceDisposal`] - only under
    ///   [`EngineConfig::strict_zero_balance`].
    ///
    /// A failed transaction changes no balance and no cost base.
    pub fn process(&mut self, transaction: Transaction) -> Result<(), LedgerError> {
        let value = transaction
            .value
            .ok_or_else(|| LedgerError::UnpricedTransaction {
                asset: transaction.asset.clone(),
                time: transaction.time,
            })?;

        if transaction.fee_amount < Decimal::ZERO {
            return Err(LedgerError::NegativeFeeAmount {
                asset: transaction.asset.clone(),
                time: transaction.time,
            });
        }
        let fee_value = if transaction.fee_amount > Decimal::ZERO {
            transaction.fee_value.ok_or_else(|| LedgerError::UnpricedFee {
                asset: transaction.fee_asset.clone(),
                time: transaction.time,
            })?
        } else {
            transaction.fee_value.unwrap_or(Decimal::ZERO)
        };

        if transaction.is_disposal() {
            self.apply_disposal(&transaction, value, fee_value)?;
        } else {
            // Acquisition: the fee is capitalized into cost base rather
            // than expensed.
            self.store.get_or_create(&transaction.asset).acb += value + fee_value;
        }

        let ledger = self.store.get_or_create(&transaction.asset);
        ledger.balance += transaction.amount;
        self.watch_balance(&transaction.asset, transaction.time);

        if self.config.settle_foreign_fees && transaction.has_foreign_fee() {
            self.settle_foreign_fee(&transaction);
        }

        self.transactions.push(transaction);
        Ok(())
    }

    /// Realizes a disposition at the current average cost per unit.
    fn apply_disposal(
        &mut self,
        tx: &Transaction,
        value: Decimal,
        fee_value: Decimal,
    ) -> Result<(), LedgerError> {
        let ledger = self.store.get_or_create(&tx.asset);
        let acb_per_unit = ledger.acb_per_unit();
        let empty = ledger.balance.is_zero();

        if empty {
            if self.config.strict_zero_balance {
                return Err(LedgerError::ZeroBalanceDisposal {
                    asset: tx.asset.clone(),
                    time: tx.time,
                });
            }
            // Lenient policy: zero cost base, full proceeds as gain.
            self.sink.emit(Diagnostic {
                asset: tx.asset.clone(),
                kind: DiagnosticKind::ZeroBalanceDisposal,
                time: tx.time,
                message: format!(
                    "disposal of {} {} from an empty ledger; cost base treated as zero",
                    -tx.amount, tx.asset
                ),
            });
        }

        let amount = -tx.amount;
        let acb = amount * acb_per_unit;
        let disposition = Disposition {
            exchange: tx.exchange.clone(),
            amount,
            pod: value,
            acb,
            oae: fee_value,
            gain: value - acb - fee_value,
            time: tx.time,
        };

        let ledger = self.store.get_or_create(&tx.asset);
        ledger.dispositions.push(disposition);
        // tx.amount is negative: this removes the consumed cost base.
        ledger.acb += acb_per_unit * tx.amount;
        Ok(())
    }

    /// Settles a fee paid in an asset other than the traded one by
    /// decrementing that asset's ledger as a micro-disposal. A fee asset
    /// with no ledger is outside the tracked universe: no-op.
    fn settle_foreign_fee(&mut self, tx: &Transaction) {
        let Some(ledger) = self.store.get_mut(&tx.fee_asset) else {
            return;
        };
        let fee_acb_per_unit = ledger.acb_per_unit();
        ledger.acb -= fee_acb_per_unit * tx.fee_amount;
        ledger.balance -= tx.fee_amount;
        self.watch_balance(&tx.fee_asset, tx.time);
    }

    /// Negative-balance monitor: runs after every balance mutation.
    fn watch_balance(&mut self, asset: &Asset, time: NaiveDateTime) {
        let Some(ledger) = self.store.get_mut(asset) else {
            return;
        };
        if ledger.observe_balance(time) {
            let balance = ledger.balance;
            self.sink.emit(Diagnostic {
                asset: asset.clone(),
                kind: DiagnosticKind::NegativeBalance,
                time,
                message: format!(
                    "balance of {asset} fell to {balance}; likely missing acquisitions upstream"
                ),
            });
        }
    }

    /// The ledger currently held for `asset`, if any.
    pub fn ledger(&self, asset: &Asset) -> Option<&Ledger> {
        self.store.get(asset)
    }

    /// Transactions applied so far, in order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The diagnostic sink, for inspection mid-run.
    pub fn diagnostics(&self) -> &S {
        &self.sink
    }

    /// Finalizes the run: folds every ledger's dispositions into per-asset
    /// aggregates, merges those into the grand total, and derives the
    /// taxable gain at the 50% inclusion rate.
    ///
    /// Consumes the engine; the Finalized state is terminal. Returns the
    /// snapshot together with the diagnostic sink.
    pub fn finalize(self) -> (CapitalGains, S) {
        let LedgerEngine {
            config,
            store,
            transactions,
            sink,
        } = self;

        let mut ledger_by_asset = store.into_inner();
        let mut grand = AggregateDisposition::default();
        for ledger in ledger_by_asset.values_mut() {
            let mut aggregate = AggregateDisposition::default();
            for disposition in &ledger.dispositions {
                aggregate.accumulate(disposition);
            }
            grand.merge(&aggregate);
            ledger.aggregate = aggregate;
        }

        let gains = CapitalGains {
            forward_by_asset: config.forward,
            transactions,
            ledger_by_asset,
            aggregate_disposition: grand,
            taxable_gain: grand.gain * INCLUSION_RATE,
        };
        (gains, sink)
    }
}

/// Final snapshot of one reporting period's run.
#[derive(Debug, Clone, Serialize)]
pub struct CapitalGains {
    /// Echo of the seed the run started from.
    pub forward_by_asset: HashMap<Asset, Forward>,
    /// Every processed transaction, for the audit section of a report.
    pub transactions: Vec<Transaction>,
    /// Final ledgers, each carrying its per-asset aggregate.
    pub ledger_by_asset: HashMap<Asset, Ledger>,
    /// Grand total over all assets.
    pub aggregate_disposition: AggregateDisposition,
    /// `aggregate_disposition.gain` at the 50% inclusion rate.
    pub taxable_gain: Decimal,
}

impl CapitalGains {
    /// Derives the seed for the next period: `{balance, acb}` for every
    /// asset whose closing balance magnitude exceeds the carry tolerance.
    pub fn carry_forward(&self) -> HashMap<Asset, Forward> {
        self.ledger_by_asset
            .iter()
            .filter(|(_, ledger)| ledger.balance.abs() > CARRY_FORWARD_TOLERANCE)
            .map(|(asset, ledger)| {
                (
                    asset.clone(),
                    Forward {
                        balance: ledger.balance,
                        acb: ledger.acb,
                    },
                )
            })
            .collect()
    }

    /// Ledgers in deterministic reporting order (sorted by asset code).
    pub fn sorted_ledgers(&self) -> Vec<(&Asset, &Ledger)> {
        let mut entries: Vec<_> = self.ledger_by_asset.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
