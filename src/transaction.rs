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

//! Normalized transaction records consumed by the ledger engine.

use crate::base::Asset;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single-asset currency movement.
///
/// Upstream collaborators parse exchange exports, resolve prices, and split
/// each two-asset trade into two of these records (one per side); the engine
/// processes every record independently, in the order given.
///
/// `amount` is signed: negative disposes units, positive acquires them.
/// `value` and `fee_value` carry the price resolver's output in the
/// reporting currency; `None` means the resolver failed, which is fatal at
/// processing time (a zero `fee_amount` with no `fee_value` simply means no
/// fee).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Exchange label, carried through to the disposition for reporting.
    pub exchange: Option<String>,
    pub asset: Asset,
    /// Signed quantity: negative = disposed, positive = acquired.
    pub amount: Decimal,
    /// Monetary value of the movement in the reporting currency.
    pub value: Option<Decimal>,
    pub time: NaiveDateTime,
    /// Asset the fee was charged in; equal to `asset` unless the fee was
    /// paid from a different holding.
    pub fee_asset: Asset,
    /// Fee quantity in `fee_asset` units, non-negative.
    pub fee_amount: Decimal,
    /// Monetary value of the fee in the reporting currency.
    pub fee_value: Option<Decimal>,
}

impl Transaction {
    /// A priced, fee-free transaction. The fee asset defaults to the traded
    /// asset so a zero fee never looks like a foreign-asset fee.
    pub fn new(
        asset: impl AsRef<str>,
        amount: Decimal,
        value: Decimal,
        time: NaiveDateTime,
    ) -> Self {
        let asset = Asset::new(asset);
        Transaction {
            exchange: None,
            fee_asset: asset.clone(),
            asset,
            amount,
            value: Some(value),
            time,
            fee_amount: Decimal::ZERO,
            fee_value: None,
        }
    }

    /// A transaction whose value the upstream resolver could not price.
    /// Processing it aborts the run.
    pub fn unpriced(asset: impl AsRef<str>, amount: Decimal, time: NaiveDateTime) -> Self {
        Transaction {
            value: None,
            ..Transaction::new(asset, amount, Decimal::ZERO, time)
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_fee(
        mut self,
        fee_asset: impl AsRef<str>,
        fee_amount: Decimal,
        fee_value: Decimal,
    ) -> Self {
        self.fee_asset = Asset::new(fee_asset);
        self.fee_amount = fee_amount;
        self.fee_value = Some(fee_value);
        self
    }

    /// Whether this transaction disposes units (reduces the balance).
    pub fn is_disposal(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Whether the fee was charged in an asset other than the traded one.
    pub fn has_foreign_fee(&self) -> bool {
        self.fee_asset != self.asset && self.fee_amount > Decimal::ZERO
    }
}
