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

//! Per-asset ACB ledgers and their aggregates.
//!
//! A [`Ledger`] is the running account for one asset: total adjusted cost
//! base, quantity held, and every realized [`Disposition`] in chronological
//! order. The [`LedgerStore`] owns all ledgers for a run, keyed by asset,
//! created lazily and seeded from carry-forward state where supplied.

use crate::base::Asset;
use crate::forward::Forward;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Balance threshold below which a holding counts as genuinely negative.
/// Slightly below zero to absorb float noise in upstream quantities.
pub const NEGATIVE_BALANCE_TOLERANCE: Decimal = rust_decimal_macros::dec!(-0.000000005);

/// A realized disposal event. Immutable once appended to a ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disposition {
    pub exchange: Option<String>,
    /// Units disposed, positive.
    pub amount: Decimal,
    /// Proceeds of disposition.
    pub pod: Decimal,
    /// Cost base consumed by this disposal.
    pub acb: Decimal,
    /// Outlays and expenses: the fee charged on the disposal.
    pub oae: Decimal,
    /// `pod - acb - oae`.
    pub gain: Decimal,
    pub time: NaiveDateTime,
}

/// Componentwise sums over a set of dispositions. The zero element is
/// [`Default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateDisposition {
    pub amount: Decimal,
    pub pod: Decimal,
    pub acb: Decimal,
    pub oae: Decimal,
    pub gain: Decimal,
}

impl AggregateDisposition {
    pub fn accumulate(&mut self, disposition: &Disposition) {
        self.amount += disposition.amount;
        self.pod += disposition.pod;
        self.acb += disposition.acb;
        self.oae += disposition.oae;
        self.gain += disposition.gain;
    }

    pub fn merge(&mut self, other: &AggregateDisposition) {
        self.amount += other.amount;
        self.pod += other.pod;
        self.acb += other.acb;
        self.oae += other.oae;
        self.gain += other.gain;
    }
}

/// A balance observation at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceSample {
    pub balance: Decimal,
    pub time: NaiveDateTime,
}

/// First and lowest negative-balance observations for one asset.
///
/// Reporting-only: a negative balance indicates likely upstream defects
/// (missing acquisitions, mis-ordered input) but never blocks processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NegativeBalanceRecord {
    pub first: BalanceSample,
    pub minimum: BalanceSample,
}

impl NegativeBalanceRecord {
    fn new(sample: BalanceSample) -> Self {
        NegativeBalanceRecord {
            first: sample,
            minimum: sample,
        }
    }

    fn observe(&mut self, sample: BalanceSample) {
        if sample.balance < self.minimum.balance {
            self.minimum = sample;
        }
    }
}

/// Running account for one asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ledger {
    /// Total adjusted cost base of the units currently held.
    pub acb: Decimal,
    /// Quantity currently held.
    pub balance: Decimal,
    /// Realized disposals, insertion order = chronological.
    pub dispositions: Vec<Disposition>,
    /// Componentwise sum of `dispositions`; filled at finalization.
    pub aggregate: AggregateDisposition,
    /// Present only if the balance ever crossed the negative tolerance.
    pub negative_balance: Option<NegativeBalanceRecord>,
}

impl Ledger {
    fn seeded(forward: &Forward) -> Self {
        Ledger {
            acb: forward.acb,
            balance: forward.balance,
            ..Ledger::default()
        }
    }

    /// Average cost of one held unit. Zero when the balance is zero: a
    /// disposal from an empty ledger consumes no cost base, so its full
    /// proceeds are gain.
    pub fn acb_per_unit(&self) -> Decimal {
        if self.balance.is_zero() {
            Decimal::ZERO
        } else {
            self.acb / self.balance
        }
    }

    /// Checks the balance against the negative tolerance after a mutation.
    /// Returns `true` on the asset's first crossing; later crossings only
    /// lower the stored minimum.
    pub(crate) fn observe_balance(&mut self, time: NaiveDateTime) -> bool {
        if self.balance >= NEGATIVE_BALANCE_TOLERANCE {
            return false;
        }

        let sample = BalanceSample {
            balance: self.balance,
            time,
        };
        match &mut self.negative_balance {
            Some(record) => {
                record.observe(sample);
                false
            }
            None => {
                self.negative_balance = Some(NegativeBalanceRecord::new(sample));
                true
            }
        }
    }
}

/// Asset-keyed ledger map, exclusively owned and mutated by the engine.
///
/// Access is single-threaded and strictly sequential, so a plain `HashMap`
/// suffices; creation order carries no meaning and reporting order is
/// established by sorting asset codes at output time.
#[derive(Debug, Default, Serialize)]
pub struct LedgerStore {
    ledgers: HashMap<Asset, Ledger>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated from a prior period's carry-forward map.
    pub fn seeded(forward: &HashMap<Asset, Forward>) -> Self {
        LedgerStore {
            ledgers: forward
                .iter()
                .map(|(asset, fwd)| (asset.clone(), Ledger::seeded(fwd)))
                .collect(),
        }
    }

    /// Returns the ledger for `asset`, creating an empty one on first
    /// reference.
    pub fn get_or_create(&mut self, asset: &Asset) -> &mut Ledger {
        self.ledgers.entry(asset.clone()).or_default()
    }

    pub fn get(&self, asset: &Asset) -> Option<&Ledger> {
        self.ledgers.get(asset)
    }

    /// Looks up without creating. Fee settlement uses this: a fee paid from
    /// an untracked asset has nothing to decrement.
    pub fn get_mut(&mut self, asset: &Asset) -> Option<&mut Ledger> {
        self.ledgers.get_mut(asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Asset, &Ledger)> {
        self.ledgers.iter()
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    pub(crate) fn into_inner(self) -> HashMap<Asset, Ledger> {
        self.ledgers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn acb_per_unit_is_average_cost() {
        let ledger = Ledger {
            acb: dec!(10000),
            balance: dec!(2),
            ..Ledger::default()
        };
        assert_eq!(ledger.acb_per_unit(), dec!(5000));
    }

    #[test]
    fn acb_per_unit_of_empty_ledger_is_zero() {
        assert_eq!(Ledger::default().acb_per_unit(), Decimal::ZERO);
    }

    #[test]
    fn aggregate_sums_componentwise() {
        let mut aggregate = AggregateDisposition::default();
        aggregate.accumulate(&Disposition {
            exchange: None,
            amount: dec!(0.5),
            pod: dec!(6000),
            acb: dec!(5000),
            oae: dec!(10),
            gain: dec!(990),
            time: time(),
        });
        aggregate.accumulate(&Disposition {
            exchange: None,
            amount: dec!(0.25),
            pod: dec!(4000),
            acb: dec!(2500),
            oae: dec!(0),
            gain: dec!(1500),
            time: time(),
        });

        assert_eq!(aggregate.amount, dec!(0.75));
        assert_eq!(aggregate.pod, dec!(10000));
        assert_eq!(aggregate.acb, dec!(7500));
        assert_eq!(aggregate.oae, dec!(10));
        assert_eq!(aggregate.gain, dec!(2490));
    }

    #[test]
    fn merge_matches_accumulating_into_one() {
        let mut a = AggregateDisposition::default();
        a.merge(&AggregateDisposition {
            amount: dec!(1),
            pod: dec!(100),
            acb: dec!(60),
            oae: dec!(5),
            gain: dec!(35),
        });
        a.merge(&AggregateDisposition {
            amount: dec!(2),
            pod: dec!(50),
            acb: dec!(40),
            oae: dec!(0),
            gain: dec!(10),
        });
        assert_eq!(a.gain, dec!(45));
        assert_eq!(a.amount, dec!(3));
    }

    #[test]
    fn observe_balance_records_first_crossing_once() {
        let mut ledger = Ledger::default();
        ledger.balance = dec!(-2);
        assert!(ledger.observe_balance(time()));

        let record = ledger.negative_balance.unwrap();
        assert_eq!(record.first.balance, dec!(-2));
        assert_eq!(record.minimum.balance, dec!(-2));
    }

    #[test]
    fn observe_balance_tracks_minimum_on_later_crossings() {
        let mut ledger = Ledger::default();
        ledger.balance = dec!(-1);
        assert!(ledger.observe_balance(time()));

        ledger.balance = dec!(-3);
        assert!(!ledger.observe_balance(time()));

        ledger.balance = dec!(-2);
        assert!(!ledger.observe_balance(time()));

        let record = ledger.negative_balance.unwrap();
        assert_eq!(record.first.balance, dec!(-1));
        assert_eq!(record.minimum.balance, dec!(-3));
    }

    #[test]
    fn tiny_negative_noise_is_tolerated() {
        let mut ledger = Ledger::default();
        ledger.balance = dec!(-0.000000001);
        assert!(!ledger.observe_balance(time()));
        assert!(ledger.negative_balance.is_none());
    }

    #[test]
    fn store_creates_empty_ledger_lazily() {
        let mut store = LedgerStore::new();
        assert!(store.is_empty());

        let ledger = store.get_or_create(&Asset::new("BTC"));
        assert_eq!(ledger.acb, Decimal::ZERO);
        assert_eq!(ledger.balance, Decimal::ZERO);
        assert!(ledger.dispositions.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_seeds_from_forward() {
        let forward = HashMap::from([(
            Asset::new("BTC"),
            Forward {
                balance: dec!(0.5),
                acb: dec!(5000),
            },
        )]);
        let mut store = LedgerStore::seeded(&forward);

        let ledger = store.get_or_create(&Asset::new("btc"));
        assert_eq!(ledger.balance, dec!(0.5));
        assert_eq!(ledger.acb, dec!(5000));
    }

    #[test]
    fn get_mut_never_creates() {
        let mut store = LedgerStore::new();
        assert!(store.get_mut(&Asset::new("XRP")).is_none());
        assert!(store.is_empty());
    }
}
