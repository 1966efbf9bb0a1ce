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

//! Carry-forward seeds: opening balance and cost base per asset.
//!
//! A period's run ends by exporting `ASSET:balance:acb` triples; the next
//! period's run parses the same text back into its opening seeds. The two
//! functions here are the round-trip contract between adjacent periods.

use crate::base::Asset;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum closing-balance magnitude that earns an asset a carry-forward
/// entry. Slightly above zero to drop float-noise residues from upstream
/// quantities.
pub const CARRY_FORWARD_TOLERANCE: Decimal = rust_decimal_macros::dec!(0.000000005);

/// Opening state for one asset, carried in from a prior reporting period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Forward {
    pub balance: Decimal,
    pub acb: Decimal,
}

/// Parses a comma-separated list of `ASSET:balance:acb` triples.
///
/// Empty entries are skipped, so a trailing comma is harmless. Errors are
/// surfaced before any transaction is processed; a run never starts from a
/// half-parsed seed.
pub fn parse_spec(spec: &str) -> Result<HashMap<Asset, Forward>, LedgerError> {
    let mut forward = HashMap::new();

    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.split(':');
        let (Some(code), Some(balance), Some(acb), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(LedgerError::InvalidForwardSpec(entry.to_string()));
        };
        if code.trim().is_empty() {
            return Err(LedgerError::InvalidForwardSpec(entry.to_string()));
        }

        forward.insert(
            Asset::new(code),
            Forward {
                balance: parse_number("balance", balance)?,
                acb: parse_number("acb", acb)?,
            },
        );
    }

    Ok(forward)
}

/// Formats a forward map back into spec form, sorted by asset code for
/// deterministic output. Values are printed at full precision so the
/// round trip through [`parse_spec`] is exact.
pub fn format_spec(forward: &HashMap<Asset, Forward>) -> String {
    let mut entries: Vec<_> = forward.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .iter()
        .map(|(asset, f)| format!("{}:{}:{}", asset, f.balance, f.acb))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_number(field: &'static str, value: &str) -> Result<Decimal, LedgerError> {
    value
        .trim()
        .parse()
        .map_err(|_| LedgerError::InvalidForwardNumber {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_triples() {
        let forward = parse_spec("BTC:0.5:5000,eth:2:3000.25").unwrap();
        assert_eq!(forward.len(), 2);
        assert_eq!(
            forward[&Asset::new("BTC")],
            Forward {
                balance: dec!(0.5),
                acb: dec!(5000)
            }
        );
        assert_eq!(
            forward[&Asset::new("ETH")],
            Forward {
                balance: dec!(2),
                acb: dec!(3000.25)
            }
        );
    }

    #[test]
    fn empty_spec_is_empty_map() {
        assert!(parse_spec("").unwrap().is_empty());
        assert!(parse_spec(" , ").unwrap().is_empty());
    }

    #[test]
    fn trailing_comma_is_harmless() {
        assert_eq!(parse_spec("BTC:1:100,").unwrap().len(), 1);
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(
            parse_spec("BTC:1"),
            Err(LedgerError::InvalidForwardSpec("BTC:1".to_string()))
        );
        assert_eq!(
            parse_spec("BTC:1:2:3"),
            Err(LedgerError::InvalidForwardSpec("BTC:1:2:3".to_string()))
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        assert_eq!(
            parse_spec("BTC:abc:100"),
            Err(LedgerError::InvalidForwardNumber {
                field: "balance",
                value: "abc".to_string()
            })
        );
        assert_eq!(
            parse_spec("BTC:1:x"),
            Err(LedgerError::InvalidForwardNumber {
                field: "acb",
                value: "x".to_string()
            })
        );
    }

    #[test]
    fn format_round_trips_and_sorts() {
        let forward = parse_spec("ETH:2:3000,BTC:0.5:5000.125").unwrap();
        let text = format_spec(&forward);
        assert_eq!(text, "BTC:0.5:5000.125,ETH:2:3000");
        assert_eq!(parse_spec(&text).unwrap(), forward);
    }
}
