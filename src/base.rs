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

//! Core identifier type for assets.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for a tradable asset (e.g. `BTC`, `ETH`).
///
/// Codes are trimmed and uppercased on construction, so `Asset::new("btc")`
/// and `Asset::new("BTC")` name the same ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(code: impl AsRef<str>) -> Self {
        Asset(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Asset {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Asset::new(s))
    }
}

impl From<&str> for Asset {
    fn from(code: &str) -> Self {
        Asset::new(code)
    }
}

// Manual impl so deserialized codes go through the same normalization as
// constructed ones.
impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Ok(Asset::new(code))
    }
}

#[cfg(test)]
mod tests {
    use super::Asset;

    #[test]
    fn asset_codes_are_case_normalized() {
        assert_eq!(Asset::new("btc"), Asset::new("BTC"));
        assert_eq!(Asset::new(" eth "), Asset::new("ETH"));
        assert_eq!(Asset::new("doge").as_str(), "DOGE");
    }

    #[test]
    fn asset_deserializes_through_normalization() {
        let asset: Asset = serde_json::from_str("\"btc\"").unwrap();
        assert_eq!(asset, Asset::new("BTC"));
    }
}
