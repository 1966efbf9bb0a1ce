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

//! Diagnostic events for recoverable data-quality conditions.
//!
//! The engine reports conditions worth a human look without halting the
//! run: a disposal applied against an empty ledger, a balance dipping below
//! zero. Events are delivered to an injected [`DiagnosticSink`]; whether
//! they are printed, logged, or dropped is the caller's concern. The engine
//! never writes to a console itself.

use crate::base::Asset;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A disposal hit a zero balance; its cost base was treated as zero and
    /// the full proceeds as gain. Usually an upstream data defect (missing
    /// acquisitions or mis-ordered input).
    ZeroBalanceDisposal,
    /// A balance crossed below the negative tolerance.
    NegativeBalance,
}

/// A structured warning tied to one asset at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub asset: Asset,
    pub kind: DiagnosticKind,
    pub time: NaiveDateTime,
    pub message: String,
}

/// Receiver for diagnostic events emitted during a run.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Default sink: collects every event in emission order.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn log_collects_in_emission_order() {
        let time = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut log = DiagnosticLog::new();
        assert!(log.is_empty());

        log.emit(Diagnostic {
            asset: Asset::new("BTC"),
            kind: DiagnosticKind::ZeroBalanceDisposal,
            time,
            message: "first".to_string(),
        });
        log.emit(Diagnostic {
            asset: Asset::new("ETH"),
            kind: DiagnosticKind::NegativeBalance,
            time,
            message: "second".to_string(),
        });

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].message, "first");
        assert_eq!(log.entries()[1].kind, DiagnosticKind::NegativeBalance);
    }
}
