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

use acb_ledger::{
    Asset, CapitalGains, DiagnosticLog, EngineConfig, LedgerEngine, Transaction, forward,
};
use chrono::NaiveDateTime;
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// ACB Ledger - compute capital gains from normalized transaction CSVs
///
/// Reads an already-priced, chronologically ordered transaction CSV and
/// writes a per-asset summary to stdout, followed by the taxable gain and
/// a carry-forward line for seeding the next period's run.
#[derive(Parser, Debug)]
#[command(name = "acb-ledger")]
#[command(about = "Computes Canadian capital gains with the Adjusted Cost Base method", long_about = None)]
struct Args {
    /// Path to CSV file with normalized transactions
    ///
    /// Expected columns:
    /// exchange,asset,amount,value,time,fee_asset,fee_amount,fee_value
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Carry-forward seed from the prior period, as comma-separated
    /// ASSET:balance:acb triples
    #[arg(long, value_name = "SPEC")]
    forward: Option<String>,

    /// Admit only this asset (repeatable); default is all assets
    #[arg(long = "asset", value_name = "CODE")]
    assets: Vec<String>,

    /// Do not settle fees paid in a foreign asset against that asset's
    /// ledger (historical-parity mode)
    #[arg(long)]
    no_fee_settlement: bool,

    /// Abort on disposal from an empty ledger instead of treating the
    /// cost base as zero
    #[arg(long)]
    strict_zero_balance: bool,
}

fn main() {
    let args = Args::parse();

    // Config errors surface before any transaction is processed.
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error in configuration: {}", e);
            process::exit(1);
        }
    };
    let filter: HashSet<Asset> = args.assets.iter().map(Asset::new).collect();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let (gains, log) = match process_transactions(BufReader::new(file), config, &filter) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error processing transactions: {}", e);
            process::exit(1);
        }
    };

    // Diagnostics go to stderr; the report stays machine-readable.
    for diagnostic in log.entries() {
        eprintln!("warning: {} at {}: {}", diagnostic.asset, diagnostic.time, diagnostic.message);
    }

    if let Err(e) = write_report(&gains, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }

    println!("taxable gain: {}", q2(gains.taxable_gain));
    let carry = gains.carry_forward();
    if !carry.is_empty() {
        println!("carry forward: {}", forward::format_spec(&carry));
    }
}

fn build_config(args: &Args) -> Result<EngineConfig, acb_ledger::LedgerError> {
    let mut config = EngineConfig::new();
    if let Some(spec) = &args.forward {
        config.forward = forward::parse_spec(spec)?;
    }
    config.settle_foreign_fees = !args.no_fee_settlement;
    config.strict_zero_balance = args.strict_zero_balance;
    Ok(config)
}

/// Raw CSV record matching the normalized input format.
///
/// Fields: `exchange,asset,amount,value,time,fee_asset,fee_amount,fee_value`
/// An empty `value` or `fee_value` means the upstream resolver failed to
/// price the record; the engine treats that as fatal.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(default)]
    exchange: String,
    asset: String,
    amount: Decimal,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    value: Option<Decimal>,
    time: String,
    #[serde(default)]
    fee_asset: String,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    fee_amount: Option<Decimal>,
    #[serde(deserialize_with = "csv::invalid_option", default)]
    fee_value: Option<Decimal>,
}

impl CsvRecord {
    fn into_transaction(self) -> Result<Transaction, Box<dyn Error>> {
        let asset = Asset::new(&self.asset);
        let fee_asset = if self.fee_asset.trim().is_empty() {
            asset.clone()
        } else {
            Asset::new(&self.fee_asset)
        };

        Ok(Transaction {
            exchange: if self.exchange.trim().is_empty() {
                None
            } else {
                Some(self.exchange.trim().to_string())
            },
            asset,
            amount: self.amount,
            value: self.value,
            time: parse_time(&self.time)?,
            fee_asset,
            fee_amount: self.fee_amount.unwrap_or(Decimal::ZERO),
            fee_value: self.fee_value,
        })
    }
}

fn parse_time(s: &str) -> Result<NaiveDateTime, Box<dyn Error>> {
    let s = s.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(t);
        }
    }
    Err(format!("unsupported timestamp format: {}", s).into())
}

/// Streams transactions from a CSV reader through a fresh engine.
///
/// Unlike lenient importers, a malformed row is fatal here: a dropped or
/// misread transaction would silently skew every later cost-base figure,
/// so the run aborts instead.
fn process_transactions<R: Read>(
    reader: R,
    config: EngineConfig,
    filter: &HashSet<Asset>,
) -> Result<(CapitalGains, DiagnosticLog), Box<dyn Error>> {
    let mut engine = LedgerEngine::new(config);

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        let transaction = result?.into_transaction()?;
        if !filter.is_empty() && !filter.contains(&transaction.asset) {
            continue;
        }
        engine.process(transaction)?;
    }

    Ok(engine.finalize())
}

/// One summary row per asset, plus a grand-total row.
#[derive(Debug, Serialize)]
struct ReportRow {
    asset: String,
    balance: Decimal,
    acb: Decimal,
    units_disposed: Decimal,
    pod: Decimal,
    acb_disposed: Decimal,
    oae: Decimal,
    gain: Decimal,
}

fn q2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn q8(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(8, RoundingStrategy::MidpointAwayFromZero)
}

/// Writes the per-asset summary CSV, sorted by asset code, with a final
/// TOTAL row holding the grand aggregate.
fn write_report<W: Write>(gains: &CapitalGains, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for (asset, ledger) in gains.sorted_ledgers() {
        wtr.serialize(ReportRow {
            asset: asset.to_string(),
            balance: q8(ledger.balance),
            acb: q2(ledger.acb),
            units_disposed: q8(ledger.aggregate.amount),
            pod: q2(ledger.aggregate.pod),
            acb_disposed: q2(ledger.aggregate.acb),
            oae: q2(ledger.aggregate.oae),
            gain: q2(ledger.aggregate.gain),
        })?;
    }

    let total = &gains.aggregate_disposition;
    wtr.serialize(ReportRow {
        asset: "TOTAL".to_string(),
        balance: Decimal::ZERO,
        acb: Decimal::ZERO,
        units_disposed: q8(total.amount),
        pod: q2(total.pod),
        acb_disposed: q2(total.acb),
        oae: q2(total.oae),
        gain: q2(total.gain),
    })?;

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    const HEADER: &str = "exchange,asset,amount,value,time,fee_asset,fee_amount,fee_value\n";

    fn run(csv: &str) -> (CapitalGains, DiagnosticLog) {
        process_transactions(Cursor::new(csv), EngineConfig::new(), &HashSet::new()).unwrap()
    }

    #[test]
    fn parses_acquisition_and_disposal() {
        let csv = format!(
            "{HEADER}\
             kraken,BTC,1.0,10000,2025-01-10 00:00:00,,,\n\
             kraken,BTC,-0.5,6000,2025-03-02 00:00:00,,,\n"
        );
        let (gains, _log) = run(&csv);

        let ledger = &gains.ledger_by_asset[&Asset::new("BTC")];
        assert_eq!(ledger.balance, dec!(0.5));
        assert_eq!(ledger.acb, dec!(5000));
        assert_eq!(gains.taxable_gain, dec!(500));
    }

    #[test]
    fn empty_fee_asset_defaults_to_traded_asset() {
        let csv = format!("{HEADER}kraken,BTC,1.0,10000,2025-01-10 00:00:00,,0.001,12\n");
        let (gains, _log) = run(&csv);

        // Fee in the same asset: capitalized, no foreign settlement.
        let ledger = &gains.ledger_by_asset[&Asset::new("BTC")];
        assert_eq!(ledger.acb, dec!(10012));
        assert_eq!(ledger.balance, dec!(1.0));
    }

    #[test]
    fn unpriced_value_aborts_run() {
        let csv = format!("{HEADER}kraken,BTC,1.0,,2025-01-10 00:00:00,,,\n");
        let result = process_transactions(Cursor::new(csv), EngineConfig::new(), &HashSet::new());
        assert!(result.is_err());
    }

    #[test]
    fn malformed_row_aborts_run() {
        let csv = format!("{HEADER}kraken,BTC,not-a-number,1,2025-01-10 00:00:00,,,\n");
        let result = process_transactions(Cursor::new(csv), EngineConfig::new(), &HashSet::new());
        assert!(result.is_err());
    }

    #[test]
    fn asset_filter_admits_subset() {
        let csv = format!(
            "{HEADER}\
             kraken,BTC,1.0,10000,2025-01-10 00:00:00,,,\n\
             kraken,ETH,2.0,3000,2025-01-11 00:00:00,,,\n"
        );
        let filter = HashSet::from([Asset::new("eth")]);
        let (gains, _log) =
            process_transactions(Cursor::new(csv), EngineConfig::new(), &filter).unwrap();

        assert_eq!(gains.ledger_by_asset.len(), 1);
        assert!(gains.ledger_by_asset.contains_key(&Asset::new("ETH")));
    }

    #[test]
    fn parses_fractional_timestamps() {
        let t = parse_time("2025-01-04 00:05:16.8462").unwrap();
        assert_eq!(t.and_utc().timestamp_subsec_millis(), 846);
        assert!(parse_time("2025-01-04T00:05:16").is_ok());
        assert!(parse_time("January 4").is_err());
    }

    #[test]
    fn report_is_sorted_with_total_row() {
        let csv = format!(
            "{HEADER}\
             ,ETH,2.0,3000,2025-01-10 00:00:00,,,\n\
             ,BTC,1.0,10000,2025-01-11 00:00:00,,,\n\
             ,BTC,-1.0,12000,2025-02-01 00:00:00,,,\n"
        );
        let (gains, _log) = run(&csv);

        let mut output = Vec::new();
        write_report(&gains, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("asset,balance,acb"));
        assert!(lines[1].starts_with("BTC,"));
        assert!(lines[2].starts_with("ETH,"));
        assert!(lines[3].starts_with("TOTAL,"));
        assert!(lines[3].contains("2000"), "grand gain should be 2000: {}", lines[3]);
    }
}
