// =============================================================================
// normalizer.rs — THE MILLION-ROW DIGESTION TRACT
// =============================================================================
//
// This module eats the national commodity-flow CSV and produces the one
// immutable table everything else runs on. The file is enormous, so we
// stream it: a dedicated reader thread deserializes rows into bounded
// batches and pushes them over a crossbeam channel, while this side filters
// and derives statistics batch by batch. The channel is bounded, so only a
// handful of batches are ever alive at once and peak memory stays flat
// whether the file has five rows or five million.
//
// Batching is strictly an I/O chunking concern. Normalizing the file as one
// giant batch or a thousand tiny ones must produce the identical table —
// there's a test that will tattle on anyone who breaks that.
//
// Arithmetic policy, stated once and enforced everywhere: a ratio with a
// zero denominator is None. Not zero, not NaN, not infinity, not a panic.
// A lane that moved nothing in 2020 has no unit price for 2020 and no
// growth rate at all, and the numbers stay honest about it.
// =============================================================================

use std::fs::File;
use std::io::Read;
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::metadata::MetadataCatalog;
use crate::models::{ConfigurationError, FlowRecord};

/// The columns the engine cannot live without. Anything else in the file
/// is politely ignored.
const REQUIRED_COLUMNS: [&str; 13] = [
    "dms_orig",
    "dms_dest",
    "dms_mode",
    "sctg2",
    "trade_type",
    "tons_2020",
    "tons_2021",
    "tons_2022",
    "tons_2023",
    "value_2020",
    "value_2021",
    "value_2022",
    "value_2023",
];

/// One raw CSV row, exactly as the dataset spells it. Field names mirror
/// the file's headers so serde can do the matching for us.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFlowRow {
    pub dms_orig: u32,
    pub dms_dest: u32,
    pub dms_mode: u32,
    pub sctg2: u32,
    pub trade_type: u32,
    pub tons_2020: f64,
    pub tons_2021: f64,
    pub tons_2022: f64,
    pub tons_2023: f64,
    pub value_2020: f64,
    pub value_2021: f64,
    pub value_2022: f64,
    pub value_2023: f64,
}

/// The fixed retention predicate: one mode, one trade type, everything
/// else discarded at the door.
#[derive(Debug, Clone, Copy)]
pub struct FlowFilter {
    pub mode: u32,
    pub trade_type: u32,
}

impl FlowFilter {
    pub fn matches(&self, row: &RawFlowRow) -> bool {
        row.dms_mode == self.mode && row.trade_type == self.trade_type
    }
}

/// None when the denominator is zero. The single arithmetic rule the whole
/// normalizer hangs off.
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Mean of the defined values only. None when nothing is defined — one
/// quiet year must not poison the lane's average price.
fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    if defined.is_empty() {
        None
    } else {
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    }
}

/// Build a fully derived record from one raw row. Names stay None here;
/// the catalog decorates the finished table in one pass after the load.
fn record_from_raw(row: &RawFlowRow) -> FlowRecord {
    let tons_by_year = [row.tons_2020, row.tons_2021, row.tons_2022, row.tons_2023];
    let value_by_year = [
        row.value_2020,
        row.value_2021,
        row.value_2022,
        row.value_2023,
    ];
    let unit_price_by_year: [Option<f64>; 4] =
        std::array::from_fn(|i| ratio(value_by_year[i], tons_by_year[i]));

    FlowRecord {
        origin_code: row.dms_orig,
        destination_code: row.dms_dest,
        mode: row.dms_mode,
        commodity_code: row.sctg2,
        trade_type: row.trade_type,
        tons_total: tons_by_year.iter().sum(),
        value_total: value_by_year.iter().sum(),
        unit_price_mean: mean_defined(&unit_price_by_year),
        tons_growth: ratio(tons_by_year[3] - tons_by_year[0], tons_by_year[0]),
        value_growth: ratio(value_by_year[3] - value_by_year[0], value_by_year[0]),
        tons_by_year,
        value_by_year,
        unit_price_by_year,
        origin_name: None,
        destination_name: None,
        commodity_name: None,
    }
}

/// Filter and derive one batch. Pure: no I/O, no shared state, no mercy.
pub fn normalize_batch(rows: &[RawFlowRow], filter: FlowFilter) -> Vec<FlowRecord> {
    rows.iter()
        .filter(|row| filter.matches(row))
        .map(record_from_raw)
        .collect()
}

fn attach_names(mut record: FlowRecord, catalog: &MetadataCatalog) -> FlowRecord {
    record.origin_name = catalog.zone_name(record.origin_code).map(str::to_string);
    record.destination_name = catalog.zone_name(record.destination_code).map(str::to_string);
    record.commodity_name = catalog.commodity_name(record.commodity_code).map(str::to_string);
    record
}

fn csv_err(origin: &str, source: csv::Error) -> ConfigurationError {
    ConfigurationError::Csv {
        path: origin.to_string(),
        source,
    }
}

/// The normalized table. Built once during startup, wrapped in an Arc,
/// and read-only forever after — request handlers share it without a
/// single lock.
#[derive(Debug)]
pub struct FlowTable {
    records: Vec<FlowRecord>,
    loaded_at: DateTime<Utc>,
}

impl FlowTable {
    pub fn from_records(records: Vec<FlowRecord>) -> Self {
        Self {
            records,
            loaded_at: Utc::now(),
        }
    }

    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Load and normalize the flow dataset from disk.
    pub fn load(
        path: &str,
        filter: FlowFilter,
        batch_size: usize,
        catalog: &MetadataCatalog,
    ) -> Result<Self, ConfigurationError> {
        info!(
            path,
            mode = filter.mode,
            trade_type = filter.trade_type,
            batch_size,
            "Loading flow dataset — this is the slow part"
        );
        let file = File::open(path).map_err(|e| ConfigurationError::Io {
            path: path.to_string(),
            source: e,
        })?;
        Self::from_reader(file, path, filter, batch_size, catalog)
    }

    /// Stream, filter, derive, concatenate, decorate. Header validation
    /// happens before any row is touched: a file missing columns is dead
    /// on arrival, not after twenty minutes of parsing. A table that comes
    /// out empty after filtering is fatal too — zero lanes means every
    /// response forever would be empty, and that's a misconfiguration, not
    /// a freight market.
    pub fn from_reader<R: Read + Send + 'static>(
        input: R,
        origin: &str,
        filter: FlowFilter,
        batch_size: usize,
        catalog: &MetadataCatalog,
    ) -> Result<Self, ConfigurationError> {
        let started = Instant::now();
        let batch_size = batch_size.max(1);

        let mut reader = csv::Reader::from_reader(input);
        let headers = reader
            .headers()
            .map_err(|e| csv_err(origin, e))?
            .clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h.trim() == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigurationError::MissingColumns {
                path: origin.to_string(),
                columns: missing,
            });
        }

        // Reader thread deserializes, this thread normalizes. The bounded
        // capacity keeps the reader from racing arbitrarily far ahead of
        // the consumer.
        let (batch_tx, batch_rx) =
            crossbeam_channel::bounded::<Result<Vec<RawFlowRow>, csv::Error>>(2);

        let reader_thread = thread::spawn(move || {
            let mut batch: Vec<RawFlowRow> = Vec::with_capacity(batch_size);
            for row in reader.into_deserialize::<RawFlowRow>() {
                match row {
                    Ok(raw) => {
                        batch.push(raw);
                        if batch.len() >= batch_size {
                            let full =
                                std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                            if batch_tx.send(Ok(full)).is_err() {
                                // Receiver hung up, stop reading.
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = batch_tx.send(Err(e));
                        return;
                    }
                }
            }
            if !batch.is_empty() {
                let _ = batch_tx.send(Ok(batch));
            }
        });

        let mut records: Vec<FlowRecord> = Vec::new();
        let mut rows_scanned = 0usize;
        let mut batches = 0usize;
        let mut failure: Option<csv::Error> = None;

        for message in batch_rx {
            match message {
                Ok(raw_rows) => {
                    rows_scanned += raw_rows.len();
                    let kept = normalize_batch(&raw_rows, filter);
                    batches += 1;
                    debug!(
                        batch = batches,
                        scanned = raw_rows.len(),
                        kept = kept.len(),
                        "flow batch normalized"
                    );
                    records.extend(kept);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if reader_thread.join().is_err() {
            return Err(ConfigurationError::Io {
                path: origin.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "flow reader thread panicked",
                ),
            });
        }
        if let Some(e) = failure {
            return Err(csv_err(origin, e));
        }

        let records: Vec<FlowRecord> = records
            .into_iter()
            .map(|record| attach_names(record, catalog))
            .collect();

        if records.is_empty() {
            return Err(ConfigurationError::EmptyTable {
                path: origin.to_string(),
            });
        }

        info!(
            records = records.len(),
            rows_scanned,
            batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Flow table ready"
        );

        Ok(Self::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataTable;
    use std::collections::HashMap;
    use std::io::Cursor;

    // Extra column (dist_band) on purpose: the engine must ignore columns
    // it doesn't know about.
    const SAMPLE_CSV: &str = "\
dms_orig,dms_dest,dms_mode,sctg2,trade_type,dist_band,tons_2020,tons_2021,tons_2022,tons_2023,value_2020,value_2021,value_2022,value_2023
139,11,1,2,1,3,10,10,10,10,100,100,100,100
139,20,2,2,1,3,8,8,8,8,80,80,80,80
11,139,1,7,2,1,6,6,6,6,60,60,60,60
20,139,1,3,1,2,0,5,5,5,50,50,50,50
20,11,1,4,1,1,0,0,0,0,0,0,0,0
";

    const FILTER: FlowFilter = FlowFilter {
        mode: 1,
        trade_type: 1,
    };

    fn load_sample(batch_size: usize, catalog: &MetadataCatalog) -> FlowTable {
        FlowTable::from_reader(Cursor::new(SAMPLE_CSV), "sample.csv", FILTER, batch_size, catalog)
            .unwrap()
    }

    fn find<'a>(table: &'a FlowTable, origin: u32, destination: u32) -> &'a FlowRecord {
        table
            .records()
            .iter()
            .find(|r| r.origin_code == origin && r.destination_code == destination)
            .expect("record not found")
    }

    #[test]
    fn test_filter_keeps_only_configured_mode_and_trade_type() {
        let table = load_sample(1000, &MetadataCatalog::default());
        assert_eq!(table.len(), 3);
        for record in table.records() {
            assert_eq!(record.mode, 1);
            assert_eq!(record.trade_type, 1);
        }
    }

    #[test]
    fn test_derived_statistics_on_a_clean_lane() {
        let table = load_sample(1000, &MetadataCatalog::default());
        let lane = find(&table, 139, 11);

        assert_eq!(lane.tons_total, 40.0);
        assert_eq!(lane.value_total, 400.0);
        for price in lane.unit_price_by_year {
            assert_eq!(price, Some(10.0));
        }
        assert_eq!(lane.unit_price_mean, Some(10.0));
        assert_eq!(lane.tons_growth, Some(0.0));
        assert_eq!(lane.value_growth, Some(0.0));
    }

    #[test]
    fn test_zero_base_year_yields_undefined_growth_not_zero() {
        let table = load_sample(1000, &MetadataCatalog::default());
        let lane = find(&table, 20, 139);

        assert_eq!(lane.tons_growth, None);
        assert_eq!(lane.unit_price_by_year[0], None);
        assert_eq!(lane.unit_price_by_year[1], Some(10.0));
        // One undefined year is excluded; the mean survives.
        assert_eq!(lane.unit_price_mean, Some(10.0));
        // Value had a non-zero base year, so its growth is defined.
        assert_eq!(lane.value_growth, Some(0.0));
    }

    #[test]
    fn test_all_zero_lane_is_fully_undefined_but_not_an_error() {
        let table = load_sample(1000, &MetadataCatalog::default());
        let lane = find(&table, 20, 11);

        assert_eq!(lane.tons_total, 0.0);
        assert_eq!(lane.value_total, 0.0);
        assert_eq!(lane.unit_price_by_year, [None, None, None, None]);
        assert_eq!(lane.unit_price_mean, None);
        assert_eq!(lane.tons_growth, None);
        assert_eq!(lane.value_growth, None);
    }

    #[test]
    fn test_batch_size_never_changes_the_result() {
        let catalog = MetadataCatalog::default();
        let one_batch = load_sample(1000, &catalog);
        let tiny_batches = load_sample(1, &catalog);
        let two_row_batches = load_sample(2, &catalog);

        assert_eq!(one_batch.records(), tiny_batches.records());
        assert_eq!(one_batch.records(), two_row_batches.records());
    }

    #[test]
    fn test_missing_columns_fail_fast_and_name_every_column() {
        let csv = "\
dms_orig,dms_dest,dms_mode,sctg2,trade_type,tons_2020,tons_2022,tons_2023,value_2020,value_2021,value_2022
139,11,1,2,1,10,10,10,100,100,100
";
        let err = FlowTable::from_reader(
            Cursor::new(csv),
            "broken.csv",
            FILTER,
            1000,
            &MetadataCatalog::default(),
        )
        .unwrap_err();

        match err {
            ConfigurationError::MissingColumns { path, columns } => {
                assert_eq!(path, "broken.csv");
                assert!(columns.contains(&"tons_2021".to_string()));
                assert!(columns.contains(&"value_2023".to_string()));
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_fully_filtered_dataset_is_fatal_not_an_empty_engine() {
        // Well-formed file, but every row fails the mode/trade-type filter.
        // Starting up over zero lanes must be an error, not a warning.
        let csv = "\
dms_orig,dms_dest,dms_mode,sctg2,trade_type,tons_2020,tons_2021,tons_2022,tons_2023,value_2020,value_2021,value_2022,value_2023
139,11,2,2,1,10,10,10,10,100,100,100,100
11,139,1,7,2,6,6,6,6,60,60,60,60
";
        let err = FlowTable::from_reader(
            Cursor::new(csv),
            "trucks_on_strike.csv",
            FILTER,
            1000,
            &MetadataCatalog::default(),
        )
        .unwrap_err();

        match err {
            ConfigurationError::EmptyTable { path } => {
                assert_eq!(path, "trucks_on_strike.csv");
            }
            other => panic!("expected EmptyTable, got {other:?}"),
        }
    }

    #[test]
    fn test_names_come_from_the_catalog_and_absent_codes_stay_none() {
        let catalog = MetadataCatalog {
            zones: MetadataTable {
                entries: HashMap::from([
                    (139, "Chicago IL".to_string()),
                    (11, "Birmingham AL".to_string()),
                ]),
            },
            commodities: MetadataTable {
                entries: HashMap::from([(2, "Cereal grains".to_string())]),
            },
            states: MetadataTable::default(),
        };
        let table = load_sample(1000, &catalog);

        let lane = find(&table, 139, 11);
        assert_eq!(lane.origin_name.as_deref(), Some("Chicago IL"));
        assert_eq!(lane.destination_name.as_deref(), Some("Birmingham AL"));
        assert_eq!(lane.commodity_name.as_deref(), Some("Cereal grains"));

        // Zone 20 and commodity 3 are not in the catalog.
        let unnamed = find(&table, 20, 139);
        assert_eq!(unnamed.origin_name, None);
        assert_eq!(unnamed.commodity_name, None);
    }

    #[test]
    fn test_normalize_batch_is_pure_filtering() {
        let rows = vec![
            RawFlowRow {
                dms_orig: 1,
                dms_dest: 2,
                dms_mode: 1,
                sctg2: 9,
                trade_type: 1,
                tons_2020: 1.0,
                tons_2021: 1.0,
                tons_2022: 1.0,
                tons_2023: 1.0,
                value_2020: 2.0,
                value_2021: 2.0,
                value_2022: 2.0,
                value_2023: 2.0,
            },
            RawFlowRow {
                dms_orig: 1,
                dms_dest: 2,
                dms_mode: 5,
                sctg2: 9,
                trade_type: 1,
                tons_2020: 1.0,
                tons_2021: 1.0,
                tons_2022: 1.0,
                tons_2023: 1.0,
                value_2020: 2.0,
                value_2021: 2.0,
                value_2022: 2.0,
                value_2023: 2.0,
            },
        ];
        let records = normalize_batch(&rows, FILTER);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].unit_price_mean, Some(2.0));
    }
}
