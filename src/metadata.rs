// =============================================================================
// metadata.rs — THE ROSETTA STONE DEPARTMENT
// =============================================================================
//
// The flow dataset speaks entirely in numeric codes: zone 123, commodity 7,
// state 48. Humans, regrettably, prefer words. This module loads the three
// lookup tables that translate codes into labels so the API can say
// "Chicago IL" and "Cereal grains" instead of numbers that mean nothing
// to anyone without the PDF open.
//
// A code that isn't in a table resolves to None, never an error. Downstream
// name fields are nullable on purpose: government datasets and their own
// metadata agreeing with each other 100% of the time would be suspicious.
// =============================================================================

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::models::ConfigurationError;

/// Every lookup table is keyed by this column. The name comes straight
/// from the dataset's metadata workbook and is not negotiable.
const NUMERIC_LABEL_COLUMN: &str = "Numeric Label";

/// The zone table labels live in "Short Description" ("Chicago IL" rather
/// than a paragraph); commodities and states use plain "Description".
const SHORT_DESCRIPTION_COLUMN: &str = "Short Description";
const DESCRIPTION_COLUMN: &str = "Description";

/// One code → label lookup table.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    pub entries: HashMap<u32, String>,
}

impl MetadataTable {
    /// Load a table from a CSV file on disk.
    pub fn load(path: &str, label_column: &str) -> Result<Self, ConfigurationError> {
        let file = File::open(path).map_err(|e| ConfigurationError::Io {
            path: path.to_string(),
            source: e,
        })?;
        Self::from_reader(file, path, label_column)
    }

    /// Load a table from any reader. Both required columns must exist or
    /// we fail fast, before a single row is parsed — a half-usable lookup
    /// table is worse than no table at all.
    pub fn from_reader<R: Read>(
        input: R,
        origin: &str,
        label_column: &str,
    ) -> Result<Self, ConfigurationError> {
        let mut reader = csv::Reader::from_reader(input);

        let headers = reader
            .headers()
            .map_err(|e| ConfigurationError::Csv {
                path: origin.to_string(),
                source: e,
            })?
            .clone();

        let find = |column: &str| headers.iter().position(|h| h.trim() == column);
        let (key_idx, label_idx) = match (find(NUMERIC_LABEL_COLUMN), find(label_column)) {
            (Some(key), Some(label)) => (key, label),
            (key, label) => {
                let mut columns = Vec::new();
                if key.is_none() {
                    columns.push(NUMERIC_LABEL_COLUMN.to_string());
                }
                if label.is_none() {
                    columns.push(label_column.to_string());
                }
                return Err(ConfigurationError::MissingColumns {
                    path: origin.to_string(),
                    columns,
                });
            }
        };

        let mut entries = HashMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| ConfigurationError::Csv {
                path: origin.to_string(),
                source: e,
            })?;

            // Metadata sheets love footnote rows ("Total", blank lines,
            // prose). Anything without a numeric code is skipped.
            let code = match record.get(key_idx).and_then(|c| c.trim().parse::<u32>().ok()) {
                Some(code) => code,
                None => {
                    debug!(origin, row = ?record.get(key_idx), "skipping non-numeric label row");
                    continue;
                }
            };
            let label = record.get(label_idx).map(str::trim).unwrap_or_default();
            if label.is_empty() {
                debug!(origin, code, "skipping row with empty label");
                continue;
            }
            // Duplicate codes: last one wins, same as the reference loader.
            entries.insert(code, label.to_string());
        }

        Ok(Self { entries })
    }

    /// Look up a label. Absent code ⇒ None, never an error.
    pub fn resolve(&self, code: u32) -> Option<&str> {
        self.entries.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All three lookup tables, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    pub zones: MetadataTable,
    pub commodities: MetadataTable,
    pub states: MetadataTable,
}

impl MetadataCatalog {
    pub fn load(config: &EngineConfig) -> Result<Self, ConfigurationError> {
        let zones = MetadataTable::load(&config.zone_metadata_path, SHORT_DESCRIPTION_COLUMN)?;
        let commodities =
            MetadataTable::load(&config.commodity_metadata_path, DESCRIPTION_COLUMN)?;
        let states = MetadataTable::load(&config.state_metadata_path, DESCRIPTION_COLUMN)?;

        // An empty table is legal (every lookup just misses), but it means
        // a whole response column comes back null, so say so up front.
        for (name, table) in [
            ("zones", &zones),
            ("commodities", &commodities),
            ("states", &states),
        ] {
            if table.is_empty() {
                warn!(table = name, "metadata table loaded zero entries; names will resolve to null");
            }
        }

        info!(
            zones = zones.len(),
            commodities = commodities.len(),
            states = states.len(),
            "Metadata catalog loaded — codes may now become words"
        );

        Ok(Self {
            zones,
            commodities,
            states,
        })
    }

    pub fn zone_name(&self, code: u32) -> Option<&str> {
        self.zones.resolve(code)
    }

    pub fn commodity_name(&self, code: u32) -> Option<&str> {
        self.commodities.resolve(code)
    }

    pub fn state_name(&self, code: u32) -> Option<&str> {
        self.states.resolve(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ZONE_CSV: &str = "\
Numeric Label,Short Description,Description
11,Birmingham AL,Birmingham-Hoover-Talladega area
139,Chicago IL,Chicago-Naperville metro area
20,Remainder of Alabama,Everything else in Alabama
";

    #[test]
    fn test_resolve_known_and_unknown_codes() {
        let table =
            MetadataTable::from_reader(Cursor::new(ZONE_CSV), "zones.csv", "Short Description")
                .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.resolve(139), Some("Chicago IL"));
        assert_eq!(table.resolve(999), None);
    }

    #[test]
    fn test_label_column_is_selectable() {
        let long = MetadataTable::from_reader(Cursor::new(ZONE_CSV), "zones.csv", "Description")
            .unwrap();
        assert_eq!(long.resolve(11), Some("Birmingham-Hoover-Talladega area"));
    }

    #[test]
    fn test_missing_columns_fail_before_any_row() {
        let csv = "Code,Name\n1,Something\n";
        let err = MetadataTable::from_reader(Cursor::new(csv), "broken.csv", "Description")
            .unwrap_err();
        match err {
            ConfigurationError::MissingColumns { path, columns } => {
                assert_eq!(path, "broken.csv");
                assert!(columns.contains(&"Numeric Label".to_string()));
                assert!(columns.contains(&"Description".to_string()));
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_footnote_rows_are_skipped() {
        let csv = "\
Numeric Label,Description
1,Live animals and fish
Total,43 commodity groups
,
2,Cereal grains
";
        let table =
            MetadataTable::from_reader(Cursor::new(csv), "commodities.csv", "Description")
                .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(2), Some("Cereal grains"));
    }

    #[test]
    fn test_duplicate_codes_last_row_wins() {
        let csv = "\
Numeric Label,Description
5,Old label
5,New label
";
        let table =
            MetadataTable::from_reader(Cursor::new(csv), "dupes.csv", "Description").unwrap();
        assert_eq!(table.resolve(5), Some("New label"));
    }

    #[test]
    fn test_catalog_resolves_per_table() {
        let catalog = MetadataCatalog {
            zones: MetadataTable {
                entries: HashMap::from([(139, "Chicago IL".to_string())]),
            },
            commodities: MetadataTable {
                entries: HashMap::from([(2, "Cereal grains".to_string())]),
            },
            states: MetadataTable {
                entries: HashMap::from([(17, "Illinois".to_string())]),
            },
        };
        assert_eq!(catalog.zone_name(139), Some("Chicago IL"));
        assert_eq!(catalog.commodity_name(2), Some("Cereal grains"));
        assert_eq!(catalog.state_name(17), Some("Illinois"));
        assert_eq!(catalog.zone_name(2), None);
    }
}
