// =============================================================================
// config.rs — THE GRAND CONFIGURATION COCKPIT
// =============================================================================
//
// Every tunable parameter in the engine lives here. We have knobs for the
// dataset, knobs for the economics, knobs for the randomness, and a knob
// that decides which city all fuel costs are measured from. Knobs for knobs.
//
// All values can be overridden via environment variables, because hardcoding
// configuration is how you end up on the front page of Hacker News for the
// wrong reasons.
//
// Default values are lifted straight from the reference deployment and have
// been validated through a rigorous process of "that's what the dataset
// uses" and "fuel was about four dollars a gallon at the time."
// =============================================================================

use std::env;

use crate::models::{BoundingBox, ConfigurationError, DriverLocation, GeoPoint};

/// The Grand Configuration Struct. If you need to change how the engine
/// ingests five million rows of commodity statistics or how thirsty the
/// imaginary trucks are, this is where you come.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // =========================================================================
    // DATASET PATHS
    // One enormous flow CSV plus three lookup tables. The lookups used to
    // live in an Excel workbook; exporting them to CSV was an act of mercy.
    // =========================================================================
    /// Path to the FAF commodity-flow CSV. Multi-gigabyte. Bring snacks.
    pub flow_data_path: String,

    /// Zone code → zone label ("Short Description" column).
    pub zone_metadata_path: String,

    /// SCTG2 commodity code → commodity label ("Description" column).
    pub commodity_metadata_path: String,

    /// State code → state label ("Description" column).
    pub state_metadata_path: String,

    // =========================================================================
    // FLOW FILTER
    // The engine serves exactly one mode and one trade type. Everything
    // else in the dataset is someone else's problem.
    // =========================================================================
    /// Transport mode to retain. 1 = truck, naturally.
    pub filter_mode: u32,

    /// Trade type to retain. 1 = domestic.
    pub filter_trade_type: u32,

    /// How many raw rows to pull per read batch. Batching bounds peak
    /// memory during the load; it must never change the resulting table.
    pub batch_size: usize,

    // =========================================================================
    // ECONOMICS
    // =========================================================================
    /// Diesel, in USD per gallon.
    pub fuel_price_per_gallon: f64,

    /// Which driver hub all transport costs are measured from. Must name
    /// one of the configured hubs or startup fails — loudly, on purpose,
    /// before the server binds.
    pub cost_reference_location: String,

    // =========================================================================
    // SAMPLING
    // The knobs that govern our imaginary fleet.
    // =========================================================================
    /// Size of the fictional driver pool. IDs are drawn from [1, n].
    pub n_drivers: u32,

    /// Bounding box for synthetic order coordinates. Roughly the lower 48.
    /// The coordinates have nothing to do with the lane's real geography,
    /// which is a documented approximation and not a bug report waiting
    /// to happen.
    pub coordinate_box: BoundingBox,

    /// Optional fixed sampling seed. Leave unset in production so every
    /// request gets fresh entropy; set it in tests or demos when you need
    /// the same imaginary trucks twice.
    pub sample_seed: Option<u64>,

    /// How many orders a request gets when it doesn't ask for a count.
    pub default_sample_size: usize,

    // =========================================================================
    // RANKING
    // =========================================================================
    /// How many nearest orders get a star per driver hub. 20, per the
    /// product decision nobody remembers making.
    pub star_count: usize,

    // =========================================================================
    // SERVER
    // =========================================================================
    /// Port for the orders HTTP server.
    pub server_port: u16,
}

impl Default for EngineConfig {
    /// The reference deployment. `from_env` starts here and lets the
    /// environment override individual knobs, so these literals are the
    /// single source of truth for defaults.
    fn default() -> Self {
        Self {
            flow_data_path: "data/FAF5.5.1_HiLoForecasts.csv".to_string(),
            zone_metadata_path: "data/faf_zones.csv".to_string(),
            commodity_metadata_path: "data/faf_commodities.csv".to_string(),
            state_metadata_path: "data/faf_states.csv".to_string(),
            filter_mode: 1,
            filter_trade_type: 1,
            batch_size: 1_000_000,
            fuel_price_per_gallon: 4.0,
            cost_reference_location: "New York".to_string(),
            n_drivers: 1000,
            coordinate_box: BoundingBox {
                lat_min: 30.0,
                lat_max: 50.0,
                lon_min: -120.0,
                lon_max: -70.0,
            },
            sample_seed: None,
            default_sample_size: 10,
            star_count: 20,
            server_port: 8000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with sensible defaults.
    /// "Sensible" here meaning "will serve orders out of the box without a
    /// single env var, but will also respect your wishes if you set them."
    ///
    /// Every parameter can be overridden via environment variables prefixed
    /// with FREIGHT_MATCH_. Namespacing your env vars is what separates the
    /// professionals from the amateurs.
    pub fn from_env() -> Self {
        // Try to load .env if it exists. Fail silently if it doesn't,
        // because not everyone has their life together enough to create
        // a .env file.
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        Self {
            flow_data_path: env_or_default("FREIGHT_MATCH_FLOW_DATA", &defaults.flow_data_path),
            zone_metadata_path: env_or_default(
                "FREIGHT_MATCH_ZONE_METADATA",
                &defaults.zone_metadata_path,
            ),
            commodity_metadata_path: env_or_default(
                "FREIGHT_MATCH_COMMODITY_METADATA",
                &defaults.commodity_metadata_path,
            ),
            state_metadata_path: env_or_default(
                "FREIGHT_MATCH_STATE_METADATA",
                &defaults.state_metadata_path,
            ),

            filter_mode: env_parsed("FREIGHT_MATCH_MODE", defaults.filter_mode),
            filter_trade_type: env_parsed("FREIGHT_MATCH_TRADE_TYPE", defaults.filter_trade_type),
            batch_size: env_parsed("FREIGHT_MATCH_BATCH_SIZE", defaults.batch_size),

            fuel_price_per_gallon: env_parsed(
                "FREIGHT_MATCH_FUEL_PRICE",
                defaults.fuel_price_per_gallon,
            ),
            cost_reference_location: env_or_default(
                "FREIGHT_MATCH_COST_REFERENCE",
                &defaults.cost_reference_location,
            ),

            n_drivers: env_parsed("FREIGHT_MATCH_N_DRIVERS", defaults.n_drivers),
            coordinate_box: BoundingBox {
                lat_min: env_parsed("FREIGHT_MATCH_LAT_MIN", defaults.coordinate_box.lat_min),
                lat_max: env_parsed("FREIGHT_MATCH_LAT_MAX", defaults.coordinate_box.lat_max),
                lon_min: env_parsed("FREIGHT_MATCH_LON_MIN", defaults.coordinate_box.lon_min),
                lon_max: env_parsed("FREIGHT_MATCH_LON_MAX", defaults.coordinate_box.lon_max),
            },
            // No default seed. A production engine that hands every request
            // the same "random" orders is a prank, not a feature.
            sample_seed: env::var("FREIGHT_MATCH_SAMPLE_SEED")
                .ok()
                .and_then(|raw| raw.parse().ok()),
            default_sample_size: env_parsed(
                "FREIGHT_MATCH_DEFAULT_SAMPLE_SIZE",
                defaults.default_sample_size,
            ),

            star_count: env_parsed("FREIGHT_MATCH_STAR_COUNT", defaults.star_count),

            server_port: env_parsed("FREIGHT_MATCH_PORT", defaults.server_port),
        }
    }

    /// The five driver hubs of the reference deployment. Orders are ranked
    /// by proximity to each of these, and one of them (see
    /// `cost_reference_location`) anchors the fuel-cost math.
    pub fn driver_locations(&self) -> Vec<DriverLocation> {
        vec![
            DriverLocation {
                name: "New York",
                point: GeoPoint::new(40.7128, -74.0060), // also the default cost anchor
            },
            DriverLocation {
                name: "Chicago",
                point: GeoPoint::new(41.8781, -87.6298), // rail capital, now with fake trucks
            },
            DriverLocation {
                name: "LA",
                point: GeoPoint::new(34.0522, -118.2437), // the ports
            },
            DriverLocation {
                name: "Texas",
                point: GeoPoint::new(31.9686, -99.9018), // an entire state as a "location"
            },
            DriverLocation {
                name: "Denver",
                point: GeoPoint::new(39.7392, -104.9903), // exactly one mile up
            },
        ]
    }

    /// Fail-fast check on the sampling knobs. The sampler hands these
    /// straight to `gen_range`, which panics on an empty range, so a
    /// zeroed driver pool or an inverted bounding box must die here with
    /// a message instead of deep inside a request handler. A degenerate
    /// box (min == max) is allowed; tests pin coordinates with it.
    pub fn validate_sampling_bounds(&self) -> Result<(), ConfigurationError> {
        if self.n_drivers == 0 {
            return Err(ConfigurationError::InvalidSamplingBounds {
                reason: "n_drivers must be at least 1".to_string(),
            });
        }
        let bbox = self.coordinate_box;
        if bbox.lat_min > bbox.lat_max {
            return Err(ConfigurationError::InvalidSamplingBounds {
                reason: format!(
                    "lat_min {} exceeds lat_max {}",
                    bbox.lat_min, bbox.lat_max
                ),
            });
        }
        if bbox.lon_min > bbox.lon_max {
            return Err(ConfigurationError::InvalidSamplingBounds {
                reason: format!(
                    "lon_min {} exceeds lon_max {}",
                    bbox.lon_min, bbox.lon_max
                ),
            });
        }
        Ok(())
    }

    /// Resolve the configured cost-reference hub to its coordinates.
    /// An unknown name is a fatal startup error: silently falling back to
    /// some other city would quietly reprice every order in the system.
    pub fn cost_reference_point(&self) -> Result<GeoPoint, ConfigurationError> {
        let locations = self.driver_locations();
        locations
            .iter()
            .find(|loc| loc.name == self.cost_reference_location)
            .map(|loc| loc.point)
            .ok_or_else(|| ConfigurationError::UnknownReferenceLocation {
                name: self.cost_reference_location.clone(),
                known: locations.iter().map(|loc| loc.name.to_string()).collect(),
            })
    }
}

/// Helper to read an environment variable with a default fallback.
/// Because unwrap_or on env::var is ugly and we have standards.
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Same idea, but for anything parseable. Unparseable garbage in the
/// environment falls back to the default rather than crashing the engine.
fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = EngineConfig::default();
        assert_eq!(config.filter_mode, 1);
        assert_eq!(config.filter_trade_type, 1);
        assert_eq!(config.batch_size, 1_000_000);
        assert_eq!(config.fuel_price_per_gallon, 4.0);
        assert_eq!(config.n_drivers, 1000);
        assert_eq!(config.star_count, 20);
        assert_eq!(config.default_sample_size, 10);
        assert_eq!(config.cost_reference_location, "New York");
        assert_eq!(config.sample_seed, None);
    }

    #[test]
    fn test_five_driver_hubs_with_new_york_coordinates() {
        let config = EngineConfig::default();
        let hubs = config.driver_locations();
        assert_eq!(hubs.len(), 5);

        let ny = hubs.iter().find(|h| h.name == "New York").unwrap();
        assert_eq!(ny.point.lat, 40.7128);
        assert_eq!(ny.point.lon, -74.0060);
    }

    #[test]
    fn test_default_cost_reference_resolves() {
        let config = EngineConfig::default();
        let point = config.cost_reference_point().unwrap();
        assert_eq!(point, GeoPoint::new(40.7128, -74.0060));
    }

    #[test]
    fn test_unknown_cost_reference_is_fatal() {
        let config = EngineConfig {
            cost_reference_location: "Atlantis".to_string(),
            ..EngineConfig::default()
        };
        let err = config.cost_reference_point().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownReferenceLocation { .. }
        ));
        assert!(err.to_string().contains("Atlantis"));
        assert!(err.to_string().contains("New York"));
    }

    #[test]
    fn test_zero_drivers_is_fatal() {
        let config = EngineConfig {
            n_drivers: 0,
            ..EngineConfig::default()
        };
        let err = config.validate_sampling_bounds().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSamplingBounds { .. }));
        assert!(err.to_string().contains("n_drivers"));
    }

    #[test]
    fn test_inverted_bounding_box_is_fatal() {
        let config = EngineConfig {
            coordinate_box: BoundingBox {
                lat_min: 50.0,
                lat_max: 30.0,
                lon_min: -120.0,
                lon_max: -70.0,
            },
            ..EngineConfig::default()
        };
        let err = config.validate_sampling_bounds().unwrap_err();
        assert!(err.to_string().contains("lat_min"));
    }

    #[test]
    fn test_degenerate_bounding_box_is_allowed() {
        // A single-point box is how tests pin every coordinate to one hub.
        let config = EngineConfig {
            coordinate_box: BoundingBox {
                lat_min: 40.7128,
                lat_max: 40.7128,
                lon_min: -74.0060,
                lon_max: -74.0060,
            },
            ..EngineConfig::default()
        };
        assert!(config.validate_sampling_bounds().is_ok());
    }

    #[test]
    fn test_bounding_box_covers_the_lower_48_ish() {
        let config = EngineConfig::default();
        let bbox = config.coordinate_box;
        assert!(bbox.lat_min < bbox.lat_max);
        assert!(bbox.lon_min < bbox.lon_max);
        assert_eq!(bbox.lat_min, 30.0);
        assert_eq!(bbox.lat_max, 50.0);
        assert_eq!(bbox.lon_min, -120.0);
        assert_eq!(bbox.lon_max, -70.0);
    }
}
