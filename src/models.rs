// =============================================================================
// models.rs — THE SACRED DATA STRUCTURES OF IMAGINARY FREIGHT
// =============================================================================
//
// These structs are the load-bearing walls of the matching engine. On one
// side: five million rows of government commodity-flow statistics, dutifully
// normalized. On the other: trucks that do not exist, drivers who have never
// been born, and coordinates drawn from a uniform distribution somewhere
// over the continental United States.
//
// Is it overkill to model a fake truck with three economic parameters and
// an enum? Yes. Do we care? Absolutely not.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A point on the (approximately spherical) Earth, in decimal degrees.
/// Latitude first, because we're not monsters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// The box we scatter synthetic coordinates into. Roughly "the lower 48,
/// squint and you won't notice the Gulf of Mexico."
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// The three sizes of imaginary truck. Each variant carries its own load
/// range, fuel appetite, and revenue rate, so there is no string-keyed
/// lookup table to miss and no "vehicle type not found" branch to write.
/// The truck IS the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    /// A box truck with ambition.
    Small,
    /// The workhorse. Statistically, your last online order rode in one.
    Medium,
    /// An 18-wheeler that drinks diesel like it's free. It is not free.
    /// That's the entire point of this engine.
    Large,
}

impl VehicleType {
    /// Every vehicle class, in a fixed order the sampler can draw from.
    pub const ALL: [VehicleType; 3] = [
        VehicleType::Small,
        VehicleType::Medium,
        VehicleType::Large,
    ];

    /// Inclusive [min, max] load range in tons. Orders get a synthetic
    /// tonnage drawn from this range, because the flow dataset's four-year
    /// aggregate tonnage would make for one very illegal truckload.
    pub fn load_range(&self) -> (f64, f64) {
        match self {
            VehicleType::Small => (3.0, 5.0),
            VehicleType::Medium => (5.0, 10.0),
            VehicleType::Large => (10.0, 15.0),
        }
    }

    /// Fuel efficiency in miles per gallon. The Large truck's number is
    /// not a typo. Six. Single digit. Weep for the diesel budget.
    pub fn miles_per_gallon(&self) -> f64 {
        match self {
            VehicleType::Small => 20.0,
            VehicleType::Medium => 12.0,
            VehicleType::Large => 6.0,
        }
    }

    /// Revenue per ton hauled, in USD. Bigger truck, better rate.
    /// Capitalism, but for trucks that don't exist.
    pub fn revenue_per_ton(&self) -> f64 {
        match self {
            VehicleType::Small => 100.0,
            VehicleType::Medium => 150.0,
            VehicleType::Large => 200.0,
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleType::Small => write!(f, "Small"),
            VehicleType::Medium => write!(f, "Medium"),
            VehicleType::Large => write!(f, "Large"),
        }
    }
}

/// A named driver hub. Five of these exist in the reference deployment,
/// and one of them moonlights as the transport-cost reference point.
#[derive(Debug, Clone)]
pub struct DriverLocation {
    pub name: &'static str,
    pub point: GeoPoint,
}

/// One normalized commodity-flow record: a single origin/destination/
/// mode/commodity/trade-type lane with four years of tonnage and value,
/// plus every derived statistic we could think of.
///
/// Built once at startup, never mutated afterwards. The year arrays are
/// index-aligned: slot 0 is 2020, slot 3 is 2023.
///
/// A ratio whose denominator is zero is stored as `None`. Not zero. Not
/// NaN. Not a panic. `None`. A lane that moved nothing in 2020 does not
/// have an "infinite growth rate", it has an unknowable one.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    pub origin_code: u32,
    pub destination_code: u32,
    pub mode: u32,
    pub commodity_code: u32,
    pub trade_type: u32,

    pub tons_by_year: [f64; 4],
    pub value_by_year: [f64; 4],

    /// value / tons, per year. `None` where that year's tonnage is zero.
    pub unit_price_by_year: [Option<f64>; 4],

    pub tons_total: f64,
    pub value_total: f64,

    /// Mean of the *defined* per-year unit prices. `None` only when all
    /// four years are undefined — a lane that never moved anything has
    /// no meaningful price, but one quiet year shouldn't poison the mean.
    pub unit_price_mean: Option<f64>,

    /// (tons_2023 − tons_2020) / tons_2020. `None` when 2020 was zero.
    pub tons_growth: Option<f64>,
    /// Same ratio over dollar value.
    pub value_growth: Option<f64>,

    /// Human-readable labels from the metadata catalog. `None` when the
    /// code isn't in the lookup table, which government data guarantees
    /// will happen eventually.
    pub origin_name: Option<String>,
    pub destination_name: Option<String>,
    pub commodity_name: Option<String>,
}

/// A sampled order before the economics have been run: one flow lane plus
/// a freshly invented truck, driver, and pair of coordinates. Think of
/// this as the "ugly duckling" stage — all potential, no profit yet.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub origin_name: Option<String>,
    pub destination_name: Option<String>,
    pub commodity_name: Option<String>,
    pub vehicle_type: VehicleType,
    /// Synthetic load in tons, drawn from the vehicle's range and rounded
    /// to one decimal. Supersedes the flow record's four-year aggregate.
    pub tons_total: f64,
    pub driver_id: u32,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

/// A fully priced candidate order. Ephemeral: created per request,
/// ranked, filtered, projected, dropped. No persistence, no regrets.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub origin_name: Option<String>,
    pub destination_name: Option<String>,
    pub commodity_name: Option<String>,
    pub vehicle_type: VehicleType,
    pub tons_total: f64,
    pub driver_id: u32,
    pub origin: GeoPoint,
    pub destination: GeoPoint,

    /// tons × revenue_per_ton(vehicle). What the order pays.
    pub expected_profit: f64,
    /// Fuel cost of deadheading from the reference hub to the origin.
    pub transport_cost: f64,
    /// expected − cost. The number everything downstream judges you by.
    pub actual_profit: f64,
    /// Great-circle km from origin to destination.
    pub route_distance_km: f64,

    /// Distance in km to each configured driver hub, index-aligned with
    /// the hub list. Filled by the proximity ranker.
    pub distance_to: Vec<f64>,
    /// True when this order is among the k nearest to at least one hub.
    /// One boolean OR'd across all hubs — an order near both Chicago and
    /// Denver is starred once, not twice.
    pub is_starred: bool,
}

/// The wire-format projection of an Order — exactly the fields the
/// frontend gets, nothing else. The driver id and raw coordinates stay
/// home.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub origin_name: Option<String>,
    pub destination_name: Option<String>,
    pub commodity_name: Option<String>,
    pub vehicle_type: VehicleType,
    pub tons_total: f64,
    pub expected_profit: f64,
    pub transport_cost: f64,
    pub actual_profit: f64,
    pub route_distance_km: f64,
    pub is_starred: bool,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            origin_name: order.origin_name,
            destination_name: order.destination_name,
            commodity_name: order.commodity_name,
            vehicle_type: order.vehicle_type,
            tons_total: order.tons_total,
            expected_profit: order.expected_profit,
            transport_cost: order.transport_cost,
            actual_profit: order.actual_profit,
            route_distance_km: order.route_distance_km,
            is_starred: order.is_starred,
        }
    }
}

/// What `/health` reports. Because monitoring the matcher is how you
/// achieve true operational nirvana.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub status: String,
    pub flow_records: usize,
    pub loaded_at: DateTime<Utc>,
    pub uptime_seconds: u64,
}

/// Fatal startup problems. If one of these appears, the process should
/// print it and die before binding a socket — serving orders against a
/// half-loaded table is how you match someone with a truck that hauls
/// negative eleven tons.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} is missing required columns: {columns:?}")]
    MissingColumns { path: String, columns: Vec<String> },

    #[error("{path} produced an empty flow table — no rows matched the configured mode and trade type")]
    EmptyTable { path: String },

    #[error("unknown cost reference location {name:?} — known hubs: {known:?}")]
    UnknownReferenceLocation { name: String, known: Vec<String> },

    #[error("invalid sampling bounds: {reason}")]
    InvalidSamplingBounds { reason: String },
}
