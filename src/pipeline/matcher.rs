// =============================================================================
// matcher.rs — THE FINAL JUDGMENT
// =============================================================================
//
// The last stop on the assembly line, and the only stage with opinions.
// Everything upstream is generous: the sampler invents orders, the oracle
// prices them, the pageant hands out stars. This stage looks at one number
// — actual profit — and throws away everything that isn't strictly above
// zero. Break-even is a loss with better marketing.
//
// It also owns MatchPipeline, the object the HTTP layer actually talks to:
// one immutable flow table in, one request-sized batch of OrderViews out.
// No shared mutable state, no locks, no apologies.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::config::EngineConfig;
use crate::metrics::MetricsCollector;
use crate::models::{ConfigurationError, DriverLocation, GeoPoint, Order, OrderView};
use crate::normalizer::FlowTable;
use crate::pipeline::{economics, ranker, sampler};

/// Keep only the strictly profitable orders, in the order they were
/// sampled, capped at `requested`, and projected down to the ten fields
/// the frontend is allowed to see. An order that exactly breaks even is
/// rejected: zero is not a profit, it's a warning.
pub fn filter_profitable(orders: Vec<Order>, requested: usize) -> Vec<OrderView> {
    orders
        .into_iter()
        .filter(|order| order.actual_profit > 0.0)
        .take(requested)
        .map(OrderView::from)
        .collect()
}

/// The whole machine, assembled: flow table, hub list, cost anchor, and
/// the metrics ledger. Construction validates the sampling bounds and
/// resolves the cost-reference hub, so a typo'd city name or an inverted
/// bounding box kills the process at startup instead of repricing five
/// million lanes against the wrong coastline (or panicking mid-request).
#[derive(Debug)]
pub struct MatchPipeline {
    config: Arc<EngineConfig>,
    table: Arc<FlowTable>,
    metrics: Arc<MetricsCollector>,
    locations: Vec<DriverLocation>,
    reference_point: GeoPoint,
}

impl MatchPipeline {
    pub fn new(
        config: Arc<EngineConfig>,
        table: Arc<FlowTable>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, ConfigurationError> {
        config.validate_sampling_bounds()?;
        let reference_point = config.cost_reference_point()?;
        let locations = config.driver_locations();
        Ok(Self {
            config,
            table,
            metrics,
            locations,
            reference_point,
        })
    }

    /// The table behind this pipeline, for health reporting.
    pub fn flow_table(&self) -> &FlowTable {
        &self.table
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One request, end to end: sample → price → star → filter → project.
    ///
    /// `seed` pins the RNG for this request only; when absent we fall back
    /// to the configured seed, and when that's absent too (the production
    /// case) every request draws fresh entropy. Asking for zero orders, or
    /// asking an empty table, returns an empty vec rather than an error —
    /// an unsatisfiable request is still a well-formed one.
    pub fn available_orders(&self, requested: usize, seed: Option<u64>) -> Vec<OrderView> {
        if requested == 0 || self.table.is_empty() {
            return Vec::new();
        }
        let started = Instant::now();

        let mut rng = sampler::make_rng(seed.or(self.config.sample_seed));
        let drafts = sampler::sample_orders(&self.table, requested, &mut rng, &self.config);
        self.metrics.add_orders_sampled(drafts.len() as u64);

        let priced = economics::price_orders(
            drafts,
            self.reference_point,
            self.config.fuel_price_per_gallon,
        );
        let ranked = ranker::star_nearest(priced, &self.locations, self.config.star_count);

        let unprofitable = ranked
            .iter()
            .filter(|order| order.actual_profit <= 0.0)
            .count();
        self.metrics.add_orders_rejected(unprofitable as u64);

        let views = filter_profitable(ranked, requested);
        self.metrics.add_orders_matched(views.len() as u64);
        self.metrics
            .add_matched_profit(views.iter().map(|view| view.actual_profit).sum());

        debug!(
            requested,
            matched = views.len(),
            rejected = unprofitable,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "match pipeline pass complete"
        );

        views
    }
}
