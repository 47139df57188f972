// =============================================================================
// sampler.rs — THE IMAGINARY FLEET GENERATOR
// =============================================================================
//
// The flow dataset knows how many tons of cereal moved between two zones
// over four years. It does not know about trucks, drivers, or street
// addresses, because it is a statistical abstraction and those are real
// things. This module papers over that gap by inventing all three.
//
// Per request we draw a without-replacement sample of lanes, then give
// each lane a vehicle class, a legal-ish tonnage, a driver id, and two
// coordinates somewhere over the lower 48. The coordinates have no
// relationship to the lane's actual geography. Everyone involved has made
// peace with this.
//
// Randomness discipline: the RNG is built from an explicit optional seed
// and handed down the call chain. No process-global seed, no thread_rng in
// disguise. Same seed + same table = same fleet, which is the entire
// reason the reproducibility tests pass.
// =============================================================================

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{GeoPoint, OrderDraft, VehicleType};
use crate::normalizer::FlowTable;

/// Build the request's RNG. `Some(seed)` gives a reproducible stream for
/// tests and demos; `None` pulls fresh OS entropy, which is what
/// production traffic gets.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Draw up to `requested` lanes uniformly without replacement and dress
/// each one up as an order draft. Asking for more lanes than the table
/// holds silently clamps; asking for zero gets zero.
///
/// Draw order per sampled lane is fixed (vehicle, tons, driver, origin
/// lat/lon, destination lat/lon) — reordering the draws would silently
/// change every seeded result.
pub fn sample_orders(
    table: &FlowTable,
    requested: usize,
    rng: &mut StdRng,
    config: &EngineConfig,
) -> Vec<OrderDraft> {
    let n = requested.min(table.len());
    if n == 0 {
        return Vec::new();
    }

    let bbox = config.coordinate_box;
    let records = table.records();
    let mut drafts = Vec::with_capacity(n);

    for idx in index::sample(rng, records.len(), n).iter() {
        let record = &records[idx];

        let vehicle_type = VehicleType::ALL[rng.gen_range(0..VehicleType::ALL.len())];
        let (min_load, max_load) = vehicle_type.load_range();
        let tons_total = (rng.gen_range(min_load..=max_load) * 10.0).round() / 10.0;
        let driver_id = rng.gen_range(1..=config.n_drivers);
        let origin = GeoPoint::new(
            rng.gen_range(bbox.lat_min..=bbox.lat_max),
            rng.gen_range(bbox.lon_min..=bbox.lon_max),
        );
        let destination = GeoPoint::new(
            rng.gen_range(bbox.lat_min..=bbox.lat_max),
            rng.gen_range(bbox.lon_min..=bbox.lon_max),
        );

        drafts.push(OrderDraft {
            origin_name: record.origin_name.clone(),
            destination_name: record.destination_name.clone(),
            commodity_name: record.commodity_name.clone(),
            vehicle_type,
            tons_total,
            driver_id,
            origin,
            destination,
        });
    }

    debug!(requested, sampled = drafts.len(), "order drafts sampled");
    drafts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlowRecord;
    use std::collections::HashSet;

    fn test_record(i: u32) -> FlowRecord {
        FlowRecord {
            origin_code: i,
            destination_code: i + 1,
            mode: 1,
            commodity_code: 2,
            trade_type: 1,
            tons_by_year: [10.0; 4],
            value_by_year: [100.0; 4],
            unit_price_by_year: [Some(10.0); 4],
            tons_total: 40.0,
            value_total: 400.0,
            unit_price_mean: Some(10.0),
            tons_growth: Some(0.0),
            value_growth: Some(0.0),
            origin_name: Some(format!("zone-{i}")),
            destination_name: Some(format!("zone-{}", i + 1)),
            commodity_name: Some(format!("commodity-{i}")),
        }
    }

    fn test_table(rows: u32) -> FlowTable {
        FlowTable::from_records((0..rows).map(test_record).collect())
    }

    #[test]
    fn test_same_seed_same_table_identical_sample() {
        let table = test_table(50);
        let config = EngineConfig::default();

        let mut rng_a = make_rng(Some(42));
        let mut rng_b = make_rng(Some(42));
        let a = sample_orders(&table, 10, &mut rng_a, &config);
        let b = sample_orders(&table, 10, &mut rng_b, &config);

        assert_eq!(a.len(), 10);
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(left.commodity_name, right.commodity_name);
            assert_eq!(left.vehicle_type, right.vehicle_type);
            assert_eq!(left.tons_total, right.tons_total);
            assert_eq!(left.driver_id, right.driver_id);
            assert_eq!(left.origin, right.origin);
            assert_eq!(left.destination, right.destination);
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let table = test_table(50);
        let config = EngineConfig::default();

        let a = sample_orders(&table, 10, &mut make_rng(Some(1)), &config);
        let b = sample_orders(&table, 10, &mut make_rng(Some(2)), &config);

        // Identical 10-draft runs from different seeds would mean the rng
        // is decorative. Compare something seed-sensitive.
        let fingerprints = |drafts: &[OrderDraft]| -> Vec<(Option<String>, u32)> {
            drafts
                .iter()
                .map(|d| (d.commodity_name.clone(), d.driver_id))
                .collect()
        };
        assert_ne!(fingerprints(&a), fingerprints(&b));
    }

    #[test]
    fn test_oversized_request_clamps_to_table_size() {
        let table = test_table(7);
        let config = EngineConfig::default();
        let drafts = sample_orders(&table, 10_000, &mut make_rng(Some(7)), &config);
        assert_eq!(drafts.len(), 7);
    }

    #[test]
    fn test_zero_request_and_empty_table_yield_nothing() {
        let config = EngineConfig::default();
        assert!(sample_orders(&test_table(5), 0, &mut make_rng(Some(1)), &config).is_empty());
        assert!(sample_orders(&test_table(0), 10, &mut make_rng(Some(1)), &config).is_empty());
    }

    #[test]
    fn test_sampling_is_without_replacement() {
        let table = test_table(30);
        let config = EngineConfig::default();
        let drafts = sample_orders(&table, 30, &mut make_rng(Some(99)), &config);

        let unique: HashSet<_> = drafts.iter().map(|d| d.commodity_name.clone()).collect();
        assert_eq!(unique.len(), 30);
    }

    #[test]
    fn test_synthetic_attributes_respect_their_ranges() {
        let table = test_table(40);
        let config = EngineConfig::default();
        let bbox = config.coordinate_box;
        let drafts = sample_orders(&table, 40, &mut make_rng(Some(123)), &config);

        for draft in &drafts {
            let (min_load, max_load) = draft.vehicle_type.load_range();
            assert!(draft.tons_total >= min_load && draft.tons_total <= max_load);
            // One decimal place, as promised.
            assert_eq!((draft.tons_total * 10.0).round() / 10.0, draft.tons_total);

            assert!(draft.driver_id >= 1 && draft.driver_id <= config.n_drivers);

            for point in [draft.origin, draft.destination] {
                assert!(point.lat >= bbox.lat_min && point.lat <= bbox.lat_max);
                assert!(point.lon >= bbox.lon_min && point.lon <= bbox.lon_max);
            }
        }
    }
}
