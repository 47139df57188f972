// =============================================================================
// ranker.rs — THE PROXIMITY PAGEANT
// =============================================================================
//
// Every hub city gets to pick its favorites. For each driver hub we rank
// the sampled orders by how far the pickup is from the hub and pin a star
// on the nearest twenty. An order near two hubs gets starred twice, which
// is the same as being starred once, because a star is a bool and booleans
// have no concept of being extra special.
//
// Stars are decoration, not destiny: the filter downstream judges orders
// by profit alone and will happily ship a starred order that loses money
// straight into the void.
// =============================================================================

use rayon::prelude::*;

use crate::geo;
use crate::models::{DriverLocation, Order};

/// Fill each order's hub-distance vector and star the `k` nearest orders
/// per hub. Distances land in the same sequence the hubs were given, so
/// index 0 is always the first hub. Ties rank in sampling order.
pub fn star_nearest(mut orders: Vec<Order>, locations: &[DriverLocation], k: usize) -> Vec<Order> {
    orders.par_iter_mut().for_each(|order| {
        order.distance_to = locations
            .iter()
            .map(|location| geo::distance_km(location.point, order.origin))
            .collect();
    });

    for hub_index in 0..locations.len() {
        let mut by_distance: Vec<usize> = (0..orders.len()).collect();
        by_distance.sort_by(|&a, &b| {
            orders[a].distance_to[hub_index].total_cmp(&orders[b].distance_to[hub_index])
        });
        for &order_index in by_distance.iter().take(k) {
            orders[order_index].is_starred = true;
        }
    }

    orders
}
