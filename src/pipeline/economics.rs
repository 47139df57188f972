// =============================================================================
// economics.rs — THE PROFIT ORACLE
// =============================================================================
//
// Pure arithmetic, no randomness, no I/O. Given a draft order this module
// answers three questions: what does it pay (tons × the vehicle's rate),
// what does it cost (fuel for the deadhead from the reference hub to the
// pickup), and is the difference worth anyone's time.
//
// The cost model is gloriously reductive: the only expense in the entire
// freight industry is diesel for the empty drive to the pickup. Insurance,
// wages, tolls, depreciation, the driver's coffee — all free. The filter
// downstream still manages to reject plenty of orders, which says
// something about the fuel economy of a Large truck.
// =============================================================================

use rayon::prelude::*;

use crate::geo;
use crate::models::{GeoPoint, Order, OrderDraft, VehicleType};

/// Fuel cost for hauling `distance_km` with the given vehicle class:
/// km → miles → gallons → dollars.
pub fn transport_cost(vehicle: VehicleType, distance_km: f64, fuel_price_per_gallon: f64) -> f64 {
    let gallons = geo::km_to_miles(distance_km) / vehicle.miles_per_gallon();
    gallons * fuel_price_per_gallon
}

/// What the order pays before any costs.
pub fn expected_profit(vehicle: VehicleType, tons: f64) -> f64 {
    tons * vehicle.revenue_per_ton()
}

/// Price one draft into a full order. The deadhead is measured from the
/// configured reference hub to the order's origin; the route distance is
/// origin → destination. `distance_to` and `is_starred` are left for the
/// ranker, which owns them.
pub fn price_order(draft: OrderDraft, reference: GeoPoint, fuel_price_per_gallon: f64) -> Order {
    let deadhead_km = geo::distance_km(reference, draft.origin);
    let transport_cost = transport_cost(draft.vehicle_type, deadhead_km, fuel_price_per_gallon);
    let expected_profit = expected_profit(draft.vehicle_type, draft.tons_total);
    let route_distance_km = geo::distance_km(draft.origin, draft.destination);

    Order {
        origin_name: draft.origin_name,
        destination_name: draft.destination_name,
        commodity_name: draft.commodity_name,
        vehicle_type: draft.vehicle_type,
        tons_total: draft.tons_total,
        driver_id: draft.driver_id,
        origin: draft.origin,
        destination: draft.destination,
        expected_profit,
        transport_cost,
        actual_profit: expected_profit - transport_cost,
        route_distance_km,
        distance_to: Vec::new(),
        is_starred: false,
    }
}

/// Price a whole sample in parallel. Rayon collects in input order, so
/// the sampling order — which the filter stage depends on — survives the
/// fan-out intact.
pub fn price_orders(
    drafts: Vec<OrderDraft>,
    reference: GeoPoint,
    fuel_price_per_gallon: f64,
) -> Vec<Order> {
    drafts
        .into_par_iter()
        .map(|draft| price_order(draft, reference, fuel_price_per_gallon))
        .collect()
}
