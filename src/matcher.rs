// matcher.rs
// Pure offer matching: criteria predicate and price selection

use crate::model::{ItemRecord, RequestCriteria};

/// Does one catalog record satisfy one request's criteria?
///
/// Per-attribute comparisons: case-insensitive substring containment on
/// the name, record >= requested minimum for capacity and speed, exact
/// equality for the platform, record <= requested budget for the price.
/// An attribute absent from the criteria is a wildcard; a criteria
/// constraint on an attribute the record does not carry is not satisfied.
pub fn matches(record: &ItemRecord, criteria: &RequestCriteria) -> bool {
    let name_ok = criteria
        .name
        .as_deref()
        .is_none_or(|want| record.name.to_lowercase().contains(&want.to_lowercase()));

    let capacity_ok = criteria
        .min_capacity
        .is_none_or(|min| record.capacity.is_some_and(|have| have >= min));

    let speed_ok = criteria
        .min_speed
        .is_none_or(|min| record.speed.is_some_and(|have| have >= min));

    let platform_ok = criteria
        .platform
        .is_none_or(|want| record.platform.is_some_and(|have| have == want));

    let price_ok = criteria.max_price.is_none_or(|budget| record.price <= budget);

    name_ok && capacity_ok && speed_ok && platform_ok && price_ok
}

/// Lowest-priced record of a seller's offer list.
///
/// Ties keep the first record in the seller's returned order.
pub fn cheapest(items: &[ItemRecord]) -> Option<&ItemRecord> {
    items.iter().min_by(|a, b| a.price.total_cmp(&b.price))
}
