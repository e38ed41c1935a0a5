use crate::record::Record;

/// Sorts records by `cost`, cheapest first. Ties keep no particular order.
///
/// NaN costs of either sign sort after every number; the rest follow the
/// IEEE total order.
pub fn sort_by_cost(records: &mut [Record]) {
    records.sort_unstable_by(|a, b| {
        a.cost
            .is_nan()
            .cmp(&b.cost.is_nan())
            .then(a.cost.total_cmp(&b.cost))
    });
}
