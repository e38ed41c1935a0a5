//! Two-input outer join with aggregation on `id`.

use tracing::{debug, error};

use crate::error::Result;
use crate::index::{IndexConfig, KeyIndex};
use crate::record::Record;

/// Joins `a` and `b` on `id`, producing one aggregated record per distinct
/// id found in either input.
///
/// Records are folded in the order `a` then `b`, left to right. The result
/// has no meaningful order; see [`crate::order::sort_by_cost`].
pub fn join(a: &[Record], b: &[Record]) -> Result<Vec<Record>> {
    join_with_config(a, b, IndexConfig::default())
}

pub fn join_with_config(a: &[Record], b: &[Record], config: IndexConfig) -> Result<Vec<Record>> {
    if a.is_empty() && b.is_empty() {
        return Ok(Vec::new());
    }

    let mut index = KeyIndex::with_config(a.len() + b.len(), config)?;
    for record in a.iter().chain(b) {
        // dropping the index on error releases every partial allocation
        index.insert(*record).inspect_err(|e| error!(%e, "join aborted"))?;
    }

    let out = index.drain()?;
    debug!(left = a.len(), right = b.len(), joined = out.len(), "join complete");
    Ok(out)
}
