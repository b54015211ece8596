use std::sync::Arc;

use dashmap::DashMap;

use crate::utils::hasher::Xxh3Builder;

pub type Batch = arrow_array::RecordBatch;
pub type Batches = Vec<Arc<Batch>>;

/// Zero-based row position across all batches of a table.
pub type RowIndex = usize;

/// Rendered key -> rows holding it, filled concurrently from several batches.
pub type OccurrenceMap = DashMap<String, Vec<RowIndex>, Xxh3Builder>;
