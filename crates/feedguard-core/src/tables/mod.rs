//! Tabular input consumed by the engine.
//!
//! Rules only see feeds through the [`Table`] trait. [`ArrowTable`] is the
//! in-memory implementation over Arrow record batches and [`FeedCatalog`]
//! maps feed names to tables.
use std::{collections::HashMap, sync::Arc};

use arrow::{array::Array, datatypes::SchemaRef};

use crate::{errors::RuleError, types::Batch};

mod arrow_table;
mod cells;

pub use arrow_table::ArrowTable;
pub use cells::{Cell, ColumnReader, RowChunk};

/// Sum of a column's numeric values, with the count of values taking part.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColumnSum {
    pub total: f64,
    pub numeric: usize,
    pub non_numeric: usize,
}

pub trait Table: Send + Sync {
    /// Feed name of the table.
    fn name(&self) -> &str;
    fn schema(&self) -> SchemaRef;
    fn batches(&self) -> &[Arc<Batch>];

    fn num_rows(&self) -> usize {
        self.batches().iter().map(|b| b.num_rows()).sum()
    }

    fn has_column(&self, column: &str) -> bool {
        self.schema().index_of(column).is_ok()
    }

    fn column_names(&self) -> Vec<String> {
        self.schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    fn column_index(&self, column: &str) -> Result<usize, RuleError> {
        self.schema()
            .index_of(column)
            .map_err(|_| RuleError::ColumnNotFound {
                feed: self.name().to_string(),
                column: column.to_string(),
            })
    }

    /// Reads the requested columns batch by batch.
    ///
    /// Columns are resolved before any row is read, so a missing column
    /// fails without scanning.
    fn row_chunks(&self, columns: &[&str]) -> Result<Vec<RowChunk>, RuleError> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut offset = 0;
        let mut chunks = Vec::with_capacity(self.batches().len());
        for batch in self.batches() {
            let readers = indices
                .iter()
                .zip(columns)
                .map(|(&i, name)| ColumnReader::try_new(name, batch.column(i)))
                .collect::<Result<Vec<_>, _>>()?;
            chunks.push(RowChunk::new(offset, batch.num_rows(), readers));
            offset += batch.num_rows();
        }
        Ok(chunks)
    }

    /// Sums the numeric values of a column. Nulls are skipped and text
    /// values are parsed.
    fn sum(&self, column: &str) -> Result<ColumnSum, RuleError> {
        let mut sum = ColumnSum::default();
        for chunk in self.row_chunks(&[column])? {
            for row in 0..chunk.len() {
                let cell = chunk.cell(0, row);
                if cell.is_null() {
                    continue;
                }
                match cell.as_f64() {
                    Some(v) => {
                        sum.total += v;
                        sum.numeric += 1;
                    }
                    None => sum.non_numeric += 1,
                }
            }
        }
        Ok(sum)
    }

    /// Row count, or the non-null count of `column` when given.
    fn count(&self, column: Option<&str>) -> Result<usize, RuleError> {
        match column {
            None => Ok(self.num_rows()),
            Some(column) => {
                let index = self.column_index(column)?;
                Ok(self
                    .batches()
                    .iter()
                    .map(|b| b.num_rows() - b.column(index).null_count())
                    .sum())
            }
        }
    }
}

/// Feeds available to a run, by name.
///
/// The first table added becomes the default feed, used by rules that do not
/// name one.
#[derive(Clone, Default)]
pub struct FeedCatalog {
    tables: HashMap<String, Arc<dyn Table>>,
    default_feed: Option<String>,
}

impl FeedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: impl Table + 'static) -> Self {
        self.add_table(Arc::new(table));
        self
    }

    pub fn add_table(&mut self, table: Arc<dyn Table>) {
        let name = table.name().to_string();
        if self.default_feed.is_none() {
            self.default_feed = Some(name.clone());
        }
        self.tables.insert(name, table);
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), RuleError> {
        if !self.tables.contains_key(name) {
            return Err(RuleError::FeedNotFound(name.to_string()));
        }
        self.default_feed = Some(name.to_string());
        Ok(())
    }

    pub fn default_feed(&self) -> Option<&str> {
        self.default_feed.as_deref()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Table>, RuleError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::FeedNotFound(name.to_string()))
    }

    /// Named feed, or the default feed when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Table>, RuleError> {
        match name.or(self.default_feed.as_deref()) {
            Some(name) => self.get(name),
            None => Err(RuleError::FeedNotFound("<default>".to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use arrow::{array::ArrayRef, record_batch::RecordBatch};

    use super::ArrowTable;

    /// Single-batch feed from named columns.
    pub fn feed(name: &str, columns: Vec<(&str, ArrayRef)>) -> ArrowTable {
        ArrowTable::from_batch(name, batch(columns))
    }

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        RecordBatch::try_from_iter_with_nullable(
            columns.into_iter().map(|(name, array)| (name, array, true)),
        )
        .unwrap()
    }

    /// Feed whose columns are split into one batch per entry.
    pub fn feed_in_batches(name: &str, batches: Vec<Vec<(&str, ArrayRef)>>) -> ArrowTable {
        let batches = batches
            .into_iter()
            .map(batch)
            .collect();
        ArrowTable::from_batches(name, batches).unwrap()
    }

    pub fn strings(values: Vec<Option<&str>>) -> ArrayRef {
        Arc::new(arrow::array::StringArray::from(values))
    }

    pub fn ints(values: Vec<Option<i64>>) -> ArrayRef {
        Arc::new(arrow::array::Int64Array::from(values))
    }

    pub fn floats(values: Vec<Option<f64>>) -> ArrayRef {
        Arc::new(arrow::array::Float64Array::from(values))
    }
}
