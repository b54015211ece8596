use std::sync::Arc;

use arrow::datatypes::SchemaRef;

use crate::{
    errors::RuleError,
    tables::Table,
    types::{Batch, Batches},
};

/// In-memory feed over Arrow record batches sharing one schema.
#[derive(Debug, Clone)]
pub struct ArrowTable {
    name: String,
    schema: SchemaRef,
    batches: Batches,
}

impl ArrowTable {
    pub fn new(
        name: impl Into<String>,
        schema: SchemaRef,
        batches: Vec<Batch>,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        for (i, batch) in batches.iter().enumerate() {
            if batch.schema().fields() != schema.fields() {
                return Err(RuleError::ValidationError(format!(
                    "Batch {} of feed '{}' does not match the feed schema",
                    i, name
                )));
            }
        }
        Ok(Self {
            name,
            schema,
            batches: batches.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn from_batch(name: impl Into<String>, batch: Batch) -> Self {
        Self {
            name: name.into(),
            schema: batch.schema(),
            batches: vec![Arc::new(batch)],
        }
    }

    /// Builds a table from at least one batch; the first batch's schema
    /// becomes the feed schema.
    pub fn from_batches(name: impl Into<String>, batches: Vec<Batch>) -> Result<Self, RuleError> {
        let name = name.into();
        let schema = batches.first().map(|b| b.schema()).ok_or_else(|| {
            RuleError::ValidationError(format!("Feed '{}' has no record batch", name))
        })?;
        Self::new(name, schema, batches)
    }
}

impl Table for ArrowTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn batches(&self) -> &[Arc<Batch>] {
        &self.batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::{
        array::{Int64Array, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    #[test]
    fn test_rejects_mismatched_batches() {
        let ints = Batch::try_new(
            Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, true)])),
            vec![Arc::new(Int64Array::from(vec![1]))],
        )
        .unwrap();
        let strings = Batch::try_new(
            Arc::new(Schema::new(vec![Field::new("a", DataType::Utf8, true)])),
            vec![Arc::new(StringArray::from(vec!["1"]))],
        )
        .unwrap();

        let result = ArrowTable::from_batches("feed", vec![ints, strings]);
        assert!(matches!(result, Err(RuleError::ValidationError(_))));
    }

    #[test]
    fn test_empty_batches_need_schema() {
        assert!(ArrowTable::from_batches("feed", vec![]).is_err());

        let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, true)]));
        let table = ArrowTable::new("feed", schema, vec![]).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert!(table.has_column("a"));
    }
}
