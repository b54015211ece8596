use std::fmt;

use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray},
    compute,
    datatypes::{DataType, Float64Type, Int64Type},
};

use crate::{errors::RuleError, types::RowIndex};

/// A single value read from a feed, borrowed from its Arrow buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
}

impl<'a> Cell<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Null, empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Str(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Strings are parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Str(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Cell::Null | Cell::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Cell::Str(s) => Some(*s),
            _ => None,
        }
    }

    /// Owned textual form, used for samples.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Rendered value for map keys and filters; `None` for null.
    pub fn key_text(&self) -> Option<String> {
        (!self.is_null()).then(|| self.render())
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("null"),
            Cell::Bool(v) => write!(f, "{v}"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Str(s) => f.write_str(s),
        }
    }
}

/// Typed accessor over one Arrow column.
///
/// Integer types are widened to `i64`, floating and decimal types to `f64`.
/// Every other type is cast to UTF-8.
#[derive(Debug, Clone)]
pub enum ColumnReader {
    Bool(BooleanArray),
    Int(Int64Array),
    Float(Float64Array),
    Utf8(StringArray),
}

impl ColumnReader {
    pub fn try_new(column: &str, array: &ArrayRef) -> Result<Self, RuleError> {
        let cast_to = |to: &DataType| {
            compute::cast(array, to)
                .map_err(|e| RuleError::TypeCastError(column.to_string(), e.to_string()))
        };
        let reader = match array.data_type() {
            DataType::Boolean => ColumnReader::Bool(array.as_boolean().clone()),
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32 => {
                let casted = cast_to(&DataType::Int64)?;
                ColumnReader::Int(casted.as_primitive::<Int64Type>().clone())
            }
            DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => {
                let casted = cast_to(&DataType::Float64)?;
                ColumnReader::Float(casted.as_primitive::<Float64Type>().clone())
            }
            DataType::Utf8 => ColumnReader::Utf8(array.as_string::<i32>().clone()),
            _ => {
                let casted = cast_to(&DataType::Utf8)?;
                ColumnReader::Utf8(casted.as_string::<i32>().clone())
            }
        };
        Ok(reader)
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnReader::Bool(a) => a.len(),
            ColumnReader::Int(a) => a.len(),
            ColumnReader::Float(a) => a.len(),
            ColumnReader::Utf8(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn cell(&self, row: usize) -> Cell<'_> {
        match self {
            ColumnReader::Bool(a) if a.is_valid(row) => Cell::Bool(a.value(row)),
            ColumnReader::Int(a) if a.is_valid(row) => Cell::Int(a.value(row)),
            ColumnReader::Float(a) if a.is_valid(row) => Cell::Float(a.value(row)),
            ColumnReader::Utf8(a) if a.is_valid(row) => Cell::Str(a.value(row)),
            _ => Cell::Null,
        }
    }
}

/// The requested columns of one batch, with the batch's global row offset.
#[derive(Debug, Clone)]
pub struct RowChunk {
    offset: RowIndex,
    len: usize,
    columns: Vec<ColumnReader>,
}

impl RowChunk {
    pub fn new(offset: RowIndex, len: usize, columns: Vec<ColumnReader>) -> Self {
        Self {
            offset,
            len,
            columns,
        }
    }

    pub fn offset(&self) -> RowIndex {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of columns read.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, col: usize) -> &ColumnReader {
        &self.columns[col]
    }

    #[inline]
    pub fn cell(&self, col: usize, row: usize) -> Cell<'_> {
        self.columns[col].cell(row)
    }

    /// Global row index of a chunk-local row.
    #[inline]
    pub fn row_index(&self, row: usize) -> RowIndex {
        self.offset + row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Decimal128Array, Int32Array};
    use std::sync::Arc;

    #[test]
    fn test_cell_blank() {
        assert!(Cell::Null.is_blank());
        assert!(Cell::Str("   ").is_blank());
        assert!(!Cell::Str("a").is_blank());
        assert!(!Cell::Int(0).is_blank());
    }

    #[test]
    fn test_cell_numeric_view() {
        assert_eq!(Cell::Str(" 12.5 ").as_f64(), Some(12.5));
        assert_eq!(Cell::Str("abc").as_f64(), None);
        assert_eq!(Cell::Str("NaN").as_f64(), None);
        assert_eq!(Cell::Int(7).as_f64(), Some(7.0));
        assert_eq!(Cell::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_cell_render() {
        assert_eq!(Cell::Float(12.0).render(), "12");
        assert_eq!(Cell::Float(2.5).render(), "2.5");
        assert_eq!(Cell::Null.render(), "null");
        assert_eq!(Cell::Str("FRA").render(), "FRA");
        assert_eq!(Cell::Null.key_text(), None);
        assert_eq!(Cell::Str("null").key_text().as_deref(), Some("null"));
    }

    #[test]
    fn test_reader_widens_integers() {
        let array: ArrayRef = Arc::new(Int32Array::from(vec![Some(1), None, Some(3)]));
        let reader = ColumnReader::try_new("n", &array).unwrap();
        assert!(matches!(reader, ColumnReader::Int(_)));
        assert_eq!(reader.cell(0), Cell::Int(1));
        assert_eq!(reader.cell(1), Cell::Null);
    }

    #[test]
    fn test_reader_decimal_to_float() {
        let array: ArrayRef = Arc::new(
            Decimal128Array::from(vec![Some(1250), Some(-300)])
                .with_precision_and_scale(10, 2)
                .unwrap(),
        );
        let reader = ColumnReader::try_new("amount", &array).unwrap();
        assert_eq!(reader.cell(0), Cell::Float(12.5));
        assert_eq!(reader.cell(1), Cell::Float(-3.0));
    }

    #[test]
    fn test_reader_casts_dates_to_text() {
        let array: ArrayRef = Arc::new(Date32Array::from(vec![Some(19723), None]));
        let reader = ColumnReader::try_new("d", &array).unwrap();
        assert_eq!(reader.cell(0), Cell::Str("2024-01-01"));
        assert_eq!(reader.cell(1), Cell::Null);
    }
}
