//! Normalized row set: a fixed column list (required fields, then the extra bag) shared by
//! every row, with JSON and polars views for downstream consumers.

use polars::prelude::{Column, DataFrame, NamedFrom, PolarsResult, Series};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const DEFAULT_EXTRA_FIELD: &str = "extra_data";

static NULL: Value = Value::Null;

/// One output row. `values` lines up with the required part of `RowSet::columns`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedRow {
    pub values: Vec<Value>,
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RowSet {
    required: Vec<String>,
    extra_field: String,
    rows: Vec<NormalizedRow>,
}

impl RowSet {
    pub(crate) fn new(required: Vec<String>, extra_field: String, rows: Vec<NormalizedRow>) -> Self {
        Self { required, extra_field, rows }
    }

    /// Required field names followed by the extra field name.
    pub fn columns(&self) -> Vec<&str> {
        self.required.iter().map(|s| s.as_str()).chain(std::iter::once(self.extra_field.as_str())).collect()
    }

    pub fn required(&self) -> &[String] { &self.required }

    pub fn extra_field(&self) -> &str { &self.extra_field }

    pub fn rows(&self) -> &[NormalizedRow] { &self.rows }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Cell lookup by row index and column name. The extra column yields its bag as an object.
    pub fn get(&self, row: usize, column: &str) -> Option<Value> {
        let r = self.rows.get(row)?;
        if column == self.extra_field {
            return Some(Value::Object(r.extra.clone()));
        }
        let idx = self.required.iter().position(|c| c == column)?;
        r.values.get(idx).cloned()
    }

    /// Polars frame with one column per required field plus the extra bag as JSON text.
    /// Column dtypes are inferred from the JSON values: bool, i64, f64, otherwise string.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut cols: Vec<Column> = Vec::with_capacity(self.required.len() + 1);
        for (i, name) in self.required.iter().enumerate() {
            let cells: Vec<&Value> = self.rows.iter().map(|r| r.values.get(i).unwrap_or(&NULL)).collect();
            cols.push(json_column(name, &cells).into());
        }
        let extra: Vec<Option<String>> = self.rows.iter().map(|r| Some(Value::Object(r.extra.clone()).to_string())).collect();
        cols.push(Series::new(self.extra_field.as_str().into(), extra).into());
        DataFrame::new(cols)
    }
}

fn json_column(name: &str, cells: &[&Value]) -> Series {
    let non_null = || cells.iter().filter(|v| !v.is_null());
    if non_null().all(|v| v.is_boolean()) {
        let vals: Vec<Option<bool>> = cells.iter().map(|v| v.as_bool()).collect();
        Series::new(name.into(), vals)
    } else if non_null().all(|v| v.is_i64()) {
        let vals: Vec<Option<i64>> = cells.iter().map(|v| v.as_i64()).collect();
        Series::new(name.into(), vals)
    } else if non_null().all(|v| v.is_number()) {
        let vals: Vec<Option<f64>> = cells.iter().map(|v| v.as_f64()).collect();
        Series::new(name.into(), vals)
    } else {
        let vals: Vec<Option<String>> = cells
            .iter()
            .map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), vals)
    }
}

struct RowView<'a> {
    set: &'a RowSet,
    row: &'a NormalizedRow,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.set.required.len() + 1))?;
        for (k, v) in self.set.required.iter().zip(self.row.values.iter()) {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry(&self.set.extra_field, &self.row.extra)?;
        map.end()
    }
}

/// Serializes as an array of objects whose keys follow `columns()` order.
impl Serialize for RowSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowView { set: self, row })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{AnyValue, DataType};
    use serde_json::json;

    fn sample() -> RowSet {
        let mut extra = Map::new();
        extra.insert("z".into(), json!(3));
        RowSet::new(
            vec!["y".into(), "x".into()],
            DEFAULT_EXTRA_FIELD.into(),
            vec![
                NormalizedRow { values: vec![json!(2), json!("a")], extra },
                NormalizedRow { values: vec![Value::Null, json!("b")], extra: Map::new() },
            ],
        )
    }

    #[test]
    fn columns_end_with_extra_field() {
        assert_eq!(sample().columns(), vec!["y", "x", "extra_data"]);
    }

    #[test]
    fn serializes_in_column_order() {
        let text = serde_json::to_string(&sample()).unwrap();
        assert_eq!(text, r#"[{"y":2,"x":"a","extra_data":{"z":3}},{"y":null,"x":"b","extra_data":{}}]"#);
    }

    #[test]
    fn cell_lookup() {
        let rs = sample();
        assert_eq!(rs.get(0, "x"), Some(json!("a")));
        assert_eq!(rs.get(0, "extra_data"), Some(json!({"z": 3})));
        assert_eq!(rs.get(1, "y"), Some(Value::Null));
        assert_eq!(rs.get(0, "nope"), None);
        assert_eq!(rs.get(5, "x"), None);
    }

    #[test]
    fn dataframe_infers_column_types() {
        let df = sample().to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("y").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::String);
        assert!(matches!(df.column("y").unwrap().get(1).unwrap(), AnyValue::Null));
        assert_eq!(df.column("extra_data").unwrap().dtype(), &DataType::String);
    }
}
