//! Column-name-keyed JSON payload -> row struct decoding (spec.md §4.3):
//! "JSON is decoded field-by-field into a fresh R by name after
//! translating server-side column names to field names".

use pgcache_errors::DeserializeError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use pgcache_util::columns::column_to_field;

/// Decode a column-keyed JSON object into `R`, re-keying every entry from
/// its snake_case column name to the PascalCase field name a derived
/// `Deserialize` impl expects (the inverse of spec.md §6's field->column
/// conversion). An unknown column surviving into the remapped object is
/// simply an extra key serde ignores by default (forward-compatible, per
/// SPEC_FULL.md §4.3); a column the struct requires but the payload lacks,
/// or a value of the wrong shape, surfaces as [`DeserializeError::Malformed`]
/// with `serde_json`'s own message naming the field.
pub fn decode<R: DeserializeOwned>(table: &str, row: Map<String, Value>) -> Result<R, DeserializeError> {
    let remapped: Map<String, Value> = row.into_iter().map(|(col, v)| (column_to_field(&col), v)).collect();
    serde_json::from_value(Value::Object(remapped)).map_err(|source| DeserializeError::Malformed {
        table: table.to_string(),
        source,
    })
}
