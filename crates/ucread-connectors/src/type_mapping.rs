//! Type mapping from SQL warehouse type names to Arrow data types.

use arrow::datatypes::{DataType, TimeUnit};
use tracing::debug;

const DEFAULT_DECIMAL: (u8, i8) = (10, 0);

/// Map a warehouse `type_name` to an Arrow `DataType`.
///
/// `type_text` is consulted for decimal precision and scale. Unknown and
/// complex types come back as UTF-8, which is how the JSON result format
/// carries them.
pub fn warehouse_type_to_arrow(type_name: &str, type_text: Option<&str>) -> DataType {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" => DataType::Boolean,

        "BYTE" | "TINYINT" => DataType::Int8,
        "SHORT" | "SMALLINT" => DataType::Int16,
        "INT" | "INTEGER" => DataType::Int32,
        "LONG" | "BIGINT" => DataType::Int64,

        "FLOAT" | "REAL" => DataType::Float32,
        "DOUBLE" => DataType::Float64,

        "DECIMAL" | "NUMERIC" | "DEC" => {
            let (precision, scale) = type_text
                .and_then(parse_decimal)
                .unwrap_or(DEFAULT_DECIMAL);
            DataType::Decimal128(precision, scale)
        }

        "STRING" | "VARCHAR" | "CHAR" | "TEXT" => DataType::Utf8,
        "BINARY" => DataType::Binary,

        "DATE" => DataType::Date32,
        "TIMESTAMP" => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        "TIMESTAMP_NTZ" => DataType::Timestamp(TimeUnit::Microsecond, None),

        "NULL" | "VOID" => DataType::Null,

        "ARRAY" | "MAP" | "STRUCT" | "INTERVAL" => DataType::Utf8,

        other => {
            debug!("Unknown warehouse type '{}', defaulting to Utf8", other);
            DataType::Utf8
        }
    }
}

/// Parse `decimal(p,s)` / `DECIMAL(p, s)` into precision and scale.
fn parse_decimal(type_text: &str) -> Option<(u8, i8)> {
    let open = type_text.find('(')?;
    let close = type_text.rfind(')')?;
    let inner = type_text.get(open + 1..close)?;
    let mut parts = inner.split(',').map(str::trim);
    let precision = parts.next()?.parse().ok()?;
    let scale = parts.next().map(|s| s.parse().ok()).unwrap_or(Some(0))?;
    Some((precision, scale))
}
