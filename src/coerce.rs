//! Coercion of raw dataset payloads into store-acceptable scalars.
//!
//! Anything that cannot be represented as a single bool, integer, float or
//! string yields `None`, which turns the dataset into a structural leaf.
//! Nothing here returns an error: a bad payload must never abort an ingest.

use crate::types::{DataType, DatasetInfo, Payload, RawScalar, Value};

/// Coerce a dataset to its scalar value, if it has one.
pub fn coerce_dataset(info: &DatasetInfo) -> Option<Value> {
    if !info.shape.is_empty() {
        return None;
    }
    match &info.payload {
        Payload::Scalar(raw) => coerce_scalar(info.dtype, raw),
        Payload::Empty | Payload::Unread | Payload::Unreadable(_) => None,
    }
}

/// Coerce a single element against its declared type.
pub fn coerce_scalar(dtype: DataType, raw: &RawScalar) -> Option<Value> {
    match (dtype, raw) {
        (DataType::String | DataType::FixedString, RawScalar::Text(s)) => Some(Value::Text(s.clone())),
        (DataType::String | DataType::FixedString, RawScalar::Bytes(bytes)) => std::str::from_utf8(bytes)
            .ok()
            .map(|s| Value::Text(s.trim_end_matches('\0').to_string())),

        (DataType::Bool, RawScalar::Bool(b)) => Some(Value::Bool(*b)),
        (DataType::Bool, RawScalar::Int(i @ (0 | 1))) => Some(Value::Bool(*i == 1)),
        (DataType::Bool, RawScalar::Uint(u @ (0 | 1))) => Some(Value::Bool(*u == 1)),

        (DataType::Int | DataType::Uint, RawScalar::Int(i)) => {
            if dtype == DataType::Uint && *i < 0 {
                None
            } else {
                Some(Value::Int(*i))
            }
        }
        // The store's integers are signed 64-bit.
        (DataType::Int | DataType::Uint, RawScalar::Uint(u)) => i64::try_from(*u).ok().map(Value::Int),

        (DataType::Float, RawScalar::Float(f)) => Some(Value::Float(*f)),
        (DataType::Float, RawScalar::Int(i)) => Some(Value::Float(*i as f64)),
        (DataType::Float, RawScalar::Uint(u)) => Some(Value::Float(*u as f64)),

        _ => None,
    }
}

/// Coerce an attribute element whose declared type is only implied by the raw value.
pub fn coerce_attribute(raw: &RawScalar) -> Option<Value> {
    let dtype = match raw {
        RawScalar::Bool(_) => DataType::Bool,
        RawScalar::Int(_) => DataType::Int,
        RawScalar::Uint(_) => DataType::Uint,
        RawScalar::Float(_) => DataType::Float,
        RawScalar::Text(_) | RawScalar::Bytes(_) => DataType::String,
    };
    coerce_scalar(dtype, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(dtype: DataType, raw: RawScalar) -> DatasetInfo {
        DatasetInfo {
            dtype,
            shape: vec![],
            payload: Payload::Scalar(raw),
        }
    }

    #[test]
    fn test_scalar_int() {
        let info = scalar(DataType::Int, RawScalar::Int(5));
        assert_eq!(coerce_dataset(&info), Some(Value::Int(5)));
    }

    #[test]
    fn test_scalar_float() {
        let info = scalar(DataType::Float, RawScalar::Float(0.00025));
        assert_eq!(coerce_dataset(&info), Some(Value::Float(0.00025)));
    }

    #[test]
    fn test_string_dataset() {
        let info = scalar(DataType::String, RawScalar::Text("ok".into()));
        assert_eq!(coerce_dataset(&info), Some(Value::Text("ok".into())));
    }

    #[test]
    fn test_fixed_string_bytes_trims_padding() {
        let info = scalar(DataType::FixedString, RawScalar::Bytes(b"abc\0\0".to_vec()));
        assert_eq!(coerce_dataset(&info), Some(Value::Text("abc".into())));
    }

    #[test]
    fn test_invalid_utf8_is_no_value() {
        let info = scalar(DataType::String, RawScalar::Bytes(vec![0xff, 0xfe]));
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_vector_is_no_value() {
        let info = DatasetInfo {
            dtype: DataType::Float,
            shape: vec![3],
            payload: Payload::Unread,
        };
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_string_array_is_no_value() {
        let info = DatasetInfo {
            dtype: DataType::String,
            shape: vec![2],
            payload: Payload::Unread,
        };
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_empty_extent_is_no_value() {
        let info = DatasetInfo {
            dtype: DataType::Int,
            shape: vec![],
            payload: Payload::Empty,
        };
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_unreadable_is_no_value() {
        let info = DatasetInfo {
            dtype: DataType::Int,
            shape: vec![],
            payload: Payload::Unreadable("checksum mismatch".into()),
        };
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_type_mismatch_is_no_value() {
        let info = scalar(DataType::Int, RawScalar::Text("abc".into()));
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_unsupported_types_are_no_value() {
        for dtype in [DataType::Compound, DataType::Opaque, DataType::Reference, DataType::Enum] {
            let info = scalar(dtype, RawScalar::Int(1));
            assert_eq!(coerce_dataset(&info), None, "{:?}", dtype);
        }
    }

    #[test]
    fn test_unsigned_overflow_is_no_value() {
        let info = scalar(DataType::Uint, RawScalar::Uint(u64::MAX));
        assert_eq!(coerce_dataset(&info), None);

        let info = scalar(DataType::Uint, RawScalar::Uint(42));
        assert_eq!(coerce_dataset(&info), Some(Value::Int(42)));
    }

    #[test]
    fn test_negative_unsigned_is_no_value() {
        let info = scalar(DataType::Uint, RawScalar::Int(-1));
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_bool_from_int() {
        let info = scalar(DataType::Bool, RawScalar::Int(1));
        assert_eq!(coerce_dataset(&info), Some(Value::Bool(true)));

        let info = scalar(DataType::Bool, RawScalar::Int(7));
        assert_eq!(coerce_dataset(&info), None);
    }

    #[test]
    fn test_float_from_int() {
        let info = scalar(DataType::Float, RawScalar::Int(2));
        assert_eq!(coerce_dataset(&info), Some(Value::Float(2.0)));
    }

    #[test]
    fn test_coerce_attribute() {
        assert_eq!(coerce_attribute(&RawScalar::Text("units".into())), Some(Value::Text("units".into())));
        assert_eq!(coerce_attribute(&RawScalar::Uint(3)), Some(Value::Int(3)));
        assert_eq!(coerce_attribute(&RawScalar::Bool(false)), Some(Value::Bool(false)));
    }
}
