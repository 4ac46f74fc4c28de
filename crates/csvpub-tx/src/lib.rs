//! Record validation and canonicalization
//!
//! Turns a [`RawRecord`] into the JSON [`Payload`] published to the broker,
//! or explains why the row cannot be published. Everything here is pure:
//! the same row always yields the same result.

use csvpub_core::{
    CanonicalRecord, Payload, RawRecord, RecordError, EXPECTED_FIELDS, FIELD_NAME, FIELD_TYPE,
};

/// Validate a row and serialize it into a payload
pub fn canonicalize(record: &RawRecord) -> Result<Payload, RecordError> {
    let canonical = validate(record)?;
    encode(&canonical)
}

/// Check the row shape and parse the `type` field
///
/// The row must have exactly [`EXPECTED_FIELDS`] fields and its `type` field
/// must be a base-10 integer. The `name` field is taken as-is.
pub fn validate(record: &RawRecord) -> Result<CanonicalRecord, RecordError> {
    let fields = record.fields();
    if fields.len() != EXPECTED_FIELDS {
        return Err(RecordError::FieldCount {
            found: fields.len(),
            expected: EXPECTED_FIELDS,
        });
    }

    let raw_type = &fields[FIELD_TYPE];
    let kind = raw_type
        .parse::<i32>()
        .map_err(|source| RecordError::InvalidType {
            value: raw_type.clone(),
            source,
        })?;

    Ok(CanonicalRecord {
        name: fields[FIELD_NAME].clone(),
        kind,
    })
}

/// Serialize a canonical record to its wire form
pub fn encode(record: &CanonicalRecord) -> Result<Payload, RecordError> {
    Ok(Payload::new(serde_json::to_string(record)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn row(fields: &[&str]) -> RawRecord {
        RawRecord::new(1, fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn test_valid_row_becomes_payload() {
        let payload = canonicalize(&row(&["alice", "1"])).unwrap();
        assert_eq!(payload.as_str(), r#"{"name":"alice","type":1}"#);
    }

    #[test]
    fn test_payload_fields_match_row() {
        for (name, kind) in [("carol", "2"), ("dave", "-17"), ("", "0"), ("x y", "+5")] {
            let payload = canonicalize(&row(&[name, kind])).unwrap();
            let value: Value = serde_json::from_str(payload.as_str()).unwrap();
            assert_eq!(value["name"], name);
            assert_eq!(value["type"], kind.parse::<i64>().unwrap());
        }
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        for fields in [&[][..], &["alice"][..], &["alice", "1", "extra"][..]] {
            let err = canonicalize(&row(fields)).unwrap_err();
            assert!(matches!(
                err,
                RecordError::FieldCount { found, expected: 2 } if found == fields.len()
            ));
        }
    }

    #[test]
    fn test_non_integer_type_is_rejected() {
        for bad in ["x", "", "1.5", " 1", "1 ", "99999999999"] {
            let err = canonicalize(&row(&["bob", bad])).unwrap_err();
            assert!(
                matches!(err, RecordError::InvalidType { ref value, .. } if value == bad),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_name_is_copied_verbatim() {
        let name = "  quoted \"name\", with comma\n";
        let record = validate(&row(&[name, "3"])).unwrap();
        assert_eq!(record.name, name);

        let payload = encode(&record).unwrap();
        let back: CanonicalRecord = serde_json::from_str(payload.as_str()).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let raw = row(&["alice", "42"]);
        assert_eq!(canonicalize(&raw).unwrap(), canonicalize(&raw).unwrap());
    }
}
