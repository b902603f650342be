use common::model::contact::{ContactField, ContactFields};
use common::model::mapping::FieldMapping;
use common::model::row::Row;

/// Applies `mapping` to one raw row.
///
/// Unmapped fields and mapped columns missing from this row both come out as
/// the empty string. Both phone fields go through [`normalize_phone`]; the
/// website is copied verbatim.
pub fn normalize(row: &Row, mapping: &FieldMapping) -> ContactFields {
    let mut fields = ContactFields::default();
    for field in ContactField::ALL {
        let value = mapping
            .column(field)
            .and_then(|column| row.get(column))
            .cloned()
            .unwrap_or_default();
        let value = match field {
            ContactField::Phone | ContactField::Phone2 => normalize_phone(&value),
            _ => value,
        };
        fields.set(field, value);
    }
    fields
}

/// Leading-zero convention for national numbers: a non-empty value that does
/// not start with `0` gets one prepended. No other validation.
pub fn normalize_phone(value: &str) -> String {
    if value.is_empty() || value.starts_with('0') {
        value.to_string()
    } else {
        format!("0{}", value)
    }
}
