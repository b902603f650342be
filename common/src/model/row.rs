use indexmap::IndexMap;

/// One parsed data row: column header -> raw cell text, in source column order.
///
/// Inserting a header that already exists keeps its original position and
/// replaces the value, so a later duplicate column wins.
pub type Row = IndexMap<String, String>;
