use crate::model::contact::ContactField;
use serde::{Deserialize, Serialize};

/// User-declared association from canonical contact field to source column.
///
/// Unmapped fields are `None`; the normalizer turns them into empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl FieldMapping {
    /// Source column mapped to `field`, if any.
    pub fn column(&self, field: ContactField) -> Option<&str> {
        let column = match field {
            ContactField::Name => &self.name,
            ContactField::Email => &self.email,
            ContactField::Phone => &self.phone,
            ContactField::Phone2 => &self.phone2,
            ContactField::Company => &self.company,
            ContactField::Position => &self.position,
            ContactField::Website => &self.website,
        };
        column.as_deref()
    }

    /// True when no field is mapped to any column.
    pub fn is_empty(&self) -> bool {
        ContactField::ALL.iter().all(|f| self.column(*f).is_none())
    }
}
