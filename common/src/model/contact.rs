use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical contact fields a spreadsheet column can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Phone2,
    Company,
    Position,
    Website,
}

impl ContactField {
    pub const ALL: [ContactField; 7] = [
        ContactField::Name,
        ContactField::Email,
        ContactField::Phone,
        ContactField::Phone2,
        ContactField::Company,
        ContactField::Position,
        ContactField::Website,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::Email => "email",
            ContactField::Phone => "phone",
            ContactField::Phone2 => "phone2",
            ContactField::Company => "company",
            ContactField::Position => "position",
            ContactField::Website => "website",
        }
    }
}

/// The canonical, flat record produced from one row. Every field is a string;
/// an unmapped or missing column is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub phone2: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub website: String,
}

impl ContactFields {
    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Email => &self.email,
            ContactField::Phone => &self.phone,
            ContactField::Phone2 => &self.phone2,
            ContactField::Company => &self.company,
            ContactField::Position => &self.position,
            ContactField::Website => &self.website,
        }
    }

    pub fn set(&mut self, field: ContactField, value: String) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
            ContactField::Phone2 => &mut self.phone2,
            ContactField::Company => &mut self.company,
            ContactField::Position => &mut self.position,
            ContactField::Website => &mut self.website,
        };
        *slot = value;
    }
}

/// A persisted contact: one row's materialized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact key; also the last segment of the public URL encoded in the QR.
    pub id: String,
    pub batch_id: String,
    #[serde(flatten)]
    pub fields: ContactFields,
    pub vcard_data: String,
    /// PNG image as a `data:image/png;base64,` URL.
    pub qr_code_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to create a contact; the store assigns timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub id: String,
    pub batch_id: String,
    pub fields: ContactFields,
    pub vcard_data: String,
    pub qr_code_url: String,
}

/// Partial contact update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub phone2: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub vcard_data: Option<String>,
    #[serde(default)]
    pub qr_code_url: Option<String>,
}

impl ContactUpdate {
    fn field(&self, field: ContactField) -> Option<&String> {
        match field {
            ContactField::Name => self.name.as_ref(),
            ContactField::Email => self.email.as_ref(),
            ContactField::Phone => self.phone.as_ref(),
            ContactField::Phone2 => self.phone2.as_ref(),
            ContactField::Company => self.company.as_ref(),
            ContactField::Position => self.position.as_ref(),
            ContactField::Website => self.website.as_ref(),
        }
    }

    /// True when the update touches any canonical field, meaning a derived
    /// vCard would change.
    pub fn touches_fields(&self) -> bool {
        ContactField::ALL.iter().any(|f| self.field(*f).is_some())
    }
}

impl Contact {
    pub fn from_new(new: NewContact, now: DateTime<Utc>) -> Self {
        Contact {
            id: new.id,
            batch_id: new.batch_id,
            fields: new.fields,
            vcard_data: new.vcard_data,
            qr_code_url: new.qr_code_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `update` into this contact and stamps `updated_at`.
    pub fn apply(&mut self, update: &ContactUpdate, now: DateTime<Utc>) {
        for field in ContactField::ALL {
            if let Some(value) = update.field(field) {
                self.fields.set(field, value.clone());
            }
        }
        if let Some(vcard) = &update.vcard_data {
            self.vcard_data = vcard.clone();
        }
        if let Some(qr) = &update.qr_code_url {
            self.qr_code_url = qr.clone();
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Contact {
        let now = Utc::now();
        Contact::from_new(
            NewContact {
                id: "c-1".into(),
                batch_id: "b-1".into(),
                fields: ContactFields {
                    name: "Ada Lovelace".into(),
                    phone: "0555".into(),
                    ..ContactFields::default()
                },
                vcard_data: "BEGIN:VCARD\r\n".into(),
                qr_code_url: "data:image/png;base64,".into(),
            },
            now,
        )
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut contact = sample();
        let update = ContactUpdate {
            email: Some("ada@example.com".into()),
            ..ContactUpdate::default()
        };
        assert!(update.touches_fields());
        contact.apply(&update, Utc::now());
        assert_eq!(contact.fields.email, "ada@example.com");
        assert_eq!(contact.fields.name, "Ada Lovelace");
        assert_eq!(contact.fields.phone, "0555");
    }

    #[test]
    fn derived_only_update_does_not_touch_fields() {
        let update = ContactUpdate {
            vcard_data: Some("x".into()),
            ..ContactUpdate::default()
        };
        assert!(!update.touches_fields());
    }

    #[test]
    fn fields_are_flattened_in_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["name"], "Ada Lovelace");
        assert_eq!(json["batch_id"], "b-1");
        assert!(json.get("fields").is_none());
    }
}
