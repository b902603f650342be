//! # Contact Service Module
//!
//! *   **`GET /api/contacts`** (`list`): every contact of every batch.
//! *   **`GET /api/contacts/{contact_id}`** (`get`): the stored contact.
//! *   **`PATCH /api/contacts/{contact_id}`** (`update`): partial update. When a
//!     canonical field changes, the vCard is rebuilt from the merged fields.
//!     The QR code encodes the contact key only, so it never changes.
//! *   **`GET /api/contacts/{contact_id}/vcard`** (`vcard`): the vCard as a
//!     `.vcf` attachment.

mod get;
mod list;
mod update;
mod vcard;

use actix_web::web::{get, patch, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/contacts";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("/{contact_id}", get().to(get::process))
        .route("/{contact_id}", patch().to(update::process))
        .route("/{contact_id}/vcard", get().to(vcard::process))
}
