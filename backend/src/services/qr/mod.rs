//! # QR Service Module
//!
//! `GET /api/qr/{contact_id}` and `GET /api/qr/{contact_id}/download` both
//! return the stored QR code as a PNG attachment named
//! `qr-<sanitized-name-or-key>.png`.

mod download;

use actix_web::web::{get, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/qr";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{contact_id}", get().to(download::process))
        .route("/{contact_id}/download", get().to(download::process))
}
