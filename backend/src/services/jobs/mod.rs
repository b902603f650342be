//! # Job Service Module
//!
//! *   **`GET /api/jobs/{job_id}`** (`status`): current `JobStatus` of a
//!     background generation.
//! *   **`POST /api/jobs/{job_id}/cancel`** (`cancel`): asks a running job to
//!     stop before its next row. Contacts already stored are kept.

mod cancel;
mod status;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/jobs";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{job_id}", get().to(status::process))
        .route("/{job_id}/cancel", post().to(cancel::process))
}
