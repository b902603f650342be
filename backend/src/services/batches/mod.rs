//! # Batch Service Module
//!
//! Routes under `/api/batches/{batch_id}`:
//!
//! *   **`GET /`** (`get`): the batch with its contacts in creation order.
//! *   **`POST /mapping`** (`mapping`): stores the column mapping; the batch
//!     becomes `mapped` unless it already finished.
//! *   **`POST /generate`** (`generate`): runs generation inline and returns
//!     the report. The file may be sent again as base64 `file_data`; otherwise
//!     the rows cached at upload are used.
//! *   **`POST /generate/async`** (`generate`): same work as a background job;
//!     returns a `job_id` to poll under `/api/jobs`.
//! *   **`POST /process`** (`process`): mapping and generation in one call from
//!     the cached rows; the batch ends `completed`.
//! *   **`GET /contacts`**, **`DELETE /contacts`** (`contacts`): list or drop
//!     the batch's contacts.

mod contacts;
mod generate;
mod get;
mod mapping;
mod process;

use actix_web::web::{delete, get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/batches";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{batch_id}", get().to(get::process))
        .route("/{batch_id}/mapping", post().to(mapping::process))
        .route("/{batch_id}/generate", post().to(generate::process))
        .route("/{batch_id}/generate/async", post().to(generate::process_async))
        .route("/{batch_id}/process", post().to(process::process))
        .route("/{batch_id}/contacts", get().to(contacts::list))
        .route("/{batch_id}/contacts", delete().to(contacts::delete))
}
