use crate::error::AppError;
use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use log::info;
use serde_json::json;

/// Unknown jobs are 404; a job that already finished answers
/// `{"cancelled": false}`.
pub(crate) async fn process(job_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    if state.status(&job_id).await.is_none() {
        return AppError::NotFound("Job").error_response();
    }
    let cancelled = state.cancel(&job_id).await;
    if cancelled {
        info!("Job {} cancellation requested", job_id);
    }
    HttpResponse::Ok().json(json!({ "cancelled": cancelled }))
}
