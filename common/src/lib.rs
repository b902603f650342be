//! Types shared between the HTTP surface and the generation pipeline.

pub mod jobs;
pub mod model;
pub mod requests;
