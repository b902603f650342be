pub mod batch;
pub mod contact;
pub mod format;
pub mod mapping;
pub mod row;
