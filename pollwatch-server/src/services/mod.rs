//! Server-side services

pub mod exif_dates;
pub mod media_store;

pub use media_store::{MediaStore, MAX_UPLOAD_BYTES};
