//! The recording upload pipeline.
//!
//! An upload flows through three stages, each in its own module:
//!
//! - [`validator`]: decides whether a multipart file part is acceptable (field name, declared
//!   content-type, running size)
//! - [`storage`]: streams accepted bytes into a temporary file and atomically moves it into the
//!   upload directory once the request is complete
//! - [`filename`]: derives the final on-disk name from the room and timestamp fields
//!
//! The HTTP handler in [`crate::api::handlers::upload`] wires the stages together.

pub mod filename;
pub mod storage;
pub mod validator;

pub use filename::{RecordingMetadata, derive_filename};
pub use storage::{LocalStorage, PendingRecording, StoredFile};
pub use validator::{SizeGauge, UploadLimits};
