//! Upload validation and derivative generation
//!
//! This crate holds the filesystem side of the pipeline:
//! - upload constraint checks (validator)
//! - temporary-file receiving (receiver)
//! - cover-fit resizing and encoding (fit, encode)
//! - the derivative generator (generator)
//! - the age-based retention sweep (retention)

pub mod encode;
pub mod fit;
pub mod generator;
pub mod receiver;
pub mod retention;
pub mod validator;

pub use generator::{DerivativeGenerator, GeneratorError};
pub use receiver::{ReceiverError, StoredUpload, TempStore};
pub use retention::{sweep, SweepError, SweepStats};
pub use validator::{UploadValidator, ValidationError};
