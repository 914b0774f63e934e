//! Extension classification and filename helpers for office document servers.
//!
//! [`file_utility::FileUtility`] is the injectable entry point;
//! [`file_utility::OfficeFileUtility`] is the table-backed implementation.

pub mod config;
pub mod error;
pub mod extensions;
pub mod file_utility;
pub mod logging;
pub mod server;
pub mod tools;

pub use error::{FileError, FileResult};
pub use extensions::{DocumentType, ExtensionClass};
pub use file_utility::{FileUtility, OfficeFileUtility};
