//! drive_helper - A helper library for Google Drive v3 file management.
//!
//! This library provides functionality to:
//! - Authenticate a service account from JSON key material
//! - Check storage quota
//! - List files with 1-based page numbers
//! - Upload files from a local path or an async stream
//! - Resolve direct/signed download links
//! - Create sharable links
//! - Bulk-delete files
//!
//! # Example
//!
//! ```no_run
//! use drive_helper::{auth::DRIVE_SCOPE, Authenticator, DriveClient};
//!
//! #[tokio::main]
//! async fn main() -> drive_helper::Result<()> {
//!     let auth = Authenticator::from_file("service-account.json", DRIVE_SCOPE)?;
//!     let client = DriveClient::new(auth);
//!
//!     let quota = client.quota().await?;
//!     println!("{} / {} ({}%)", quota.usage, quota.limit, quota.percent);
//!
//!     for file in client.list_files(1, 10).await? {
//!         println!("{}", file);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod links;
pub mod models;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use links::{extract_id, file_view_url};
pub use models::{DownloadDetails, DownloadLinkOutcome, DriveFile, Quota};
