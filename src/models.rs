//! Data models for Google Drive API responses.

use serde::{Deserialize, Serialize};

use crate::error::{DriveError, Result};

/// Storage quota snapshot: total capacity, bytes used, and usage percent.
#[derive(Debug, Clone, Serialize)]
pub struct Quota {
    pub limit: i64,
    pub usage: i64,
    pub percent: String,
}

impl Quota {
    /// Build a quota snapshot, deriving the usage percent with fixed
    /// 3-decimal formatting. A zero (or negative) limit is an error rather
    /// than a NaN/Inf percent.
    pub fn new(limit: i64, usage: i64) -> Result<Self> {
        if limit <= 0 {
            return Err(DriveError::ZeroQuotaLimit);
        }
        let percent = format!("{:.3}", usage as f64 * 100.0 / limit as f64);
        Ok(Self {
            limit,
            usage,
            percent,
        })
    }
}

/// Projection of a remote Drive file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

// The Drive API reports sizes as decimal strings.
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl std::fmt::Display for DriveFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_str = self
            .size
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        let mime = self.mime_type.as_deref().unwrap_or("-");
        write!(f, "{}\t{}\t{}\t{}", self.id, size_str, mime, self.name)
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Diagnostic record describing a resolved direct download.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadDetails {
    pub link: String,
    pub token: String,
    pub user_agent: String,
    pub x_api_client: String,
}

/// Outcome of probing the media URL with redirects suppressed.
///
/// A redirect is the expected success signal here; it is tagged rather than
/// routed through the error channel.
#[derive(Debug, Clone)]
pub enum DownloadLinkOutcome {
    Redirected { location: String },
    Failed { status: u16, message: String },
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// User information from the about API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email_address: Option<String>,
    pub display_name: Option<String>,
}

/// Storage quota block of the about response. Limit and usage arrive as
/// decimal strings; limit is absent for unlimited storage pools.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageQuota {
    pub limit: Option<String>,
    pub usage: Option<String>,
}

/// About response from the Drive API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct About {
    pub user: Option<User>,
    pub storage_quota: StorageQuota,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account credentials from JSON key material.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_percent_formatting() {
        let quota = Quota::new(100, 33).unwrap();
        assert_eq!(quota.percent, "33.000");

        let quota = Quota::new(3, 1).unwrap();
        assert_eq!(quota.percent, "33.333");
    }

    #[test]
    fn test_quota_zero_limit_is_error() {
        let err = Quota::new(0, 33).unwrap_err();
        assert!(matches!(err, DriveError::ZeroQuotaLimit));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_drive_file_deserialize() {
        let json = r#"{
            "id": "abc123",
            "name": "test.txt",
            "mimeType": "text/plain",
            "size": "1024"
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "abc123");
        assert_eq!(file.name, "test.txt");
        assert_eq!(file.mime_type, Some("text/plain".to_string()));
        assert_eq!(file.size, Some(1024));
    }

    #[test]
    fn test_drive_file_display() {
        let file = DriveFile {
            id: "abc123".to_string(),
            name: "test.txt".to_string(),
            size: Some(1024),
            mime_type: Some("text/plain".to_string()),
            web_view_link: None,
        };

        let display = format!("{}", file);
        assert!(display.contains("abc123"));
        assert!(display.contains("test.txt"));
        assert!(display.contains("1.00 KB"));
    }

    #[test]
    fn test_about_deserialize_without_limit() {
        let json = r#"{
            "user": {"emailAddress": "svc@example.iam.gserviceaccount.com"},
            "storageQuota": {"usage": "42"}
        }"#;

        let about: About = serde_json::from_str(json).unwrap();
        assert_eq!(about.storage_quota.limit, None);
        assert_eq!(about.storage_quota.usage, Some("42".to_string()));
    }
}
