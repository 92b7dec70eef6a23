//! Google Drive API facade for service-account file management.

use std::path::Path;

use futures::StreamExt;
use reqwest::header::{LOCATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::redirect;
use reqwest::{Body, Client, Response};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::links;
use crate::models::{
    About, ApiErrorResponse, DownloadDetails, DownloadLinkOutcome, DriveFile, FileListResponse,
    Quota,
};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// User agent sent on media requests and echoed in download details.
const CLIENT_USER_AGENT: &str = concat!("drive_helper/", env!("CARGO_PKG_VERSION"));

/// Value for the X-Goog-Api-Client diagnostic header.
const API_CLIENT: &str = concat!("gl-rust drive_helper/", env!("CARGO_PKG_VERSION"));

const API_CLIENT_HEADER: &str = "X-Goog-Api-Client";

/// Client for Google Drive file management on behalf of a service account.
///
/// Every operation is a thin wrapper over a Drive v3 endpoint; no state is
/// held between calls beyond the authenticator's token cache.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    // Media probing needs the first redirect surfaced, not followed.
    no_redirect: Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    /// Create a client against the production Drive endpoints.
    pub fn new(auth: Authenticator) -> Self {
        Self::with_endpoints(auth, DRIVE_API_BASE, UPLOAD_API_BASE)
    }

    /// Create a client with overridden API endpoints.
    pub fn with_endpoints(
        auth: Authenticator,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            http: Client::new(),
            no_redirect: Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .expect("failed to build HTTP client"),
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }

    /// Fetch the storage quota snapshot.
    ///
    /// The usage percent is derived with fixed 3-decimal formatting; a zero
    /// or unreported limit yields [`DriveError::ZeroQuotaLimit`].
    pub async fn quota(&self) -> Result<Quota> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(format!("{}/about", self.api_base))
            .bearer_auth(&token)
            .query(&[("fields", "user,storageQuota")])
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let about: About = response.json().await?;

        let limit = parse_quota_field(about.storage_quota.limit.as_deref());
        let usage = parse_quota_field(about.storage_quota.usage.as_deref());
        Quota::new(limit, usage)
    }

    /// List one page of files.
    ///
    /// Pages are 1-based. Page 1 lists directly; for page N the continuation
    /// token chain is re-walked from the start to discover page N's token, so
    /// requesting a page cold always succeeds at O(N) list calls.
    pub async fn list_files(&self, page: u32, size: u32) -> Result<Vec<DriveFile>> {
        if page <= 1 {
            self.retrieve_files("", size).await
        } else {
            let page_token = self.page_token(page, size).await?;
            self.retrieve_files(&page_token, size).await
        }
    }

    /// Walk the token chain from page 1 to discover the token for `page`.
    async fn page_token(&self, page: u32, size: u32) -> Result<String> {
        let token = self.auth.access_token().await?;
        let page_size = size.to_string();
        let mut page_token = String::new();

        for _ in 1..page {
            let response = self
                .http
                .get(format!("{}/files", self.api_base))
                .bearer_auth(&token)
                .query(&[
                    ("pageSize", page_size.as_str()),
                    ("pageToken", page_token.as_str()),
                    ("fields", "nextPageToken"),
                ])
                .send()
                .await?;

            let response = error_for_status(response).await?;
            let list: FileListResponse = response.json().await?;
            // A chain that ends early falls back to the empty token.
            page_token = list.next_page_token.unwrap_or_default();
        }

        Ok(page_token)
    }

    /// Issue the data listing call for a known continuation token.
    async fn retrieve_files(&self, page_token: &str, size: u32) -> Result<Vec<DriveFile>> {
        let token = self.auth.access_token().await?;
        let page_size = size.to_string();

        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[
                ("pageSize", page_size.as_str()),
                ("pageToken", page_token),
                ("fields", "files(id, name, size, mimeType)"),
            ])
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let list: FileListResponse = response.json().await?;
        Ok(list.files)
    }

    /// Get a file's projected metadata by ID.
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("fields", "id, name, size, mimeType, webViewLink")])
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let file: DriveFile = response.json().await?;
        Ok(file)
    }

    /// Delete a single file by ID.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .send()
            .await?;

        error_for_status(response).await?;
        Ok(())
    }

    /// Delete every file visible to the service account, sequentially.
    ///
    /// Aborts on the first deletion error; files after the failure point are
    /// left undeleted. Returns the number of files deleted.
    pub async fn delete_all_files(&self) -> Result<usize> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("fields", "files(id, name)")])
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let list: FileListResponse = response.json().await?;

        let mut deleted = 0;
        for file in &list.files {
            self.delete_file(&file.id).await?;
            debug!(id = %file.id, name = %file.name, "deleted file");
            deleted += 1;
        }

        info!(deleted, "bulk delete finished");
        Ok(deleted)
    }

    /// Upload a local file as a new Drive file.
    ///
    /// When `mime_type` is `None` it is guessed from the path, falling back
    /// to octet-stream. An unreadable path is a returned error.
    pub async fn upload_file<P: AsRef<Path>>(
        &self,
        local_path: P,
        name: &str,
        description: &str,
        mime_type: Option<&str>,
    ) -> Result<DriveFile> {
        let local_path = local_path.as_ref();
        let content = tokio::fs::read(local_path).await?;

        let mime = match mime_type {
            Some(m) => m.to_string(),
            None => mime_guess::from_path(local_path)
                .first_or_octet_stream()
                .to_string(),
        };

        let file_part = Part::bytes(content)
            .file_name(name.to_string())
            .mime_str(&mime)?;

        self.upload_multipart(name, description, &mime, file_part)
            .await
    }

    /// Upload from any async byte stream as a new Drive file.
    pub async fn upload_from_stream<R>(
        &self,
        name: &str,
        description: &str,
        mime_type: &str,
        reader: R,
    ) -> Result<DriveFile>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        let body = Body::wrap_stream(ReaderStream::new(reader));
        let file_part = Part::stream(body)
            .file_name(name.to_string())
            .mime_str(mime_type)?;

        self.upload_multipart(name, description, mime_type, file_part)
            .await
    }

    /// Shared multipart create call for both upload variants.
    async fn upload_multipart(
        &self,
        name: &str,
        description: &str,
        mime_type: &str,
        file_part: Part,
    ) -> Result<DriveFile> {
        let token = self.auth.access_token().await?;

        let metadata = serde_json::json!({
            "name": name,
            "description": description,
            "mimeType": mime_type,
        });

        let metadata_part = Part::text(metadata.to_string()).mime_str("application/json")?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id, name, size, mimeType, webViewLink"),
            ])
            .multipart(form)
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let file: DriveFile = response.json().await?;
        Ok(file)
    }

    /// Direct media URL carrying a fresh access token as a query parameter.
    pub async fn direct_download_url(&self, file_id: &str) -> Result<String> {
        let token = self.auth.access_token().await?;
        Ok(self.media_url(file_id, &token))
    }

    fn media_url(&self, file_id: &str, access_token: &str) -> String {
        format!(
            "{}/files/{}?alt=media&prettyPrint=false&access_token={}",
            self.api_base, file_id, access_token
        )
    }

    /// Probe the direct media URL with redirects suppressed.
    ///
    /// The provider answers the media URL with a redirect to a short-lived
    /// signed URL; that redirect is the expected outcome here, so it is
    /// reported as a tagged [`DownloadLinkOutcome`] rather than an error.
    pub async fn probe_download_redirect(&self, file_id: &str) -> Result<DownloadLinkOutcome> {
        let token = self.auth.access_token().await?;
        let url = self.media_url(file_id, &token);

        let response = self
            .no_redirect
            .head(&url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(API_CLIENT_HEADER, API_CLIENT)
            .send()
            .await?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(DriveError::MissingRedirectLocation)?
                .to_string();
            debug!(%location, "media URL redirected to signed download URL");
            return Ok(DownloadLinkOutcome::Redirected { location });
        }

        let message = response.text().await.unwrap_or_default();
        Ok(DownloadLinkOutcome::Failed {
            status: status.as_u16(),
            message,
        })
    }

    /// Resolve the short-lived signed download URL for a file.
    ///
    /// Returns the redirect target verbatim, along with the bearer token and
    /// the diagnostic headers the probe request carried.
    pub async fn resolve_download(&self, file_id: &str) -> Result<DownloadDetails> {
        let token = self.auth.access_token().await?;

        match self.probe_download_redirect(file_id).await? {
            DownloadLinkOutcome::Redirected { location } => Ok(DownloadDetails {
                link: location,
                token,
                user_agent: CLIENT_USER_AGENT.to_string(),
                x_api_client: API_CLIENT.to_string(),
            }),
            DownloadLinkOutcome::Failed { status, message } => {
                Err(DriveError::ApiError { status, message })
            }
        }
    }

    /// Grant "anyone with the link: reader" on a file and return its
    /// metadata together with the canonical viewer URL.
    pub async fn sharable_link(&self, file_id: &str) -> Result<(DriveFile, String)> {
        let token = self.auth.access_token().await?;

        let permission = serde_json::json!({
            "type": "anyone",
            "role": "reader",
        });

        let response = self
            .http
            .post(format!("{}/files/{}/permissions", self.api_base, file_id))
            .bearer_auth(&token)
            .json(&permission)
            .send()
            .await?;

        error_for_status(response).await?;

        let file = self.get_file(file_id).await?;
        Ok((file, links::file_view_url(file_id)))
    }

    /// Download a file's content to a local path.
    ///
    /// # Arguments
    /// * `file_id` - The ID of the file to download
    /// * `destination` - The local path to save the file (file or directory)
    pub async fn download_to_path<P: AsRef<Path>>(
        &self,
        file_id: &str,
        destination: P,
    ) -> Result<DriveFile> {
        let token = self.auth.access_token().await?;
        let destination = destination.as_ref();

        let metadata = self.get_file(file_id).await?;

        let final_path = if destination.is_dir() {
            destination.join(&metadata.name)
        } else {
            destination.to_path_buf()
        };

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("alt", "media")])
            .send()
            .await?;

        let response = error_for_status(response).await?;

        let mut file = File::create(&final_path).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        Ok(metadata)
    }
}

/// Map non-success responses to `DriveError::ApiError`, preferring the
/// structured Google error envelope when the body parses as one.
async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
        return Err(DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }
    Err(DriveError::ApiError {
        status: status.as_u16(),
        message: body,
    })
}

fn parse_quota_field(value: Option<&str>) -> i64 {
    value.and_then(|s| s.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    // HTTP-level tests are in tests/client_test.rs against a mock server.
    use super::parse_quota_field;

    #[test]
    fn test_parse_quota_field() {
        assert_eq!(parse_quota_field(Some("1024")), 1024);
        assert_eq!(parse_quota_field(Some("junk")), 0);
        assert_eq!(parse_quota_field(None), 0);
    }
}
