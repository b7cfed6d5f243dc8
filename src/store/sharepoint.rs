//! SharePoint document library over the REST API (`/_api/web`).
//!
//! Server-relative paths such as `/sites/team/Shared Documents/2023` are passed
//! through `@p` query aliases so quoting and percent-encoding are handled in one
//! place. Throttled and transient responses are retried here, never by callers.

use std::env;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::SharePointSettings;
use crate::error::StoreError;
use crate::path;
use crate::store::RemoteStore;

const ODATA_JSON: &str = "application/json;odata=nometadata";
const MAX_RETRY_AFTER_SECS: u64 = 60;

#[derive(Deserialize)]
struct Listing {
    value: Vec<NamedItem>,
}

#[derive(Deserialize)]
struct NamedItem {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Deserialize)]
struct Flag {
    value: bool,
}

pub struct SharePointStore {
    client: Client,
    site_url: Url,
    token: String,
    max_retries: u32,
}

impl SharePointStore {
    pub fn new(
        site_url: &str,
        token: String,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let site_url = Url::parse(site_url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidPath(format!("{}: {}", site_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Backend(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            site_url,
            token,
            max_retries,
        })
    }

    /// Read the bearer token from the environment variable named in `settings`.
    pub fn from_settings(settings: &SharePointSettings) -> Result<Self, StoreError> {
        let token = env::var(&settings.token_env).map_err(|_| {
            StoreError::PermissionDenied(format!(
                "environment variable '{}' not set (required for SharePoint authentication)",
                settings.token_env
            ))
        })?;
        Self::new(
            &settings.site_url,
            token,
            settings.max_retries,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// Build `{site}/_api/{function}` with `@p` bound to `target` and extra query pairs.
    fn endpoint(
        &self,
        function: &str,
        target: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Url {
        let mut url = self.site_url.clone();
        let base = self.site_url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/_api/{}", base, function));
        {
            let mut query = url.query_pairs_mut();
            if let Some(target) = target {
                query.append_pair("@p", &quoted(target));
            }
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        url
    }

    fn absolute(&self, server_relative: &str) -> String {
        format!("{}{}", self.site_url.origin().ascii_serialization(), server_relative)
    }

    /// Send with bearer auth, retrying throttled and transient failures.
    fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, StoreError> {
        let mut attempt = 0;
        loop {
            let result = build()
                .bearer_auth(&self.token)
                .header(ACCEPT, ODATA_JSON)
                .send();

            match result {
                Ok(response) if is_retryable(response.status()) && attempt < self.max_retries => {
                    let delay = retry_after(&response).unwrap_or_else(|| backoff(attempt));
                    warn!(
                        status = %response.status(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "SharePoint throttled the request, retrying"
                    );
                    thread::sleep(delay);
                }
                Ok(response) => return Ok(response),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    let delay = backoff(attempt);
                    warn!(error = %e, attempt = attempt + 1, "SharePoint request failed, retrying");
                    thread::sleep(delay);
                }
                Err(e) => return Err(StoreError::TransientNetwork(e.to_string())),
            }
            attempt += 1;
        }
    }

    fn checked(&self, response: Response, target: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(classify(status, target, &body))
    }

    fn list(&self, target: &str, collection: &str) -> Result<Vec<String>, StoreError> {
        let url = self.endpoint(
            &format!("web/GetFolderByServerRelativePath(decodedurl=@p)/{}", collection),
            Some(target),
            &[("$select", "Name")],
        );
        debug!(%url, "listing");
        let response = self.send(|| self.client.get(url.clone()))?;
        let listing: Listing = self
            .checked(response, target)?
            .json()
            .map_err(|e| StoreError::Backend(format!("unreadable listing for {}: {}", target, e)))?;
        Ok(listing.value.into_iter().map(|item| item.name).collect())
    }

    fn delete(&self, function: &str, target: &str) -> Result<(), StoreError> {
        let url = self.endpoint(function, Some(target), &[]);
        let response = self.send(|| {
            self.client
                .post(url.clone())
                .header("X-HTTP-Method", "DELETE")
                .header("IF-MATCH", "*")
        })?;
        if function.contains("Folder") && is_folder_conflict(response.status()) {
            return Err(StoreError::NonEmptyDirectory(target.to_string()));
        }
        self.checked(response, target)?;
        Ok(())
    }

    fn post(&self, url: Url, body: Option<serde_json::Value>, target: &str) -> Result<(), StoreError> {
        let response = self.send(|| {
            let request = self.client.post(url.clone());
            match &body {
                Some(body) => request.json(body),
                None => request,
            }
        })?;
        self.checked(response, target)?;
        Ok(())
    }
}

/// Statuses SharePoint answers with when a folder still has children or is checked out.
fn is_folder_conflict(status: StatusCode) -> bool {
    matches!(status, StatusCode::CONFLICT | StatusCode::LOCKED)
}

impl RemoteStore for SharePointStore {
    fn list_subfolders(&self, target: &str) -> Result<Vec<String>, StoreError> {
        self.list(target, "Folders")
    }

    fn list_files(&self, target: &str) -> Result<Vec<String>, StoreError> {
        self.list(target, "Files")
    }

    fn delete_file(&self, target: &str) -> Result<(), StoreError> {
        self.delete("web/GetFileByServerRelativePath(decodedurl=@p)", target)
    }

    fn delete_folder(&self, target: &str) -> Result<(), StoreError> {
        // SharePoint removes folders recursively; keep the empty-only contract.
        if !self.list_subfolders(target)?.is_empty() || !self.list_files(target)?.is_empty() {
            return Err(StoreError::NonEmptyDirectory(target.to_string()));
        }
        self.delete("web/GetFolderByServerRelativePath(decodedurl=@p)", target)
    }

    fn folder_exists(&self, target: &str) -> Result<bool, StoreError> {
        let url = self.endpoint(
            "web/GetFolderByServerRelativePath(decodedurl=@p)/Exists",
            Some(target),
            &[],
        );
        let response = self.send(|| self.client.get(url.clone()))?;
        match self.checked(response, target) {
            Ok(response) => {
                let flag: Flag = response
                    .json()
                    .map_err(|e| StoreError::Backend(format!("unreadable response for {}: {}", target, e)))?;
                Ok(flag.value)
            }
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError> {
        path::validate_name(name)?;
        let created = path::compose(parent, name);
        let url = self.endpoint("web/folders/AddUsingPath(decodedurl=@p)", Some(&created), &[]);
        self.post(url, None, &created)
    }

    fn rename_folder(&self, target: &str, new_name: &str) -> Result<(), StoreError> {
        path::validate_name(new_name)?;
        let renamed = path::compose(&path::parent(target), new_name);
        let destination = quoted(&renamed);
        let url = self.endpoint(
            "web/GetFolderByServerRelativePath(decodedurl=@p)/MoveToUsingPath(DecodedUrl=@d)",
            Some(target),
            &[("@d", destination.as_str())],
        );
        self.post(url, None, target)
    }

    fn copy_folder(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let url = self.endpoint("SP.MoveCopyUtil.CopyFolderByPath()", None, &[]);
        let body = json!({
            "srcPath": { "DecodedUrl": self.absolute(from) },
            "destPath": { "DecodedUrl": self.absolute(to) },
            "options": { "KeepBoth": false, "ResetAuthorAndCreatedOnCopy": false, "ShouldBypassSharedLocks": true }
        });
        self.post(url, Some(body), from)
    }

    fn copy_file(&self, from: &str, to_dir: &str) -> Result<(), StoreError> {
        let url = self.endpoint("SP.MoveCopyUtil.CopyFileByPath()", None, &[("overwrite", "false")]);
        let destination = path::compose(to_dir, path::name(from));
        let body = json!({
            "srcPath": { "DecodedUrl": self.absolute(from) },
            "destPath": { "DecodedUrl": self.absolute(&destination) },
            "options": { "KeepBoth": false, "ResetAuthorAndCreatedOnCopy": false, "ShouldBypassSharedLocks": true }
        });
        self.post(url, Some(body), from)
    }

    fn describe(&self) -> String {
        format!("SharePoint site {}", self.site_url)
    }
}

/// OData string literal: single quotes doubled.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::BAD_GATEWAY
        || status == StatusCode::GATEWAY_TIMEOUT
}

fn retry_after(response: &Response) -> Option<Duration> {
    let seconds: u64 = response.headers().get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(seconds.min(MAX_RETRY_AFTER_SECS)))
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * u64::from(attempt + 1))
}

fn classify(status: StatusCode, target: &str, body: &str) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(target.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::PermissionDenied(target.to_string())
        }
        s if is_retryable(s) || s.is_server_error() => {
            StoreError::TransientNetwork(format!("{} returned {}", target, s))
        }
        s => {
            let detail: String = body.chars().take(200).collect();
            StoreError::Backend(format!("{} returned {}: {}", target, s.as_u16(), detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SharePointStore {
        SharePointStore::new(
            "https://contoso.sharepoint.com/sites/team/",
            "token".into(),
            2,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quoted("/sites/a/Bob's files"), "'/sites/a/Bob''s files'");
    }

    #[test]
    fn endpoint_binds_path_alias() {
        let url = store().endpoint(
            "web/GetFolderByServerRelativePath(decodedurl=@p)/Folders",
            Some("/sites/team/Shared Documents"),
            &[("$select", "Name")],
        );
        assert_eq!(
            url.path(),
            "/sites/team/_api/web/GetFolderByServerRelativePath(decodedurl=@p)/Folders"
        );
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("@p".to_string(), "'/sites/team/Shared Documents'".to_string()),
                ("$select".to_string(), "Name".to_string()),
            ]
        );
    }

    #[test]
    fn absolute_urls_use_site_origin() {
        assert_eq!(
            store().absolute("/sites/team/Docs/a"),
            "https://contoso.sharepoint.com/sites/team/Docs/a"
        );
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(classify(StatusCode::NOT_FOUND, "/a", "").is_not_found());
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, "/a", ""),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, "/a", ""),
            StoreError::TransientNetwork(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, "/a", "bad"),
            StoreError::Backend(m) if m.contains("400")
        ));
    }

    #[test]
    fn conflict_and_locked_block_folder_deletes() {
        assert!(is_folder_conflict(StatusCode::CONFLICT));
        assert!(is_folder_conflict(StatusCode::LOCKED));
        assert!(!is_folder_conflict(StatusCode::NOT_FOUND));
        assert!(!is_folder_conflict(StatusCode::FORBIDDEN));
    }

    #[test]
    fn backoff_grows_linearly() {
        assert_eq!(backoff(0), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_millis(1500));
    }

    #[test]
    fn rejects_unparseable_site_url() {
        assert!(matches!(
            SharePointStore::new("not a url", String::new(), 0, Duration::from_secs(1)),
            Err(StoreError::InvalidPath(_))
        ));
    }
}
