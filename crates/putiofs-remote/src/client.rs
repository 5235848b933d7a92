//! put.io v2 REST client.
//!
//! The filesystem calls the store synchronously from kernel dispatch threads,
//! so each [`RemoteStore`] method drives an async `reqwest` request to
//! completion on a tokio runtime through its [`Handle`]. Those threads must
//! not themselves be runtime workers.
//!
//! Two HTTP clients are kept. API calls carry a whole-request timeout.
//! Content transfers can legitimately run for hours, so they are only bounded
//! by how long the connection may sit idle.

use crate::account::AccountInfo;
use crate::body::BodyReader;
use crate::entry::{Entry, EntryId};
use crate::error::{RemoteError, Result};
use crate::store::{range_header, ByteStream, RemoteStore};
use crate::transfer::Transfer;
use reqwest::header::RANGE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::fs::File;
use std::io::Seek;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.put.io/v2";
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.put.io/v2/files/upload";
pub const DEFAULT_USER_AGENT: &str = "putiofs - FUSE bridge to Put.io";

/// Connection settings for [`PutioClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// Endpoint accepting multipart uploads.
    pub upload_url: String,
    /// Personal access token.
    pub token: String,
    /// Sent with every request.
    pub user_agent: String,
    /// Whole-request limit for JSON API calls.
    pub request_timeout: Duration,
    /// Limit on establishing any connection.
    pub connect_timeout: Duration,
    /// Longest a download or upload may go without moving a byte.
    pub read_timeout: Duration,
    /// Ask for download URLs routed through the store's tunnel servers.
    pub use_tunnel: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            token: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(60 * 60),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(5 * 60),
            use_tunnel: true,
        }
    }
}

impl ClientConfig {
    /// Default settings authenticated with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    files: Vec<Entry>,
}

#[derive(Deserialize)]
struct FileResponse {
    file: Entry,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    file: Option<Entry>,
}

#[derive(Deserialize)]
struct UrlResponse {
    url: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    info: AccountInfo,
}

#[derive(Deserialize)]
struct TransfersResponse {
    #[serde(default)]
    transfers: Vec<Transfer>,
}

/// [`RemoteStore`] backed by the put.io REST API.
pub struct PutioClient {
    api: reqwest::Client,
    transfer: reqwest::Client,
    config: ClientConfig,
    runtime: Handle,
}

impl PutioClient {
    /// Builds both HTTP clients; requests are driven on `runtime`.
    pub fn new(config: ClientConfig, runtime: Handle) -> Result<Self> {
        let api = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        let transfer = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;
        Ok(Self {
            api,
            transfer,
            config,
            runtime,
        })
    }

    /// Settings the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.config.token)
    }

    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = endpoint(&self.config.api_url, path);
        let resp = self
            .authorized(self.api.get(url).query(query))
            .send()
            .await?;
        decode(resp).await
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &[(&str, String)]) -> Result<T> {
        let url = endpoint(&self.config.api_url, path);
        let resp = self
            .authorized(self.api.post(url).form(form))
            .send()
            .await?;
        decode(resp).await
    }

    async fn post_multipart(&self, form: Form) -> Result<UploadResponse> {
        let resp = self
            .authorized(self.transfer.post(&self.config.upload_url).multipart(form))
            .send()
            .await?;
        decode(resp).await
    }

    async fn open_range(&self, id: EntryId, offset: u64, length: Option<u64>) -> Result<Response> {
        let link: UrlResponse = self
            .get_json(
                &format!("files/{}/url", id),
                &[("use_tunnel", self.config.use_tunnel.to_string())],
            )
            .await?;

        let range = range_header(offset, length);
        debug!(id, offset, range = %range, "download request");

        let resp = self.transfer.get(&link.url).header(RANGE, range).send().await?;
        let status = resp.status();
        debug!(id, offset, status = status.as_u16(), "download response");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

impl RemoteStore for PutioClient {
    fn list(&self, parent_id: EntryId) -> Result<Vec<Entry>> {
        let resp: ListResponse =
            self.block_on(self.get_json("files/list", &[("parent_id", parent_id.to_string())]))?;
        Ok(resp.files)
    }

    fn get(&self, id: EntryId) -> Result<Entry> {
        let resp: FileResponse = self.block_on(self.get_json(&format!("files/{}", id), &[]))?;
        Ok(resp.file)
    }

    fn delete(&self, id: EntryId) -> Result<()> {
        let _: serde_json::Value =
            self.block_on(self.post_form("files/delete", &[("file_ids", id.to_string())]))?;
        Ok(())
    }

    fn rename(&self, id: EntryId, new_name: &str) -> Result<()> {
        let _: serde_json::Value = self.block_on(self.post_form(
            "files/rename",
            &[("file_id", id.to_string()), ("name", new_name.to_string())],
        ))?;
        Ok(())
    }

    fn move_entry(&self, new_parent_id: EntryId, id: EntryId) -> Result<()> {
        let _: serde_json::Value = self.block_on(self.post_form(
            "files/move",
            &[
                ("file_ids", id.to_string()),
                ("parent_id", new_parent_id.to_string()),
            ],
        ))?;
        Ok(())
    }

    fn create_folder(&self, name: &str, parent_id: EntryId) -> Result<Entry> {
        let resp: FileResponse = self.block_on(self.post_form(
            "files/create-folder",
            &[("name", name.to_string()), ("parent_id", parent_id.to_string())],
        ))?;
        Ok(resp.file)
    }

    fn upload(&self, mut source: File, name: &str, parent_id: EntryId) -> Result<Entry> {
        let start = source.stream_position()?;
        let len = source.metadata()?.len().saturating_sub(start);
        debug!(name, parent_id, bytes = len, "upload request");

        let body = reqwest::Body::from(tokio::fs::File::from_std(source));
        let form = Form::new()
            .text("parent_id", parent_id.to_string())
            .text("filename", name.to_string())
            .part("file", Part::stream_with_length(body, len).file_name(name.to_string()));

        let resp = self.block_on(self.post_multipart(form))?;
        resp.file.ok_or(RemoteError::MissingFile)
    }

    fn download_range(&self, id: EntryId, offset: u64, length: Option<u64>) -> Result<ByteStream> {
        let resp = self.block_on(self.open_range(id, offset, length))?;
        Ok(Box::new(BodyReader::new(resp, self.runtime.clone())))
    }

    fn account_info(&self) -> Result<AccountInfo> {
        let resp: AccountResponse = self.block_on(self.get_json("account/info", &[]))?;
        Ok(resp.info)
    }

    fn list_transfers(&self) -> Result<Vec<Transfer>> {
        let resp: TransfersResponse = self.block_on(self.get_json("transfers/list", &[]))?;
        Ok(resp.transfers)
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status().as_u16();
    let body = resp.text().await?;
    decode_body(status, &body)
}

fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    if !(200..300).contains(&status) {
        return Err(RemoteError::Status {
            status,
            body: body.to_string(),
        });
    }
    Ok(serde_json::from_str(body)?)
}
