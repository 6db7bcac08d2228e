use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::UploadDir,
    error::ErrorEnvelope,
    protocol::{
        EurofinsExportRequest, HealthResponse, HelperLogsResponse, LogsResponse, OptionsResponse,
        PreviewResponse, RegisterRequest, RegisterResponse, ResultRecord, ResultsResponse, Row,
        RunRequest, RunResponse, SelectOption, UploadResponse, UsersResponse,
    },
};
use tracing::debug;
use url::Url;

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod render;
pub mod tracker;

pub use controller::{
    AlignerController, ControllerEvent, ControllerOptions, ControllerSnapshot, HelperLogView,
    LogPanel, PollPurpose, RunOutcome, RunPhase, StatusMessage, StatusSeverity, Tab,
};
pub use error::{AlignerError, AlignerResult, ValidationError};
pub use export::Download;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A file picked for upload, already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> AlignerResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AlignerError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        Ok(Self { filename, bytes })
    }

    pub async fn from_paths(paths: &[PathBuf]) -> AlignerResult<Vec<Self>> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(Self::from_path(path).await?);
        }
        Ok(files)
    }

    fn to_part(&self) -> Part {
        Part::bytes(self.bytes.clone()).file_name(self.filename.clone())
    }
}

/// Every endpoint the aligner server exposes to its client.
#[async_trait]
pub trait AlignerApi: Send + Sync {
    async fn upload(&self, files: &[UploadFile]) -> AlignerResult<UploadResponse>;
    async fn run(&self, upload_dir: &UploadDir) -> AlignerResult<RunResponse>;
    async fn logs(&self) -> AlignerResult<Vec<String>>;
    async fn results(&self) -> AlignerResult<Vec<ResultRecord>>;
    async fn users(&self) -> AlignerResult<Vec<SelectOption>>;
    async fn direction_options(&self) -> AlignerResult<Vec<SelectOption>>;
    async fn preview_primers(&self, file: &UploadFile) -> AlignerResult<Vec<Row>>;
    async fn register_primers(&self, request: &RegisterRequest) -> AlignerResult<Vec<Row>>;
    async fn export_eurofins(&self, rows: &[Row]) -> AlignerResult<Vec<u8>>;
    async fn helper_logs(&self, tail: u32) -> AlignerResult<Vec<String>>;
    async fn health(&self) -> AlignerResult<HealthResponse>;
}

pub struct HttpAlignerClient {
    http: Client,
    base_url: Url,
}

impl HttpAlignerClient {
    pub fn new(server_url: &str) -> AlignerResult<Arc<Self>> {
        Self::with_timeout(server_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(server_url: &str, timeout: Duration) -> AlignerResult<Arc<Self>> {
        let base_url = normalize_base_url(server_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Arc::new(Self { http, base_url }))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> AlignerResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| AlignerError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }
}

fn normalize_base_url(server_url: &str) -> AlignerResult<Url> {
    let trimmed = server_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| AlignerError::InvalidUrl {
        url: trimmed.to_string(),
        source,
    })
}

/// Decodes a JSON body from a successful response; a non-OK status becomes
/// [`AlignerError::Server`] carrying the envelope's `error` text when present.
async fn read_json<T: DeserializeOwned>(response: Response) -> AlignerResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(AlignerError::server(
            status.as_u16(),
            ErrorEnvelope::message_from_body(&body),
        ));
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Upload and run answer with `{success: false, error}` bodies on 4xx, so the
/// body is decoded whatever the status is.
async fn read_json_any_status<T: DeserializeOwned>(response: Response) -> AlignerResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    match serde_json::from_slice(&body) {
        Ok(decoded) => Ok(decoded),
        Err(_) if !status.is_success() => Err(AlignerError::server(
            status.as_u16(),
            ErrorEnvelope::message_from_body(&body),
        )),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl AlignerApi for HttpAlignerClient {
    async fn upload(&self, files: &[UploadFile]) -> AlignerResult<UploadResponse> {
        let form = files
            .iter()
            .fold(Form::new(), |form, file| form.part("files", file.to_part()));
        debug!(files = files.len(), "uploading alignment inputs");
        let response = self
            .http
            .post(self.endpoint("api/upload")?)
            .multipart(form)
            .send()
            .await?;
        read_json_any_status(response).await
    }

    async fn run(&self, upload_dir: &UploadDir) -> AlignerResult<RunResponse> {
        let response = self
            .http
            .post(self.endpoint("api/run")?)
            .json(&RunRequest {
                upload_dir: upload_dir.clone(),
            })
            .send()
            .await?;
        read_json_any_status(response).await
    }

    async fn logs(&self) -> AlignerResult<Vec<String>> {
        let response = self.http.get(self.endpoint("api/logs")?).send().await?;
        let body: LogsResponse = read_json(response).await?;
        Ok(body.logs)
    }

    async fn results(&self) -> AlignerResult<Vec<ResultRecord>> {
        let response = self.http.get(self.endpoint("api/results")?).send().await?;
        let body: ResultsResponse = read_json(response).await?;
        Ok(body.results)
    }

    async fn users(&self) -> AlignerResult<Vec<SelectOption>> {
        let response = self.http.get(self.endpoint("api/users")?).send().await?;
        let body: UsersResponse = read_json(response).await?;
        Ok(body.users)
    }

    async fn direction_options(&self) -> AlignerResult<Vec<SelectOption>> {
        let response = self
            .http
            .get(self.endpoint("api/dropdown/options")?)
            .send()
            .await?;
        let body: OptionsResponse = read_json(response).await?;
        Ok(body.options)
    }

    async fn preview_primers(&self, file: &UploadFile) -> AlignerResult<Vec<Row>> {
        let form = Form::new().part("file", file.to_part());
        let response = self
            .http
            .post(self.endpoint("api/primer/preview")?)
            .multipart(form)
            .send()
            .await?;
        let body: PreviewResponse = read_json(response).await?;
        Ok(body.rows)
    }

    async fn register_primers(&self, request: &RegisterRequest) -> AlignerResult<Vec<Row>> {
        let response = self
            .http
            .post(self.endpoint("api/primer/register")?)
            .json(request)
            .send()
            .await?;
        let body: RegisterResponse = read_json(response).await?;
        Ok(body.results)
    }

    async fn export_eurofins(&self, rows: &[Row]) -> AlignerResult<Vec<u8>> {
        let response = self
            .http
            .post(self.endpoint("api/primer/eurofins")?)
            .json(&EurofinsExportRequest {
                rows: rows.to_vec(),
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(AlignerError::server(
                status.as_u16(),
                ErrorEnvelope::message_from_body(&body),
            ));
        }
        Ok(body.to_vec())
    }

    async fn helper_logs(&self, tail: u32) -> AlignerResult<Vec<String>> {
        let response = self
            .http
            .get(self.endpoint("api/benchling-helper/logs")?)
            .query(&[("tail", tail)])
            .send()
            .await?;
        let body: HelperLogsResponse = read_json(response).await?;
        Ok(body.lines)
    }

    async fn health(&self) -> AlignerResult<HealthResponse> {
        let response = self.http.get(self.endpoint("health")?).send().await?;
        read_json(response).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
