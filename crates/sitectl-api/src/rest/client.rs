// REST API HTTP client
//
// Resource-oriented JSON endpoints under `/sites/`, `/content/` and
// `/documents/`. Credentials are attached to every request directly; the
// relay is not involved. Long-running operations answer `202 Accepted`
// with a `Location` job URL, which `JobPoller` can follow through the
// `JobStatusSource` impl below.

use bytes::Bytes;
use reqwest::header::LOCATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::ServerAuth;
use crate::error::Error;
use crate::poller::{JobReport, JobStatusSource, PollConfig, Submission};
use crate::rest::types::{ApiErrorBody, RestJob};
use crate::transport::TransportConfig;

/// Async client for the REST management APIs.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    auth: ServerAuth,
    poll: PollConfig,
}

impl RestClient {
    // ── Constructors ─────────────────────────────────────────────────

    pub fn new(base_url: Url, auth: ServerAuth, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
            auth,
            poll: PollConfig::job_default(),
        })
    }

    /// Replace the poll policy used for `202 Accepted` jobs.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Resolve an absolute API path (`/sites/...`) against the server root.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.auth.apply(self.http.get(url)).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .auth
            .apply(self.http.get(url).query(params))
            .send()
            .await?;
        handle_response(resp).await
    }

    /// GET that maps `404 Not Found` to `None`.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, Error> {
        match self.get_with_params(path, params).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn get_bytes(&self, path: &str) -> Result<Bytes, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.auth.apply(self.http.get(url)).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.bytes().await?)
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.auth.apply(self.http.post(url).json(body)).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url} (multipart)");

        let resp = self
            .auth
            .apply(self.http.post(url).multipart(form))
            .send()
            .await?;
        handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.auth.apply(self.http.put(url).json(body)).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        self.delete_with_params(path, &[]).await
    }

    pub(crate) async fn delete_with_params(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url} params={params:?}");

        let resp = self
            .auth
            .apply(self.http.delete(url).query(params))
            .send()
            .await?;
        handle_empty(resp).await
    }

    pub(crate) async fn delete_with_response<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url} params={params:?}");

        let resp = self
            .auth
            .apply(self.http.delete(url).query(params))
            .send()
            .await?;
        handle_response(resp).await
    }

    // ── Asynchronous operations ──────────────────────────────────────

    /// POST an operation that may run as a job. A `202` with a `Location`
    /// header yields the job URL; any other success is synchronous.
    pub(crate) async fn post_operation<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Submission, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.auth.apply(self.http.post(url).json(body)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }
        if status != reqwest::StatusCode::ACCEPTED {
            return Ok(Submission::default());
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        match location {
            Some(location) => Ok(Submission {
                job_id: Some(self.base_url.join(&location)?.to_string()),
            }),
            None => Ok(Submission::default()),
        }
    }

    async fn fetch_job(&self, job_url: &str) -> Result<RestJob, Error> {
        let url = Url::parse(job_url)?;
        debug!("GET {url}");

        let resp = self.auth.apply(self.http.get(url)).send().await?;
        handle_response(resp).await
    }
}

/// Job ids for REST jobs are the absolute status URLs from `Location`.
impl JobStatusSource for RestClient {
    async fn job_status(&self, job_id: &str) -> Result<JobReport, Error> {
        let job = self.fetch_job(job_id).await?;
        Ok(job.report())
    }

    async fn job_diagnostics(&self, job_id: &str) -> Result<Option<String>, Error> {
        let job = self.fetch_job(job_id).await?;
        Ok(job.error.and_then(|e| e.detail.or(e.title)))
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(parse_error(status, resp).await);
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Authentication {
            message: format!("server rejected credentials (HTTP {status})"),
        };
    }

    let message = serde_json::from_str::<ApiErrorBody>(&raw)
        .ok()
        .and_then(|body| body.detail.or(body.title))
        .unwrap_or_else(|| {
            if raw.is_empty() {
                status.to_string()
            } else {
                raw
            }
        });
    Error::Rest {
        status: status.as_u16(),
        message,
    }
}
