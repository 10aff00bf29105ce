// IDC service HTTP client
//
// Talks to `/documents/web?IdcService=...` on a local relay. Reads are plain
// GETs the relay passes through with credentials attached; mutating
// services are POSTed as a JSON-encoded `IdcOperation` that the relay
// expands into the upstream form. Endpoint helpers live in sibling files.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::idc::models::{IdcResponse, ImportConflict};
use crate::idc::service::IdcOperation;
use crate::transport::TransportConfig;

pub(crate) const IDC_PATH: &str = "/documents/web";

/// Raw HTTP client for IDC services, addressed through a [`RelayServer`].
///
/// Handles URL construction and the `LocalData.StatusCode` envelope.
///
/// [`RelayServer`]: crate::relay::RelayServer
pub struct IdcClient {
    http: reqwest::Client,
    base_url: Url,
}

impl IdcClient {
    /// Create a client for the relay listening at `base_url`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/documents/web?IdcService={service}&{params}`
    pub(crate) fn service_url(&self, service: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self.base_url.join(IDC_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("IdcService", service);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET a read-only service and decode the envelope.
    ///
    /// A `StatusCode` other than `"0"` is an error; a missing one is not,
    /// since several read services omit it.
    pub async fn get_service(
        &self,
        service: &str,
        params: &[(&str, &str)],
    ) -> Result<IdcResponse, Error> {
        let resp: IdcResponse = self.get_json(service, params).await?;
        match resp.local_data.status_code.as_deref() {
            Some(code) if code != "0" => Err(Error::Idc {
                service: service.to_owned(),
                message: resp.local_data.failure_message(),
            }),
            _ => Ok(resp),
        }
    }

    /// GET a service whose body is not an IDC envelope (site info files).
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.service_url(service, params)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let body = read_body(service, resp).await?;
        decode(&body)
    }

    /// Submit a mutating operation through the relay.
    ///
    /// Returns the decoded envelope once `StatusCode` is `"0"`. Import
    /// conflicts reported by the server are surfaced as
    /// [`Error::ImportConflicts`].
    pub async fn submit(&self, op: &IdcOperation) -> Result<IdcResponse, Error> {
        let service = op.service();
        let url = self.service_url(service.as_ref(), &[])?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(op).send().await?;
        let body = read_body(service.as_ref(), resp).await?;
        let envelope: IdcResponse = decode(&body)?;

        if !envelope.local_data.is_success() {
            return Err(Error::Idc {
                service: service.to_string(),
                message: envelope.local_data.failure_message(),
            });
        }
        if envelope.local_data.has_import_conflicts() {
            let conflicts = envelope
                .records("ImportConflictsResultSet")
                .iter()
                .map(ImportConflict::from_record)
                .collect();
            return Err(Error::ImportConflicts(conflicts));
        }
        Ok(envelope)
    }
}

/// Read the body, mapping HTTP-level failures. IDC services put their
/// reason in `LocalData.StatusMessage` even on non-200 answers.
async fn read_body(service: &str, resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: format!("{service}: server rejected credentials (HTTP 401)"),
        });
    }
    if !status.is_success() {
        let message = serde_json::from_str::<IdcResponse>(&body)
            .ok()
            .and_then(|r| r.local_data.status_message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(Error::Idc {
            service: service.to_owned(),
            message,
        });
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}
