// Local relay server
//
// An ephemeral HTTP/1 listener on 127.0.0.1 that stands in for the content
// server during one command. Reads under `/documents/` and `/content/` are
// forwarded with the caller's credentials attached. Mutating IDC services
// arrive as a JSON `IdcOperation`, are checked against the service named in
// the query string, and go upstream as a form carrying the session token.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::pin;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use secrecy::{ExposeSecret, SecretString};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::ServerAuth;
use crate::error::Error;
use crate::idc::client::{IDC_PATH, IdcClient};
use crate::idc::service::{IdcOperation, IdcService};
use crate::transport::TransportConfig;

type RelayBody = Full<Bytes>;

/// Headers never copied back from upstream. Hop-by-hop headers belong to
/// the upstream connection, and bodies are re-framed after decompression.
const DROPPED_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "content-encoding",
    "set-cookie",
    "x-frame-options",
];

const DROPPED_PREFIX: &str = "access-control-";

/// Where the relay forwards to, and as whom.
#[derive(Debug, Clone)]
pub struct RelayUpstream {
    pub base_url: Url,
    pub auth: ServerAuth,
    pub transport: TransportConfig,
}

struct RelayState {
    http: reqwest::Client,
    upstream: Url,
    auth: ServerAuth,
    token: RwLock<Option<SecretString>>,
}

/// A running relay. Owned by exactly one command invocation.
///
/// [`shutdown`](Self::shutdown) closes the listener and waits for the
/// accept loop to exit. Dropping the handle without calling it still
/// cancels the listener.
pub struct RelayServer {
    addr: SocketAddr,
    base_url: Url,
    state: Arc<RelayState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RelayServer {
    /// Bind an OS-assigned port on loopback and start accepting.
    pub async fn start(upstream: RelayUpstream) -> Result<Self, Error> {
        let http = upstream.transport.build_client()?;
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .map_err(|e| Error::Relay(format!("failed to bind local listener: {e}")))?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}/"))?;

        let state = Arc::new(RelayState {
            http,
            upstream: upstream.base_url,
            auth: upstream.auth,
            token: RwLock::new(None),
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(accept_loop(listener, Arc::clone(&state), cancel.clone()));

        info!(%addr, upstream = %state.upstream, "relay listening");
        Ok(Self {
            addr,
            base_url,
            state,
            cancel,
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://127.0.0.1:<port>/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// An IDC client addressed at this relay.
    pub fn idc_client(&self, transport: &TransportConfig) -> Result<IdcClient, Error> {
        IdcClient::new(self.base_url.clone(), transport)
    }

    /// Install the anti-forgery token used for forwarded POSTs.
    pub async fn set_token(&self, token: SecretString) {
        *self.state.token.write().await = Some(token);
    }

    /// Stop accepting, close the listener and wait for the accept loop.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "relay accept loop ended abnormally");
            }
        }
        debug!(addr = %self.addr, "relay closed");
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<RelayState>, cancel: CancellationToken) {
    loop {
        let stream = tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _peer)) => stream,
                Err(e) => {
                    warn!(error = %e, "relay accept failed");
                    continue;
                }
            },
        };
        tokio::spawn(serve_connection(stream, Arc::clone(&state), cancel.clone()));
    }
}

async fn serve_connection(stream: TcpStream, state: Arc<RelayState>, cancel: CancellationToken) {
    let service = service_fn(move |req| {
        let state = Arc::clone(&state);
        async move { Ok::<_, Infallible>(handle(req, &state).await) }
    });
    let mut conn = pin!(
        http1::Builder::new()
            .keep_alive(true)
            .serve_connection(TokioIo::new(stream), service)
    );

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                debug!(error = %e, "relay connection closed with error");
            }
        }
        () = cancel.cancelled() => {
            conn.as_mut().graceful_shutdown();
            if let Err(e) = conn.await {
                debug!(error = %e, "relay connection shutdown error");
            }
        }
    }
}

// ── Request handling ─────────────────────────────────────────────────

async fn handle(req: Request<Incoming>, state: &RelayState) -> Response<RelayBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    match method {
        Method::GET if is_passthrough_path(&path) => {
            let target = req
                .uri()
                .path_and_query()
                .map_or(path, |pq| pq.as_str().to_owned());
            forward_get(&target, state).await
        }
        Method::POST if path == IDC_PATH => forward_post(req, state).await,
        _ => {
            debug!(%method, path = %path, "relay rejected request");
            empty(StatusCode::NOT_FOUND)
        }
    }
}

fn is_passthrough_path(path: &str) -> bool {
    path.contains("/documents/") || path.contains("/content/")
}

async fn forward_get(path_and_query: &str, state: &RelayState) -> Response<RelayBody> {
    let url = match state.upstream.join(path_and_query) {
        Ok(url) => url,
        Err(e) => return text(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    debug!("GET {url}");

    let upstream = state.auth.apply(state.http.get(url));
    relay_response(upstream.send().await).await
}

async fn forward_post(req: Request<Incoming>, state: &RelayState) -> Response<RelayBody> {
    let Some(service) = requested_service(req.uri().query()) else {
        debug!(query = ?req.uri().query(), "relay rejected unknown IDC service");
        return empty(StatusCode::NOT_FOUND);
    };

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return text(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let op: IdcOperation = match serde_json::from_slice(&body) {
        Ok(op) => op,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("invalid operation: {e}")),
    };
    if op.service() != service {
        return text(
            StatusCode::BAD_REQUEST,
            &format!("operation targets {} but query names {service}", op.service()),
        );
    }

    let Some(token) = state.token.read().await.clone() else {
        return text(StatusCode::SERVICE_UNAVAILABLE, "no user session established");
    };

    let mut url = match state.upstream.join(IDC_PATH) {
        Ok(url) => url,
        Err(e) => return text(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    url.query_pairs_mut().append_pair("IdcService", service.as_ref());
    info!(service = %service, "forwarding IDC operation");
    debug!("POST {url}");

    let mut form = vec![("idcToken", token.expose_secret().to_owned())];
    form.extend(op.form_fields());

    let upstream = state.auth.apply(state.http.post(url).form(&form));
    relay_response(upstream.send().await).await
}

/// The whitelisted service named by `IdcService=` in a query string.
fn requested_service(query: Option<&str>) -> Option<IdcService> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "IdcService")
        .and_then(|(_, value)| IdcService::from_str(&value).ok())
}

async fn relay_response(
    result: Result<reqwest::Response, reqwest::Error>,
) -> Response<RelayBody> {
    let upstream = match result {
        Ok(resp) => resp,
        Err(e) => {
            warn!(error = %e, "upstream request failed");
            return text(StatusCode::BAD_GATEWAY, &e.to_string());
        }
    };

    let status = upstream.status();
    let headers = fix_headers(upstream.headers());
    match upstream.bytes().await {
        Ok(body) => {
            let mut resp = Response::new(Full::new(body));
            *resp.status_mut() = status;
            *resp.headers_mut() = headers;
            resp
        }
        Err(e) => text(StatusCode::BAD_GATEWAY, &e.to_string()),
    }
}

/// Copy upstream headers, dropping the ones that do not survive the relay.
/// Header names in a `HeaderMap` are already lower-case.
pub fn fix_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut fixed = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        let key = name.as_str();
        if DROPPED_HEADERS.contains(&key) || key.starts_with(DROPPED_PREFIX) {
            continue;
        }
        fixed.append(name.clone(), value.clone());
    }
    fixed
}

fn empty(status: StatusCode) -> Response<RelayBody> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    resp
}

fn text(status: StatusCode, message: &str) -> Response<RelayBody> {
    let mut resp = Response::new(Full::new(Bytes::from(message.to_owned())));
    *resp.status_mut() = status;
    resp
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use hyper::header::HeaderValue;

    use super::*;

    #[test]
    fn fix_headers_strips_framing_and_cross_origin() {
        let mut upstream = HeaderMap::new();
        upstream.insert("Content-Type", HeaderValue::from_static("application/json"));
        upstream.insert("Content-Length", HeaderValue::from_static("12"));
        upstream.insert("Content-Encoding", HeaderValue::from_static("gzip"));
        upstream.insert("Transfer-Encoding", HeaderValue::from_static("chunked"));
        upstream.insert("Set-Cookie", HeaderValue::from_static("JSESSIONID=1"));
        upstream.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
        upstream.insert(
            "Access-Control-Allow-Origin",
            HeaderValue::from_static("*"),
        );
        upstream.append("X-Trace", HeaderValue::from_static("a"));
        upstream.append("X-Trace", HeaderValue::from_static("b"));

        let fixed = fix_headers(&upstream);
        let names: Vec<&str> = fixed.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["content-type", "x-trace"]);
        assert_eq!(fixed.get_all("x-trace").iter().count(), 2);
    }

    #[test]
    fn only_whitelisted_services_are_recognised() {
        assert_eq!(
            requested_service(Some("IdcService=SCS_COPY_SITES")),
            Some(IdcService::CopySites)
        );
        assert_eq!(
            requested_service(Some("x=1&IdcService=SCS_EDIT_SECURE_SITE")),
            Some(IdcService::EditSecureSite)
        );
        assert_eq!(requested_service(Some("IdcService=SCS_DELETE_USER")), None);
        assert_eq!(requested_service(None), None);
    }

    #[test]
    fn passthrough_paths() {
        assert!(is_passthrough_path("/documents/web"));
        assert!(is_passthrough_path("/content/management/api/v1.1/items"));
        assert!(!is_passthrough_path("/sites/management/api/v1/sites"));
        assert!(!is_passthrough_path("/"));
    }
}
