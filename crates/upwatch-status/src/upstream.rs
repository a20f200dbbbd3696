//! HTTP adapter for the upstream admin API.
//!
//! Each call opens a plain HTTP/1 connection, issues one GET, and decodes
//! the JSON body. The whole exchange runs under the configured timeout.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, HOST, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tracing::debug;
use upwatch_core::{ConfigSnapshot, EndpointId, HealthCheckRecord, RecentRequestSample};

use crate::error::{SourceError, SourceResult};
use crate::source::{BoxFuture, StatusSource};

/// Unreserved characters pass through; everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const AGENT: &str = concat!("upwatch/", env!("CARGO_PKG_VERSION"));

/// [`StatusSource`] backed by the upstream `/api/status` endpoints.
#[derive(Debug, Clone)]
pub struct HttpSource {
    authority: String,
    /// Base path without trailing slash, e.g. `""` or `"/admin"`.
    prefix: String,
    timeout: Duration,
}

impl HttpSource {
    /// Build a source for `base_url` (`http://host:port[/prefix]`).
    pub fn new(base_url: &str, timeout: Duration) -> SourceResult<Self> {
        let uri: Uri = base_url
            .parse()
            .map_err(|e| SourceError::Other(format!("invalid upstream url {base_url}: {e}")))?;
        if let Some(scheme) = uri.scheme_str() {
            if scheme != "http" {
                return Err(SourceError::Other(format!(
                    "unsupported upstream scheme {scheme}, only http is supported"
                )));
            }
        }
        let authority = uri
            .authority()
            .ok_or_else(|| SourceError::Other(format!("upstream url {base_url} has no host")))?
            .to_string();
        let prefix = uri.path().trim_end_matches('/').to_string();

        Ok(Self {
            authority,
            prefix,
            timeout,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.authority, self.prefix)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SourceResult<T> {
        let path = format!("{}{}", self.prefix, path);
        match tokio::time::timeout(self.timeout, self.exchange(&path)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%path, authority = %self.authority, "upstream request timed out");
                Err(SourceError::Timeout(self.timeout))
            }
        }
    }

    async fn exchange<T: DeserializeOwned>(&self, path: &str) -> SourceResult<T> {
        let stream = TcpStream::connect(self.authority.as_str())
            .await
            .map_err(|e| SourceError::Connect(format!("{}: {e}", self.authority)))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| SourceError::Connect(format!("{}: {e}", self.authority)))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "upstream connection closed with error");
            }
        });

        let req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(HOST, self.authority.as_str())
            .header(USER_AGENT, AGENT)
            .header(ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%status, %path, "upstream non-2xx");
            return Err(SourceError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?
            .to_bytes();

        serde_json::from_slice(&body).map_err(|e| SourceError::Decode(format!("{path}: {e}")))
    }
}

fn recent_requests_path(endpoint_id: &str, client_type: &str, limit: usize) -> String {
    format!(
        "/api/status/endpoints/{}/recent-requests?client_type={}&limit={limit}",
        utf8_percent_encode(endpoint_id, COMPONENT),
        utf8_percent_encode(client_type, COMPONENT),
    )
}

impl StatusSource for HttpSource {
    fn fetch_config(&self) -> BoxFuture<'_, SourceResult<ConfigSnapshot>> {
        Box::pin(self.get_json("/api/status/config"))
    }

    fn fetch_health_checks(
        &self,
    ) -> BoxFuture<'_, SourceResult<HashMap<EndpointId, HealthCheckRecord>>> {
        Box::pin(self.get_json("/api/status/health-checks"))
    }

    fn fetch_recent_requests<'a>(
        &'a self,
        endpoint_id: &'a str,
        client_type: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, SourceResult<Vec<RecentRequestSample>>> {
        Box::pin(async move {
            let path = recent_requests_path(endpoint_id, client_type, limit);
            self.get_json(&path).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response, returning the address and the
    /// request line the client sent.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });
        (addr, handle)
    }

    #[test]
    fn new_parses_authority_and_prefix() {
        let source = HttpSource::new("http://10.0.0.5:13500/admin/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.authority, "10.0.0.5:13500");
        assert_eq!(source.prefix, "/admin");
        assert_eq!(source.base_url(), "http://10.0.0.5:13500/admin");
    }

    #[test]
    fn new_rejects_https() {
        let err = HttpSource::new("https://example.com", Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("only http"));
    }

    #[test]
    fn recent_requests_path_escapes_components() {
        let path = recent_requests_path("team a/1", "claude code", 3);
        assert_eq!(
            path,
            "/api/status/endpoints/team%20a%2F1/recent-requests?client_type=claude%20code&limit=3"
        );
    }

    #[tokio::test]
    async fn fetch_config_decodes_body() {
        let (addr, server) = serve_once(
            "200 OK",
            r#"{"endpoints":[{"id":"a","client_type":"claude","status":"untested"}],"health_check_interval_secs":30}"#,
        )
        .await;
        let source = HttpSource::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();

        let config = source.fetch_config().await.unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].id, "a");
        assert!(config.endpoints[0].is_enabled);
        assert_eq!(config.health_check_interval_secs, Some(30));

        let request_line = server.await.unwrap();
        assert_eq!(request_line, "GET /api/status/config HTTP/1.1");
    }

    #[tokio::test]
    async fn non_2xx_maps_to_status_error() {
        let (addr, _server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let source = HttpSource::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();

        match source.fetch_health_checks().await {
            Err(SourceError::Status { status, path }) => {
                assert_eq!(status, 500);
                assert_eq!(path, "/api/status/health-checks");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_maps_to_decode_error() {
        let (addr, _server) = serve_once("200 OK", "not json").await;
        let source = HttpSource::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();

        let err = source.fetch_recent_requests("a", "claude", 3).await.unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[tokio::test]
    async fn closed_port_maps_to_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpSource::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = source.fetch_config().await.unwrap_err();
        assert!(matches!(err, SourceError::Connect(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let source = HttpSource::new(&format!("http://{addr}"), Duration::from_millis(100)).unwrap();
        let err = source.fetch_config().await.unwrap_err();
        assert!(matches!(err, SourceError::Timeout(_)));
    }
}
