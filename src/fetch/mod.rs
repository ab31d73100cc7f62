// src/fetch/mod.rs

use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use thiserror::Error;
use tokio::{fs, time::sleep};
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::{Columns, FetchSettings};
use crate::snapshot::Snapshot;

/// Where an export is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(Url),
    Path(PathBuf),
}

impl Source {
    /// `http://` and `https://` strings are URLs; anything else is a file path.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Source::Url(url),
            _ => Source::Path(PathBuf::from(s)),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{url}"),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The export could not be obtained. Nothing was parsed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("GET {url} failed after {attempts} attempt(s): {source}")]
    Http {
        url: Url,
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned HTTP {status}")]
    Status { url: Url, status: StatusCode },

    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// HTTP client honouring the configured timeout.
pub fn build_client(settings: &FetchSettings) -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(settings.timeout()).build()?)
}

/// Read the raw export text from `source`.
///
/// URLs are retried up to `settings.max_retries` attempts on transport errors;
/// a non-success status is returned straight away.
#[instrument(level = "info", skip_all, fields(source = %source))]
pub async fn load_text(
    client: &Client,
    source: &Source,
    settings: &FetchSettings,
) -> Result<String, LoadError> {
    let text = match source {
        Source::Url(url) => fetch_url(client, url, settings).await?,
        Source::Path(path) => {
            let bytes = fs::read(path).await.map_err(|e| LoadError::Io {
                path: path.clone(),
                source: e,
            })?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };
    info!(bytes = text.len(), "loaded export");
    Ok(text)
}

async fn fetch_url(client: &Client, url: &Url, settings: &FetchSettings) -> Result<String, LoadError> {
    let max_attempts = settings.max_retries.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        // 1) send
        let resp = match client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) if attempt < max_attempts => {
                warn!(attempt, error = %e, "request failed; retrying");
                sleep(settings.retry_delay()).await;
                continue;
            }
            Err(e) => {
                return Err(LoadError::Http {
                    url: url.clone(),
                    attempts: attempt,
                    source: e,
                })
            }
        };

        // 2) status
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.clone(),
                status,
            });
        }

        // 3) body
        match resp.text().await {
            Ok(body) => return Ok(body),
            Err(e) if attempt < max_attempts => {
                warn!(attempt, error = %e, "reading body failed; retrying");
                sleep(settings.retry_delay()).await;
            }
            Err(e) => {
                return Err(LoadError::Http {
                    url: url.clone(),
                    attempts: attempt,
                    source: e,
                })
            }
        }
    }
}

/// Load the export and build a [`Snapshot`] for `owners`.
///
/// Only obtaining the text can fail; parsing is best-effort.
pub async fn load_snapshot(
    client: &Client,
    source: &Source,
    settings: &FetchSettings,
    columns: &Columns,
    owners: &[&str],
) -> Result<Snapshot, LoadError> {
    let text = load_text(client, source, settings).await?;
    Ok(Snapshot::build(&text, columns, owners))
}

/// JSON body reported in place of a snapshot when `source` could not be loaded.
pub fn unavailable_body(source: &Source, err: &LoadError) -> serde_json::Value {
    serde_json::json!({
        "status": "unavailable",
        "source": source.to_string(),
        "error": err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use std::net::SocketAddr;
    use tempfile::NamedTempFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const EXPORT: &str = "Owner,Amount\nTony Goh,\"$50,000\"\nTony Goh,\"$30,000\"\nAlex,\"$10,000\"\n";

    fn local_client() -> Result<Client> {
        // loopback stubs must not be routed through an ambient HTTP proxy
        Ok(Client::builder().no_proxy().build()?)
    }

    fn quick() -> FetchSettings {
        FetchSettings {
            max_retries: 2,
            retry_delay_ms: 10,
            timeout_secs: 5,
        }
    }

    /// Serve one canned HTTP response on a loopback port.
    async fn serve_once(status: &'static str, body: &'static str) -> Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut req = Vec::new();
                let mut buf = [0u8; 1024];
                while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => req.extend_from_slice(&buf[..n]),
                    }
                }
                let resp = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        Ok(addr)
    }

    #[test]
    fn source_parse_splits_urls_from_paths() {
        assert!(matches!(
            Source::parse("https://example.com/export.csv"),
            Source::Url(_)
        ));
        assert_eq!(
            Source::parse("data/export.csv"),
            Source::Path(PathBuf::from("data/export.csv"))
        );
        assert!(matches!(Source::parse("C:/exports/a.csv"), Source::Path(_)));
    }

    #[tokio::test]
    async fn loads_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(EXPORT.as_bytes())?;

        let client = build_client(&quick())?;
        let source = Source::Path(file.path().to_path_buf());
        let text = load_text(&client, &source, &quick()).await?;
        assert_eq!(text, EXPORT);
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() -> Result<()> {
        let client = build_client(&quick())?;
        let source = Source::Path(PathBuf::from("/definitely/not/here.csv"));
        let err = load_text(&client, &source, &quick()).await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_reports_unavailable() -> Result<()> {
        let client = build_client(&quick())?;
        let source = Source::Path(PathBuf::from("/definitely/not/here.csv"));
        let err = load_text(&client, &source, &quick()).await.unwrap_err();

        let body = unavailable_body(&source, &err);
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["source"], "/definitely/not/here.csv");
        let message = body["error"].as_str().expect("error message");
        assert!(message.starts_with("reading /definitely/not/here.csv: "));
        Ok(())
    }

    #[tokio::test]
    async fn loads_snapshot_over_http() -> Result<()> {
        let addr = serve_once("200 OK", EXPORT).await?;
        let client = local_client()?;
        let source = Source::Url(Url::parse(&format!("http://{addr}/export.csv"))?);

        let snapshot = load_snapshot(
            &client,
            &source,
            &quick(),
            &Columns::default(),
            &["Tony Goh"],
        )
        .await?;
        assert_eq!(snapshot.row_count, 3);
        let tony = snapshot.group("Tony Goh").expect("Tony Goh group");
        assert_eq!(tony.total, 80000.0);
        assert_eq!(tony.count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_not_retried() -> Result<()> {
        let addr = serve_once("404 Not Found", "").await?;
        let client = local_client()?;
        let source = Source::Url(Url::parse(&format!("http://{addr}/missing.csv"))?);

        let err = load_text(&client, &source, &quick()).await.unwrap_err();
        match err {
            LoadError::Status { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("expected status error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_exhausts_retries() -> Result<()> {
        // bind then drop so the port refuses connections
        let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
        let client = local_client()?;
        let source = Source::Url(Url::parse(&format!("http://{addr}/export.csv"))?);

        let err = load_text(&client, &source, &quick()).await.unwrap_err();
        match err {
            LoadError::Http { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected transport error, got {other:?}"),
        }
        Ok(())
    }
}
