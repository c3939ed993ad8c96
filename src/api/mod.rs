use crate::error::FixtureError;
use anyhow::{Context, Result};
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Status and body of a fetched fragment resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: String::new(),
        }
    }

    /// True for any 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to fetch fragment text by a relative path such as `./table.html`.
///
/// A non-success status is not an error at this level: implementations hand back the status,
/// without reading the body, and let the loader decide. Only failures to obtain a response at
/// all (connection refused, unreadable file, undecodable body) come back as
/// [`FixtureError::Transport`].
pub trait ResourceFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<FetchResponse, FixtureError>> + Send;
}

/// Fetches fragments over HTTP relative to a base URL, e.g. a static server started for a test
/// run.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
}

impl HttpFetcher {
    /// Create a fetcher with a default reqwest client.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        // Without a trailing slash `Url::join` would replace the last path segment.
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&base).with_context(|| format!("invalid fixture base URL {}", base_url))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, FixtureError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| FixtureError::transport(path, e))?;

        tracing::debug!(%url, "fetching fixture");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FixtureError::transport(path, e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            // The body of a failed response is never used, so don't wait on it.
            return Ok(FetchResponse {
                status,
                body: String::new(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FixtureError::transport(path, e))?;

        Ok(FetchResponse { status, body })
    }
}

/// Reads fragments from a directory on disk. A missing file answers like a 404.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl ResourceFetcher for DirFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, FixtureError> {
        let full_path = self.root.join(path);
        tracing::debug!(path = %full_path.display(), "reading fixture");

        match tokio::fs::read_to_string(&full_path).await {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FetchResponse::not_found()),
            Err(e) => Err(FixtureError::transport(path, e)),
        }
    }
}

/// In-memory fetcher for tests. Paths are matched with any leading `./` removed.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    files: HashMap<String, FetchResponse>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, body: impl Into<String>) -> Self {
        self.insert(name, FetchResponse::ok(body));
        self
    }

    pub fn with_response(mut self, name: &str, response: FetchResponse) -> Self {
        self.insert(name, response);
        self
    }

    pub fn insert(&mut self, name: &str, response: FetchResponse) {
        self.files.insert(strip_dot_slash(name).to_string(), response);
    }

    /// Number of fetches served so far, hits and misses alike.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ResourceFetcher for MemoryFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, FixtureError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .files
            .get(strip_dot_slash(path))
            .cloned()
            .unwrap_or_else(FetchResponse::not_found))
    }
}

fn strip_dot_slash(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_response_status() {
        assert!(FetchResponse::ok("x").is_ok());
        assert!(FetchResponse { status: 204, body: String::new() }.is_ok());
        assert!(!FetchResponse::not_found().is_ok());
        assert!(!FetchResponse { status: 500, body: "boom".into() }.is_ok());
        assert!(!FetchResponse { status: 301, body: String::new() }.is_ok());
    }

    #[test]
    fn test_http_fetcher_appends_trailing_slash() {
        let fetcher = HttpFetcher::new("http://localhost:8080/fixtures").unwrap();
        assert_eq!(fetcher.base_url().as_str(), "http://localhost:8080/fixtures/");
    }

    #[test]
    fn test_http_fetcher_rejects_invalid_base() {
        let result = HttpFetcher::new("not a url");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid fixture base URL"));
    }

    #[tokio::test]
    async fn test_http_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fixtures/table.html")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<table></table>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&format!("{}/fixtures/", server.url())).unwrap();
        let response = fetcher.fetch("./table.html").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response, FetchResponse::ok("<table></table>"));
    }

    #[tokio::test]
    async fn test_http_fetch_returns_error_status_as_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.html")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&server.url()).unwrap();
        let response = fetcher.fetch("./missing.html").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_http_error_status_skips_truncated_body() {
        use crate::internal::fixture::FixtureLoader;
        use crate::internal::sink::MemorySink;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            // Promises far more body than it sends, then hangs up
            let _ = socket
                .write_all(
                    b"HTTP/1.1 404 Not Found\r\nContent-Length: 1000\r\nContent-Type: text/html\r\n\r\npartial",
                )
                .await;
            let _ = socket.shutdown().await;
        });

        let fetcher = HttpFetcher::new(&format!("http://{}/", addr)).unwrap();
        let loader = FixtureLoader::new(MemorySink::default(), fetcher);

        let err = loader
            .load_and_set_fragment("missing.html")
            .await
            .unwrap_err();

        assert!(matches!(err, FixtureError::Fetch { status: 404, .. }));
        assert!(err.to_string().contains("missing.html"));
        assert_eq!(loader.get_fragment_text(), "");
    }

    #[tokio::test]
    async fn test_http_fetch_network_error() {
        // Nothing listens on port 1
        let fetcher = HttpFetcher::new("http://localhost:1/").unwrap();
        let result = fetcher.fetch("./a.html").await;

        assert!(matches!(result, Err(FixtureError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_dir_fetcher_reads_and_misses() {
        let dir = std::env::temp_dir()
            .join(format!("html_fixture_dir_fetcher_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("list.html"), "<ul>\n<li>a</li>\n</ul>").unwrap();

        let fetcher = DirFetcher::new(&dir);
        let hit = fetcher.fetch("./list.html").await.unwrap();
        assert_eq!(hit, FetchResponse::ok("<ul>\n<li>a</li>\n</ul>"));

        let miss = fetcher.fetch("./nope.html").await.unwrap();
        assert_eq!(miss.status, 404);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_memory_fetcher_counts_and_strips_prefix() {
        let fetcher = MemoryFetcher::new()
            .with_file("a.html", "<b>a</b>")
            .with_response("broken.html", FetchResponse { status: 500, body: String::new() });

        assert_eq!(fetcher.fetch("./a.html").await.unwrap().body, "<b>a</b>");
        assert_eq!(fetcher.fetch("a.html").await.unwrap().body, "<b>a</b>");
        assert_eq!(fetcher.fetch("./broken.html").await.unwrap().status, 500);
        assert_eq!(fetcher.fetch("./other.html").await.unwrap().status, 404);
        assert_eq!(fetcher.fetch_count(), 4);
    }
}
