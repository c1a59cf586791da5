//! Resolving catalog entries to raw template text.
//!
//! Every failure here degrades to "no content": an unknown template, a non-success status, a
//! timeout.  Callers fall back to predefined templates.

use std::sync::Arc;
use std::time::Duration;

use crate::{PolicyCatalog, TemplateCache};

/// Where example policies are published.
pub const DEFAULT_TEMPLATE_BASE_URL: &str =
    "https://raw.githubusercontent.com/infamousjoeg/conjur-policies/master";

/// Upper bound on a single template read.
pub const TEMPLATE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

////////////////////////////////////////// TemplateSource //////////////////////////////////////////

/// A store of raw template text addressed by catalog path.
#[async_trait::async_trait]
pub trait TemplateSource: Send + Sync {
    /// Read the template at `path`, or `None` if it cannot be read.
    async fn read(&self, path: &str) -> Option<String>;
}

//////////////////////////////////////// HttpTemplateSource ////////////////////////////////////////

/// Reads templates over HTTP from `{base}/{path}`.
#[derive(Clone, Debug)]
pub struct HttpTemplateSource {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTemplateSource {
    /// A source rooted at `base_url` with [`TEMPLATE_FETCH_TIMEOUT`].
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, TEMPLATE_FETCH_TIMEOUT)
    }

    /// A source rooted at `base_url` whose reads give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    /// The bound on a single read.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The URL a catalog path is read from.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn read(&self, path: &str) -> Option<String> {
        let url = self.url_for(path);
        tracing::info!(url = %url, "fetching template");
        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "template fetch failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(url = %url, status = %resp.status(), "template fetch failed");
            return None;
        }
        match resp.text().await {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "could not read template body");
                None
            }
        }
    }
}

////////////////////////////////////////// TemplateFetcher /////////////////////////////////////////

/// Resolves `(category, template)` pairs against a catalog and reads them through a cache.
pub struct TemplateFetcher<S> {
    catalog: Arc<PolicyCatalog>,
    source: S,
    cache: Arc<TemplateCache>,
}

impl<S: TemplateSource> TemplateFetcher<S> {
    /// A fetcher over `source`, caching into `cache`.
    pub fn new(catalog: Arc<PolicyCatalog>, source: S, cache: Arc<TemplateCache>) -> Self {
        Self {
            catalog,
            source,
            cache,
        }
    }

    /// The catalog templates are resolved against.
    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }

    /// The cache this fetcher writes to.
    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Fetch a template's text.
    ///
    /// A template that cannot be resolved in the catalog is reported as missing without touching
    /// the source.  Successful reads are cached for the life of the cache.
    pub async fn fetch(&self, category: &str, template_name: &str) -> Option<String> {
        let key = TemplateCache::key(category, template_name);
        if let Some(content) = self.cache.get(&key) {
            tracing::debug!(key = %key, "template cache hit");
            return Some(content);
        }
        let Some(path) = self.catalog.resolve_path(category, template_name) else {
            tracing::warn!(key = %key, "template not in catalog");
            return None;
        };
        let content = self.source.read(&path).await?;
        self.cache.insert(key, content.clone());
        Some(content)
    }
}

/////////////////////////////////////////////// testing ////////////////////////////////////////////


/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::testing::MapSource;
    use super::*;

    fn create_test_fetcher(source: MapSource) -> TemplateFetcher<MapSource> {
        let catalog = PolicyCatalog::from_json(
            r#"{"authn": ["authn-jwt-github.yml"], "ci": {"github": ["actions.yml"]}}"#,
        )
        .unwrap();
        TemplateFetcher::new(Arc::new(catalog), source, Arc::new(TemplateCache::new()))
    }

    #[tokio::test]
    async fn fetch_then_cache() {
        let source = MapSource::new(&[("ci/github/actions.yml", "- !host a")]);
        let fetcher = create_test_fetcher(source);
        assert_eq!(
            Some("- !host a".to_string()),
            fetcher.fetch("ci/github", "actions").await
        );
        assert_eq!(
            Some("- !host a".to_string()),
            fetcher.fetch("ci/github", "actions").await
        );
        assert_eq!(vec!["ci/github/actions.yml"], fetcher.source.reads());
        assert_eq!(Some("- !host a".to_string()), fetcher.cache().get("ci/github/actions"));
    }

    #[tokio::test]
    async fn unresolvable_template_skips_source() {
        let fetcher = create_test_fetcher(MapSource::new(&[]));
        assert_eq!(None, fetcher.fetch("cloud/aws", "aws").await);
        assert!(fetcher.source.reads().is_empty());
    }

    #[tokio::test]
    async fn missing_upstream_is_not_cached() {
        let fetcher = create_test_fetcher(MapSource::new(&[]));
        assert_eq!(None, fetcher.fetch("authn", "authn-jwt-github").await);
        assert_eq!(None, fetcher.fetch("authn", "authn-jwt-github").await);
        assert_eq!(2, fetcher.source.reads().len());
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn shared_cache_across_fetchers() {
        let catalog = Arc::new(PolicyCatalog::builtin());
        let cache = Arc::new(TemplateCache::new());
        let first = TemplateFetcher::new(
            catalog.clone(),
            MapSource::new(&[("authn/authn-jwt-github.yml", "- !webservice")]),
            cache.clone(),
        );
        let second = TemplateFetcher::new(catalog, MapSource::new(&[]), cache);
        assert!(first.fetch("authn", "authn-jwt-github").await.is_some());
        assert_eq!(
            Some("- !webservice".to_string()),
            second.fetch("authn", "authn-jwt-github").await
        );
        assert!(second.source.reads().is_empty());
    }

    #[test]
    fn url_joins_cleanly() {
        let source = HttpTemplateSource::new("https://example.org/policies/").unwrap();
        assert_eq!(
            "https://example.org/policies/ci/github/actions.yml",
            source.url_for("/ci/github/actions.yml")
        );
        assert_eq!(TEMPLATE_FETCH_TIMEOUT, source.timeout());
    }

    /// Serve one connection per canned response on a loopback port.
    fn serve(responses: Vec<Option<&'static str>>) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                match response {
                    Some(response) => {
                        let _ = stream.write_all(response.as_bytes());
                    }
                    None => std::thread::sleep(Duration::from_secs(2)),
                }
            }
        });
        format!("http://{addr}/policies")
    }

    #[tokio::test]
    async fn http_status_decides_content() {
        let not_found = "HTTP/1.1 404 Not Found\r\n\
                         Content-Length: 9\r\n\
                         Connection: close\r\n\r\n\
                         Not Found";
        let ok = "HTTP/1.1 200 OK\r\n\
                  Content-Length: 13\r\n\
                  Connection: close\r\n\r\n\
                  - !host robot";
        let base = serve(vec![Some(not_found), Some(ok)]);
        let source = HttpTemplateSource::new(base).unwrap();
        assert_eq!(None, source.read("authn/missing.yml").await);
        assert_eq!(
            Some("- !host robot".to_string()),
            source.read("ci/github/actions.yml").await
        );
    }

    #[tokio::test]
    async fn http_timeout_is_not_found() {
        let base = serve(vec![None]);
        let source = HttpTemplateSource::with_timeout(base, Duration::from_millis(200)).unwrap();
        assert_eq!(None, source.read("cloud/aws/aws.yml").await);
    }

    #[tokio::test]
    async fn unreachable_host_is_not_found() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpTemplateSource::new(format!("http://{addr}")).unwrap();
        assert_eq!(None, source.read("authn/authn-k8s.yml").await);
    }
}
