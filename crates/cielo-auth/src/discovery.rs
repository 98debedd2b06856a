//! Per-deployment API-key discovery.
//!
//! The cloud requires an `x-api-key` header whose value is baked into the
//! web application's JS bundle. Discovery fetches the login page, locates
//! the `main.<hash>.js` bundle, and scrapes the `apiKey:"…"` literal out of
//! it. The scrape is fragile by nature, so it sits behind the narrow
//! [`ApiKeyDiscovery`] trait — tests and embedders can inject a fixed key.

use async_trait::async_trait;
use regex::Regex;

use cielo_core::CieloConfig;

use crate::errors::DiscoveryError;

/// Source of the vendor-issued API key.
#[async_trait]
pub trait ApiKeyDiscovery: Send + Sync {
    /// Obtain the `x-api-key` value.
    async fn discover(&self) -> Result<String, DiscoveryError>;
}

/// A fixed, pre-known API key. Useful for tests and deployments that pin
/// the key out of band.
pub struct StaticKey(pub String);

#[async_trait]
impl ApiKeyDiscovery for StaticKey {
    async fn discover(&self) -> Result<String, DiscoveryError> {
        Ok(self.0.clone())
    }
}

/// Production discovery: scrape the key out of the web app's JS bundle.
pub struct WebAppDiscovery {
    http: reqwest::Client,
    home_url: String,
    user_agent: String,
}

impl WebAppDiscovery {
    /// Create a discovery client against the configured web application.
    pub fn new(http: reqwest::Client, config: &CieloConfig) -> Self {
        Self {
            http,
            home_url: config.home_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, DiscoveryError> {
        let resp = self
            .http
            .get(url)
            .header("user-agent", &self.user_agent)
            .send()
            .await?;
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ApiKeyDiscovery for WebAppDiscovery {
    #[tracing::instrument(skip_all)]
    async fn discover(&self) -> Result<String, DiscoveryError> {
        let login_page = self
            .fetch_text(&format!("{}/auth/login", self.home_url))
            .await?;
        let bundle = bundle_path(&login_page).ok_or_else(|| DiscoveryError::KeyNotFound {
            context: "main.js bundle reference".to_string(),
        })?;

        let js = self
            .fetch_text(&format!("{}/{}", self.home_url, bundle))
            .await?;
        let key = api_key(&js).ok_or_else(|| DiscoveryError::KeyNotFound {
            context: "apiKey literal".to_string(),
        })?;

        tracing::debug!(bundle, "API key discovered");
        Ok(key)
    }
}

/// Locate the `main.<hash>.js` bundle path in the login page HTML.
fn bundle_path(html: &str) -> Option<String> {
    let re = Regex::new(r#"src="(main\.[^"]*?\.js)""#).ok()?;
    Some(re.captures(html)?.get(1)?.as_str().to_string())
}

/// Extract the `apiKey:"…"` literal from the JS bundle.
fn api_key(js: &str) -> Option<String> {
    let re = Regex::new(r#"apiKey:\s*"([^"]+)""#).ok()?;
    Some(re.captures(js)?.get(1)?.as_str().to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOGIN_HTML: &str = r#"<html><body>
        <script src="runtime.4f2a.js"></script>
        <script src="main.8c1b2f9e.js" type="module"></script>
    </body></html>"#;

    const BUNDLE_JS: &str =
        r#"var e={production:!0,apiKey:"abc-123-key",region:"us-east-1"};export default e;"#;

    #[test]
    fn bundle_path_from_login_page() {
        assert_eq!(
            bundle_path(LOGIN_HTML).as_deref(),
            Some("main.8c1b2f9e.js")
        );
    }

    #[test]
    fn bundle_path_missing() {
        assert!(bundle_path("<html>no scripts here</html>").is_none());
    }

    #[test]
    fn api_key_from_bundle() {
        assert_eq!(api_key(BUNDLE_JS).as_deref(), Some("abc-123-key"));
    }

    #[test]
    fn api_key_missing() {
        assert!(api_key("var e = {};").is_none());
    }

    #[tokio::test]
    async fn web_discovery_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_HTML))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/main.8c1b2f9e.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BUNDLE_JS))
            .mount(&server)
            .await;

        let config = CieloConfig {
            home_url: server.uri(),
            ..CieloConfig::default()
        };
        let discovery = WebAppDiscovery::new(reqwest::Client::new(), &config);
        let key = discovery.discover().await.unwrap();
        assert_eq!(key, "abc-123-key");
    }

    #[tokio::test]
    async fn web_discovery_unrecognized_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let config = CieloConfig {
            home_url: server.uri(),
            ..CieloConfig::default()
        };
        let discovery = WebAppDiscovery::new(reqwest::Client::new(), &config);
        let err = discovery.discover().await.unwrap_err();
        assert_matches!(err, DiscoveryError::KeyNotFound { .. });
    }

    #[tokio::test]
    async fn static_key_passthrough() {
        let key = StaticKey("fixed".to_string()).discover().await.unwrap();
        assert_eq!(key, "fixed");
    }
}
