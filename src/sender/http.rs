use super::transport::{Transport, TransportError};
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the server, e.g. `http://localhost:8086`.
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "metrics".to_string(),
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("influx-metrics-reporter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Posts each batch to the `/write` endpoint with millisecond precision.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    write_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let write_url = write_url(&config.url, &config.database)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| {
                TransportError::InvalidConfiguration(format!("Invalid user agent: {e}"))
            })?,
        );

        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                TransportError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            write_url,
            username: config.username,
            password: config.password,
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        let bytes = payload.len();
        let mut request = self.client.post(self.write_url.clone()).body(payload);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            debug!(bytes, "Write accepted");
            return Ok(());
        }
        if status.is_success() {
            // 2xx other than 204 means the server answered but did not store
            let body = response.text().await.unwrap_or_default();
            info!(status = status.as_u16(), body = %body, "Write answered without storing data");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn write_url(base: &str, database: &str) -> Result<Url, TransportError> {
    let mut url: Url = base
        .parse()
        .map_err(|e| TransportError::InvalidConfiguration(format!("Invalid URL '{base}': {e}")))?;

    if url.cannot_be_a_base() {
        return Err(TransportError::InvalidConfiguration(format!(
            "URL '{base}' cannot be used as a base"
        )));
    }

    let path = if url.path().ends_with('/') {
        format!("{}write", url.path())
    } else {
        format!("{}/write", url.path())
    };
    url.set_path(&path);
    url.query_pairs_mut()
        .clear()
        .append_pair("db", database)
        .append_pair("precision", "ms");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_url() {
        let url = write_url("http://localhost:8086", "metrics").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8086/write?db=metrics&precision=ms");

        let nested = write_url("https://influx.example.com/proxy/", "my db").unwrap();
        assert_eq!(nested.path(), "/proxy/write");
        assert_eq!(nested.query(), Some("db=my+db&precision=ms"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(matches!(
            HttpTransport::new(HttpConfig {
                url: "not a url".to_string(),
                ..HttpConfig::default()
            }),
            Err(TransportError::InvalidConfiguration(_))
        ));
    }
}
