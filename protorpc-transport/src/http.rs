use crate::{Channel, ChannelError, Exchange, Reply, RpcTransport};
use async_trait::async_trait;
use protorpc_core::{JsonCodec, DEFAULT_MAX_MESSAGE_SIZE};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base path of the service; method calls go to `<service_path>.<method>`
    pub service_path: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Extra headers sent with every request, e.g. `Authorization`
    pub headers: Vec<(String, String)>,
    /// Largest request or reply body the codec accepts
    pub max_message_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            service_path: "http://localhost:8080/rpc/Service".to_string(),
            timeout_ms: 30000,
            headers: Vec::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl HttpConfig {
    pub fn new(service_path: impl Into<String>) -> Self {
        Self {
            service_path: service_path.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// POSTs each exchange to `<service_path>.<method>`.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: reqwest::Client,
    service_path: String,
    timeout: Duration,
}

impl HttpChannel {
    pub fn new(config: &HttpConfig) -> Result<Self, ChannelError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ChannelError::Config(format!("invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ChannelError::Config(format!("invalid value for header '{}': {}", name, e)))?;
            headers.append(header_name, header_value);
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ChannelError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            service_path: config.service_path.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn service_path(&self) -> &str {
        &self.service_path
    }

    pub fn url_for(&self, method: &str) -> String {
        format!("{}.{}", self.service_path, method)
    }

    fn map_error(&self, err: reqwest::Error) -> ChannelError {
        if err.is_timeout() {
            ChannelError::Timeout(self.timeout)
        } else if err.is_connect() {
            ChannelError::Connect(err.to_string())
        } else {
            ChannelError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl Channel for HttpChannel {
    async fn exchange(&self, exchange: Exchange) -> Result<Reply, ChannelError> {
        let url = self.url_for(&exchange.method);
        debug!("POST {} ({} bytes)", url, exchange.body.len());

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, exchange.content_type)
            .body(exchange.body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        trace!("{} replied {} with {} bytes", url, status, body.len());

        Ok(Reply { status, body })
    }
}

/// Transport speaking HTTP through [`HttpChannel`].
pub type HttpTransport = RpcTransport<HttpChannel>;

impl RpcTransport<HttpChannel> {
    pub fn http(config: HttpConfig) -> Result<Self, ChannelError> {
        let channel = HttpChannel::new(&config)?;
        let codec = Arc::new(JsonCodec::with_max_message_size(config.max_message_size));
        Ok(Self::with_codec(channel, codec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_method() {
        let channel = HttpChannel::new(&HttpConfig::new("http://example.com/rpc/Echo/")).unwrap();
        assert_eq!(channel.service_path(), "http://example.com/rpc/Echo");
        assert_eq!(channel.url_for("say"), "http://example.com/rpc/Echo.say");
    }

    #[test]
    fn test_config_builders() {
        let config = HttpConfig::new("http://localhost/rpc/Echo")
            .with_header("Authorization", "Bearer abc")
            .with_timeout_ms(500);
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(
            config.headers,
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = HttpConfig::default().with_header("bad header", "x");
        assert!(matches!(HttpChannel::new(&config), Err(ChannelError::Config(_))));

        let config = HttpConfig::default().with_header("X-Token", "line\nbreak");
        assert!(matches!(HttpChannel::new(&config), Err(ChannelError::Config(_))));
    }
}
