use super::connection::{Connection, Connector};
use crate::error::{Error, Result};
use crate::runtime_config::RuntimeConfig;
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::io::{self, Read};
use url::Url;

/// Default connection opener backed by `reqwest::blocking`
///
/// One connector describes one kind of call: its method, extra headers and
/// request body. Each [`open`](Connector::open) prepares a fresh exchange;
/// nothing touches the network until [`Connection::connect`].
///
/// ```rust,no_run
/// use authlane::http::{HttpRequest, ReqwestConnector, RequestType};
/// use authlane::runtime_config::RuntimeConfig;
/// use std::sync::Arc;
///
/// let connector = ReqwestConnector::new(&RuntimeConfig::from_env())?
///     .form([("grant_type", "refresh_token"), ("refresh_token", "...")]);
/// let request = HttpRequest::parse(
///     RequestType::RefreshToken,
///     "https://example.okta.com/oauth2/default/v1/token",
///     Arc::new(connector),
/// )?;
/// # Ok::<(), authlane::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    client: reqwest::blocking::Client,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl ReqwestConnector {
    /// Build a connector with timeouts and user agent from `config`
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] if the TLS backend cannot be initialised.
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        // reqwest's blocking timeout covers the whole exchange including body reads
        builder = builder.timeout(config.read_timeout());
        if let Some(connect) = config.connect_timeout() {
            builder = builder.connect_timeout(connect);
        }
        let client = builder.build().map_err(|e| Error::Transport(to_io(e)))?;

        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        headers.insert(http::header::ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self::with_client(client).headers(headers))
    }

    /// Wrap an existing client (shared connection pool, custom TLS roots)
    #[must_use]
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Send `body` with the given content type
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>, content_type: HeaderValue) -> Self {
        self.headers.insert(CONTENT_TYPE, content_type);
        self.body = Some(body.into());
        self
    }

    /// POST an `application/x-www-form-urlencoded` body, as token endpoints expect
    #[must_use]
    pub fn form<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.method(Method::POST).body(
            encoded,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
    }

    #[must_use]
    pub fn request_method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn request_headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn request_body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

impl Connector for ReqwestConnector {
    fn open(&self, url: &Url) -> io::Result<Box<dyn Connection>> {
        let mut builder = self
            .client
            .request(self.method.clone(), url.clone())
            .headers(self.headers.clone());
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        Ok(Box::new(ReqwestConnection {
            pending: Some(builder),
            response: None,
        }))
    }
}

struct ReqwestConnection {
    pending: Option<reqwest::blocking::RequestBuilder>,
    response: Option<reqwest::blocking::Response>,
}

impl Connection for ReqwestConnection {
    fn connect(&mut self) -> io::Result<()> {
        let builder = self
            .pending
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "connection already used"))?;
        self.response = Some(builder.send().map_err(to_io)?);
        Ok(())
    }

    fn response_code(&mut self) -> io::Result<Option<u16>> {
        Ok(self.response.as_ref().map(|r| r.status().as_u16()))
    }

    fn headers(&self) -> HeaderMap {
        self.response
            .as_ref()
            .map(|r| r.headers().clone())
            .unwrap_or_default()
    }

    fn content_length(&self) -> Option<u64> {
        self.response.as_ref().and_then(|r| r.content_length())
    }

    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.response.as_mut() {
            Some(resp) => resp.read(buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "not connected")),
        }
    }

    fn disconnect(&mut self) {
        // Dropping the response closes (or returns) the underlying socket
        self.pending = None;
        self.response = None;
    }
}

fn to_io(err: reqwest::Error) -> io::Error {
    let kind = if err.is_timeout() {
        io::ErrorKind::TimedOut
    } else if err.is_connect() {
        io::ErrorKind::ConnectionRefused
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, err)
}
