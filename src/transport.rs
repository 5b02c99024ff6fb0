use std::error::Error as _;
use std::fmt::Display;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderName, HeaderValue, LOCATION};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{ClientBuilder, Method, StatusCode, Url};
use tokio::time::timeout;

use crate::http::{method, Body, HeaderMap, PostParams, PostValue, Prepared, RequestConfig, Version};

const SEPARATOR: &[u8] = b"\r\n\r\n";

/// Failure classes, numbered like libcurl's error codes.
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FailureCode {
    UnsupportedProtocol = 1,
    UrlMalformat = 3,
    CouldNotConnect = 7,
    ReadError = 26,
    OperationTimedOut = 28,
    TooManyRedirects = 47,
    SendError = 55,
    RecvError = 56,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,
}

impl Failure {
    #[inline]
    pub fn new(code: FailureCode, message: impl Display) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(error: reqwest::Error) -> Self {
        let code = if error.is_timeout() {
            FailureCode::OperationTimedOut
        } else if error.is_connect() {
            FailureCode::CouldNotConnect
        } else if error.is_builder() {
            FailureCode::UrlMalformat
        } else if error.is_redirect() {
            FailureCode::TooManyRedirects
        } else if error.is_request() {
            FailureCode::SendError
        } else {
            FailureCode::RecvError
        };
        // reqwest keeps the interesting part (refused, reset, bad chunk) in the sources
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        Self { code, message }
    }
}

pub type Result<T, E = Failure> = std::result::Result<T, E>;

/// Raw outcome of one `execute`: the header blocks of every redirect hop
/// followed by the final header block and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub status: u16,
    pub redirects: u32,
    pub raw: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Prepared) -> Result<Exchange>;
}

/// HTTP/1.x through `reqwest`. Redirects are followed here, hop by hop,
/// so that every intermediate header block ends up in [`Exchange::raw`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

impl HttpTransport {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    fn client(config: &RequestConfig) -> Result<reqwest::Client> {
        let client = ClientBuilder::new()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .http1_only()
            .http1_title_case_headers()
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(client)
    }

    async fn run(&self, request: &Prepared) -> Result<Exchange> {
        let config = &request.config;
        let client = Self::client(config)?;
        let mut url = Url::parse(&request.url).map_err(|e| Failure::new(FailureCode::UrlMalformat, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Failure::new(
                FailureCode::UnsupportedProtocol,
                format!("Protocol \"{}\" not supported", url.scheme()),
            ));
        }
        let mut verb = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Failure::new(FailureCode::SendError, e))?;
        let mut headers = request.headers.clone();
        let mut body = request.body.clone();
        let mut raw = Vec::new();
        let mut redirects = 0;

        loop {
            let response = send(&client, verb.clone(), url.clone(), &headers, &body, config.version).await?;
            let status = response.status();
            let head = head(response.version(), status, response.headers());
            let location = match status.as_u16() {
                301 | 302 | 303 | 307 | 308 if config.maxredirs > 0 => response
                    .headers()
                    .get(LOCATION)
                    .and_then(|location| location.to_str().ok())
                    .map(str::to_owned),
                _ => None,
            };

            let Some(location) = location else {
                let content = response.bytes().await?;
                raw.extend_from_slice(&head);
                raw.extend_from_slice(SEPARATOR);
                raw.extend_from_slice(&content);
                return Ok(Exchange {
                    status: status.as_u16(),
                    redirects,
                    raw,
                });
            };

            if redirects == config.maxredirs {
                return Err(Failure::new(
                    FailureCode::TooManyRedirects,
                    format!("Maximum ({redirects}) redirects followed"),
                ));
            }
            redirects += 1;
            raw.extend_from_slice(&head);
            raw.extend_from_slice(SEPARATOR);

            let next = url
                .join(&location)
                .map_err(|e| Failure::new(FailureCode::UrlMalformat, format!("bad Location '{location}': {e}")))?;
            debug!("redirect {redirects}: {url} -> {next}");
            if next.origin() != url.origin() {
                headers.remove("host");
            }
            let downgrade = matches!(status.as_u16(), 301..=303);
            if downgrade && verb.as_str() != method::GET && verb.as_str() != method::HEAD {
                verb = Method::GET;
                body = Body::Empty;
                headers.remove("content-type");
            }
            url = next;
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Prepared) -> Result<Exchange> {
        // reqwest's timeout is per hop; this one covers the redirect chain
        let limit = request.config.timeout;
        match timeout(limit, self.run(request)).await {
            Ok(result) => result,
            Err(_) => Err(Failure::new(
                FailureCode::OperationTimedOut,
                format!("Operation timed out after {} milliseconds", limit.as_millis()),
            )),
        }
    }
}

async fn send(
    client: &reqwest::Client,
    verb: Method,
    url: Url,
    headers: &HeaderMap,
    body: &Body,
    version: Version,
) -> Result<reqwest::Response> {
    debug!("{verb} {url}");
    let mut builder = client.request(verb, url).version(match version {
        Version::Http10 => reqwest::Version::HTTP_10,
        Version::Http11 => reqwest::Version::HTTP_11,
    });
    let multipart = matches!(body, Body::Multipart(_));
    for (name, _) in headers.iter() {
        // the form supplies its own boundary
        if multipart && name == "content-type" {
            continue;
        }
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Failure::new(FailureCode::SendError, e))?;
        for value in headers.get_all(name) {
            let value = HeaderValue::from_str(value).map_err(|_| {
                Failure::new(FailureCode::SendError, format!("invalid value for header '{name}'"))
            })?;
            builder = builder.header(header.clone(), value);
        }
    }
    builder = match body {
        Body::Empty => builder,
        Body::Bytes(bytes) => builder.body(bytes.clone()),
        Body::Multipart(params) => builder.multipart(form(params).await?),
    };
    Ok(builder.send().await?)
}

/// Rebuilds the status line and header lines of one hop.
fn head(version: reqwest::Version, status: StatusCode, headers: &reqwest::header::HeaderMap) -> Vec<u8> {
    let mut head = format!(
        "{version:?} {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
    .trim_end()
    .to_owned();
    for (name, value) in headers {
        head.push_str("\r\n");
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
    }
    head.into_bytes()
}

async fn form(params: &PostParams) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in params.iter() {
        form = match value {
            PostValue::Text(text) => form.text(name.to_owned(), text.clone()),
            PostValue::File { path, mime } => {
                let data = tokio::fs::read(path).await.map_err(|e| {
                    Failure::new(FailureCode::ReadError, format!("couldn't read {}: {e}", path.display()))
                })?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let part = Part::bytes(data)
                    .file_name(file_name)
                    .mime_str(mime)
                    .map_err(|e| Failure::new(FailureCode::SendError, e))?;
                form.part(name.to_owned(), part)
            }
        };
    }
    Ok(form)
}
