use std::fmt::{Display, Formatter};

use smol_str::{SmolStr, ToSmolStr};

use super::cookie::cookie_pair;
use super::{
    is_token, ConfigOption, Error, HeaderInput, HeaderMap, Param, PostParams, RequestConfig,
    Response, Result, Target,
};
use crate::client::Client;

pub mod method {
    pub const OPTIONS: &str = "OPTIONS";
    pub const GET: &str = "GET";
    pub const HEAD: &str = "HEAD";
    pub const POST: &str = "POST";
    pub const PUT: &str = "PUT";
    pub const DELETE: &str = "DELETE";
    pub const TRACE: &str = "TRACE";
    pub const CONNECT: &str = "CONNECT";
}

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Request body as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Parameters the transport encodes as `multipart/form-data`.
    Multipart(PostParams),
}

/// A request with every send-time policy applied, ready for a transport.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub method: SmolStr,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Body,
    pub config: RequestConfig,
}

impl Prepared {
    #[inline]
    pub fn request_line(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    /// Value sent as `Host`, when it differs from the URL.
    #[inline]
    pub fn host(&self) -> Option<SmolStr> {
        self.headers.get("host")
    }
}

impl Display for Prepared {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\r\n{}\r\n", self.request_line(), self.headers)?;
        match &self.body {
            Body::Empty => Ok(()),
            Body::Bytes(bytes) => String::from_utf8_lossy(bytes).fmt(f),
            Body::Multipart(params) => {
                for (name, value) in params.iter() {
                    write!(f, "{name}={value}\r\n")?;
                }
                Ok(())
            }
        }
    }
}

/// An outgoing request under construction.
#[derive(Debug, Clone)]
pub struct Request {
    url: String,
    method: SmolStr,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    params: PostParams,
    config: RequestConfig,
}

impl Request {
    /// A `GET` for `url` with the default configuration.
    #[inline]
    pub fn new(url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.replace("user-agent".into(), USER_AGENT.into());
        Self {
            url: url.into(),
            method: method::GET.into(),
            headers,
            body: None,
            params: PostParams::new(),
            config: RequestConfig::default(),
        }
    }

    #[inline]
    pub fn with_config(
        url: impl Into<String>,
        method: &str,
        options: impl IntoIterator<Item = ConfigOption>,
    ) -> Result<Self> {
        let mut request = Self::new(url);
        request.set_method(method)?.set_configs(options);
        Ok(request)
    }

    #[inline]
    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn set_method(&mut self, method: &str) -> Result<&mut Self> {
        if !is_token(method) {
            return Err(Error::InvalidMethod(method.to_owned()));
        }
        self.method = method.into();
        Ok(self)
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Raw body; for `POST` and `PUT` it takes the place of the parameters.
    #[inline]
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// ```
    /// # use httpreq::http::{HeaderInput, Request};
    /// let mut request = Request::new("http://example.com/");
    /// request.set_header("Foo: Bar")?; // foo -> Bar
    /// request.set_header(("FoO", "Baz"))?; // foo -> Baz
    /// request.set_header(vec![("foo", "Quux")])?; // foo -> Quux
    /// request.set_header("FOO")?; // removed
    /// assert!(request.headers().get("foo").is_none());
    /// request.set_header(HeaderInput::Pair("accept".into(), None))?;
    /// # Ok::<(), httpreq::http::Error>(())
    /// ```
    #[inline]
    pub fn set_header(&mut self, input: impl Into<HeaderInput>) -> Result<&mut Self> {
        self.headers.set(input)?;
        Ok(self)
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Appends `name=value` to the `Cookie` header.
    #[inline]
    pub fn add_cookie(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let cookie = cookie_pair(name, value)?;
        let cookies = match self.headers.get("cookie") {
            Some(cookies) => format!("{cookies}; {cookie}"),
            None => cookie,
        };
        self.headers.replace("cookie".into(), cookies.into());
        Ok(self)
    }

    #[inline]
    pub fn add_post_parameter(&mut self, name: impl ToSmolStr, value: impl Into<Param>) -> &mut Self {
        self.default_form_content_type();
        self.params.add_text(name.to_smolstr(), value.into());
        self
    }

    #[inline]
    pub fn add_post_parameters<N: ToSmolStr, V: Into<Param>>(&mut self, params: Vec<(N, V)>) -> &mut Self {
        self.default_form_content_type();
        for (name, value) in params {
            self.params.add_text(name.to_smolstr(), value.into());
        }
        self
    }

    /// Attaches the file at `path` (or every path of a mapping) for a
    /// `multipart/form-data` upload.
    #[inline]
    pub fn add_file_parameter(&mut self, name: impl ToSmolStr, path: impl Into<Param>) -> Result<&mut Self> {
        self.params.add_files(name.to_smolstr(), path.into())?;
        self.headers
            .replace("content-type".into(), MULTIPART_FORM_DATA.into());
        Ok(self)
    }

    #[inline]
    pub fn add_file_parameters<N: ToSmolStr, V: Into<Param>>(&mut self, paths: Vec<(N, V)>) -> Result<&mut Self> {
        // a mapping attaches each entry under its own name
        self.add_file_parameter(SmolStr::default(), Param::from(paths))
    }

    #[inline]
    pub fn post_params(&self) -> &PostParams {
        &self.params
    }

    #[inline]
    pub fn set_config(&mut self, option: ConfigOption) -> &mut Self {
        self.config.set(option);
        self
    }

    #[inline]
    pub fn set_configs(&mut self, options: impl IntoIterator<Item = ConfigOption>) -> &mut Self {
        for option in options {
            self.config.set(option);
        }
        self
    }

    #[inline]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Builds the transport descriptor for `target`. The request itself is
    /// left untouched, so it can be prepared again.
    #[inline]
    pub fn prepare(&self, target: Target) -> Prepared {
        let mut headers = self.headers.clone();
        if let Some(host) = target.host {
            headers.replace("host".into(), host.into());
        }

        let body = match (self.method.as_str(), &self.body) {
            (method::POST | method::PUT, None) if is_form_urlencoded(&headers) => {
                Body::Bytes(self.params.to_urlencoded().into_bytes())
            }
            (method::POST | method::PUT, None) => Body::Multipart(self.params.clone()),
            (_, Some(body)) => Body::Bytes(body.clone()),
            (_, None) => Body::Empty,
        };

        Prepared {
            method: self.method.clone(),
            url: target.url,
            headers,
            body,
            config: self.config.clone(),
        }
    }

    #[inline]
    pub async fn send(&self, client: &Client) -> Result<Response> {
        client.send(self).await
    }

    fn default_form_content_type(&mut self) {
        if !self.headers.contains("content-type") {
            self.headers
                .replace("content-type".into(), FORM_URLENCODED.into());
        }
    }
}

fn is_form_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get("content-type")
        .map_or(true, |content_type| content_type.eq_ignore_ascii_case(FORM_URLENCODED))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::http::PostValue;

    fn verbatim(request: &Request) -> Prepared {
        request.prepare(Target {
            url: request.url().to_owned(),
            host: None,
        })
    }

    #[test]
    fn defaults() {
        let request = Request::new("http://example.com/");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.url(), "http://example.com/");
        assert_eq!(request.headers().get("user-agent").as_deref(), Some(USER_AGENT));
        assert!(request.body().is_none());
        assert_eq!(request.config(), &RequestConfig::default());
    }

    #[test]
    fn cookies_accumulate_in_one_header() {
        let mut request = Request::new("http://example.com/");
        request.add_cookie("sid", "abc123").unwrap().add_cookie("lang", "en").unwrap();
        assert_eq!(request.headers().get("cookie").as_deref(), Some("sid=abc123; lang=en"));
    }

    #[test]
    fn invalid_cookie_leaves_header_alone() {
        let mut request = Request::new("http://example.com/");
        request.add_cookie("sid", "abc").unwrap();
        assert!(matches!(request.add_cookie("bad name", "x"), Err(Error::InvalidCookie(_))));
        assert_eq!(request.headers().get("cookie").as_deref(), Some("sid=abc"));
    }

    #[test]
    fn method_must_be_a_token() {
        let mut request = Request::new("http://example.com/");
        for method in ["GE T", "POST\r\n", "", "A/B"] {
            assert!(matches!(request.set_method(method), Err(Error::InvalidMethod(_))));
        }
        request.set_method("PROPFIND").unwrap();
        assert_eq!(request.method(), "PROPFIND");
        assert!(Request::with_config("http://x/", "BAD METHOD", []).is_err());
    }

    #[test]
    fn post_parameters_become_a_form_body() {
        let mut request = Request::with_config("http://example.com/form", method::POST, []).unwrap();
        request.add_post_parameters(vec![("a", "1"), ("b", "2")]);
        assert_eq!(
            request.headers().get("content-type").as_deref(),
            Some(FORM_URLENCODED)
        );
        let prepared = verbatim(&request);
        assert_eq!(prepared.body, Body::Bytes(b"a=1&b=2".to_vec()));
    }

    #[test]
    fn post_parameters_keep_an_existing_content_type() {
        let mut request = Request::with_config("http://example.com/", method::PUT, []).unwrap();
        request.set_header(("Content-Type", "application/json")).unwrap();
        request.add_post_parameter("a", "1");
        assert_eq!(
            request.headers().get("content-type").as_deref(),
            Some("application/json")
        );
        let prepared = verbatim(&request);
        assert!(matches!(prepared.body, Body::Multipart(params) if params.len() == 1));
    }

    #[test]
    fn explicit_body_takes_precedence() {
        let mut request = Request::with_config("http://example.com/", method::POST, []).unwrap();
        request.add_post_parameter("a", "1").set_body(r#"{"a":1}"#);
        assert_eq!(verbatim(&request).body, Body::Bytes(br#"{"a":1}"#.to_vec()));

        request.set_body(Vec::new());
        assert_eq!(verbatim(&request).body, Body::Bytes(Vec::new()));
    }

    #[test]
    fn get_sends_parameters_nowhere() {
        let mut request = Request::new("http://example.com/");
        request.add_post_parameter("a", "1");
        assert_eq!(verbatim(&request).body, Body::Empty);

        request.set_method(method::DELETE).unwrap().set_body("gone");
        assert_eq!(verbatim(&request).body, Body::Bytes(b"gone".to_vec()));
    }

    #[test]
    fn file_parameters_switch_to_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::File::create(&path).unwrap().write_all(b"%PDF-1.4\n").unwrap();

        let mut request = Request::with_config("http://example.com/upload", method::POST, []).unwrap();
        request.add_post_parameter("title", "Q3");
        request
            .add_file_parameter("report", path.to_string_lossy().into_owned())
            .unwrap();

        assert_eq!(
            request.headers().get("content-type").as_deref(),
            Some(MULTIPART_FORM_DATA)
        );
        let Body::Multipart(params) = verbatim(&request).body else {
            panic!("expected a multipart body");
        };
        assert_eq!(params.get("title"), Some(&PostValue::Text("Q3".into())));
        assert_eq!(
            params.get("report"),
            Some(&PostValue::File { path, mime: "application/pdf".into() })
        );
    }

    #[test]
    fn missing_file_keeps_the_request_unchanged() {
        let mut request = Request::with_config("http://example.com/", method::POST, []).unwrap();
        let result = request.add_file_parameter("f", "/definitely/not/here.bin");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
        assert!(!request.headers().contains("content-type"));
        assert!(request.post_params().is_empty());
    }

    #[test]
    fn one_missing_file_in_a_mapping_attaches_none() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.txt");
        std::fs::write(&good, "hello").unwrap();
        let good = good.to_string_lossy().into_owned();

        let mut request = Request::with_config("http://example.com/", method::POST, []).unwrap();
        let mapping = Param::from(vec![("good", good.as_str()), ("bad", "/no/such/file")]);
        assert!(matches!(
            request.add_file_parameter("files", mapping),
            Err(Error::FileNotFound(_))
        ));
        assert!(request.post_params().is_empty());
        assert!(!request.headers().contains("content-type"));

        let result = request.add_file_parameters(vec![("good", good.as_str()), ("bad", "/no/such/file")]);
        assert!(result.is_err());
        assert!(request.post_params().is_empty());
        assert!(!request.headers().contains("content-type"));
        assert_eq!(verbatim(&request).body, Body::Bytes(Vec::new()));

        request.add_file_parameters(vec![("good", good.as_str())]).unwrap();
        assert!(matches!(
            request.post_params().get("good"),
            Some(PostValue::File { mime, .. }) if mime == "text/plain"
        ));
    }

    #[test]
    fn host_override_lives_only_in_the_prepared_request() {
        let request = Request::new("http://example.com/a");
        let prepared = request.prepare(Target {
            url: "http://10.0.0.1/a".into(),
            host: Some("example.com".into()),
        });
        assert_eq!(prepared.url, "http://10.0.0.1/a");
        assert_eq!(prepared.host().as_deref(), Some("example.com"));
        assert_eq!(request.url(), "http://example.com/a");
        assert!(!request.headers().contains("host"));
    }

    #[test]
    fn configuration_round_trip() {
        let mut request = Request::new("http://example.com/");
        request.set_configs([ConfigOption::MaxRedirs(3), ConfigOption::DnsCache(true)]);
        assert_eq!(request.config().maxredirs, 3);
        assert!(request.config().dnscache);
    }
}
