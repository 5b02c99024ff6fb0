use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result};

use smol_str::SmolStr;

use super::{find, is_token, Cookie, HeaderMap};

const SEPARATOR: &[u8] = b"\r\n\r\n";

/// A parsed response. Built once from the raw bytes the transport
/// returned, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    cookies: Vec<Cookie>,
    body: Option<Vec<u8>>,
}

impl Response {
    /// Parses `raw`, the bytes of a whole exchange. `status` comes from the
    /// transport. When the transport followed `redirects` redirects, the
    /// leading header blocks of the intermediate hops are skipped.
    #[inline]
    pub fn parse(status: u16, raw: &[u8], redirects: u32) -> Self {
        let raw = skip_blocks(raw, redirects);
        let (head, body) = match find(raw, SEPARATOR) {
            Some(index) => (&raw[..index], Some(raw[index + SEPARATOR.len()..].to_vec())),
            None => (raw, None),
        };

        let mut parser = HeaderParser::default();
        // the status line is not re-read, `status` is authoritative
        for line in String::from_utf8_lossy(head).split("\r\n").skip(1) {
            parser.line(line);
        }
        let (headers, cookies) = parser.finish();

        Self {
            status,
            headers,
            cookies,
            body,
        }
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[inline]
    pub fn header(&self, name: &str) -> Option<SmolStr> {
        self.headers.get(name)
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// `None` when the response had no blank line after its headers.
    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    #[inline]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body().unwrap_or_default())
    }

    pub(crate) fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

impl Display for Response {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}\r\n{}", self.status, self.headers)?;
        for cookie in &self.cookies {
            write!(f, "Set-Cookie: {}={}\r\n", cookie.name, cookie.value)?;
        }
        write!(f, "\r\n{}", self.text())
    }
}

fn skip_blocks(mut raw: &[u8], blocks: u32) -> &[u8] {
    for _ in 0..blocks {
        match find(raw, SEPARATOR) {
            Some(index) => raw = &raw[index + SEPARATOR.len()..],
            None => break,
        }
    }
    raw
}

#[derive(Default)]
struct HeaderParser {
    headers: HeaderMap,
    last: Option<SmolStr>,
}

impl HeaderParser {
    fn line(&mut self, line: &str) {
        let line = line.trim_matches(|c| c == '\r' || c == '\n');

        if let Some((name, value)) = line.split_once(':') {
            if is_token(name) && !value.is_empty() {
                let name: SmolStr = name.to_ascii_lowercase().into();
                self.headers.push(name.clone(), value.trim().into());
                self.last = Some(name);
                return;
            }
        }

        if line.starts_with(char::is_whitespace) {
            let continuation = line.trim();
            if let (Some(last), false) = (&self.last, continuation.is_empty()) {
                self.headers.fold(last, continuation);
            }
        }
    }

    fn finish(mut self) -> (HeaderMap, Vec<Cookie>) {
        let cookies = self
            .headers
            .remove("set-cookie")
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| Cookie::parse(raw))
            .collect();
        (self.headers, cookies)
    }
}
