use smol_str::SmolStr;

use super::{url_decode, Error, Result};

/// `name=value` for the outgoing `Cookie` header.
///
/// Whitespace and `;` are rejected, following the Netscape cookie rules.
pub(crate) fn cookie_pair(name: &str, value: &str) -> Result<String> {
    let cookie = format!("{name}={value}");
    if cookie.chars().any(|c| c.is_whitespace() || c == ';') {
        return Err(Error::InvalidCookie(cookie));
    }
    Ok(cookie)
}

/// A cookie received through `Set-Cookie`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: SmolStr,
    pub value: SmolStr,
    /// Raw date string, quotes removed.
    pub expires: Option<String>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    /// Every other attribute under its lowercase name, value as sent.
    pub attributes: Vec<(SmolStr, Option<String>)>,
}

impl Cookie {
    /// Parses one `Set-Cookie` value. Returns `None` when the leading
    /// segment is not a `name=value` pair.
    #[inline]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut segments = raw.split(';');
        let (name, value) = segments.next()?.split_once('=')?;
        let mut cookie = Self {
            name: name.trim().into(),
            value: value.trim().into(),
            ..Self::default()
        };

        for segment in segments {
            let (name, value) = match segment.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (segment.trim(), None),
            };
            if name.is_empty() {
                continue;
            }
            match name.to_ascii_lowercase().as_str() {
                "secure" => cookie.secure = true,
                "expires" => cookie.expires = value.map(|value| value.replace('"', "")),
                "path" => cookie.path = value.map(url_decode),
                "domain" => cookie.domain = value.map(url_decode),
                other => cookie
                    .attributes
                    .push((other.into(), value.map(str::to_owned))),
            }
        }
        Some(cookie)
    }

    /// Looks up an attribute outside the well-known ones.
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        let name = name.to_ascii_lowercase();
        self.attributes
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_deref())
    }
}
