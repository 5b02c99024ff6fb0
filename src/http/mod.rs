mod config;
mod cookie;
mod error;
mod header;
mod param;
mod request;
mod response;
pub(crate) mod rewrite;

pub use config::{ConfigOption, RequestConfig, Version};
pub use cookie::Cookie;
pub use error::{Error, Result};
pub use header::{canonical_name, HeaderInput, HeaderMap};
pub use param::{Param, PostParams, PostValue};
pub use request::{method, Body, Prepared, Request};
pub use response::Response;
pub use rewrite::{Resolver, SystemResolver, Target, DNS_TTL};

/// Whether `name` is an RFC 2616 token: no control characters, no
/// separators, no whitespace, not empty.
#[inline]
pub fn is_token(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_token_byte)
}

fn is_token_byte(byte: u8) -> bool {
    !matches!(
        byte,
        0x00..=0x20
            | 0x7f..=0xff
            | b'('
            | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
            | b'{'
            | b'}'
    )
}

/// `application/x-www-form-urlencoded` decoding: `+` is a space, then percent escapes.
pub(crate) fn url_decode(raw: &str) -> String {
    percent_encoding::percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
