use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use smol_str::{SmolStr, ToSmolStr};
use url::form_urlencoded;

use super::{Error, Result};

/// A parameter value as supplied by the caller: a scalar, or a nested
/// mapping whose leaves are added under their own names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Scalar(String),
    Map(Vec<(SmolStr, Param)>),
}

impl From<&str> for Param {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_owned())
    }
}

impl From<String> for Param {
    #[inline]
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl<N: ToSmolStr, V: Into<Param>> From<Vec<(N, V)>> for Param {
    #[inline]
    fn from(entries: Vec<(N, V)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(name, value)| (name.to_smolstr(), value.into()))
                .collect(),
        )
    }
}

/// A flattened POST parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValue {
    Text(String),
    File { path: PathBuf, mime: SmolStr },
}

impl Display for PostValue {
    /// The legacy `@path;type=mime` notation for files.
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::File { path, mime } => write!(f, "@{};type={}", path.display(), mime),
        }
    }
}

/// Flat, ordered name -> value mapping. Re-adding a name replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostParams {
    inner: Vec<(SmolStr, PostValue)>,
}

impl PostParams {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn insert(&mut self, name: impl ToSmolStr, value: PostValue) {
        let name = name.to_smolstr();
        match self.inner.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Adds scalar leaves of `param`; a mapping contributes its leaves
    /// under their own names, never under `name`.
    pub(crate) fn add_text(&mut self, name: SmolStr, param: Param) {
        self.walk(name, param, &mut |params, name, value| {
            params.insert(name, PostValue::Text(value));
            Ok::<(), Infallible>(())
        })
        .unwrap_or_else(|never| match never {});
    }

    /// Same walk as [`PostParams::add_text`], leaves being file paths.
    /// Nothing is added unless every file can be attached.
    pub(crate) fn add_files(&mut self, name: SmolStr, param: Param) -> Result<()> {
        let mut staged = Self::new();
        staged.walk(name, param, &mut |params, name, path| {
            let path = PathBuf::from(path);
            let mime = detect_mime(&path)?;
            params.insert(name, PostValue::File { path, mime });
            Ok::<(), Error>(())
        })?;
        for (name, value) in staged.inner {
            self.insert(name, value);
        }
        Ok(())
    }

    fn walk<E>(
        &mut self,
        name: SmolStr,
        param: Param,
        leaf: &mut impl FnMut(&mut Self, SmolStr, String) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        match param {
            Param::Scalar(value) => leaf(self, name, value),
            Param::Map(entries) => {
                for (name, param) in entries {
                    self.walk(name, param, leaf)?;
                }
                Ok(())
            }
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&PostValue> {
        self.inner
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostValue)> {
        self.inner.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// `a=1&b=2`, in insertion order.
    #[inline]
    pub fn to_urlencoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter().map(|(name, value)| (name, value.to_string())))
            .finish()
    }
}

/// Sniffs the first bytes of the file, falling back to its extension.
pub(crate) fn detect_mime(path: &Path) -> Result<SmolStr> {
    let mut file = File::open(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_owned()),
        _ => Error::MimeDetection {
            path: path.to_owned(),
            source,
        },
    })?;
    let mut head = [0u8; 512];
    let mut filled = 0;
    loop {
        let read = file
            .read(&mut head[filled..])
            .map_err(|source| Error::MimeDetection {
                path: path.to_owned(),
                source,
            })?;
        if read == 0 || filled + read == head.len() {
            filled += read;
            break;
        }
        filled += read;
    }
    let head = &head[..filled];

    Ok(sniff(head)
        .or_else(|| mime_from_extension(path))
        .unwrap_or_else(|| {
            if head.is_empty() || std::str::from_utf8(head).is_ok() {
                "text/plain"
            } else {
                "application/octet-stream"
            }
        })
        .into())
}

fn sniff(head: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"BM", "image/bmp"),
        (b"ID3", "audio/mpeg"),
        (b"OggS", "audio/ogg"),
    ];
    if let Some(mime) = SIGNATURES
        .iter()
        .find(|(signature, _)| head.starts_with(signature))
        .map(|(_, mime)| *mime)
    {
        return Some(mime);
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    None
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => return None,
    })
}
