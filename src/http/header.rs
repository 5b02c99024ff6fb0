use std::fmt::{Display, Formatter, Result as FmtResult};

use smol_str::{SmolStr, ToSmolStr};

use super::{is_token, Error, Result};

/// The shapes accepted by [`HeaderMap::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderInput {
    /// `name` and its value; `None` removes the header.
    Pair(SmolStr, Option<SmolStr>),
    /// `"Name: value"`, split on the first colon. A line without a colon
    /// names a header to remove.
    Line(String),
    /// Many headers applied in order. Names repeated within the mapping
    /// (in any case) accumulate instead of replacing each other.
    Many(Vec<(SmolStr, Option<SmolStr>)>),
}

impl From<&str> for HeaderInput {
    #[inline]
    fn from(line: &str) -> Self {
        Self::Line(line.to_owned())
    }
}

impl From<String> for HeaderInput {
    #[inline]
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

impl<N: ToSmolStr, V: ToSmolStr> From<(N, V)> for HeaderInput {
    #[inline]
    fn from((name, value): (N, V)) -> Self {
        Self::Pair(name.to_smolstr(), Some(value.to_smolstr()))
    }
}

impl<N: ToSmolStr, V: ToSmolStr> From<Vec<(N, V)>> for HeaderInput {
    #[inline]
    fn from(headers: Vec<(N, V)>) -> Self {
        Self::Many(
            headers
                .into_iter()
                .map(|(name, value)| (name.to_smolstr(), Some(value.to_smolstr())))
                .collect(),
        )
    }
}

/// Case-insensitive header storage. Names are kept lowercase, in first
/// insertion order; a name may carry several values, which are joined with
/// `", "` whenever the header is read as a single string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    inner: Vec<(SmolStr, Vec<SmolStr>)>,
}

impl HeaderMap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&mut self, input: impl Into<HeaderInput>) -> Result<()> {
        match input.into() {
            HeaderInput::Pair(name, value) => self.set_one(&name, value),
            HeaderInput::Line(line) => match line.split_once(':') {
                Some((name, value)) => self.set_one(name.trim(), Some(value.trim().into())),
                None => self.set_one(line.trim(), None),
            },
            HeaderInput::Many(headers) => {
                if let Some((name, _)) = headers.iter().find(|(name, _)| !is_token(name)) {
                    return Err(Error::InvalidHeaderName(name.to_string()));
                }
                let mut seen: Vec<SmolStr> = Vec::with_capacity(headers.len());
                for (name, value) in headers {
                    let name = lowercase(&name);
                    match value {
                        Some(value) if seen.contains(&name) => self.push(name, value),
                        value => {
                            self.set_one(&name, value)?;
                            seen.push(name);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Replaces every value of `name` with `value`.
    #[inline]
    pub fn insert(&mut self, name: &str, value: impl ToSmolStr) -> Result<()> {
        self.set_one(name, Some(value.to_smolstr()))
    }

    #[inline]
    pub fn remove(&mut self, name: &str) -> Option<Vec<SmolStr>> {
        let name = lowercase(name);
        let index = self.inner.iter().position(|(key, _)| *key == name)?;
        Some(self.inner.remove(index).1)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<SmolStr> {
        self.values(name).map(join)
    }

    #[inline]
    pub fn get_all(&self, name: &str) -> &[SmolStr] {
        self.values(name).unwrap_or_default()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.values(name).is_some()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, SmolStr)> {
        self.inner
            .iter()
            .map(|(name, values)| (name.as_str(), join(values)))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// `Name: value` lines with canonically capitalised names.
    #[inline]
    pub fn to_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| format!("{}: {}", canonical_name(name), value))
            .collect()
    }

    /// Parser entry point: `name` is already a lowercase token.
    pub(crate) fn push(&mut self, name: SmolStr, value: SmolStr) {
        match self.inner.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => values.push(value),
            None => self.inner.push((name, vec![value])),
        }
    }

    /// Continues the last value of `name` with a folded line.
    pub(crate) fn fold(&mut self, name: &str, continuation: &str) {
        let last = self
            .inner
            .iter_mut()
            .find(|(key, _)| key == name)
            .and_then(|(_, values)| values.last_mut());
        if let Some(last) = last {
            *last = format!("{last} {continuation}").into();
        }
    }

    /// Like [`HeaderMap::insert`] for a name known to be a lowercase token.
    pub(crate) fn replace(&mut self, name: SmolStr, value: SmolStr) {
        match self.inner.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => *values = vec![value],
            None => self.inner.push((name, vec![value])),
        }
    }

    fn set_one(&mut self, name: &str, value: Option<SmolStr>) -> Result<()> {
        let name = validated(name)?;
        match value {
            None => {
                self.remove(&name);
            }
            Some(value) => self.replace(name, value),
        }
        Ok(())
    }

    fn values(&self, name: &str) -> Option<&[SmolStr]> {
        let name = lowercase(name);
        self.inner
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, values)| values.as_slice())
    }
}

impl Display for HeaderMap {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for line in self.to_lines() {
            write!(f, "{line}\r\n")?;
        }
        Ok(())
    }
}

/// `content-type` -> `Content-Type`.
#[inline]
pub fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

fn validated(name: &str) -> Result<SmolStr> {
    if is_token(name) {
        Ok(lowercase(name))
    } else {
        Err(Error::InvalidHeaderName(name.to_owned()))
    }
}

fn lowercase(name: &str) -> SmolStr {
    name.to_ascii_lowercase().into()
}

fn join(values: &[SmolStr]) -> SmolStr {
    match values {
        [single] => single.clone(),
        values => values.join(", ").into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_names() {
        let mut headers = HeaderMap::new();
        for name in ["Bad Name", "X\r\nInjected", "a\n", "(x)", "a@b", "semi;colon", "q?", "br[a]ce"] {
            let result = headers.set(HeaderInput::Pair(name.into(), Some("v".into())));
            assert!(matches!(result, Err(Error::InvalidHeaderName(_))), "{name:?}");
        }
        assert!(headers.is_empty());
    }

    #[test]
    fn line_and_pair_forms_are_equivalent() {
        let mut from_line = HeaderMap::new();
        from_line.set("Foo: Bar").unwrap();
        let mut from_pair = HeaderMap::new();
        from_pair.set(("FOO", "Bar")).unwrap();
        assert_eq!(from_line, from_pair);
        assert_eq!(from_line.get("foo").as_deref(), Some("Bar"));
    }

    #[test]
    fn line_splits_on_first_colon_only() {
        let mut headers = HeaderMap::new();
        headers.set("Referer:  http://example.com:8080/ ").unwrap();
        assert_eq!(
            headers.get("referer").as_deref(),
            Some("http://example.com:8080/")
        );
    }

    #[test]
    fn pair_replaces_previous_value() {
        let mut headers = HeaderMap::new();
        headers.set(("Foo", "Bar")).unwrap();
        headers.set(("FoO", "Baz")).unwrap();
        assert_eq!(headers.get("FOO").as_deref(), Some("Baz"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn mapping_collisions_accumulate() {
        let mut headers = HeaderMap::new();
        headers.set(vec![("foo", "a"), ("Foo", "b")]).unwrap();
        assert_eq!(headers.get("foo").as_deref(), Some("a, b"));
        assert_eq!(headers.get_all("foo"), ["a", "b"]);
        assert_eq!(headers.to_lines(), ["Foo: a, b"]);
    }

    #[test]
    fn mapping_replaces_values_set_before_it() {
        let mut headers = HeaderMap::new();
        headers.set(("Accept", "text/html")).unwrap();
        headers.set(vec![("accept", "*/*")]).unwrap();
        assert_eq!(headers.get("accept").as_deref(), Some("*/*"));
    }

    #[test]
    fn mapping_with_invalid_name_changes_nothing() {
        let mut headers = HeaderMap::new();
        let result = headers.set(vec![("good", "1"), ("bad name", "2")]);
        assert!(matches!(result, Err(Error::InvalidHeaderName(name)) if name == "bad name"));
        assert!(!headers.contains("good"));
    }

    #[test]
    fn absent_value_removes_and_empty_value_is_kept() {
        let mut headers = HeaderMap::new();
        headers.set(("X-Token", "secret")).unwrap();
        headers.set(HeaderInput::Pair("x-token".into(), None)).unwrap();
        assert!(headers.get("x-token").is_none());

        headers.set(("X-Empty", "")).unwrap();
        assert_eq!(headers.get("x-empty").as_deref(), Some(""));

        headers.set("X-EMPTY").unwrap();
        assert!(!headers.contains("x-empty"));
    }

    #[test]
    fn canonicalises_on_emission_only() {
        let mut headers = HeaderMap::new();
        headers.set(("content-type", "text/plain")).unwrap();
        headers.set(("X-REQUESTED-WITH", "test")).unwrap();
        assert_eq!(
            headers.to_string(),
            "Content-Type: text/plain\r\nX-Requested-With: test\r\n"
        );
        assert_eq!(headers.iter().next().map(|(name, _)| name), Some("content-type"));
    }

    #[test]
    fn canonical_name_capitalises_each_word() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("www-authenticate"), "Www-Authenticate");
        assert_eq!(canonical_name("host"), "Host");
        assert_eq!(canonical_name("x--y"), "X--Y");
    }

    #[test]
    fn fold_extends_the_last_value() {
        let mut headers = HeaderMap::new();
        headers.push("x-long".into(), "first".into());
        headers.push("x-long".into(), "second".into());
        headers.fold("x-long", "more");
        assert_eq!(headers.get("x-long").as_deref(), Some("first, second more"));
    }
}
