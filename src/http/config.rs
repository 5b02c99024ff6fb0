use std::fmt::{Display, Formatter};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Version {
    #[default]
    Http10,
    Http11,
}

impl Display for Version {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Resolve the host up front and connect to the IPv4 literal.
    pub dnscache: bool,
    /// Host (and optional port) that replaces the URL's authority.
    pub proxy: Option<String>,
    /// Redirects the transport may follow; 0 disables following.
    pub maxredirs: u32,
    pub version: Version,
    /// Certificate and hostname verification. Off by default so that
    /// IP literals from the DNS cache still connect: INSECURE.
    pub verify_tls: bool,
}

impl Default for RequestConfig {
    #[inline]
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(50),
            dnscache: false,
            proxy: None,
            maxredirs: 0,
            version: Version::Http10,
            verify_tls: false,
        }
    }
}

/// One overridable configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOption {
    ConnectTimeout(Duration),
    Timeout(Duration),
    DnsCache(bool),
    Proxy(Option<String>),
    MaxRedirs(u32),
    Version(Version),
    VerifyTls(bool),
}

impl RequestConfig {
    #[inline]
    pub fn set(&mut self, option: ConfigOption) {
        match option {
            ConfigOption::ConnectTimeout(timeout) => self.connect_timeout = timeout,
            ConfigOption::Timeout(timeout) => self.timeout = timeout,
            ConfigOption::DnsCache(enabled) => self.dnscache = enabled,
            ConfigOption::Proxy(proxy) => self.proxy = proxy.filter(|proxy| !proxy.is_empty()),
            ConfigOption::MaxRedirs(max) => self.maxredirs = max,
            ConfigOption::Version(version) => self.version = version,
            ConfigOption::VerifyTls(verify) => self.verify_tls = verify,
        }
    }

    #[inline]
    pub fn with(mut self, options: impl IntoIterator<Item = ConfigOption>) -> Self {
        for option in options {
            self.set(option);
        }
        self
    }
}
