use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::{Error, RequestConfig, Result};
use crate::cache::DnsCache;

pub const DNS_TTL: Duration = Duration::from_secs(3600);

/// Where a request is actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    /// Original authority to announce in `Host` when the URL was rewritten.
    pub host: Option<String>,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Option<IpAddr>;
}

/// The operating system's resolver; prefers IPv4 answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Option<IpAddr> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .ok()?
            .map(|addr| addr.ip())
            .collect();
        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
    }
}

/// Applies the proxy or DNS-cache policy of `config` to `url`.
pub(crate) async fn rewrite(
    url: &str,
    config: &RequestConfig,
    cache: &dyn DnsCache,
    resolver: &dyn Resolver,
) -> Result<Target> {
    if let Some(proxy) = &config.proxy {
        let (scheme, authority, rest) = split(url, |c| !matches!(c, '/' | '?' | '#'))?;
        debug!("proxy rewrite: {authority} -> {proxy}");
        return Ok(Target {
            url: format!("{scheme}{proxy}{rest}"),
            host: Some(authority.to_owned()),
        });
    }

    if config.dnscache {
        let (scheme, host, rest) = split(url, |c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))?;
        // a failed lookup keeps the URL and sends no Host override
        if let Some(ip) = lookup(host, cache, resolver).await {
            return Ok(Target {
                url: format!("{scheme}{ip}{rest}"),
                host: Some(host.to_owned()),
            });
        }
    }

    Ok(Target {
        url: url.to_owned(),
        host: None,
    })
}

async fn lookup(host: &str, cache: &dyn DnsCache, resolver: &dyn Resolver) -> Option<Ipv4Addr> {
    if host.is_empty() {
        return None;
    }
    let key = format!("host_{host}");
    if let Some(ip) = cache.get(&key).and_then(|ip| ip.parse::<Ipv4Addr>().ok()) {
        debug!("{key} cache hit");
        return Some(ip);
    }
    debug!("{key} cache miss");

    match resolver.resolve(host).await {
        Some(IpAddr::V4(ip)) => {
            cache.set(&key, ip.to_string(), DNS_TTL);
            Some(ip)
        }
        other => {
            debug!("no IPv4 address for {host}: {other:?}");
            None
        }
    }
}

/// `scheme://`, the leading run of `part` characters, and the remainder.
fn split(url: &str, part: impl Fn(char) -> bool) -> Result<(&str, &str, &str)> {
    let scheme_len = ["http://", "https://"]
        .iter()
        .find(|scheme| {
            url.get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        })
        .map(|scheme| scheme.len())
        .ok_or_else(|| Error::InvalidUrl(url.to_owned()))?;
    let (scheme, after) = url.split_at(scheme_len);
    let end = after.find(|c| !part(c)).unwrap_or(after.len());
    let (middle, rest) = after.split_at(end);
    Ok((scheme, middle, rest))
}
