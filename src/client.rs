use std::sync::Arc;

use log::{debug, warn};

use crate::cache::{DnsCache, MemoryCache};
use crate::compress::try_decompress;
use crate::http::{rewrite::rewrite, Error, Request, Resolver, Response, Result, SystemResolver};
use crate::service::{LoggerService, Service};
use crate::transport::{HttpTransport, Transport};

/// Sends [`Request`]s: applies the proxy and DNS-cache policy, hands the
/// prepared request to a [`Transport`] and parses what comes back.
pub struct Client {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn DnsCache>,
    resolver: Arc<dyn Resolver>,
    services: Vec<Arc<dyn Service>>,
}

impl Client {
    #[inline]
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            cache: Arc::new(MemoryCache::new()),
            resolver: Arc::new(SystemResolver),
            services: Vec::new(),
        }
    }

    /// Shares `cache` between clients, e.g. one per process.
    #[inline]
    pub fn with_cache(mut self, cache: Arc<dyn DnsCache>) -> Self {
        self.cache = cache;
        self
    }

    #[inline]
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Services run in order after every successful exchange.
    #[inline]
    pub fn with_service(mut self, service: impl Service + 'static) -> Self {
        self.services.push(Arc::new(service));
        self
    }

    pub async fn send(&self, request: &Request) -> Result<Response> {
        let target = rewrite(
            request.url(),
            request.config(),
            self.cache.as_ref(),
            self.resolver.as_ref(),
        )
        .await?;
        let host = target.host.clone();
        let prepared = request.prepare(target);
        debug!("sending {}", prepared.request_line());

        let exchange = self
            .transport
            .execute(&prepared)
            .await
            .map_err(|failure| Error::Transport {
                code: failure.code as u16,
                message: failure.message,
                url: prepared.url.clone(),
                host,
            })?;

        let mut response = Response::parse(exchange.status, &exchange.raw, exchange.redirects);
        if request.headers().contains("accept-encoding") {
            response = decode(response);
        }

        for service in &self.services {
            service.call(&prepared, &response).await?;
        }
        Ok(response)
    }
}

impl Default for Client {
    #[inline]
    fn default() -> Self {
        Self::new(HttpTransport::new()).with_service(LoggerService)
    }
}

/// Undoes the response's `Content-Encoding`; on failure the body is kept as sent.
fn decode(response: Response) -> Response {
    let (Some(encoding), Some(body)) = (response.header("content-encoding"), response.body()) else {
        return response;
    };
    match try_decompress(&encoding, body) {
        Ok(Some(decoded)) => response.with_body(decoded),
        Ok(None) => response,
        Err(e) => {
            warn!("couldn't decode {encoding} body: {e}");
            response
        }
    }
}
