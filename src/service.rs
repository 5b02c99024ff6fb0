use async_trait::async_trait;

use crate::http::{Prepared, Response, Result};

/// Hook run by the [`Client`](crate::client::Client) after each exchange.
#[async_trait]
pub trait Service: Send + Sync {
    async fn call(&self, request: &Prepared, response: &Response) -> Result<()>;
}

/// Prints one colored line per exchange to stderr.
pub struct LoggerService;

#[async_trait]
impl Service for LoggerService {
    async fn call(&self, request: &Prepared, response: &Response) -> Result<()> {
        use colored::Colorize;
        let via = request
            .host()
            .map(|host| format!(" (Host: {host})"))
            .unwrap_or_default();
        eprintln!(
            r#""{}"{} - {}"#,
            request.request_line().bright_cyan(),
            via,
            response
                .status()
                .to_string()
                .color(match response.status().to_string().chars().next() {
                    Some('1') => "cyan",
                    Some('2') => "green",
                    Some('3') => "yellow",
                    Some('4') => "red",
                    Some('5') => "purple",
                    _ => "normal",
                }),
        );
        Ok(())
    }
}
