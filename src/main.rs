use std::env;
use std::time::Duration;

use httpreq::http::{ConfigOption, Request, Version};
use httpreq::{BoxError, Client};

/// Reads `HTTPREQ_*` variables into configuration overrides.
fn options_from_env() -> Vec<ConfigOption> {
    let var = |name: &str| env::var(format!("HTTPREQ_{name}")).ok();
    let secs = |raw: String| Duration::from_secs_f64(raw.parse().expect("timeouts are in seconds"));
    let flag = |raw: String| matches!(raw.as_str(), "1" | "true" | "yes" | "on");

    let mut options = Vec::new();
    if let Some(proxy) = var("PROXY") {
        options.push(ConfigOption::Proxy(Some(proxy)));
    }
    if let Some(raw) = var("DNSCACHE") {
        options.push(ConfigOption::DnsCache(flag(raw)));
    }
    if let Some(raw) = var("MAXREDIRS") {
        options.push(ConfigOption::MaxRedirs(raw.parse().expect("HTTPREQ_MAXREDIRS is a count")));
    }
    if let Some(raw) = var("TIMEOUT") {
        options.push(ConfigOption::Timeout(secs(raw)));
    }
    if let Some(raw) = var("CONNECT_TIMEOUT") {
        options.push(ConfigOption::ConnectTimeout(secs(raw)));
    }
    if let Some(raw) = var("VERIFY_TLS") {
        options.push(ConfigOption::VerifyTls(flag(raw)));
    }
    if var("HTTP11").is_some_and(flag) {
        options.push(ConfigOption::Version(Version::Http11));
    }
    options
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: httpreq URL [Name:value | key=value | key=@path]...");
        std::process::exit(2);
    };
    let method = env::var("HTTPREQ_METHOD").unwrap_or_else(|_| "GET".to_owned());
    let mut request = Request::with_config(url, &method, options_from_env())?;

    for arg in args {
        match arg.split_once(['=', ':']) {
            Some((name, value)) if arg.as_bytes()[name.len()] == b':' => {
                request.set_header(format!("{name}:{value}"))?;
            }
            Some((name, path)) if path.starts_with('@') => {
                request.add_file_parameter(name, &path[1..])?;
            }
            Some((name, value)) => {
                request.add_post_parameter(name, value);
            }
            None => return Err(format!("can't interpret argument '{arg}'").into()),
        }
    }

    let response = request.send(&Client::default()).await?;
    println!("{response}");
    Ok(())
}
