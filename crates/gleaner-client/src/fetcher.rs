use std::error::Error as StdError;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use gleaner_core::error::AppError;
use gleaner_core::models::{FetchErrorKind, FetchOutcome};
use gleaner_core::traits::Fetcher;
use reqwest::Client;
use url::Url;

/// Desktop browser User-Agent sent unless the caller picks another.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Largest response body read before the page is refused.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// HTTP fetcher using reqwest.
///
/// Every failure is folded into a [`FetchOutcome`] so a batch never sees a
/// transport error escape. Redirects are followed; the final status decides
/// success. SSRF protection is **off** by default because the CLI runs on the
/// user's own machine; the server turns it on with
/// [`block_private_urls`](Self::block_private_urls).
///
/// The address check, the request and the body read all share the single
/// deadline passed to [`Fetcher::fetch`].
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    ssrf_protection: bool,
    max_body_bytes: usize,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Wrap a preconfigured client. Deadlines are still applied per request.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            ssrf_protection: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Refuse bodies larger than `limit` bytes.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Refuse URLs that resolve to private or reserved addresses.
    pub fn block_private_urls(mut self) -> Self {
        self.ssrf_protection = true;
        self
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome {
        within_deadline(timeout, self.fetch_page(url, timeout)).await
    }
}

impl ReqwestFetcher {
    async fn fetch_page(&self, url: &str, timeout: Duration) -> FetchOutcome {
        if self.ssrf_protection {
            if let Err((kind, message)) = validate_url(url).await {
                tracing::warn!(%url, %message, "Refusing to fetch");
                return FetchOutcome::failure(kind, message);
            }
        }

        let mut response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return classify(&e, timeout),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "Non-success status");
            return FetchOutcome::failure(FetchErrorKind::HttpStatus, status.as_u16().to_string());
        }

        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return body_too_large(limit);
        }

        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > limit {
                        return body_too_large(limit);
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => return classify(&e, timeout),
            }
        }

        FetchOutcome::Success {
            html: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

/// Bound a whole fetch by one deadline, reporting overrun as a timeout.
async fn within_deadline<Fut>(timeout: Duration, fetch: Fut) -> FetchOutcome
where
    Fut: Future<Output = FetchOutcome>,
{
    match tokio::time::timeout(timeout, fetch).await {
        Ok(outcome) => outcome,
        Err(_) => FetchOutcome::failure(FetchErrorKind::Timeout, format!("{timeout:?}")),
    }
}

fn body_too_large(limit: usize) -> FetchOutcome {
    FetchOutcome::failure(
        FetchErrorKind::Unknown,
        format!("response body exceeds {limit} bytes"),
    )
}

fn classify(err: &reqwest::Error, timeout: Duration) -> FetchOutcome {
    if err.is_timeout() {
        FetchOutcome::failure(FetchErrorKind::Timeout, format!("{timeout:?}"))
    } else if err.is_connect() {
        FetchOutcome::failure(FetchErrorKind::Connection, error_chain(err))
    } else {
        FetchOutcome::failure(FetchErrorKind::Unknown, error_chain(err))
    }
}

/// reqwest hides the useful part (DNS, refused, TLS) in the source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate a URL to prevent server-side request forgery (SSRF).
///
/// 1. Only allow `http` and `https` schemes.
/// 2. Resolve the hostname via DNS.
/// 3. Reject if any resolved IP is private/reserved.
async fn validate_url(url: &str) -> Result<(), (FetchErrorKind, String)> {
    let blocked = |message: String| (FetchErrorKind::Unknown, message);

    let parsed = Url::parse(url).map_err(|e| blocked(format!("Invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(blocked(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| blocked("URL has no host".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(blocked(format!(
                "SSRF blocked: {host} resolves to private/reserved IP"
            )));
        }
        return Ok(());
    }

    let port = parsed.port_or_known_default().unwrap_or(80);
    let addrs: Vec<_> = match tokio::net::lookup_host((host, port)).await {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            return Err((
                FetchErrorKind::Connection,
                format!("DNS resolution failed for {host}: {e}"),
            ));
        }
    };

    if addrs.is_empty() {
        return Err((
            FetchErrorKind::Connection,
            format!("DNS resolution returned no addresses for {host}"),
        ));
    }

    if let Some(addr) = addrs.iter().find(|a| is_private_ip(a.ip())) {
        return Err(blocked(format!(
            "SSRF blocked: {host} resolves to private/reserved IP {}",
            addr.ip()
        )));
    }

    Ok(())
}

/// Check if an IP address is in a private/reserved/link-local range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // 169.254.0.0/16, cloud metadata
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10 (CGN)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // fe80::/10
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // fc00::/7
                || match v6.to_ipv4_mapped() {
                    Some(v4) => is_private_ip(IpAddr::V4(v4)),
                    None => false,
                }
        }
    }
}
