//! Throttled HTTP transport.
//!
//! Every request waits on the shared [`Throttle`] first, then issues a single
//! blocking GET. Non-2xx statuses and connection failures come back as
//! [`FetchError`]; retries are the caller's business.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use std::sync::Arc;
use std::time::Duration;

use super::provider::{Fetch, FetchError};
use super::throttle::Throttle;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ACCEPT_LANGUAGE_VALUE: &str = "ja,en-US;q=0.9,en;q=0.8";

/// Blocking HTTP fetcher with randomized inter-request delay.
pub struct RateLimitedFetcher {
    client: reqwest::blocking::Client,
    throttle: Arc<Throttle>,
    api_key: Option<String>,
}

impl RateLimitedFetcher {
    /// Build a fetcher. An empty `api_key` means no `Authorization` header.
    pub fn new(
        throttle: Arc<Throttle>,
        timeout: Duration,
        api_key: &str,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            throttle,
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
        })
    }
}

impl Fetch for RateLimitedFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let delay = self.throttle.wait();
        tracing::debug!(url, ?query, delay_ms = delay.as_millis() as u64, "GET");

        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().map_err(|e| {
            tracing::error!("Error making request to {url}: {e}");
            FetchError::Connection {
                url: url.to_string(),
                cause: e.to_string(),
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::error!("Error making request to {url}: HTTP {status}");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().map_err(|e| FetchError::Connection {
            url: url.to_string(),
            cause: format!("failed to read response body: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectError;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer one request on a local port with `response`; the handle yields
    /// the request head as received.
    fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            head
        });
        (base, handle)
    }

    #[test]
    fn empty_api_key_sends_no_auth() {
        let fetcher =
            RateLimitedFetcher::new(Arc::new(Throttle::disabled()), Duration::from_secs(5), "")
                .unwrap();
        assert!(fetcher.api_key.is_none());
        assert_eq!(fetcher.name(), "http");
    }

    #[test]
    fn unreachable_host_is_a_connection_error() {
        let throttle = Arc::new(Throttle::disabled());
        let fetcher =
            RateLimitedFetcher::new(Arc::clone(&throttle), Duration::from_secs(2), "k").unwrap();

        // Port 9 on localhost (discard) is closed on test machines.
        let err = fetcher
            .fetch("http://127.0.0.1:9/race_results", &[("year", "2020")])
            .unwrap_err();
        assert!(matches!(err, FetchError::Connection { .. }), "{err:?}");
        assert_eq!(throttle.requests(), 1);
    }

    #[test]
    fn non_success_status_is_a_status_error() {
        let (base, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let fetcher =
            RateLimitedFetcher::new(Arc::new(Throttle::disabled()), Duration::from_secs(5), "k")
                .unwrap();
        let url = format!("{base}/race_results");

        let err = fetcher.fetch(&url, &[("year", "2020")]).unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                url: url.clone(),
                status: 503
            }
        );

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /race_results?year=2020 "), "{head}");
        assert!(head.contains("authorization: bearer k"), "{head}");
        assert!(head.contains("accept-language: ja"), "{head}");

        match CollectError::from(err) {
            CollectError::Transport { url: u, cause } => {
                assert_eq!(u, url);
                assert_eq!(cause, "HTTP 503");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn success_returns_body() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 8\r\nConnection: close\r\n\r\n<table/>",
        );
        let fetcher =
            RateLimitedFetcher::new(Arc::new(Throttle::disabled()), Duration::from_secs(5), "")
                .unwrap();

        let body = fetcher
            .fetch(&format!("{base}/horse_data"), &[("year", "1999")])
            .unwrap();
        assert_eq!(body, "<table/>");

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(!head.contains("authorization:"), "{head}");
    }
}
