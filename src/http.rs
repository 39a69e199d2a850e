use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HttpOptions {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

impl HttpOptions {
    pub(crate) fn single_attempt(self) -> Self {
        Self {
            attempts: 1,
            ..self
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
            attempts: 2,
            retry_delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum HttpError {
    #[error("HTTP status {status}")]
    Status {
        status: u16,
        body: String,
        attempts: usize,
    },
    #[error("transport error after {attempts} attempt(s): {detail}")]
    Transport { detail: String, attempts: usize },
    #[error("response decode failed: {0}")]
    Body(String),
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

/// Sends one request, retrying retryable statuses and transport failures.
/// Only GET requests are retried; a POST is sent exactly once.
pub(crate) fn send_with_retries(
    method: Method,
    url: &str,
    query: &[(String, String)],
    json_body: Option<&str>,
    options: &HttpOptions,
) -> Result<HttpResponse, HttpError> {
    let attempts = match method {
        Method::Get => options.attempts.max(1),
        Method::Post => 1,
    };
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(options.connect_timeout)
        .timeout_read(options.read_timeout)
        .timeout_write(options.read_timeout)
        .build();

    for attempt in 1..=attempts {
        let mut request = agent.request(method.as_str(), url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        debug!(method = method.as_str(), url, attempt, "sending request");

        let result = match json_body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_string(body),
            None => request.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                return match response.into_string() {
                    Ok(body) => Ok(HttpResponse { status, body }),
                    Err(err) => Err(HttpError::Body(err.to_string())),
                };
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().ok().unwrap_or_default();
                if should_retry_http_status(status) && attempt < attempts {
                    warn!(url, status, attempt, "retryable status, retrying");
                    thread::sleep(options.retry_delay);
                    continue;
                }
                return Err(HttpError::Status {
                    status,
                    body: body.trim().to_string(),
                    attempts: attempt,
                });
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt < attempts {
                    warn!(url, attempt, error = %err, "transport error, retrying");
                    thread::sleep(options.retry_delay);
                    continue;
                }
                return Err(HttpError::Transport {
                    detail: err.to_string(),
                    attempts: attempt,
                });
            }
        }
    }

    Err(HttpError::Transport {
        detail: "exhausted attempts without a concrete error".to_string(),
        attempts,
    })
}


#[cfg(test)]
mod tests {
    use super::test_server::{Behavior, TestServer};
    use super::*;

    fn options(attempts: usize, read_timeout: Duration) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_millis(200),
            read_timeout,
            attempts,
            retry_delay: Duration::from_millis(1),
        }
    }

    fn query() -> Vec<(String, String)> {
        vec![("q".to_string(), "x".to_string())]
    }

    #[test]
    fn retries_retryable_statuses_until_success() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(500, "server-error".to_string()),
            Behavior::Respond(429, "throttled".to_string()),
            Behavior::Respond(200, "ok".to_string()),
        ]);

        let result = send_with_retries(
            Method::Get,
            &server.base_url,
            &query(),
            None,
            &options(3, Duration::from_millis(200)),
        );

        let response = result.expect("should eventually succeed");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
        assert_eq!(server.request_count(), 3);
    }

    #[test]
    fn does_not_retry_hard_client_errors() {
        let server = TestServer::spawn(vec![Behavior::Respond(404, "not-found".to_string())]);

        let result = send_with_retries(
            Method::Get,
            &server.base_url,
            &query(),
            None,
            &options(5, Duration::from_millis(200)),
        );

        let err = result.expect_err("404 should not be retried");
        assert_eq!(
            err,
            HttpError::Status {
                status: 404,
                body: "not-found".to_string(),
                attempts: 1,
            }
        );
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn retries_transport_timeout_and_recovers() {
        let server = TestServer::spawn(vec![
            Behavior::DelayRespond(Duration::from_millis(120), 200, "slow".to_string()),
            Behavior::Respond(200, "ok".to_string()),
        ]);

        let result = send_with_retries(
            Method::Get,
            &server.base_url,
            &query(),
            None,
            &HttpOptions {
                connect_timeout: Duration::from_millis(250),
                ..options(2, Duration::from_millis(20))
            },
        );

        assert_eq!(result.expect("timeout should be retried").body, "ok");
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn returns_last_status_when_retries_are_exhausted() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(503, "down".to_string()),
            Behavior::Respond(503, "still-down".to_string()),
        ]);

        let result = send_with_retries(
            Method::Get,
            &server.base_url,
            &query(),
            None,
            &options(2, Duration::from_millis(200)),
        );

        match result.expect_err("retryable failures should eventually error") {
            HttpError::Status {
                status,
                body,
                attempts,
            } => {
                assert_eq!(status, 503);
                assert_eq!(body, "still-down");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn post_is_sent_once_even_on_retryable_status() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(503, "down".to_string()),
            Behavior::Respond(202, "accepted".to_string()),
        ]);

        let result = send_with_retries(
            Method::Post,
            &server.base_url,
            &[],
            Some(r#"{"k":"v"}"#),
            &options(3, Duration::from_millis(200)),
        );

        assert!(result.is_err());
        assert_eq!(server.request_count(), 1);
        let recorded = server.recorded();
        assert_eq!(recorded[0].method, "POST");
        assert_eq!(recorded[0].body, r#"{"k":"v"}"#);
    }
}
