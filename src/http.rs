//! Shared plumbing for the blocking HTTP clients

use std::time::Duration;

use crate::error::{Result, SentinelError};

/// Longest response-body excerpt kept in error messages
const ERROR_BODY_LIMIT: usize = 100;

pub(crate) fn build_agent(read_timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(10))
        .timeout_read(read_timeout)
        .build()
}

pub(crate) fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub(crate) fn encode_url_path_segment(segment: &str) -> String {
    // RFC3986 unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"
    let mut out = String::with_capacity(segment.len());
    for &b in segment.as_bytes() {
        let is_unreserved =
            matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~');
        if is_unreserved {
            out.push(b as char);
        } else {
            out.push('%');
            out.push_str(&format!("{:02X}", b));
        }
    }
    out
}

impl From<ureq::Error> for SentinelError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                SentinelError::Http {
                    status,
                    body: body.chars().take(ERROR_BODY_LIMIT).collect(),
                }
            }
            ureq::Error::Transport(transport) => SentinelError::Transport(transport.to_string()),
        }
    }
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T> {
    response
        .into_json()
        .map_err(|e| SentinelError::Decode(e.to_string()))
}

/// Run a blocking request off the async executor
pub(crate) async fn blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| SentinelError::Internal(format!("blocking request task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::encode_url_path_segment;

    #[test]
    fn encodes_reserved_characters() {
        assert_eq!(encode_url_path_segment("devin-abc_1.2~"), "devin-abc_1.2~");
        assert_eq!(encode_url_path_segment("a/b c"), "a%2Fb%20c");
    }
}
