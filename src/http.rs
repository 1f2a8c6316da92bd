use std::io::Read;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Timeouts {
    pub(crate) connect: Duration,
    pub(crate) read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            read: Duration::from_secs(30),
        }
    }
}

fn build_agent(user_agent: &str, timeouts: Timeouts) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(timeouts.connect)
        .timeout_read(timeouts.read)
        .timeout_write(timeouts.read)
        .user_agent(user_agent)
        .build()
}

fn describe_failure(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(status, response) => {
            let response_body = response.into_string().ok().unwrap_or_default();
            let body = response_body.trim();
            if body.is_empty() {
                format!("request failed: HTTP status {status}")
            } else {
                let truncated = body.chars().take(240).collect::<String>();
                format!("request failed: HTTP status {status} ({truncated})")
            }
        }
        ureq::Error::Transport(err) => format!("request failed: transport error: {err}"),
    }
}

/// Single POST, no retries. Returns the response body.
pub(crate) fn post_text(
    url: &str,
    content_type: &str,
    body: &str,
    user_agent: &str,
    timeouts: Timeouts,
) -> Result<String, String> {
    let response = build_agent(user_agent, timeouts)
        .post(url)
        .set("Content-Type", content_type)
        .send_string(body)
        .map_err(describe_failure)?;
    response
        .into_string()
        .map_err(|err| format!("request failed: response decode failed: {err}"))
}

/// Single GET, no retries. Returns the raw response bytes.
pub(crate) fn get_bytes(url: &str, user_agent: &str, timeouts: Timeouts) -> Result<Vec<u8>, String> {
    let response = build_agent(user_agent, timeouts)
        .get(url)
        .call()
        .map_err(describe_failure)?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|err| format!("request failed: reading body failed: {err}"))?;
    Ok(bytes)
}
