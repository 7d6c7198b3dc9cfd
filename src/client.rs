//! Client for the generative-language `generateContent` endpoint.
//!
//! One logical call is one POST. Only HTTP 429 is retried, with exponential
//! backoff; every other failure ends the call immediately.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ConsultError;

/// Text used when a successful response carries no candidate text.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't generate a meaningful response based on your pitch.";

/// Anything that can turn a query and a system prompt into reply text.
///
/// The session only depends on this, so it can be driven without a network.
pub trait Generate {
    fn generate(&self, user_query: &str, system_prompt: &str) -> Result<String, ConsultError>;
}

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(user_query: &'a str, system_prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: user_query }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: system_prompt,
                }],
            },
        }
    }
}

/// Tolerant view of the response: every level may be missing or null.
#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Option<Candidate>>>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<Option<ResponsePart>>>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()??
            .content?
            .parts?
            .into_iter()
            .next()??
            .text
            .filter(|t| !t.is_empty())
    }
}

/// Pull the reply text out of a response body, falling back when absent.
pub fn extract_reply(body: &str) -> Result<String, ConsultError> {
    let parsed: Option<GenerateResponse> = serde_json::from_str(body)?;
    Ok(parsed
        .and_then(GenerateResponse::first_text)
        .unwrap_or_else(|| FALLBACK_REPLY.to_string()))
}

/// Delay before the retry that follows failed attempt `attempt` (0-based).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Blocking client with rate-limit retries.
pub struct GeminiClient {
    agent: ureq::Agent,
    url: String,
    api_key: String,
    max_attempts: u32,
    base_delay: Duration,
    sleep: Sleeper,
}

impl GeminiClient {
    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &Config) -> Result<Self, ConsultError> {
        let api_key = config
            .api
            .api_key()
            .ok_or_else(|| ConsultError::MissingApiKey {
                var: config.api.api_key_env.clone(),
            })?;
        Ok(Self::new(&config.api.generate_url(), &api_key)
            .timeout(config.api.timeout())
            .max_attempts(config.retry.max_attempts)
            .base_delay(config.retry.base_delay()))
    }

    /// Create a client for `url` with default retry settings (5 attempts, 1s base).
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            agent: build_agent(None),
            url: url.to_string(),
            api_key: api_key.to_string(),
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Set a global per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(Some(timeout));
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub const fn base_delay(mut self, base: Duration) -> Self {
        self.base_delay = base;
        self
    }

    /// Replace the sleep used between retries.
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    fn post(&self, body: &str) -> Result<(u16, String, String), ConsultError> {
        let response = self
            .agent
            .post(self.url.as_str())
            .header("content-type", "application/json")
            .header("x-goog-api-key", self.api_key.as_str())
            .send(body)?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let text = response.into_body().read_to_string()?;
        Ok((status.as_u16(), reason, text))
    }
}

fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    // Statuses are inspected by hand so 429 can be told apart from other failures.
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .into()
}

impl Generate for GeminiClient {
    fn generate(&self, user_query: &str, system_prompt: &str) -> Result<String, ConsultError> {
        let body = serde_json::to_string(&GenerateRequest::new(user_query, system_prompt))?;

        for attempt in 0..self.max_attempts {
            tracing::debug!(attempt, url = %self.url, "posting generateContent");

            let (status, reason, text) = self.post(&body).inspect_err(|e| {
                tracing::error!(attempt, error = %e, "request failed");
            })?;

            if status == 429 {
                if attempt + 1 < self.max_attempts {
                    let delay = backoff_delay(self.base_delay, attempt);
                    tracing::warn!(attempt, ?delay, "rate limited, backing off");
                    (self.sleep)(delay);
                    continue;
                }
                tracing::error!(attempts = self.max_attempts, "rate limit retries exhausted");
                return Err(ConsultError::RateLimitExhausted {
                    attempts: self.max_attempts,
                });
            }

            if !(200..300).contains(&status) {
                tracing::error!(status, %reason, "API call failed");
                return Err(ConsultError::Api { status, reason });
            }

            return extract_reply(&text);
        }

        Err(ConsultError::RateLimitExhausted {
            attempts: self.max_attempts,
        })
    }
}

/// A [`GeminiClient`] built from config on first use.
///
/// Questions stopped before the model call never need the API key.
pub struct LazyClient {
    config: Config,
    client: OnceLock<Arc<GeminiClient>>,
}

impl LazyClient {
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            client: OnceLock::new(),
        }
    }

    /// The shared client, building it on the first call.
    pub fn client(&self) -> Result<Arc<GeminiClient>, ConsultError> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(GeminiClient::from_config(&self.config)?);
        Ok(Arc::clone(self.client.get_or_init(|| client)))
    }
}

impl Generate for LazyClient {
    fn generate(&self, user_query: &str, system_prompt: &str) -> Result<String, ConsultError> {
        self.client()?.generate(user_query, system_prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::thread;

    /// Serve the scripted `(status, body)` responses, one per connection, and
    /// return the URL plus a handle yielding the captured request bodies.
    fn serve(responses: Vec<(u16, String)>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut bodies = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let trimmed = line.trim_end();
                    if trimmed.is_empty() {
                        break;
                    }
                    let lower = trimmed.to_ascii_lowercase();
                    if let Some(v) = lower.strip_prefix("content-length:") {
                        content_length = v.trim().parse().unwrap();
                    }
                }
                let mut req_body = vec![0u8; content_length];
                reader.read_exact(&mut req_body).unwrap();
                bodies.push(String::from_utf8(req_body).unwrap());

                let mut stream = stream;
                write!(
                    stream,
                    "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                )
                .unwrap();
                stream.flush().unwrap();
            }
            bodies
        });
        (format!("http://{addr}/v1beta/models/test:generateContent"), handle)
    }

    fn ok_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
        .to_string()
    }

    fn recording_client(url: &str) -> (GeminiClient, Arc<Mutex<Vec<Duration>>>) {
        let slept = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&slept);
        let client = GeminiClient::new(url, "test-key")
            .timeout(Duration::from_secs(5))
            .with_sleeper(move |d| log.lock().unwrap().push(d));
        (client, slept)
    }

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_secs(1);
        let delays: Vec<_> = (0..4).map(|a| backoff_delay(base, a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8]);
    }

    #[test]
    fn request_payload_shape() {
        let body = serde_json::to_value(GenerateRequest::new("q", "sys")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{"parts": [{"text": "q"}]}],
                "systemInstruction": {"parts": [{"text": "sys"}]}
            })
        );
    }

    #[test]
    fn extract_reply_falls_back() {
        assert_eq!(extract_reply(&ok_body("hi")).unwrap(), "hi");
        assert_eq!(extract_reply("{}").unwrap(), FALLBACK_REPLY);
        assert_eq!(extract_reply(r#"{"candidates": []}"#).unwrap(), FALLBACK_REPLY);
        assert_eq!(
            extract_reply(r#"{"candidates": [{"content": {"parts": []}}]}"#).unwrap(),
            FALLBACK_REPLY
        );
        assert_eq!(extract_reply(&ok_body("")).unwrap(), FALLBACK_REPLY);
        assert!(matches!(extract_reply("not json"), Err(ConsultError::Decode(_))));
    }

    #[test]
    fn extract_reply_treats_null_as_missing() {
        for body in [
            "null",
            r#"{"candidates": null}"#,
            r#"{"candidates": [null]}"#,
            r#"{"candidates": [{"content": null}]}"#,
            r#"{"candidates": [{"content": {"parts": null}}]}"#,
            r#"{"candidates": [{"content": {"parts": [null]}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"text": null}]}}]}"#,
        ] {
            assert_eq!(extract_reply(body).unwrap(), FALLBACK_REPLY, "body: {body}");
        }
    }

    #[test]
    fn success_first_try() {
        let (url, server) = serve(vec![(200, ok_body("Form a Delaware C-corp."))]);
        let (client, slept) = recording_client(&url);

        let reply = client.generate("question", "be a lawyer").unwrap();
        assert_eq!(reply, "Form a Delaware C-corp.");
        assert!(slept.lock().unwrap().is_empty());

        let bodies = server.join().unwrap();
        let sent: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(sent["contents"][0]["parts"][0]["text"], "question");
        assert_eq!(sent["systemInstruction"]["parts"][0]["text"], "be a lawyer");
    }

    #[test]
    fn retries_429_with_geometric_backoff() {
        let (url, server) = serve(vec![
            (429, "{}".into()),
            (429, "{}".into()),
            (429, "{}".into()),
            (200, ok_body("finally")),
        ]);
        let (client, slept) = recording_client(&url);

        assert_eq!(client.generate("q", "s").unwrap(), "finally");
        assert_eq!(
            *slept.lock().unwrap(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(server.join().unwrap().len(), 4);
    }

    #[test]
    fn exhausts_after_five_429s() {
        let (url, server) = serve(vec![(429, "{}".into()); 5]);
        let (client, slept) = recording_client(&url);

        let err = client.generate("q", "s").unwrap_err();
        assert!(matches!(err, ConsultError::RateLimitExhausted { attempts: 5 }));
        // No sleep after the final attempt.
        assert_eq!(slept.lock().unwrap().len(), 4);
        // The server only scripted five responses; a sixth request would hang
        // the client until its timeout and fail differently.
        assert_eq!(server.join().unwrap().len(), 5);
    }

    #[test]
    fn other_status_is_not_retried() {
        let (url, server) = serve(vec![(503, "{}".into())]);
        let (client, slept) = recording_client(&url);

        let err = client.generate("q", "s").unwrap_err();
        match err {
            ConsultError::Api { status, .. } => assert_eq!(status, 503),
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(slept.lock().unwrap().is_empty());
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn malformed_body_aborts() {
        let (url, server) = serve(vec![(200, "<html>".into())]);
        let (client, _) = recording_client(&url);
        assert!(matches!(client.generate("q", "s"), Err(ConsultError::Decode(_))));
        server.join().unwrap();
    }

    #[test]
    fn connection_refused_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let (client, slept) = recording_client(&format!("http://{addr}/x"));
        assert!(matches!(client.generate("q", "s"), Err(ConsultError::Transport(_))));
        assert!(slept.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_key_is_reported() {
        let mut config = Config::default();
        config.api.api_key_env = "PITCHDESK_TEST_KEY_THAT_IS_NEVER_SET".into();
        match GeminiClient::from_config(&config) {
            Err(ConsultError::MissingApiKey { var }) => {
                assert_eq!(var, "PITCHDESK_TEST_KEY_THAT_IS_NEVER_SET");
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("expected missing key"),
        }
    }

    #[test]
    fn lazy_client_reports_missing_key_on_use() {
        let mut config = Config::default();
        config.api.api_key_env = "PITCHDESK_TEST_KEY_THAT_IS_NEVER_SET".into();
        let lazy = LazyClient::new(config);
        assert!(matches!(
            lazy.generate("q", "s"),
            Err(ConsultError::MissingApiKey { .. })
        ));
        assert!(lazy.client().is_err());
    }

    #[test]
    fn lazy_client_is_built_once() {
        let mut config = Config::default();
        // Any variable that is always set will do as a key.
        config.api.api_key_env = "PATH".into();
        let lazy = LazyClient::new(config);
        let first = lazy.client().unwrap();
        let second = lazy.client().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
