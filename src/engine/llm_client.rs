use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::error::{EndpointError, GenerationError};
use crate::engine::narrative_parser::{extract_choices, NormalizedTextResult};
use crate::engine::prompt_builder::NARRATOR_INSTRUCTION;
use crate::engine::response_normalizer::normalize_payload;
use crate::model::image_slot::SceneImage;
use crate::model::policy::GenerationRequestPolicy;

pub const TEMPERATURE: f32 = 0.8;
pub const MAX_TOKENS: u32 = 500;
pub const IMAGE_WIDTH: u32 = 1024;
pub const IMAGE_HEIGHT: u32 = 576;

/// Escapes everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const PROMPT_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Where generation requests go. Loaded from the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub text_primary: String,
    pub text_fallback: String,
    pub image_primary: String,
    pub image_fallback: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            text_primary: "https://enter.pollinations.ai/api/generate/v1".into(),
            text_fallback: "https://text.pollinations.ai/openai".into(),
            image_primary: "https://enter.pollinations.ai/api/generate/image".into(),
            image_fallback: "https://image.pollinations.ai/prompt".into(),
            model: "openai".into(),
            timeout_secs: 60,
        }
    }
}

/// One HTTP round trip. Non-success statuses are errors.
pub trait Transport: Send {
    fn post_json<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<Value, EndpointError>;

    fn get_bytes(&self, url: &str, bearer: Option<&str>) -> Result<Vec<u8>, EndpointError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<Value, EndpointError> {
        let mut req = self.client.post(url).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        let resp = req.send().map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EndpointError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let raw = resp.text().map_err(transport_error)?;
        parse_body(&raw)
    }

    fn get_bytes(&self, url: &str, bearer: Option<&str>) -> Result<Vec<u8>, EndpointError> {
        let mut req = self.client.get(url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        let resp = req.send().map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EndpointError::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(resp.bytes().map_err(transport_error)?.to_vec())
    }
}

fn transport_error(err: reqwest::Error) -> EndpointError {
    EndpointError::Transport(err.to_string())
}

/// A 200 with a body that isn't JSON (busy pages, portals) is a failed attempt.
pub fn parse_body(raw: &str) -> Result<Value, EndpointError> {
    serde_json::from_str(raw).map_err(|e| EndpointError::InvalidBody(e.to_string()))
}

/// Runs each generation call against a primary endpoint, then a fallback.
///
/// A primary failure is logged and swallowed; only a failed fallback is
/// reported. The primary is never retried.
pub struct FallbackClient<T: Transport> {
    transport: T,
    endpoints: EndpointConfig,
}

impl<T: Transport> FallbackClient<T> {
    pub fn new(transport: T, endpoints: EndpointConfig) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn request_text(
        &self,
        prompt: &str,
        policy: &GenerationRequestPolicy,
    ) -> Result<NormalizedTextResult, GenerationError> {
        let body = ChatCompletionRequest {
            model: self.endpoints.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: NARRATOR_INSTRUCTION.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: prompt.into(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let bearer = policy.bearer();

        let payload = with_fallback(
            "text",
            policy.allow_primary_endpoint,
            || self.transport.post_json(&self.endpoints.text_primary, &body, bearer),
            || self.transport.post_json(&self.endpoints.text_fallback, &body, bearer),
        )?;

        Ok(extract_choices(&normalize_payload(&payload)))
    }

    /// Best effort: any failure ends as `None`.
    pub fn request_image(
        &self,
        prompt: &str,
        policy: &GenerationRequestPolicy,
    ) -> Option<SceneImage> {
        let fetch = |base: &str, bearer: Option<&str>| -> Result<SceneImage, EndpointError> {
            let url = image_url(base, prompt)?;
            let bytes = self.transport.get_bytes(url.as_str(), bearer)?;
            decode_image(&bytes)
        };

        let result = with_fallback(
            "image",
            policy.allow_primary_endpoint,
            || fetch(&self.endpoints.image_primary, policy.bearer()),
            // The public fallback takes no credentials.
            || fetch(&self.endpoints.image_fallback, None),
        );

        match result {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("no scene image: {e}");
                None
            }
        }
    }
}

fn with_fallback<R>(
    kind: &str,
    allow_primary: bool,
    primary: impl FnOnce() -> Result<R, EndpointError>,
    fallback: impl FnOnce() -> Result<R, EndpointError>,
) -> Result<R, GenerationError> {
    let primary_error = if allow_primary {
        match primary() {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::warn!("{kind} primary endpoint failed, trying fallback: {e}");
                Some(e)
            }
        }
    } else {
        None
    };

    fallback().map_err(|fallback| GenerationError::BothEndpointsFailed {
        primary: primary_error,
        fallback,
    })
}

/// `<base>/<encoded prompt>?width=1024&height=576`
pub fn image_url(base: &str, prompt: &str) -> Result<Url, EndpointError> {
    let mut url = Url::parse(base).map_err(|e| EndpointError::InvalidUrl(format!("{base}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(EndpointError::InvalidUrl(base.to_string()));
    }

    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        utf8_percent_encode(prompt, PROMPT_SEGMENT)
    );
    url.set_path(&path);

    url.query_pairs_mut()
        .append_pair("width", &IMAGE_WIDTH.to_string())
        .append_pair("height", &IMAGE_HEIGHT.to_string());

    Ok(url)
}

fn decode_image(bytes: &[u8]) -> Result<SceneImage, EndpointError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| EndpointError::UndecodableImage(e.to_string()))?
        .to_rgba8();
    let (w, h) = img.dimensions();

    Ok(SceneImage {
        width: w as usize,
        height: h as usize,
        rgba: img.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::testing::{png_bytes, FakeTransport};

    fn endpoints() -> EndpointConfig {
        EndpointConfig {
            text_primary: "http://primary.test/text".into(),
            text_fallback: "http://fallback.test/text".into(),
            image_primary: "http://primary.test/image".into(),
            image_fallback: "http://fallback.test/image".into(),
            ..EndpointConfig::default()
        }
    }

    fn policy(allow_primary: bool, token: &str) -> GenerationRequestPolicy {
        GenerationRequestPolicy {
            allow_primary_endpoint: allow_primary,
            bearer_token: token.into(),
        }
    }

    #[test]
    fn disabled_primary_is_never_contacted() -> anyhow::Result<()> {
        let transport = FakeTransport::default()
            .respond("http://fallback.test/text", Ok(json!("Dusk. [Sleep]")));
        let client = FallbackClient::new(transport, endpoints());

        let result = client.request_text("look", &policy(false, ""))?;
        assert_eq!(result.narrative_text, "Dusk.");
        assert_eq!(result.suggested_choices, ["Sleep"]);

        let calls = client.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "http://fallback.test/text");
        Ok(())
    }

    #[test]
    fn primary_success_skips_fallback() -> anyhow::Result<()> {
        let transport = FakeTransport::default().respond(
            "http://primary.test/text",
            Ok(json!({ "choices": [{ "message": { "content": "Dawn." } }] })),
        );
        let client = FallbackClient::new(transport, endpoints());

        let result = client.request_text("look", &policy(true, ""))?;
        assert_eq!(result.narrative_text, "Dawn.");

        let urls = client.transport().urls();
        assert_eq!(urls, ["http://primary.test/text"]);
        Ok(())
    }

    #[test]
    fn primary_failure_falls_back_exactly_once() -> anyhow::Result<()> {
        let transport = FakeTransport::default()
            .respond(
                "http://primary.test/text",
                Err(EndpointError::HttpStatus { status: 500 }),
            )
            .respond("http://fallback.test/text", Ok(json!({ "output": ["a", "b"] })));
        let client = FallbackClient::new(transport, endpoints());

        let result = client.request_text("look", &policy(true, ""))?;
        assert_eq!(result.narrative_text, "a\nb");

        let urls = client.transport().urls();
        assert_eq!(urls, ["http://primary.test/text", "http://fallback.test/text"]);
        Ok(())
    }

    #[test]
    fn both_failures_surface_one_error() {
        let transport = FakeTransport::default()
            .respond(
                "http://primary.test/text",
                Err(EndpointError::Transport("reset".into())),
            )
            .respond(
                "http://fallback.test/text",
                Err(EndpointError::HttpStatus { status: 502 }),
            );
        let client = FallbackClient::new(transport, endpoints());

        let err = client.request_text("look", &policy(true, "")).err();
        assert_eq!(
            err,
            Some(GenerationError::BothEndpointsFailed {
                primary: Some(EndpointError::Transport("reset".into())),
                fallback: EndpointError::HttpStatus { status: 502 },
            })
        );
        assert_eq!(client.transport().calls().len(), 2);
    }

    #[test]
    fn non_json_primary_body_falls_back_once() -> anyhow::Result<()> {
        let transport = FakeTransport::default()
            .respond_body(
                "http://primary.test/text",
                "<html><body>Service busy, try later</body></html>",
            )
            .respond_body(
                "http://fallback.test/text",
                r#"{"choices":[{"message":{"content":"The gate opens. [Enter]"}}]}"#,
            );
        let client = FallbackClient::new(transport, endpoints());

        let result = client.request_text("look", &policy(true, ""))?;
        assert_eq!(result.narrative_text, "The gate opens.");
        assert_eq!(result.suggested_choices, ["Enter"]);

        let urls = client.transport().urls();
        assert_eq!(urls, ["http://primary.test/text", "http://fallback.test/text"]);
        Ok(())
    }

    #[test]
    fn non_json_fallback_body_is_an_error() {
        let transport = FakeTransport::default()
            .respond_body("http://fallback.test/text", "Service busy");
        let client = FallbackClient::new(transport, endpoints());

        let err = client.request_text("look", &policy(false, "")).err();
        assert!(matches!(
            err,
            Some(GenerationError::BothEndpointsFailed {
                primary: None,
                fallback: EndpointError::InvalidBody(_),
            })
        ));
    }

    #[test]
    fn json_string_body_is_accepted() -> anyhow::Result<()> {
        assert_eq!(parse_body(r#""A bare line.""#)?, json!("A bare line."));
        assert!(matches!(parse_body("A bare line."), Err(EndpointError::InvalidBody(_))));
        Ok(())
    }

    #[test]
    fn text_request_carries_fixed_parameters_and_token() -> anyhow::Result<()> {
        let transport = FakeTransport::default()
            .respond(
                "http://primary.test/text",
                Err(EndpointError::HttpStatus { status: 401 }),
            )
            .respond("http://fallback.test/text", Ok(json!("ok")));
        let client = FallbackClient::new(transport, endpoints());

        client.request_text("Player: Do: look", &policy(true, "secret"))?;

        let calls = client.transport().calls();
        for call in &calls {
            assert_eq!(call.bearer.as_deref(), Some("secret"));
            let body = call.body.as_ref().ok_or_else(|| anyhow::anyhow!("no body"))?;
            assert_eq!(body["model"], "openai");
            assert_eq!(body["max_tokens"], 500);
            assert!((body["temperature"].as_f64().unwrap_or_default() - 0.8).abs() < 1e-6);
            assert_eq!(body["messages"][0]["role"], "system");
            assert_eq!(body["messages"][1]["role"], "user");
            assert_eq!(body["messages"][1]["content"], "Player: Do: look");
        }
        Ok(())
    }

    #[test]
    fn image_url_encodes_prompt_and_size() -> anyhow::Result<()> {
        let url = image_url("https://image.test/prompt/", "A cave, lit by fire?")?;
        assert_eq!(
            url.as_str(),
            "https://image.test/prompt/A%20cave%2C%20lit%20by%20fire%3F?width=1024&height=576"
        );
        Ok(())
    }

    #[test]
    fn image_url_escapes_reserved_characters() -> anyhow::Result<()> {
        let url = image_url("https://image.test/prompt", "salt+pepper & ale=1; 5:00 @inn/cellar")?;
        assert_eq!(
            url.path(),
            "/prompt/salt%2Bpepper%20%26%20ale%3D1%3B%205%3A00%20%40inn%2Fcellar"
        );

        let url = image_url("https://image.test", "(it's *here*!) ~é")?;
        assert_eq!(url.path(), "/(it's%20*here*!)%20~%C3%A9");
        Ok(())
    }

    #[test]
    fn image_fallback_is_unauthenticated() -> anyhow::Result<()> {
        let png = png_bytes(4, 3)?;
        let transport = FakeTransport::default()
            .respond_bytes("http://primary.test/image/", Err(EndpointError::HttpStatus { status: 403 }))
            .respond_bytes("http://fallback.test/image/", Ok(png));
        let client = FallbackClient::new(transport, endpoints());

        let image = client
            .request_image("a cave", &policy(true, "secret"))
            .ok_or_else(|| anyhow::anyhow!("expected an image"))?;
        assert_eq!((image.width, image.height), (4, 3));
        assert_eq!(image.rgba.len(), 4 * 3 * 4);

        let calls = client.transport().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].bearer.as_deref(), Some("secret"));
        assert_eq!(calls[1].bearer, None);
        Ok(())
    }

    #[test]
    fn undecodable_image_counts_as_failure() {
        let transport = FakeTransport::default()
            .respond_bytes("http://fallback.test/image/", Ok(b"<html>busy</html>".to_vec()));
        let client = FallbackClient::new(transport, endpoints());

        assert!(client.request_image("a cave", &policy(false, "")).is_none());
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[test]
    fn image_failure_is_absent_not_error() {
        let client = FallbackClient::new(FakeTransport::default(), endpoints());
        assert!(client.request_image("a cave", &policy(true, "")).is_none());
        assert_eq!(client.transport().calls().len(), 2);
    }
}
