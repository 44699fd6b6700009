//! Recording transport for exercising the client and orchestrator without a network.

use std::io::Cursor;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::engine::error::EndpointError;
use crate::engine::llm_client::{parse_body, Transport};

#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

/// Routes are matched by URL prefix; unrouted URLs fail with a transport error.
#[derive(Default)]
pub struct FakeTransport {
    json_routes: Vec<(String, Result<Value, EndpointError>)>,
    byte_routes: Vec<(String, Result<Vec<u8>, EndpointError>)>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn respond(mut self, prefix: &str, result: Result<Value, EndpointError>) -> Self {
        self.json_routes.push((prefix.to_string(), result));
        self
    }

    /// Routes a raw response body through the same parsing as the HTTP transport.
    pub fn respond_body(self, prefix: &str, raw: &str) -> Self {
        self.respond(prefix, parse_body(raw))
    }

    pub fn respond_bytes(mut self, prefix: &str, result: Result<Vec<u8>, EndpointError>) -> Self {
        self.byte_routes.push((prefix.to_string(), result));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }

    fn record(&self, url: &str, body: Option<Value>, bearer: Option<&str>) {
        self.calls.lock().push(Call {
            url: url.to_string(),
            body,
            bearer: bearer.map(str::to_string),
        });
    }
}

fn route<R: Clone>(routes: &[(String, Result<R, EndpointError>)], url: &str) -> Result<R, EndpointError> {
    routes
        .iter()
        .find(|(prefix, _)| url.starts_with(prefix.as_str()))
        .map(|(_, result)| result.clone())
        .unwrap_or_else(|| Err(EndpointError::Transport(format!("no route to {url}"))))
}

impl Transport for FakeTransport {
    fn post_json<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<Value, EndpointError> {
        self.record(url, serde_json::to_value(body).ok(), bearer);
        route(&self.json_routes, url)
    }

    fn get_bytes(&self, url: &str, bearer: Option<&str>) -> Result<Vec<u8>, EndpointError> {
        self.record(url, None, bearer);
        route(&self.byte_routes, url)
    }
}

pub fn png_bytes(width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 120, 40, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
