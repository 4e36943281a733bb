use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::models::{MemoryRequest, MemoryResponse};
use super::state::ServerState;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: axum::http::StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format!("{:#}", err))
    }
}

pub(crate) fn render_memory(
    state: &ServerState,
    request: MemoryRequest,
) -> Result<MemoryResponse, ServerError> {
    let png = state.renderer.render(&request.heading, &request.body)?;
    tracing::info!(
        chat_id = %request.chat_id,
        bytes = png.len(),
        "rendered memory card"
    );
    Ok(MemoryResponse {
        image_base64: BASE64.encode(&png),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardFonts, CardRenderer};
    use std::sync::Arc;

    fn state() -> ServerState {
        ServerState {
            renderer: CardRenderer::new(Arc::new(CardFonts::builtin(36.0, 24.0))),
        }
    }

    fn request(heading: &str, body: &str) -> MemoryRequest {
        MemoryRequest {
            chat_id: "chat-1".to_string(),
            heading: heading.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn response_carries_base64_png() {
        let response = render_memory(&state(), request("Hello", "World")).expect("response");
        let bytes = BASE64.decode(&response.image_base64).expect("base64");
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        let decoded = image::load_from_memory(&bytes).expect("png");
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }

    #[test]
    fn chat_id_does_not_affect_output() {
        let state = state();
        let first = render_memory(&state, request("Same", "content")).expect("first");
        let mut other = request("Same", "content");
        other.chat_id = "another-chat".to_string();
        let second = render_memory(&state, other).expect("second");
        assert_eq!(first.image_base64, second.image_base64);
    }

    #[test]
    fn response_serializes_with_camel_case_key() {
        let response = render_memory(&state(), request("", "")).expect("response");
        let value = serde_json::to_value(&response).expect("serialize");
        assert!(value["imageBase64"].as_str().is_some_and(|value| !value.is_empty()));
        assert!(value.get("image_base64").is_none());
    }

    #[test]
    fn anyhow_errors_become_internal_errors() {
        let err = ServerError::from(anyhow::anyhow!("encode failed").context("rendering"));
        assert_eq!(err.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "rendering: encode failed");
    }
}
