//! Image captioning proxy.
//!
//! Forwards an uploaded image to an external captioning service and relays
//! whatever JSON it answers with. Purely optional: the route is only mounted
//! when a service URL is configured, and nothing else depends on it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::Json;
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use reqwest::multipart;

use crate::coordinator::protocol::MessageBody;

pub struct DescriptionClient {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl DescriptionClient {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn describe(
        &self,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    ) -> Result<serde_json::Value> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&content_type)
            .context("invalid image content type")?;
        let form = multipart::Form::new().part("image", part);

        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .context("captioning service unreachable")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "captioning service responded with status {}",
                response.status()
            ));
        }

        response
            .json::<serde_json::Value>()
            .await
            .context("captioning service sent a malformed response")
    }
}

pub async fn handle_describe(
    Extension(client): Extension<Arc<DescriptionClient>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<MessageBody>)> {
    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(MessageBody {
                        message: err.to_string(),
                    }),
                ));
            }
        };
        if field.name() == Some("image") {
            let file_name = field
                .file_name()
                .map(|name| name.to_string())
                .unwrap_or_else(|| "upload".to_string());
            let content_type = field
                .content_type()
                .map(|mime| mime.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            match field.bytes().await {
                Ok(bytes) => file = Some((file_name, content_type, bytes.to_vec())),
                Err(err) => {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        Json(MessageBody {
                            message: err.to_string(),
                        }),
                    ));
                }
            }
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(MessageBody {
                message: "No image file provided".to_string(),
            }),
        ));
    };

    match client.describe(file_name, content_type, bytes).await {
        Ok(description) => Ok(Json(description)),
        Err(err) => {
            tracing::error!("caption request failed: {:#}", err);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(MessageBody {
                    message: err.to_string(),
                }),
            ))
        }
    }
}
