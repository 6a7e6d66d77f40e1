use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::clients::{ClientError, SlugClient, truncate_utf8};
use crate::config::ClientSettings;

/// Slug generator over HTTP: `POST {base}/api/slug` with the paste content
/// and tags, back a unique slug. An empty slug in the response body is an
/// invalid-response condition, never a usable value.
pub struct HttpSlugGen {
    client: reqwest::Client,
    base_url: String,
    max_text_bytes: usize,
}

#[derive(Serialize)]
struct SlugRequest<'a> {
    content: &'a str,
    tags: &'a [String],
}

#[derive(Deserialize)]
struct SlugResponse {
    slug: String,
}

impl HttpSlugGen {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            max_text_bytes: settings.max_text_bytes,
        })
    }
}

#[async_trait]
impl SlugClient for HttpSlugGen {
    async fn generate_slug(&self, content: &str, tags: &[String]) -> Result<String, ClientError> {
        let content = truncate_utf8(content, self.max_text_bytes);

        let response = self
            .client
            .post(format!("{}/api/slug", self.base_url))
            .json(&SlugRequest { content, tags })
            .send()
            .await
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Unavailable(format!(
                "slug generator returned status {status}"
            )));
        }

        let body: SlugResponse = response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        if body.slug.is_empty() {
            return Err(ClientError::InvalidResponse(
                "empty slug in response".to_string(),
            ));
        }
        Ok(body.slug)
    }
}
