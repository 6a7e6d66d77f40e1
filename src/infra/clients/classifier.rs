use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::clients::{ClassifierClient, ClientError, truncate_utf8};
use crate::config::ClientSettings;

/// Classifier over HTTP: `POST {base}/api/tags` with the paste text, back a
/// list of suggested tags. Oversized text is truncated before sending.
pub struct HttpClassifier {
    client: reqwest::Client,
    base_url: String,
    max_text_bytes: usize,
}

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TagResponse {
    tags: Vec<String>,
}

impl HttpClassifier {
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
impl ClassifierClient for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<String>, ClientError> {
        let text = truncate_utf8(text, self.max_text_bytes);

        let response = self
            .client
            .post(format!("{}/api/tags", self.base_url))
            .json(&TagRequest { text })
            .send()
            .await
            .map_err(|err| ClientError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Unavailable(format!(
                "classifier returned status {status}"
            )));
        }

        let body: TagResponse = response
            .json()
            .await
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        Ok(body.tags)
    }
}
