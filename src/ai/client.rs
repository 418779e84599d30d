use anyhow::Result;
use reqwest::Client;

use crate::{
    config::ClassifierConfig,
    domain::{Platform, Verdict},
};

use super::inference::{build_request, parse_response};

#[derive(Clone)]
pub struct RemoteClassifier {
    http: Client,
    config: ClassifierConfig,
}

impl RemoteClassifier {
    pub fn new(http: Client, config: ClassifierConfig) -> Self {
        Self { http, config }
    }

    /// Sends one post to the chat-completions endpoint. Transport and decode
    /// failures are returned as errors; an `error` payload from the service is
    /// already a clean verdict.
    pub async fn classify(
        &self,
        api_key: &str,
        system_prompt: String,
        platform: Platform,
        post_content: &str,
    ) -> Result<Verdict> {
        let request = build_request(
            self.config.model.clone(),
            system_prompt,
            platform,
            post_content,
        );
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .timeout(self.config.request_timeout)
            .json(&request)
            .send()
            .await?;

        let verdict = parse_response(response).await?;
        Ok(verdict)
    }
}
