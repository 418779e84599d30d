use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Response;
use serde::{Deserialize, Serialize};

use crate::domain::{CustomPrompt, FilterConfig, Platform, Verdict};

pub const DEFAULT_API_URL: &str = "https://api.x.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "grok-4-1-fast-non-reasoning";
pub const TEMPERATURE: f32 = 0.1;

pub const CRINGE_TOKEN: &str = "POST_IS_CRINGE";
pub const NOT_CRINGE_TOKEN: &str = "POST_IS_NOT_CRINGE";
const FALLBACK_REASON: &str = "Cringe content";
const RESPONSE_FORMAT_HINT: &str = "Respond EXACTLY in one line: if cringe, 'POST_IS_CRINGE: <one short reason>'; if not, 'POST_IS_NOT_CRINGE'.";

static CRINGE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)post_is_cringe\s*:?").expect("valid cringe token regex"));

fn analyzer_intro(platform: Platform) -> String {
    format!("You are a {} post analyzer.", platform.display_name())
}

/// System instruction for one post. A valid custom prompt replaces the
/// filter-derived instruction entirely; with no active filters the model is
/// told to never flag anything.
pub fn compose_system_prompt(
    platform: Platform,
    filters: &FilterConfig,
    custom: Option<&CustomPrompt>,
) -> String {
    if let Some(custom) = custom {
        return custom.as_str().to_string();
    }
    let intro = analyzer_intro(platform);
    let criteria = filters.active();
    if criteria.is_empty() {
        return format!("{intro} No filters are active. Always respond with {NOT_CRINGE_TOKEN}.");
    }
    let bullets = criteria
        .iter()
        .map(|category| category.clause())
        .collect::<Vec<_>>()
        .join("\n- ");
    format!(
        "{intro} Determine if the post meets any of these criteria:\n- {bullets}\n\
         If any criteria are met, respond with {CRINGE_TOKEN}, otherwise {NOT_CRINGE_TOKEN}."
    )
}

pub fn build_request(
    model: String,
    system_prompt: String,
    platform: Platform,
    post_content: &str,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system".into(),
                content: system_prompt,
            },
            ChatMessage {
                role: "user".into(),
                content: format!(
                    "{} Post:\n\n{}\n\n{}",
                    platform.display_name(),
                    post_content,
                    RESPONSE_FORMAT_HINT
                ),
            },
        ],
        temperature: TEMPERATURE,
    }
}

pub async fn parse_response(response: Response) -> Result<Verdict> {
    let completion: ChatCompletionResponse = response
        .json()
        .await
        .context("classifier response was not valid JSON")?;
    if let Some(error) = completion.error {
        tracing::warn!(target: "classifier", %error, "classifier returned an error payload");
        return Ok(Verdict::clean());
    }
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default();
    Ok(parse_verdict(&content))
}

/// Reads the model's one-line answer. Anything that does not mention the
/// positive token is a negative verdict.
pub fn parse_verdict(content: &str) -> Verdict {
    let raw = content.trim();
    if !raw.to_lowercase().contains(&CRINGE_TOKEN.to_lowercase()) {
        return Verdict::clean();
    }
    let reason = CRINGE_SPLIT
        .split(raw)
        .nth(1)
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .unwrap_or(FALLBACK_REASON);
    Verdict::cringe(reason)
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatCompletionMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FilterCategory;

    #[test]
    fn zero_filters_means_never_cringe() {
        let prompt = compose_system_prompt(Platform::LinkedIn, &FilterConfig::none(), None);
        assert_eq!(
            prompt,
            "You are a LinkedIn post analyzer. No filters are active. Always respond with POST_IS_NOT_CRINGE."
        );
    }

    #[test]
    fn active_filters_become_bullets() {
        let mut filters = FilterConfig::none();
        filters.set(FilterCategory::Harassment, true);
        filters.set(FilterCategory::IntrusiveAds, true);
        let prompt = compose_system_prompt(Platform::Twitter, &filters, None);

        assert!(prompt.starts_with(
            "You are a Twitter/X post analyzer. Determine if the post meets any of these criteria:\n- "
        ));
        assert!(prompt.contains(FilterCategory::Harassment.clause()));
        assert!(prompt.contains(FilterCategory::IntrusiveAds.clause()));
        assert!(!prompt.contains(FilterCategory::Misleading.clause()));
        assert!(prompt.ends_with("otherwise POST_IS_NOT_CRINGE."));
    }

    #[test]
    fn custom_prompt_replaces_filters() {
        let custom = CustomPrompt::parse("Only flag posts that brag about waking up early").unwrap();
        let prompt =
            compose_system_prompt(Platform::LinkedIn, &FilterConfig::none(), Some(&custom));
        assert_eq!(prompt, "Only flag posts that brag about waking up early");
    }

    #[test]
    fn request_carries_platform_heading_and_low_temperature() {
        let request = build_request(
            DEFAULT_MODEL.into(),
            "system".into(),
            Platform::Twitter,
            "gm",
        );
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .starts_with("Twitter/X Post:\n\ngm\n\n"));
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn parses_positive_answers_with_reason() {
        assert_eq!(
            parse_verdict("POST_IS_CRINGE: uses engagement bait"),
            Verdict::cringe("uses engagement bait")
        );
        assert_eq!(
            parse_verdict("  post_is_cringe :  humblebrag  "),
            Verdict::cringe("humblebrag")
        );
    }

    #[test]
    fn positive_answer_without_reason_gets_fallback() {
        assert_eq!(parse_verdict("POST_IS_CRINGE"), Verdict::cringe("Cringe content"));
        assert_eq!(parse_verdict("POST_IS_CRINGE:"), Verdict::cringe("Cringe content"));
    }

    #[test]
    fn repeated_token_keeps_only_the_first_reason() {
        assert_eq!(
            parse_verdict("POST_IS_CRINGE: humblebrag POST_IS_CRINGE: bait"),
            Verdict::cringe("humblebrag")
        );
    }

    #[test]
    fn negative_and_garbage_answers_are_clean() {
        assert_eq!(parse_verdict("POST_IS_NOT_CRINGE"), Verdict::clean());
        assert_eq!(parse_verdict(""), Verdict::clean());
        assert_eq!(parse_verdict("I cannot help with that"), Verdict::clean());
    }
}
