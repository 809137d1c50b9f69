//! Gemini-backed rewriter — a single generateContent call per improve.

use async_trait::async_trait;
use coldreach_core::config::RewriteConfig;
use coldreach_core::error::{OutreachError, Result};

use crate::guard::{protect_tokens, restore_tokens, sanitize_html};
use crate::Rewriter;

/// Rewriter backed by the Gemini generateContent API.
pub struct GeminiRewriter {
    client: reqwest::Client,
    config: RewriteConfig,
}

impl GeminiRewriter {
    pub fn new(config: RewriteConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(OutreachError::Config(
                "rewrite API key is not configured".into(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.endpoint, self.config.model, self.config.api_key
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .client
            .post(self.url())
            .json(&payload)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| OutreachError::Rewrite(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OutreachError::Rewrite(format!("API {status}: {body}")));
        }

        let result: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| OutreachError::Rewrite(format!("bad response body: {e}")))?;

        result
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| OutreachError::Rewrite("empty model response".into()))
    }
}

#[async_trait]
impl Rewriter for GeminiRewriter {
    async fn improve(&self, text: &str) -> Result<String> {
        let (protected, map) = protect_tokens(text);

        let prompt = format!(
            "Rewrite the following cold-outreach email body so it reads \
             more natural and concise while keeping the same intent and a \
             professional tone. Preserve the HTML structure. Placeholders \
             that look like <<<TOKEN_N>>> must be kept exactly as they \
             are. Return only the HTML fragment, no commentary.\n\n{protected}"
        );

        let raw = self.generate(&prompt).await?;
        let cleaned = sanitize_html(&raw);
        let restored = restore_tokens(&cleaned, &map);
        tracing::debug!("✨ Rewrite produced {} chars", restored.len());
        Ok(restored)
    }
}
