use crate::traits::LanguageModel;
use crate::LlmError;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::warn;

pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "in", "is", "it", "of", "on", "or", "that", "the", "this", "to", "what", "when", "where",
    "which", "who", "why", "with",
];

pub fn keyword_prompt(question: &str) -> String {
    format!(
        "Extract the key search terms from the question below.\n\
         Each term must be one or two words; split compound terms into separate terms.\n\
         Do not include any of these words: {stop_words}.\n\
         Return only a comma or newline separated list of terms, with no explanation.\n\n\
         Question: {question}",
        stop_words = STOP_WORDS.join(", "),
    )
}

fn separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[,\n]+").expect("static regex is valid"))
}

/// Splits on runs of commas/newlines, then trims, lowercases, dedupes and sorts.
pub fn normalize_keywords(raw: &str) -> Vec<String> {
    separators()
        .split(raw)
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub async fn try_extract_keywords<L>(llm: &L, question: &str) -> Result<Vec<String>, LlmError>
where
    L: LanguageModel + ?Sized + Sync,
{
    let raw = llm.complete(&keyword_prompt(question)).await?;
    Ok(normalize_keywords(&raw))
}

/// Comma-and-space joined keywords, or an empty string when the model call fails.
pub async fn extract_keywords<L>(llm: &L, question: &str) -> String
where
    L: LanguageModel + ?Sized + Sync,
{
    match try_extract_keywords(llm, question).await {
        Ok(keywords) => keywords.join(", "),
        Err(error) => {
            warn!(error = %error, "keyword extraction failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedLlm(Result<&'static str, ()>);

    #[async_trait]
    impl LanguageModel for FixedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            self.0
                .map(str::to_string)
                .map_err(|_| LlmError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                })
        }
    }

    #[test]
    fn normalization_lowercases_dedupes_and_sorts() {
        assert_eq!(
            normalize_keywords("API, Gateway, api,\narchitecture").join(", "),
            "api, architecture, gateway"
        );
        assert_eq!(normalize_keywords(",\n, ,\n"), Vec::<String>::new());
        assert_eq!(
            normalize_keywords("event streaming\nKafka"),
            vec!["event streaming".to_string(), "kafka".to_string()]
        );
    }

    #[test]
    fn prompt_lists_stop_words_and_the_question() {
        let prompt = keyword_prompt("How does the gateway route traffic?");
        assert!(prompt.contains("Question: How does the gateway route traffic?"));
        assert!(prompt.contains("the, this, to"));
    }

    #[tokio::test]
    async fn keywords_are_joined_with_comma_space() {
        let llm = FixedLlm(Ok("API, Gateway, api,\narchitecture"));
        assert_eq!(
            extract_keywords(&llm, "What is the API gateway architecture?").await,
            "api, architecture, gateway"
        );
    }

    #[tokio::test]
    async fn failures_and_empty_replies_yield_empty_string() {
        assert_eq!(extract_keywords(&FixedLlm(Err(())), "anything").await, "");
        assert_eq!(extract_keywords(&FixedLlm(Ok(" \n ")), "anything").await, "");
        assert!(try_extract_keywords(&FixedLlm(Err(())), "anything")
            .await
            .is_err());
    }
}
