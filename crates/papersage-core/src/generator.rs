//! Text generation capability and the prompts the pipeline sends through it.
//!
//! Every generated artifact (answer, heading, summary, idea list) is one call to
//! [Generator::generate] with a prompt built here. Prompt text is exact: tests and
//! reproducibility depend on the model seeing the same input for the same chunks.

use async_trait::async_trait;

/// Default beam width / candidate count per call.
pub const DEFAULT_NUM_CANDIDATES: usize = 4;

pub const ANSWER_MAX_TOKENS: usize = 1024;
pub const HEADING_MAX_TOKENS: usize = 100;
pub const SUMMARY_MAX_TOKENS: usize = 1024;
pub const IDEAS_MAX_TOKENS: usize = 512;

#[async_trait]
pub trait Generator: Send + Sync {
    /// One deterministic generation step. No retries: a failure is reported as is.
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: usize,
        num_candidates: usize,
    ) -> Result<String, GenerateError>;
}

/// A prompt and its output budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub max_tokens: usize,
}

impl Prompt {
    pub fn answer(question: &str, context: &str) -> Self {
        Self {
            text: format!("Question: {question}\nContext: {context}\nAnswer:"),
            max_tokens: ANSWER_MAX_TOKENS,
        }
    }

    pub fn heading(context: &str) -> Self {
        Self {
            text: format!("Find the Heading name inside the following text:\n{context}\nHeading:"),
            max_tokens: HEADING_MAX_TOKENS,
        }
    }

    pub fn summary(context: &str) -> Self {
        Self {
            text: format!("Summarize the following text coherently:\n{context}\nSummary:"),
            max_tokens: SUMMARY_MAX_TOKENS,
        }
    }

    /// `summaries` are `(paper_name, summary)` pairs in paper order.
    pub fn future_work<'a, I>(summaries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let context = summaries
            .into_iter()
            .map(|(name, summary)| format!("Paper: {name}\nSummary: {summary}"))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            text: format!(
                "Based on the following research, suggest ideas for future work:\n{context}\nIdeas:"
            ),
            max_tokens: IDEAS_MAX_TOKENS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generation model unavailable: {0}")]
    Unavailable(String),
    #[error("generation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
