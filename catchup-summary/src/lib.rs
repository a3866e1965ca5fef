mod provider;
mod summarizer;

pub use provider::{ChatMessage, LlmProvider, OpenAiProvider};
pub use summarizer::{
    AnalysisType, IssueSummarizer, ACTION_ITEMS_MAX, ANALYSIS_MAX_TOKENS, SUMMARY_MAX_TOKENS,
};
