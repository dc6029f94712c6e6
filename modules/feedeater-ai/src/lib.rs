//! Client for the internal AI summarizer/embedder service (out of scope
//! to implement itself — see spec §1, §6). Grounded on
//! `ai-client::traits::{Agent, PromptBuilder, EmbedAgent}` for the shape
//! of the abstraction and on `ai-client::claude::client::ClaudeClient`
//! for the header-building / non-2xx-error-propagation idiom, retargeted
//! from Anthropic's API to `FEED_API_BASE_URL` with a bearer token.

pub mod client;
pub mod traits;

pub use client::FeedAiClient;
pub use traits::{AiError, Embedder, SummaryRequest, SummaryResponse, Summarizer};
