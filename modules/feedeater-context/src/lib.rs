pub mod engine;
pub mod selection;

pub use engine::{ContextEngine, ContextMetrics, ContextPublisher, ContextSource, DEFAULT_TOP_K};
pub use selection::{build_prompt, cosine_distance, cosine_similarity, SelectedItem, MAX_PROMPT_CHARS};
