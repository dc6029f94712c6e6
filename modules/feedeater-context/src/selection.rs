//! Candidate selection and prompt construction for the context engine
//! (spec §4.11). The actual k-NN query against a module's embedding table
//! is module-specific (different raw schemas); this module holds the
//! schema-independent pieces: the prompt bound and a pure cosine-distance
//! helper used by module implementations and by tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A candidate record pulled from a module's raw/embedding table, already
/// ordered by the k-NN tie-break from spec §4.11: ascending cosine
/// distance, then descending timestamp, then ascending id.
#[derive(Debug, Clone)]
pub struct SelectedItem {
    pub id: Uuid,
    pub text: String,
    pub collected_at: DateTime<Utc>,
    pub distance: Option<f64>,
}

/// Prompts are bounded to ~8000 characters (spec §4.11(c)): a header with
/// the prior summary, then enumerated selected items, truncated at the
/// limit rather than dropped wholesale so a partial prompt still carries
/// the most relevant (first) items.
pub const MAX_PROMPT_CHARS: usize = 8000;

pub fn build_prompt(prior_summary: Option<&str>, items: &[SelectedItem]) -> String {
    let mut prompt = String::new();

    if let Some(summary) = prior_summary {
        prompt.push_str("Prior summary:\n");
        prompt.push_str(summary);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Recent items:\n");
    for (i, item) in items.iter().enumerate() {
        let line = format!("{}. [{}] {}\n", i + 1, item.collected_at.to_rfc3339(), item.text);
        if prompt.chars().count() + line.chars().count() > MAX_PROMPT_CHARS {
            break;
        }
        prompt.push_str(&line);
    }

    if prompt.chars().count() > MAX_PROMPT_CHARS {
        prompt = prompt.chars().take(MAX_PROMPT_CHARS).collect();
    }

    prompt
}

/// Pure cosine similarity, used by in-memory fallback paths and tests.
/// The production k-NN path pushes this down into SQL via pgvector's
/// `<=>` operator instead of computing it here.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u8, text: &str, minute: u32) -> SelectedItem {
        SelectedItem {
            id: Uuid::from_bytes([id; 16]),
            text: text.to_string(),
            collected_at: DateTime::from_timestamp(minute as i64 * 60, 0).unwrap(),
            distance: None,
        }
    }

    #[test]
    fn build_prompt_includes_prior_summary_and_items() {
        let prompt = build_prompt(Some("prior"), &[item(1, "hello", 0), item(2, "world", 1)]);
        assert!(prompt.contains("Prior summary:\nprior"));
        assert!(prompt.contains("hello"));
        assert!(prompt.contains("world"));
    }

    #[test]
    fn build_prompt_truncates_past_the_char_bound() {
        let items: Vec<SelectedItem> = (0..2000).map(|i| item((i % 255) as u8, "x".repeat(20).as_str(), i)).collect();
        let prompt = build_prompt(None, &items);
        assert!(prompt.chars().count() <= MAX_PROMPT_CHARS);
    }

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_is_one_minus_similarity() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0];
        assert!((cosine_distance(&a, &b)).abs() < 1e-9);
    }
}
