/// Matches a dotted subject against a dotted pattern where `*` matches
/// exactly one segment. No multi-segment wildcard is needed: every pattern
/// used in this system (`<root>.*.messageCreated`, `<root>.<module>.log`)
/// is a fixed-length dotted path.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    let subject_segments: Vec<&str> = subject.split('.').collect();

    if pattern_segments.len() != subject_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(subject_segments.iter())
        .all(|(p, s)| *p == "*" || p == s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(subject_matches("feedeater.rss.messageCreated", "feedeater.rss.messageCreated"));
    }

    #[test]
    fn wildcard_segment_matches_anything() {
        assert!(subject_matches("feedeater.*.messageCreated", "feedeater.bybit.messageCreated"));
    }

    #[test]
    fn wildcard_does_not_span_segments() {
        assert!(!subject_matches("feedeater.*", "feedeater.rss.messageCreated"));
    }

    #[test]
    fn mismatched_literal_segment_fails() {
        assert!(!subject_matches("feedeater.rss.messageCreated", "feedeater.rss.contextUpdated"));
    }
}
