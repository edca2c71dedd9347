// src/memory/recall/query_preprocess.rs
// Query normalization (§4.3 step 1).

const QUESTION_WORDS: &[&str] = &["what", "who", "where", "when", "why", "how", "which", "is", "are", "do", "does"];
const COPULAS: &[&str] = &["is", "are", "was", "were", "am"];
const STOP_WORDS_QUESTION: &[&str] = &[
    "my", "your", "the", "a", "an", "to", "of", "for", "in", "on", "at", "do", "does", "did",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedQuery {
    pub original: String,
    pub normalized: String,
    pub terms: Vec<String>,
    pub is_question: bool,
}

/// Normalizes a recall query: strips leading question words, possessives,
/// and copulas, then applies context-aware stop-word filtering — aggressive
/// for questions, conservative for declarative statements (§4.3 step 1).
pub fn preprocess(query: &str) -> PreprocessedQuery {
    let is_question = query.trim_end().ends_with('?')
        || QUESTION_WORDS
            .iter()
            .any(|w| query.to_lowercase().trim_start().starts_with(w));

    let lower = query.to_lowercase().replace('?', "");
    let words: Vec<&str> = lower.split_whitespace().collect();

    let mut start = 0;
    while start < words.len() && QUESTION_WORDS.contains(&words[start]) {
        start += 1;
    }
    while start < words.len() && COPULAS.contains(&words[start]) {
        start += 1;
    }

    let mut filtered: Vec<String> = words[start..]
        .iter()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_string())
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_end_matches("'s").to_string())
        .collect();

    if is_question {
        filtered.retain(|w| !STOP_WORDS_QUESTION.contains(&w.as_str()));
    }

    let normalized = filtered.join(" ");

    PreprocessedQuery {
        original: query.to_string(),
        normalized,
        terms: filtered,
        is_question,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_question_word_and_copula() {
        let p = preprocess("what is my favorite color");
        assert_eq!(p.normalized, "favorite color");
        assert!(p.is_question);
    }

    #[test]
    fn keeps_statement_terms_intact() {
        let p = preprocess("my favorite color is blue");
        assert!(!p.is_question);
        assert!(p.terms.contains(&"favorite".to_string()));
        assert!(p.terms.contains(&"blue".to_string()));
    }

    #[test]
    fn strips_possessive_suffix() {
        let p = preprocess("what is john's favorite language");
        assert!(p.terms.contains(&"john".to_string()));
    }
}
