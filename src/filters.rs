use crate::error::Result;
use crate::types::{MatchProvenance, Paper};
use tracing::warn;

/// A relevance predicate: given a paper and one keyword, decide whether the
/// paper matches. Implementations are pluggable; the pipeline never looks
/// inside them.
pub trait PaperFilter: Send + Sync {
    /// Name recorded in match provenance
    fn name(&self) -> &'static str;

    fn matches(&self, paper: &Paper, keyword: &str) -> Result<bool>;
}

fn field_contains(paper: &Paper, field: &str, keyword: &str) -> bool {
    paper
        .field_text(field)
        .map(|text| text.to_lowercase().contains(&keyword.to_lowercase()))
        .unwrap_or(false)
}

/// Case-insensitive substring match on the title field.
pub struct TitleFilter;

impl PaperFilter for TitleFilter {
    fn name(&self) -> &'static str {
        "title"
    }

    fn matches(&self, paper: &Paper, keyword: &str) -> Result<bool> {
        Ok(field_contains(paper, "title", keyword))
    }
}

/// Case-insensitive substring match on the author-supplied keywords field.
pub struct KeywordsFilter;

impl PaperFilter for KeywordsFilter {
    fn name(&self) -> &'static str {
        "keywords"
    }

    fn matches(&self, paper: &Paper, keyword: &str) -> Result<bool> {
        Ok(field_contains(paper, "keywords", keyword))
    }
}

/// Case-insensitive substring match on the abstract field.
pub struct AbstractFilter;

impl PaperFilter for AbstractFilter {
    fn name(&self) -> &'static str {
        "abstract"
    }

    fn matches(&self, paper: &Paper, keyword: &str) -> Result<bool> {
        Ok(field_contains(paper, "abstract", keyword))
    }
}

/// Ordered filter pipeline with first-match-wins provenance.
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn PaperFilter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: Box<dyn PaperFilter>) {
        self.filters.push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates a paper against every (filter, keyword) pair in
    /// predicate-major order and short-circuits on the first hit.
    ///
    /// Returns the single provenance entry for a passing paper, or `None`
    /// when nothing matched (the paper is then dropped, not an error). A
    /// filter that fails is logged and treated as a non-match so one bad
    /// predicate cannot abort a conference's filtering pass.
    pub fn evaluate(&self, paper: &Paper, keywords: &[String]) -> Option<MatchProvenance> {
        for filter in &self.filters {
            for keyword in keywords {
                match filter.matches(paper, keyword) {
                    Ok(true) => {
                        return Some(MatchProvenance {
                            filter: filter.name().to_string(),
                            keyword: keyword.clone(),
                        });
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(
                            "Filter '{}' failed on paper {}: {}",
                            filter.name(),
                            paper.forum,
                            e
                        );
                    }
                }
            }
        }
        None
    }
}

/// The default pipeline used by the CLI: title, then keywords, then abstract.
pub fn default_pipeline() -> FilterPipeline {
    let mut pipeline = FilterPipeline::new();
    pipeline.add_filter(Box::new(TitleFilter));
    pipeline.add_filter(Box::new(KeywordsFilter));
    pipeline.add_filter(Box::new(AbstractFilter));
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScraperError;
    use serde_json::json;

    fn paper(title: &str, keywords: &[&str], abstract_text: &str) -> Paper {
        Paper {
            id: "n1".into(),
            forum: "f1".into(),
            content: json!({
                "title": {"value": title},
                "keywords": {"value": keywords},
                "abstract": {"value": abstract_text},
            })
            .as_object()
            .unwrap()
            .clone(),
        }
    }

    struct NeverFilter(&'static str);

    impl PaperFilter for NeverFilter {
        fn name(&self) -> &'static str {
            self.0
        }
        fn matches(&self, _paper: &Paper, _keyword: &str) -> Result<bool> {
            Ok(false)
        }
    }

    struct BrokenFilter;

    impl PaperFilter for BrokenFilter {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn matches(&self, _paper: &Paper, _keyword: &str) -> Result<bool> {
            Err(ScraperError::Filter {
                filter: "broken".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    struct AlwaysFilter(&'static str);

    impl PaperFilter for AlwaysFilter {
        fn name(&self) -> &'static str {
            self.0
        }
        fn matches(&self, _paper: &Paper, _keyword: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_match_wins_in_predicate_major_order() {
        // P2 matches K2; P4 would match anything. Provenance must be (P2, K2).
        let mut pipeline = FilterPipeline::new();
        pipeline.add_filter(Box::new(NeverFilter("p1")));
        pipeline.add_filter(Box::new(TitleFilter));
        pipeline.add_filter(Box::new(NeverFilter("p3")));
        pipeline.add_filter(Box::new(AlwaysFilter("p4")));

        let paper = paper("Trajectory synthesis for agents", &[], "");
        let provenance = pipeline
            .evaluate(&paper, &keywords(&["robotics", "trajectory", "agent"]))
            .unwrap();

        assert_eq!(provenance.filter, "title");
        assert_eq!(provenance.keyword, "trajectory");
    }

    #[test]
    fn test_no_match_returns_none() {
        let pipeline = default_pipeline();
        let paper = paper("Graph pooling", &["gnn"], "We pool graphs.");
        assert!(pipeline.evaluate(&paper, &keywords(&["Agent"])).is_none());
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let pipeline = default_pipeline();
        let paper = paper("On AGENTS everywhere", &[], "");
        let provenance = pipeline.evaluate(&paper, &keywords(&["agent"])).unwrap();
        assert_eq!(provenance.filter, "title");
    }

    #[test]
    fn test_broken_filter_is_skipped_not_fatal() {
        let mut pipeline = FilterPipeline::new();
        pipeline.add_filter(Box::new(BrokenFilter));
        pipeline.add_filter(Box::new(AbstractFilter));

        let paper = paper("", &[], "Synthetic data pipelines");
        let provenance = pipeline.evaluate(&paper, &keywords(&["synthetic"])).unwrap();
        assert_eq!(provenance.filter, "abstract");
    }

    #[test]
    fn test_keywords_field_array_matching() {
        let pipeline = default_pipeline();
        let paper = paper("Unrelated title", &["data synthesis", "LLM"], "");
        let provenance = pipeline
            .evaluate(&paper, &keywords(&["Data Synthesis"]))
            .unwrap();
        assert_eq!(provenance.filter, "keywords");
        assert_eq!(provenance.keyword, "Data Synthesis");
    }
}
