use crate::types::Paper;
use serde_json::Value;

/// A pure per-paper rewrite applied after filtering and before extraction.
/// Transforms run sequentially in registration order, each seeing the
/// previous transform's output.
pub type PaperTransform = Box<dyn Fn(Paper) -> Paper + Send + Sync>;

/// Applies the chain in order.
pub fn apply_transforms(transforms: &[PaperTransform], mut paper: Paper) -> Paper {
    for transform in transforms {
        paper = transform(paper);
    }
    paper
}

/// Rewrites the forum key and pdf path into absolute openreview.net URLs.
pub fn link_paper(mut paper: Paper) -> Paper {
    paper.forum = format!("https://openreview.net/forum?id={}", paper.forum);
    if let Some(pdf) = paper.field_text("pdf") {
        paper.content.insert(
            "pdf".to_string(),
            Value::String(format!("https://openreview.net{}", pdf)),
        );
    }
    paper
}

/// Collapses author list fields to "; "-joined strings and defaults fields
/// that some venues omit, so downstream CSV rows stay uniform.
pub fn join_authors(mut paper: Paper) -> Paper {
    for field in ["authors", "authorids"] {
        let joined = paper
            .field_text(field)
            .map(|text| text.replace(", ", "; "))
            .unwrap_or_default();
        paper.content.insert(field.to_string(), Value::String(joined));
    }
    if !paper.content.contains_key("keywords") {
        paper.content.insert("keywords".to_string(), Value::Null);
    }
    paper
}

/// The transform chain used by the CLI.
pub fn default_transforms() -> Vec<PaperTransform> {
    vec![Box::new(link_paper), Box::new(join_authors)]
}
