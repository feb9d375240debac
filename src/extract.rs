use crate::types::{unwrap_value, FlatPaper, Paper};
use serde_json::Value;

/// Projects a paper onto a flat mapping of the caller-requested fields.
///
/// `fields` are read from the top level of the paper, `subfields` from inside
/// a nested mapping (in practice the `content` attribute). Missing fields map
/// to null rather than erroring; v2 `{"value": ...}` wrappers are unwrapped.
#[derive(Debug, Clone)]
pub struct Extractor {
    pub fields: Vec<String>,
    pub subfields: Vec<(String, Vec<String>)>,
    pub include_subfield: bool,
}

impl Extractor {
    pub fn new(fields: Vec<String>, subfields: Vec<(String, Vec<String>)>) -> Self {
        Self {
            fields,
            subfields,
            include_subfield: false,
        }
    }

    /// The extraction used by the CLI: forum plus the standard content fields.
    pub fn default_paper_extractor() -> Self {
        Self::new(
            vec!["forum".to_string()],
            vec![(
                "content".to_string(),
                ["title", "authors", "authorids", "keywords", "abstract", "pdf", "match"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )],
        )
    }

    pub fn extract(&self, paper: &Paper) -> FlatPaper {
        // Work over the serialized shape so field names resolve uniformly
        let paper_value = serde_json::to_value(paper).unwrap_or(Value::Null);
        let mut flat = FlatPaper::new();

        for field in &self.fields {
            let value = paper_value.get(field).cloned().unwrap_or(Value::Null);
            flat.insert(field.clone(), value);
        }

        for (subfield, fields) in &self.subfields {
            let subfield_data = paper_value.get(subfield);
            let mut nested = serde_json::Map::new();

            for field in fields {
                let value = subfield_data
                    .and_then(|data| data.get(field))
                    .map(|value| unwrap_value(value).clone())
                    .unwrap_or(Value::Null);
                if self.include_subfield {
                    nested.insert(field.clone(), value);
                } else {
                    flat.insert(field.clone(), value);
                }
            }

            if self.include_subfield {
                flat.insert(subfield.clone(), Value::Object(nested));
            }
        }

        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_paper() -> Paper {
        Paper {
            id: "note1".into(),
            forum: "abc123".into(),
            content: json!({
                "title": {"value": "Agents at Scale"},
                "authors": {"value": ["A. One", "B. Two"]},
                "pdf": "/pdf/abc123.pdf",
            })
            .as_object()
            .unwrap()
            .clone(),
        }
    }

    #[test]
    fn test_extracts_fields_and_subfields_flat() {
        let extractor = Extractor::new(
            vec!["forum".to_string()],
            vec![(
                "content".to_string(),
                vec!["title".to_string(), "pdf".to_string(), "keywords".to_string()],
            )],
        );

        let flat = extractor.extract(&sample_paper());
        assert_eq!(flat["forum"], json!("abc123"));
        assert_eq!(flat["title"], json!("Agents at Scale"));
        assert_eq!(flat["pdf"], json!("/pdf/abc123.pdf"));
        // Requested but absent fields become null
        assert_eq!(flat["keywords"], Value::Null);
    }

    #[test]
    fn test_include_subfield_keeps_nesting() {
        let mut extractor = Extractor::new(
            vec![],
            vec![("content".to_string(), vec!["title".to_string()])],
        );
        extractor.include_subfield = true;

        let flat = extractor.extract(&sample_paper());
        assert_eq!(flat["content"]["title"], json!("Agents at Scale"));
    }
}
