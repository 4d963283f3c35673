
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{FaqError, Result};

/// A single question/answer pair with the category it was filed under.
///
/// Records are identified by their position in the flattened corpus. That
/// position is also the vector's position in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub question: String,
    pub answer: String,
    pub category: String,
}

/// Read a categorized corpus file and flatten it into records
#[inline]
pub fn load_corpus(path: &Path) -> Result<Vec<FaqRecord>> {
    debug!("Loading FAQ corpus from {}", path.display());

    let content = fs::read_to_string(path)?;
    let records = parse_corpus(&content)?;

    info!(
        "Loaded {} FAQ records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Parse a corpus document of the form `{"Category": [{"question", "answer"}, ...]}`.
///
/// Categories and entries keep their document order. A single malformed
/// entry rejects the whole corpus.
#[inline]
pub fn parse_corpus(content: &str) -> Result<Vec<FaqRecord>> {
    let document: Value = serde_json::from_str(content)
        .map_err(|e| FaqError::CorpusFormat(format!("Invalid JSON: {}", e)))?;

    let Value::Object(categories) = document else {
        return Err(FaqError::CorpusFormat(
            "Top level must be a mapping from category to FAQ list".to_string(),
        ));
    };

    let mut records = Vec::new();
    for (category, entries) in categories {
        let Value::Array(entries) = entries else {
            return Err(FaqError::CorpusFormat(format!(
                "Category '{}' must contain a list of FAQs",
                category
            )));
        };

        for (position, entry) in entries.iter().enumerate() {
            let question = required_text(entry, "question", &category, position)?;
            let answer = required_text(entry, "answer", &category, position)?;
            records.push(FaqRecord {
                question,
                answer,
                category: category.clone(),
            });
        }
    }

    Ok(records)
}

fn required_text(entry: &Value, key: &str, category: &str, position: usize) -> Result<String> {
    let Value::Object(fields) = entry else {
        return Err(FaqError::CorpusFormat(format!(
            "Entry {} in category '{}' is not an object",
            position, category
        )));
    };

    match fields.get(key) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(FaqError::CorpusFormat(format!(
            "Entry {} in category '{}' has a non-string '{}'",
            position, category, key
        ))),
        None => Err(FaqError::CorpusFormat(format!(
            "Entry {} in category '{}' is missing '{}'",
            position, category, key
        ))),
    }
}
