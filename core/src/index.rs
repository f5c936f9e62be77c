use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TermId = u32;
pub type DocId = u32;

/// One course listing. The document id is the record's position in the corpus snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, alias = "title")]
    pub course_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub university_name: String,
    #[serde(default)]
    pub faculty_name: String,
    #[serde(default)]
    pub is_it_full_time: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub fees: String,
    #[serde(default)]
    pub modality: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub administration: String,
    #[serde(default)]
    pub url: String,
}

impl Course {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { course_name: title.into(), description: description.into(), ..Self::default() }
    }

    pub fn title(&self) -> &str {
        &self.course_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f32, // strictly positive
}

/// Which index answers a query and how its weights were computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Conjunctive match over descriptions, unranked.
    Boolean,
    /// Raw description tf times smoothed idf.
    Tfidf,
    /// Title tf plus sublinear description tf-idf.
    Blended,
}

impl Scheme {
    pub const WEIGHTED: [Scheme; 2] = [Scheme::Tfidf, Scheme::Blended];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Boolean => "boolean",
            Scheme::Tfidf => "tfidf",
            Scheme::Blended => "blended",
        }
    }

    pub fn is_weighted(&self) -> bool {
        !matches!(self, Scheme::Boolean)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScheme(pub String);

impl fmt::Display for UnknownScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown scheme '{}' (expected boolean, tfidf or blended)", self.0)
    }
}

impl std::error::Error for UnknownScheme {}

impl FromStr for Scheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(Scheme::Boolean),
            "tfidf" | "tf-idf" => Ok(Scheme::Tfidf),
            "blended" => Ok(Scheme::Blended),
            _ => Err(UnknownScheme(s.to_string())),
        }
    }
}
