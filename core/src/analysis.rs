use crate::tokenizer::normalize;
use crate::Course;

/// Normalized token streams of one document, computed once per build.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedDoc {
    pub title: Vec<String>,
    pub description: Vec<String>,
}

pub fn analyze(courses: &[Course]) -> Vec<AnalyzedDoc> {
    courses
        .iter()
        .map(|c| AnalyzedDoc { title: normalize(c.title()), description: normalize(&c.description) })
        .collect()
}
