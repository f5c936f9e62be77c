use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[a-z0-9]+(?:-[a-z0-9]+)*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    // NLTK english stopword list
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "i","me","my","myself","we","our","ours","ourselves","you","you're","you've","you'll","you'd",
            "your","yours","yourself","yourselves","he","him","his","himself","she","she's","her","hers",
            "herself","it","it's","its","itself","they","them","their","theirs","themselves","what","which",
            "who","whom","this","that","that'll","these","those","am","is","are","was","were","be","been",
            "being","have","has","had","having","do","does","did","doing","a","an","the","and","but","if",
            "or","because","as","until","while","of","at","by","for","with","about","against","between",
            "into","through","during","before","after","above","below","to","from","up","down","in","out",
            "on","off","over","under","again","further","then","once","here","there","when","where","why",
            "how","all","any","both","each","few","more","most","other","some","such","no","nor","not",
            "only","own","same","so","than","too","very","s","t","can","will","just","don","don't","should",
            "should've","now","d","ll","m","o","re","ve","y","ain","aren","aren't","couldn","couldn't",
            "didn","didn't","doesn","doesn't","hadn","hadn't","hasn","hasn't","haven","haven't","isn",
            "isn't","ma","mightn","mightn't","mustn","mustn't","needn","needn't","shan","shan't","shouldn",
            "shouldn't","wasn","wasn't","weren","weren't","won","won't","wouldn","wouldn't"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Fold accents and lowercase: `Café` -> `cafe`.
fn fold(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase()
}

/// Drop everything except ASCII letters, digits, whitespace and interior hyphens.
///
/// A hyphen survives only between two letters (`eye-catching`) or two digits
/// (`2023-2024`); the neighbours are read from the input, before any stripping.
fn strip_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' {
            let prev = if i > 0 { chars.get(i - 1).copied() } else { None };
            let next = chars.get(i + 1).copied();
            let interior = match (prev, next) {
                (Some(p), Some(n)) => {
                    (p.is_ascii_lowercase() && n.is_ascii_lowercase())
                        || (p.is_ascii_digit() && n.is_ascii_digit())
                }
                _ => false,
            };
            if interior {
                out.push(c);
            }
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
            out.push(c);
        }
    }
    out
}

const MAX_STEM_PASSES: usize = 8;

/// Stem until the output stops changing, so a stem re-stems to itself.
///
/// Snowball stems are not fixpoints (`university` -> `univers` -> `univ`).
/// Hyphens left dangling by a removed suffix are trimmed on each pass.
fn stem(token: &str) -> String {
    let mut current = token.to_string();
    for _ in 0..MAX_STEM_PASSES {
        let next = STEMMER.stem(&current).trim_matches('-').to_string();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Normalize text into stemmed terms: fold case and accents, strip punctuation,
/// tokenize, drop stopwords, stem. Order of occurrence is preserved.
///
/// Stopwords are dropped both before and after stemming (`oed` stems to `o`),
/// which keeps `normalize(normalize(x).join(" ")) == normalize(x)`.
pub fn normalize(text: &str) -> Vec<String> {
    let cleaned = strip_punctuation(&fold(text));
    RE.find_iter(&cleaned)
        .map(|m| m.as_str())
        .filter(|token| !is_stopword(token))
        .map(stem)
        .filter(|term| !term.is_empty() && !is_stopword(term))
        .collect()
}
