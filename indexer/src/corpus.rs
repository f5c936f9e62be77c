use anyhow::{Context, Result};
use msc_core::Course;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// JSON / JSONL files under `input`, in lexical path order.
fn corpus_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

/// Load every course under `input`. Document ids are positions in the returned vector.
pub fn load_corpus(input: &Path) -> Result<Vec<Course>> {
    let files = corpus_files(input);
    if files.is_empty() {
        anyhow::bail!("no corpus files found at {}", input.display());
    }
    let mut courses = Vec::new();
    for file in files {
        let before = courses.len();
        let read = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut courses)
        } else {
            read_json(&file, &mut courses)
        };
        read.with_context(|| format!("reading {}", file.display()))?;
        tracing::debug!(file = %file.display(), records = courses.len() - before, "loaded corpus file");
    }
    Ok(courses)
}

fn read_jsonl(file: &Path, out: &mut Vec<Course>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let course: Course = serde_json::from_str(&line).with_context(|| format!("line {}", lineno + 1))?;
        out.push(course);
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<Course>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => out.push(serde_json::from_value(json)?),
        other => anyhow::bail!("expected an object or an array of objects, found {other}"),
    }
    Ok(())
}
