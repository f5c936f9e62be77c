use anyhow::Result;
use clap::{Parser, Subcommand};
use msc_core::persist::{rebuild_scheme, save_engine, IndexPaths};
use msc_core::{Engine, LazyEngine, Scheme};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

mod corpus;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the course search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a full snapshot from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Weighted schemes to build (comma-separated)
        #[arg(long = "scheme", value_delimiter = ',', default_values_t = Scheme::WEIGHTED)]
        schemes: Vec<Scheme>,
    },
    /// Recompute one scheme against the existing snapshot
    RebuildScheme {
        #[arg(long)]
        index: String,
        #[arg(long)]
        scheme: Scheme,
    },
    /// Run a single query and print the ranked courses
    Query {
        #[arg(long)]
        index: String,
        #[arg(long)]
        q: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[arg(long, default_value_t = Scheme::Tfidf)]
        scheme: Scheme,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, schemes } => build_index(&input, &output, &schemes),
        Commands::RebuildScheme { index, scheme } => {
            rebuild_scheme(&IndexPaths::new(&index), scheme)?;
            tracing::info!(index = %index, %scheme, "scheme rebuild complete");
            Ok(())
        }
        Commands::Query { index, q, k, scheme } => run_query(&index, &q, k, scheme),
    }
}

fn build_index(input: &str, output: &str, schemes: &[Scheme]) -> Result<()> {
    let courses = corpus::load_corpus(Path::new(input))?;
    tracing::info!(num_docs = courses.len(), "ingested documents");

    let engine = Engine::build(courses, schemes);
    save_engine(&IndexPaths::new(output), &engine)?;

    tracing::info!(output, num_terms = engine.vocabulary().len(), "index build complete");
    Ok(())
}

fn run_query(index: &str, q: &str, k: usize, scheme: Scheme) -> Result<()> {
    let lazy = LazyEngine::open(IndexPaths::new(index));
    let engine = lazy.get()?;
    let hits = engine.search(q, k, scheme)?;
    if hits.is_empty() {
        println!("no courses match {q:?}");
        return Ok(());
    }
    for hit in hits {
        let c = hit.course;
        println!("{:>6}  {:.4}  {}  ({}, {})", hit.doc_id, hit.similarity, c.title(), c.university_name, c.country);
        if !c.url.is_empty() {
            println!("        {}", c.url);
        }
    }
    Ok(())
}
