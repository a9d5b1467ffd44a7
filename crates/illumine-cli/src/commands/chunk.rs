//! Chunk a text file via the Text Chunker (spec §4.1) and print the result.

use std::fs;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use illumine_text::{chunk, ChunkStrategy, ChunkerConfig};
use uuid::Uuid;

use crate::output::{create_table, print_info, OutputFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Paragraph,
    Semantic,
    Fixed,
}

impl From<StrategyArg> for ChunkStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Paragraph => ChunkStrategy::Paragraph,
            StrategyArg::Semantic => ChunkStrategy::Semantic,
            StrategyArg::Fixed => ChunkStrategy::Fixed,
        }
    }
}

/// Split a plain-text file into bounded-size chunks
#[derive(Args)]
pub struct ChunkArgs {
    /// Path to a UTF-8 text file to chunk
    path: String,

    /// Chunking strategy
    #[arg(short, long, value_enum, default_value = "paragraph")]
    strategy: StrategyArg,

    /// Maximum chunk size, in bytes
    #[arg(long, default_value_t = 2000)]
    max_size: usize,

    /// Overlap between consecutive fixed-strategy chunks, in bytes
    #[arg(long, default_value_t = 100)]
    overlap: usize,

    /// Output format (table, json)
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,
}

pub async fn run(args: ChunkArgs) -> Result<()> {
    let text = fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path))?;

    let config = ChunkerConfig { max_size: args.max_size, overlap: args.overlap };
    let chunks = chunk(Uuid::new_v4(), &text, args.strategy.into(), &config)?;

    match args.format {
        OutputFormat::Json => {
            let rows: Vec<_> = chunks
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "index": c.index,
                        "boundary_kind": format!("{:?}", c.boundary_kind),
                        "byte_len": c.text.len(),
                        "text": c.text,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            print_info(&format!("{} chunk(s) produced", chunks.len()));
            let mut table = create_table();
            table.set_header(vec!["index", "boundary", "bytes", "preview"]);
            for c in &chunks {
                let preview: String = c.text.chars().take(60).collect();
                table.add_row(vec![
                    c.index.to_string(),
                    format!("{:?}", c.boundary_kind),
                    c.text.len().to_string(),
                    preview.replace('\n', " "),
                ]);
            }
            println!("{table}");
        }
    }

    Ok(())
}
