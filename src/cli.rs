use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::SearchFilters;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the marketplace for a single material
    Search {
        /// Material name (French)
        #[arg(short, long)]
        query: String,

        /// Optional material description appended to the query
        #[arg(short, long)]
        description: Option<String>,

        /// Reference image URL; tried before the keyword search
        #[arg(short, long)]
        image: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        max_results: Option<usize>,

        /// Send the query as typed, without translating it
        #[arg(long)]
        no_translate: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Search every material of a JSON list, one at a time
    Batch {
        /// JSON file holding an array of materials
        #[arg(short, long)]
        input: PathBuf,

        /// Write the batch report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pause between consecutive searches, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Maximum number of results per material
        #[arg(short, long)]
        max_results: Option<usize>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show the marketplace term a phrase would be searched with
    Term {
        /// French phrase
        #[arg(short, long)]
        phrase: String,

        /// Maximum number of words kept
        #[arg(long)]
        max_words: Option<usize>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

/// Post-filters shared by `search` and `batch`; prices are in the marketplace currency
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct FilterArgs {
    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    #[arg(long)]
    pub min_moq: Option<u32>,

    #[arg(long)]
    pub max_moq: Option<u32>,

    #[arg(long)]
    pub min_rating: Option<f64>,
}

impl FilterArgs {
    /// Overlay command-line filters on configured ones
    pub fn merge_into(&self, filters: &mut SearchFilters) {
        filters.min_price = self.min_price.or(filters.min_price);
        filters.max_price = self.max_price.or(filters.max_price);
        filters.min_moq = self.min_moq.or(filters.min_moq);
        filters.max_moq = self.max_moq.or(filters.max_moq);
        filters.min_rating = self.min_rating.or(filters.min_rating);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let args = Args::try_parse_from([
            "sourcing", "search", "--query", "Ciment", "--max-price", "40", "--image", "https://img.example/a.jpg",
        ])
        .unwrap();
        match args.command {
            Commands::Search { query, image, filters, .. } => {
                assert_eq!(query, "Ciment");
                assert_eq!(image.as_deref(), Some("https://img.example/a.jpg"));
                assert_eq!(filters.max_price, Some(40.0));
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_filter_args_override_configured_values() {
        let mut filters = SearchFilters { min_price: Some(1.0), max_moq: Some(100), ..Default::default() };
        let args = FilterArgs { max_moq: Some(10), min_rating: Some(4.0), ..Default::default() };
        args.merge_into(&mut filters);
        assert_eq!(filters.min_price, Some(1.0));
        assert_eq!(filters.max_moq, Some(10));
        assert_eq!(filters.min_rating, Some(4.0));
    }
}
