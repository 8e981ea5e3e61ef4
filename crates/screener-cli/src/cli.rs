use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "screener", version, about = "Score and rank a listed-equity universe")]
pub struct Cli {
    /// Strategy YAML
    #[arg(long, env = "SCREENER_CONFIG")]
    pub config: PathBuf,

    /// Reference date (YYYY-MM-DD), defaults to today
    #[arg(long, conflicts_with = "as_of_from")]
    pub as_of: Option<NaiveDate>,

    /// Take the as-of date from the newest CSV under this directory
    #[arg(long, value_name = "DIR")]
    pub as_of_from: Option<PathBuf>,

    /// Report directory
    #[arg(long, default_value = "reports")]
    pub output: PathBuf,

    /// Load and summarize the strategy without fetching data
    #[arg(long)]
    pub dry_run: bool,

    /// Shortlist size, overrides quantitative.top_n_candidates
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Recommendation count, overrides deep_dive.top_k
    #[arg(long)]
    pub top_k: Option<usize>,
}

impl Cli {
    pub fn explicit_or_today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }
}
