use std::path::PathBuf;

use clap::Parser;

/// Catch up on recent YouTrack issues requiring your attention.
#[derive(Debug, Parser)]
#[command(name = "youtrack-catchup", version)]
pub struct Cli {
    /// Time period to look back (e.g. '7d', '1w', '2M', '1y 2M')
    #[arg(long, default_value = "1w")]
    pub since: String,

    /// Stop after this many issues
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Issues requested per page (capped by the configured maximum)
    #[arg(long, default_value_t = 50)]
    pub page_size: usize,

    /// Ask the LLM for a summary of the fetched issues
    #[arg(long)]
    pub summarize: bool,

    /// Ask the LLM for today's action items
    #[arg(long)]
    pub action_items: bool,

    /// Analyze a single issue in detail (e.g. DEMO-42)
    #[arg(long, value_name = "ISSUE-ID")]
    pub analyze: Option<String>,

    /// Kind of single-issue analysis
    #[arg(long, default_value = "general", value_parser = ["general", "technical", "priority"])]
    pub analysis_type: String,

    /// Config file to use instead of the default location
    #[arg(long, env = "CATCHUP_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Use built-in mock issues instead of a YouTrack server
    #[arg(long)]
    pub mock: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn wants_llm(&self) -> bool {
        self.summarize || self.action_items || self.analyze.is_some()
    }
}
