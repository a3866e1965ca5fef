mod adapter;
mod cli_args;
mod logging;
mod mock;
mod render;
mod utils;

use std::{fmt, process::ExitCode};

use catchup_config::CatchupConfig;
use catchup_domain::{Issue, Period, PeriodError};
use catchup_summary::{
    AnalysisType, IssueSummarizer, OpenAiProvider, ACTION_ITEMS_MAX, ANALYSIS_MAX_TOKENS,
    SUMMARY_MAX_TOKENS,
};
use catchup_youtrack::{Transport, TransportError, YouTrackClient};
use clap::Parser;
use tracing::{debug, error, warn};

use crate::{
    adapter::{connect, fetch_my_issues, load_config, ISSUE_FIELDS, USER_FIELDS},
    cli_args::Cli,
    mock::MockTransport,
    render::{render_footer, render_issue},
};

const MOCK_SERVER_URL: &str = "mock://youtrack";
const SECTION_WIDTH: usize = 80;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = logging::init(cli.verbose) {
        eprintln!("{error:#}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}

enum Failure {
    Config(anyhow::Error),
    Run(anyhow::Error),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Config(error) => write!(
                f,
                "❌ Configuration error: {error:#}\n   \
                 Set YOUTRACK_URL and YOUTRACK_TOKEN in the environment, a .env file or the config file."
            ),
            Failure::Run(error) => {
                if let Some(period) = error.downcast_ref::<PeriodError>() {
                    return write!(f, "❌ Invalid period: {period}");
                }
                if let Some(api) = error.downcast_ref::<TransportError>() {
                    return write!(
                        f,
                        "❌ API error: {api}\n   Check that your YouTrack URL and token are correct."
                    );
                }
                write!(f, "❌ Unexpected error: {error:#}")
            }
        }
    }
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let period = Period::parse(&cli.since).map_err(|error| Failure::Run(error.into()))?;
    let config = load_config(cli.config.as_deref()).map_err(Failure::Config)?;

    if cli.mock {
        debug!("using mock transport");
        let client = YouTrackClient::new(
            MockTransport::new(),
            config.default_page_size,
            config.max_page_size,
        );
        return report(cli, &client, &config, MOCK_SERVER_URL, &period).map_err(Failure::Run);
    }

    let server_url = config
        .require_url()
        .map_err(Failure::Config)?
        .to_string();
    let client = connect(&config).map_err(Failure::Config)?;
    report(cli, &client, &config, &server_url, &period).map_err(Failure::Run)
}

fn report<T: Transport>(
    cli: &Cli,
    client: &YouTrackClient<T>,
    config: &CatchupConfig,
    server_url: &str,
    period: &Period,
) -> anyhow::Result<()> {
    println!("Connected to YouTrack at: {server_url}");
    let user = client.get_current_user(&USER_FIELDS)?;
    println!(
        "Logged in as: {} ({})",
        user.display_name(),
        user.login.as_deref().unwrap_or("unknown")
    );

    println!("\n🔍 Fetching issues updated in the last {period}...\n");
    let issues = fetch_my_issues(client, period, Some(cli.page_size), cli.max_results)?;

    for issue in &issues {
        println!("{}", render_issue(issue));
    }
    println!("\n{}", render_footer(issues.len()));

    if cli.wants_llm() {
        run_llm(cli, client, config, &issues);
    }
    Ok(())
}

fn run_llm<T: Transport>(
    cli: &Cli,
    client: &YouTrackClient<T>,
    config: &CatchupConfig,
    issues: &[Issue],
) {
    let provider = match OpenAiProvider::from_config(&config.llm) {
        Ok(provider) => provider,
        Err(error) => {
            warn!("LLM provider unavailable: {error:#}");
            println!("\n⚠️  AI features unavailable: {error:#}");
            return;
        }
    };
    debug!(model = provider.model(), "LLM provider ready");
    let summarizer = IssueSummarizer::new(provider, config.youtrack_url.clone());

    if cli.summarize {
        print_section("🤖 AI Summary");
        match summarizer.summarize_issues(issues, config.user_context.as_deref(), SUMMARY_MAX_TOKENS)
        {
            Ok(summary) => println!("{summary}"),
            Err(error) => report_llm_failure("generate AI summary", &error),
        }
    }

    if cli.action_items {
        print_section("📝 Action Items for Today");
        match summarizer.generate_action_items(issues, ACTION_ITEMS_MAX) {
            Ok(items) if items.is_empty() => println!("No action items generated."),
            Ok(items) => {
                for (index, item) in items.iter().enumerate() {
                    println!("{}. {item}", index + 1);
                }
            }
            Err(error) => report_llm_failure("generate action items", &error),
        }
    }

    if let Some(issue_id) = cli.analyze.as_deref() {
        let analysis = AnalysisType::from_name(&cli.analysis_type);
        print_section(&format!("🔬 Analysis of {issue_id} ({})", cli.analysis_type));
        let issue = match client.get_issue(issue_id, &ISSUE_FIELDS, true) {
            Ok(issue) => issue,
            Err(error) => {
                error!(issue = issue_id, "failed to fetch issue for analysis: {error}");
                println!("❌ Failed to fetch issue {issue_id}: {error}");
                return;
            }
        };
        match summarizer.analyze_issue(&issue, analysis, ANALYSIS_MAX_TOKENS) {
            Ok(text) => println!("{text}"),
            Err(error) => report_llm_failure("analyze issue", &error),
        }
    }
}

fn print_section(title: &str) {
    println!("\n{title}\n{}", "=".repeat(SECTION_WIDTH));
}

fn report_llm_failure(action: &str, error: &anyhow::Error) {
    error!("failed to {action}: {error:#}");
    println!("❌ Failed to {action}: {}", error.root_cause());
}
