use std::path::Path;

use anyhow::{Context, Result};
use catchup_config::CatchupConfig;
use catchup_domain::{involvement_query, sort_by_updated_desc, Issue, Period};
use catchup_youtrack::{SearchQuery, Transport, YouTrackClient};
use tracing::info;

pub const ISSUE_FIELDS: [&str; 8] = [
    "idReadable",
    "summary",
    "description",
    "created",
    "updated",
    "resolved",
    "customFields(name,value(name,login))",
    "comments(id,text,created,author(login,fullName))",
];
pub const USER_FIELDS: [&str; 3] = ["login", "fullName", "email"];

pub fn load_config(path: Option<&Path>) -> Result<CatchupConfig> {
    match path {
        Some(path) => CatchupConfig::load_with_file(path),
        None => CatchupConfig::load_default(),
    }
}

pub fn connect(config: &CatchupConfig) -> Result<YouTrackClient> {
    YouTrackClient::from_config(config).with_context(|| "failed to set up YouTrack client")
}

pub fn fetch_my_issues<T: Transport>(
    client: &YouTrackClient<T>,
    period: &Period,
    page_size: Option<usize>,
    max_results: Option<usize>,
) -> Result<Vec<Issue>> {
    let query = involvement_query(period);
    info!(%query, "fetching issues");

    let search = SearchQuery::new(query).fields(ISSUE_FIELDS);
    let mut issues = client
        .search_all(search, page_size, max_results)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    sort_by_updated_desc(&mut issues);
    Ok(issues)
}
