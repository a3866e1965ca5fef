mod error;
mod transport;

use std::collections::VecDeque;

use anyhow::Result as AnyResult;
use catchup_config::CatchupConfig;
use catchup_domain::Issue;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub use error::TransportError;
pub use reqwest::Method;
pub use transport::{HttpTransport, RetryPolicy, Transport};

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub fields: Vec<String>,
    pub normalize: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fields: Vec::new(),
            normalize: true,
        }
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn without_normalization(mut self) -> Self {
        self.normalize = false;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchPage {
    pub issues: Vec<Issue>,
    pub requested_size: usize,
    pub returned_count: usize,
    pub skip_offset: usize,
    /// `returned_count == requested_size`. The API reports no total, so a full
    /// page is taken to mean more may follow.
    pub has_more: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct UserRecord {
    pub id: Option<String>,
    pub login: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.login.as_deref())
            .unwrap_or("Unknown")
    }
}

pub struct YouTrackClient<T = HttpTransport> {
    transport: T,
    default_page_size: usize,
    max_page_size: usize,
}

impl YouTrackClient<HttpTransport> {
    pub fn from_config(config: &CatchupConfig) -> AnyResult<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(
            transport,
            config.default_page_size,
            config.max_page_size,
        ))
    }
}

impl<T: Transport> YouTrackClient<T> {
    pub fn new(transport: T, default_page_size: usize, max_page_size: usize) -> Self {
        Self {
            transport,
            default_page_size,
            max_page_size,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn search_page(
        &self,
        search: &SearchQuery,
        skip: usize,
        page_size: Option<usize>,
    ) -> Result<SearchPage> {
        let top = self.effective_page_size(page_size);

        let mut params = vec![
            ("$skip".to_string(), skip.to_string()),
            ("$top".to_string(), top.to_string()),
        ];
        if !search.query.is_empty() {
            params.push(("query".to_string(), search.query.clone()));
        }
        if let Some(fields) = fields_param(&search.fields) {
            params.push(("fields".to_string(), fields));
        }

        debug!(skip, top, query = %search.query, "searching issues");
        let response = self.transport.request(Method::GET, "issues", &params, None)?;

        let issues = issue_values(response)
            .into_iter()
            .map(|value| Issue::from_value(value, search.normalize))
            .collect::<Vec<_>>();
        let returned_count = issues.len();

        Ok(SearchPage {
            issues,
            requested_size: top,
            returned_count,
            skip_offset: skip,
            has_more: returned_count == top,
        })
    }

    pub fn search_all(
        &self,
        search: SearchQuery,
        page_size: Option<usize>,
        max_results: Option<usize>,
    ) -> SearchAll<'_, T> {
        let page_size = self.effective_page_size(page_size).max(1);
        SearchAll {
            client: self,
            search,
            page_size,
            remaining: max_results,
            skip: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub fn get_issue(&self, id: &str, fields: &[&str], normalize: bool) -> Result<Issue> {
        let params = fields_query(fields);
        debug!(issue = id, "fetching issue");
        let value = self
            .transport
            .request(Method::GET, &format!("issues/{id}"), &params, None)?;
        Ok(Issue::from_value(value, normalize))
    }

    pub fn get_current_user(&self, fields: &[&str]) -> Result<UserRecord> {
        let params = fields_query(fields);
        debug!("fetching current user");
        let value = self
            .transport
            .request(Method::GET, "users/me", &params, None)?;
        serde_json::from_value(value).map_err(|source| TransportError::UnexpectedPayload {
            what: "user",
            source,
        })
    }

    fn effective_page_size(&self, requested: Option<usize>) -> usize {
        let Some(size) = requested else {
            return self.default_page_size;
        };
        if size > self.max_page_size {
            warn!(
                requested = size,
                maximum = self.max_page_size,
                "requested page size exceeds maximum, using maximum instead"
            );
            return self.max_page_size;
        }
        size
    }
}

/// The first error is yielded once and ends the sequence.
pub struct SearchAll<'a, T> {
    client: &'a YouTrackClient<T>,
    search: SearchQuery,
    page_size: usize,
    remaining: Option<usize>,
    skip: usize,
    buffer: VecDeque<Issue>,
    exhausted: bool,
}

impl<T> SearchAll<'_, T> {
    pub fn next_skip(&self) -> usize {
        self.skip
    }
}

impl<T: Transport> Iterator for SearchAll<'_, T> {
    type Item = Result<Issue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == Some(0) {
                self.buffer.clear();
                self.exhausted = true;
                return None;
            }

            if let Some(issue) = self.buffer.pop_front() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(Ok(issue));
            }

            if self.exhausted {
                return None;
            }

            let batch = match self.remaining {
                Some(remaining) => self.page_size.min(remaining),
                None => self.page_size,
            };

            let page = match self.client.search_page(&self.search, self.skip, Some(batch)) {
                Ok(page) => page,
                Err(error) => {
                    self.exhausted = true;
                    return Some(Err(error));
                }
            };

            if !page.has_more || page.returned_count < page.requested_size {
                self.exhausted = true;
            }
            self.skip += page.returned_count;
            self.buffer.extend(page.issues);

            debug!(skip = self.skip, "fetched page, continuing");
        }
    }
}

fn fields_param(fields: &[String]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    Some(fields.join(","))
}

fn fields_query(fields: &[&str]) -> Vec<(String, String)> {
    if fields.is_empty() {
        return Vec::new();
    }
    vec![("fields".to_string(), fields.join(","))]
}

/// The issues endpoint answers with a bare array; some proxies wrap it in
/// `{"issues": [...]}`.
fn issue_values(response: Value) -> Vec<Value> {
    match response {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("issues") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use reqwest::Method;
    use serde_json::{json, Value};

    use super::{SearchQuery, Transport, TransportError, YouTrackClient};

    #[derive(Debug, Clone, PartialEq)]
    struct Recorded {
        method: Method,
        path: String,
        query: Vec<(String, String)>,
    }

    impl Recorded {
        fn param(&self, key: &str) -> Option<&str> {
            self.query
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str())
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        issues: Vec<Value>,
        wrap_in_object: bool,
        server_cap: Option<usize>,
        fail_on: Option<usize>,
        single: Option<Value>,
        requests: RefCell<Vec<Recorded>>,
    }

    impl FakeTransport {
        fn with_issues(count: usize) -> Self {
            Self {
                issues: (0..count)
                    .map(|index| json!({"idReadable": format!("DEMO-{index}"), "updated": index}))
                    .collect(),
                ..Self::default()
            }
        }

        fn skips(&self) -> Vec<usize> {
            self.requests
                .borrow()
                .iter()
                .map(|request| request.param("$skip").expect("skip").parse().expect("int"))
                .collect()
        }

        fn tops(&self) -> Vec<usize> {
            self.requests
                .borrow()
                .iter()
                .map(|request| request.param("$top").expect("top").parse().expect("int"))
                .collect()
        }

        fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl Transport for FakeTransport {
        fn request(
            &self,
            method: Method,
            path: &str,
            query: &[(String, String)],
            _body: Option<&Value>,
        ) -> Result<Value, TransportError> {
            let recorded = Recorded {
                method,
                path: path.to_string(),
                query: query.to_vec(),
            };
            self.requests.borrow_mut().push(recorded.clone());

            if self.fail_on == Some(self.request_count()) {
                return Err(TransportError::Status {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }

            if path != "issues" {
                return Ok(self.single.clone().unwrap_or_else(|| json!({})));
            }

            let skip: usize = recorded.param("$skip").unwrap_or("0").parse().expect("int");
            let mut top: usize = recorded.param("$top").unwrap_or("0").parse().expect("int");
            if let Some(cap) = self.server_cap {
                top = top.min(cap);
            }
            let page = self
                .issues
                .iter()
                .skip(skip)
                .take(top)
                .cloned()
                .collect::<Vec<_>>();

            if self.wrap_in_object {
                Ok(json!({ "issues": page }))
            } else {
                Ok(Value::Array(page))
            }
        }
    }

    fn client(transport: &FakeTransport) -> YouTrackClient<&FakeTransport> {
        YouTrackClient::new(transport, 50, 100)
    }

    fn collect_ids(
        client: &YouTrackClient<&FakeTransport>,
        page_size: usize,
        max_results: Option<usize>,
    ) -> Vec<String> {
        client
            .search_all(SearchQuery::new("for: me"), Some(page_size), max_results)
            .map(|issue| issue.expect("issue").id().expect("id").to_string())
            .collect()
    }

    #[test]
    fn builds_page_request_parameters() {
        let transport = FakeTransport::with_issues(3);
        let search = SearchQuery::new("for: me #Unresolved")
            .fields(["idReadable", "customFields(name,value(name,login))"]);

        let page = client(&transport)
            .search_page(&search, 20, Some(10))
            .expect("page");

        let requests = transport.requests.borrow();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path, "issues");
        assert_eq!(
            requests[0].query,
            vec![
                ("$skip".to_string(), "20".to_string()),
                ("$top".to_string(), "10".to_string()),
                ("query".to_string(), "for: me #Unresolved".to_string()),
                (
                    "fields".to_string(),
                    "idReadable,customFields(name,value(name,login))".to_string()
                ),
            ]
        );
        assert_eq!(page.skip_offset, 20);
        assert_eq!(page.returned_count, 0);
        assert!(!page.has_more);
    }

    #[test]
    fn omits_empty_query_and_fields_and_uses_default_size() {
        let transport = FakeTransport::with_issues(60);
        let page = client(&transport)
            .search_page(&SearchQuery::new(""), 0, None)
            .expect("page");

        let requests = transport.requests.borrow();
        assert_eq!(requests[0].param("query"), None);
        assert_eq!(requests[0].param("fields"), None);
        assert_eq!(requests[0].param("$top"), Some("50"));
        assert_eq!(page.requested_size, 50);
        assert_eq!(page.returned_count, 50);
        assert!(page.has_more);
    }

    #[test]
    fn caps_page_size_at_maximum() {
        let transport = FakeTransport::with_issues(250);
        let page = client(&transport)
            .search_page(&SearchQuery::new(""), 0, Some(500))
            .expect("page");

        assert_eq!(page.requested_size, 100);
        assert_eq!(transport.tops(), vec![100]);
        assert!(page.has_more);
    }

    #[test]
    fn accepts_wrapped_issue_lists_and_normalizes() {
        let transport = FakeTransport {
            issues: vec![json!({
                "idReadable": "DEMO-1",
                "customFields": [{"name": "State", "value": {"name": "Open"}}]
            })],
            wrap_in_object: true,
            ..FakeTransport::default()
        };

        let page = client(&transport)
            .search_page(&SearchQuery::new(""), 0, Some(5))
            .expect("page");
        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.issues[0].custom_field_text("State").as_deref(), Some("Open"));

        let raw = client(&transport)
            .search_page(&SearchQuery::new("").without_normalization(), 0, Some(5))
            .expect("page");
        assert!(!raw.issues[0].is_normalized());
    }

    #[test]
    fn walks_all_pages_in_order() {
        let transport = FakeTransport::with_issues(7);
        let ids = collect_ids(&client(&transport), 3, None);

        assert_eq!(
            ids,
            (0..7).map(|index| format!("DEMO-{index}")).collect::<Vec<_>>()
        );
        assert_eq!(transport.skips(), vec![0, 3, 6]);
        assert_eq!(transport.tops(), vec![3, 3, 3]);
    }

    #[test]
    fn probes_one_empty_page_when_size_divides_total() {
        let transport = FakeTransport::with_issues(6);
        let ids = collect_ids(&client(&transport), 3, None);

        assert_eq!(ids.len(), 6);
        assert_eq!(transport.skips(), vec![0, 3, 6]);
    }

    #[test]
    fn pagination_terminates_for_many_shapes() {
        for total in 0..12usize {
            for page_size in 1..6usize {
                for max_results in [None, Some(0), Some(1), Some(5), Some(100)] {
                    let transport = FakeTransport::with_issues(total);
                    let ids = collect_ids(&client(&transport), page_size, max_results);

                    let expected = max_results.map_or(total, |max| max.min(total));
                    assert_eq!(ids.len(), expected, "total={total} page={page_size}");

                    let skips = transport.skips();
                    let mut unique = skips.clone();
                    unique.dedup();
                    assert_eq!(skips, unique, "skip revisited");
                    assert!(skips.windows(2).all(|pair| pair[0] < pair[1]));
                    assert!(transport.request_count() <= total / page_size + 1);
                }
            }
        }
    }

    #[test]
    fn zero_max_results_makes_no_requests() {
        let transport = FakeTransport::with_issues(10);
        let ids = collect_ids(&client(&transport), 5, Some(0));

        assert!(ids.is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn shrinks_last_request_to_remaining_budget() {
        let transport = FakeTransport::with_issues(10);
        let ids = collect_ids(&client(&transport), 3, Some(4));

        assert_eq!(ids, vec!["DEMO-0", "DEMO-1", "DEMO-2", "DEMO-3"]);
        assert_eq!(transport.tops(), vec![3, 1]);
        assert_eq!(transport.skips(), vec![0, 3]);
    }

    #[test]
    fn budget_larger_than_dataset_ends_cleanly() {
        let transport = FakeTransport::with_issues(5);
        let ids = collect_ids(&client(&transport), 2, Some(100));

        assert_eq!(ids.len(), 5);
        assert_eq!(transport.skips(), vec![0, 2, 4]);
    }

    #[test]
    fn short_page_ends_the_sequence() {
        let transport = FakeTransport {
            server_cap: Some(2),
            ..FakeTransport::with_issues(10)
        };
        let ids = collect_ids(&client(&transport), 5, None);

        assert_eq!(ids, vec!["DEMO-0", "DEMO-1"]);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn oversized_page_size_is_capped_for_every_page() {
        let transport = FakeTransport::with_issues(250);
        let ids = collect_ids(&client(&transport), 500, None);

        assert_eq!(ids.len(), 250);
        assert_eq!(transport.tops(), vec![100, 100, 100]);
    }

    #[test]
    fn fetches_lazily_one_page_at_a_time() {
        let transport = FakeTransport::with_issues(10);
        let client = client(&transport);
        let mut cursor = client.search_all(SearchQuery::new(""), Some(4), None);

        assert_eq!(transport.request_count(), 0);
        cursor.next().expect("first").expect("issue");
        assert_eq!(transport.request_count(), 1);
        for _ in 0..3 {
            cursor.next().expect("buffered").expect("issue");
        }
        assert_eq!(transport.request_count(), 1);
        assert_eq!(cursor.next_skip(), 4);
        cursor.next().expect("second page").expect("issue");
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn yields_error_once_and_stops() {
        let transport = FakeTransport {
            fail_on: Some(2),
            ..FakeTransport::with_issues(10)
        };
        let client = client(&transport);
        let results = client
            .search_all(SearchQuery::new(""), Some(3), None)
            .collect::<Vec<_>>();

        assert_eq!(results.len(), 4);
        assert!(results[..3].iter().all(|result| result.is_ok()));
        let error = results[3].as_ref().expect_err("error");
        assert_eq!(error.status(), Some(503));
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn gets_single_issue_normalized() {
        let transport = FakeTransport {
            single: Some(json!({
                "idReadable": "DEMO-9",
                "customFields": [{"name": "Assignee", "value": {"login": "alice"}}]
            })),
            ..FakeTransport::default()
        };

        let issue = client(&transport)
            .get_issue("DEMO-9", &["idReadable", "customFields(name,value(login))"], true)
            .expect("issue");

        let requests = transport.requests.borrow();
        assert_eq!(requests[0].path, "issues/DEMO-9");
        assert_eq!(
            requests[0].param("fields"),
            Some("idReadable,customFields(name,value(login))")
        );
        assert_eq!(issue.custom_field_text("Assignee").as_deref(), Some("alice"));
    }

    #[test]
    fn gets_current_user() {
        let transport = FakeTransport {
            single: Some(json!({"login": "alice", "fullName": "Alice A", "ringId": "r-1"})),
            ..FakeTransport::default()
        };

        let user = client(&transport)
            .get_current_user(&["login", "fullName", "ringId"])
            .expect("user");

        assert_eq!(transport.requests.borrow()[0].path, "users/me");
        assert_eq!(user.login.as_deref(), Some("alice"));
        assert_eq!(user.display_name(), "Alice A");
        assert_eq!(user.extra.get("ringId"), Some(&json!("r-1")));
    }

    #[test]
    fn current_user_without_fields_sends_no_params() {
        let transport = FakeTransport::default();
        let user = client(&transport).get_current_user(&[]).expect("user");

        assert!(transport.requests.borrow()[0].query.is_empty());
        assert_eq!(user.display_name(), "Unknown");
    }
}
