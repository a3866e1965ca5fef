use std::cmp::Reverse;

use crate::issue::Issue;

pub fn sort_by_updated_desc(issues: &mut [Issue]) {
    issues.sort_by_key(|issue| Reverse(issue.updated().unwrap_or(0)));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::sort_by_updated_desc;
    use crate::issue::Issue;

    fn issue(value: serde_json::Value) -> Issue {
        Issue::from_value(value, true)
    }

    fn ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().filter_map(Issue::id).collect()
    }

    #[test]
    fn sorts_descending_and_keeps_ties_stable() {
        let mut issues = vec![
            issue(json!({"id": "A", "updated": 100})),
            issue(json!({"id": "B", "updated": 200})),
            issue(json!({"id": "C", "updated": 100})),
        ];

        sort_by_updated_desc(&mut issues);

        assert_eq!(ids(&issues), vec!["B", "A", "C"]);
    }

    #[test]
    fn missing_timestamps_sort_as_oldest() {
        let mut issues = vec![
            issue(json!({"id": "none"})),
            issue(json!({"id": "new", "updated": 5})),
            issue(json!({"id": "null", "updated": null})),
            issue(json!({"id": "zero", "updated": 0})),
        ];

        sort_by_updated_desc(&mut issues);

        assert_eq!(ids(&issues), vec!["new", "none", "null", "zero"]);
    }
}
