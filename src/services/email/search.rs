use chrono::{Days, NaiveDate};

/// 规范化的搜索条件
#[derive(Debug, Clone, Default)]
pub struct SearchSpec {
    pub only_unseen: bool,
    pub from: Option<String>,
    pub since_days_ago: Option<u64>,
}

/// A single atomic IMAP search criterion. Criteria combine conjunctively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriterion {
    Unseen,
    From(String),
    Since(NaiveDate),
}

impl SearchCriterion {
    /// Render into the query fragment the mail protocol expects.
    pub fn to_query(&self) -> String {
        match self {
            SearchCriterion::Unseen => "UNSEEN".to_string(),
            SearchCriterion::From(sender) => format!("FROM \"{}\"", sender),
            SearchCriterion::Since(date) => format!("SINCE {}", date.format("%d-%b-%Y")),
        }
    }
}

/// Join criteria into one conjunctive query string.
pub fn to_query(criteria: &[SearchCriterion]) -> String {
    criteria
        .iter()
        .map(SearchCriterion::to_query)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Assemble criteria from a spec, in the order unseen, from, since.
///
/// Pure: emits `Since` only when the spec carries a window. The default
/// window policy belongs to the caller, not here.
pub fn build(spec: &SearchSpec, today: NaiveDate) -> Vec<SearchCriterion> {
    let mut criteria = Vec::new();

    if spec.only_unseen {
        criteria.push(SearchCriterion::Unseen);
    }

    if let Some(sender) = &spec.from {
        criteria.push(SearchCriterion::From(sender.clone()));
    }

    if let Some(days) = spec.since_days_ago {
        let since = today.checked_sub_days(Days::new(days)).unwrap_or(today);
        criteria.push(SearchCriterion::Since(since));
    }

    criteria
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
    }

    #[test]
    fn test_build_emits_criteria_in_wire_order() {
        let spec = SearchSpec {
            only_unseen: true,
            from: Some("alice@x.com".to_string()),
            since_days_ago: Some(7),
        };

        let criteria = build(&spec, today());
        assert_eq!(
            criteria,
            vec![
                SearchCriterion::Unseen,
                SearchCriterion::From("alice@x.com".to_string()),
                SearchCriterion::Since(NaiveDate::from_ymd_opt(2025, 4, 3).unwrap()),
            ]
        );
    }

    #[test]
    fn test_build_skips_absent_fields() {
        let spec = SearchSpec {
            only_unseen: true,
            from: None,
            since_days_ago: None,
        };

        assert_eq!(build(&spec, today()), vec![SearchCriterion::Unseen]);
    }

    #[test]
    fn test_build_applies_no_default_window() {
        let spec = SearchSpec {
            only_unseen: false,
            from: Some("bob@x.com".to_string()),
            since_days_ago: None,
        };

        let criteria = build(&spec, today());
        assert!(!criteria
            .iter()
            .any(|c| matches!(c, SearchCriterion::Since(_))));
    }

    #[test]
    fn test_since_query_uses_imap_date_format() {
        let criterion = SearchCriterion::Since(NaiveDate::from_ymd_opt(2025, 4, 3).unwrap());
        assert_eq!(criterion.to_query(), "SINCE 03-Apr-2025");
    }

    #[test]
    fn test_query_joins_conjunctively() {
        let spec = SearchSpec {
            only_unseen: true,
            from: Some("alice@x.com".to_string()),
            since_days_ago: None,
        };

        assert_eq!(
            to_query(&build(&spec, today())),
            "UNSEEN FROM \"alice@x.com\""
        );
    }
}
