use serde::{Deserialize, Serialize};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Raw list query string. Values stay strings so junk input is coerced to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn params(&self) -> ListParams {
        ListParams {
            page: coerce_positive(self.page.as_deref(), DEFAULT_PAGE),
            limit: coerce_positive(self.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Validated paging window plus optional case-insensitive search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl ListParams {
    pub fn first(limit: i64) -> Self {
        Self {
            page: 1,
            limit,
            search: None,
        }
    }

    /// Every record in one page; used by export.
    pub fn unbounded() -> Self {
        Self::first(i64::MAX)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `%term%` with LIKE metacharacters escaped.
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|term| {
            let escaped = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }

    pub fn matches(&self, field: &str) -> bool {
        match &self.search {
            Some(term) => field.to_lowercase().contains(&term.to_lowercase()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, params: &ListParams) -> Self {
        let limit = params.limit.max(1);
        let total_pages = total / limit + i64::from(total % limit != 0);
        Self {
            total,
            page: params.page,
            limit: params.limit,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            pagination: Pagination::new(total, params),
        }
    }
}

fn coerce_positive(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}
