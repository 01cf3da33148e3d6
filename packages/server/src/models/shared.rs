use chrono::NaiveDate;
use serde::Serialize;

use crate::config::QueryConfig;
use crate::error::AppError;

/// Plain acknowledgement body.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Task deleted")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Empty JSON object (`{}`).
#[derive(Serialize, utoipa::ToSchema)]
pub struct EmptyResponse {}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    pub page_size: u64,
}

/// Neighbouring page numbers of a served page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<u64>,
    pub previous: Option<u64>,
}

impl PageRequest {
    /// Parses raw query values.
    ///
    /// An unparsable or zero page is a `NOT_FOUND`. An unparsable or zero
    /// page size falls back to the default; larger sizes are capped.
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        config: &QueryConfig,
    ) -> Result<Self, AppError> {
        let page = match page.map(str::trim).filter(|s| !s.is_empty()) {
            None => 1,
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(invalid_page)?,
        };
        let max = config.max_page_size.max(1);
        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|s| *s >= 1)
            .unwrap_or(config.default_page_size)
            .clamp(1, max);

        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    /// Checks the page against the total and returns its neighbours.
    ///
    /// Page 1 always exists, even when there are no results.
    pub fn links(&self, total: u64) -> Result<PageLinks, AppError> {
        let last_page = total.div_ceil(self.page_size).max(1);
        if self.page > last_page {
            return Err(invalid_page());
        }
        Ok(PageLinks {
            next: (self.page < last_page).then_some(self.page + 1),
            previous: (self.page > 1).then_some(self.page - 1),
        })
    }
}

fn invalid_page() -> AppError {
    AppError::NotFound("Invalid page".into())
}

/// Parses an optional `YYYY-MM-DD` query value.
pub fn parse_date(raw: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{name} must be a date in YYYY-MM-DD format"))),
    }
}
