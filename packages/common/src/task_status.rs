#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a recognition task.
///
/// A task starts as `Processing` and is moved to `Done` or `Failed` by the
/// recognition callbacks. Only an explicit retry puts it back to
/// `Processing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Submitted to the recognition service, no result yet.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "processing"))]
    Processing,
    /// The recognition service reported success.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "done"))]
    Done,
    /// The recognition service reported a failure.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "failed"))]
    Failed,
}

impl TaskStatus {
    pub const ALL: &'static [TaskStatus] = &[Self::Processing, Self::Done, Self::Failed];

    /// Returns true once the recognition service has answered.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// Whether a callback may move a task from `self` to `next`.
    ///
    /// Callbacks never move a task back to `Processing`, and a `Done` task
    /// is never downgraded to `Failed` by a late or duplicate failure report.
    pub fn accepts_callback_transition(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (_, Self::Processing) => false,
            (Self::Done, Self::Failed) => false,
            _ => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Processing
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            TaskStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
