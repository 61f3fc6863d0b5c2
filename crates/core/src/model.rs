use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    /// Wire values outside the documented set; ranked below low.
    #[serde(other)]
    Unknown,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Unknown => "unknown",
        }
    }

    /// Total ordering used for priority sorts. Unrecognized values rank
    /// below low rather than failing the sort.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
            Priority::Unknown => 0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(anyhow!(
                "Unknown priority '{}': expected low|medium|high",
                other
            )),
        }
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        const VARIANTS: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];
        &VARIANTS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Priority::Unknown => None,
            other => Some(clap::builder::PossibleValue::new(other.as_str())),
        }
    }
}

/// A task as the service stores it. The wire format uses camelCase names
/// and calls the title field `todo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(rename = "todo")]
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// A task is overdue when it has a deadline in the past and is still open.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.complete && self.deadline.map_or(false, |deadline| deadline < now)
    }

    /// The only place completion changes. `complete` and `completed_at`
    /// always move together: completing stamps `completed_at` (keeping an
    /// existing stamp), reopening clears it.
    pub fn set_complete(&mut self, complete: bool, now: DateTime<Utc>) {
        self.complete = complete;
        if complete {
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.updated_at = Some(now);
    }
}

/// Payload for creating a task; the server assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    #[serde(rename = "todo")]
    pub title: String,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Priority,
}

impl TaskDraft {
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Reject drafts whose title is empty after trimming, before any
    /// request is issued.
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        Ok(())
    }
}
