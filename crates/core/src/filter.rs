//! Filter selection and the requery-vs-derive decision policy.

use std::fmt;

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
    Overdue,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
            StatusFilter::Overdue => "overdue",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum PeriodFilter {
    #[default]
    All,
    Today,
    Week,
    Overdue,
}

impl PeriodFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodFilter::All => "all",
            PeriodFilter::Today => "today",
            PeriodFilter::Week => "week",
            PeriodFilter::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum TaskOrder {
    CreatedAsc,
    #[default]
    CreatedDesc,
    PriorityDesc,
}

impl TaskOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOrder::CreatedAsc => "created-asc",
            TaskOrder::CreatedDesc => "created-desc",
            TaskOrder::PriorityDesc => "priority-desc",
        }
    }
}

impl fmt::Display for TaskOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three filter controls as the user currently has them set.
/// Ephemeral UI state; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub status: StatusFilter,
    pub period: PeriodFilter,
    pub order: TaskOrder,
}

/// How to satisfy a selection: ask the service, or reuse the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// The service is the authority for this selection; issue a fresh list call.
    Requery(ListQuery),
    /// Default fast path: derive from the held snapshot without I/O.
    DeriveLocal,
}

impl FilterSelection {
    /// Period, overdue, and non-default orderings are service-side concerns.
    /// Only the newest-first status split is served from the snapshot.
    pub fn requires_requery(&self) -> bool {
        self.period != PeriodFilter::All
            || self.status == StatusFilter::Overdue
            || matches!(self.order, TaskOrder::PriorityDesc | TaskOrder::CreatedAsc)
    }

    pub fn plan(&self) -> FetchPlan {
        if self.requires_requery() {
            FetchPlan::Requery(self.query())
        } else {
            FetchPlan::DeriveLocal
        }
    }

    /// Translate the selection into `GET /todos` parameters.
    pub fn query(&self) -> ListQuery {
        let status = match self.status {
            StatusFilter::Active => Some("active"),
            StatusFilter::Completed => Some("completed"),
            // overdue is expressed through the period parameter below, never
            // as a status; the two are never both sent
            StatusFilter::All | StatusFilter::Overdue => None,
        };

        let period = if self.status == StatusFilter::Overdue {
            Some("overdue")
        } else {
            match self.period {
                PeriodFilter::All => None,
                PeriodFilter::Today => Some("today"),
                PeriodFilter::Week => Some("week"),
                PeriodFilter::Overdue => Some("overdue"),
            }
        };

        // the service reads orderDir=asc for priority as high-to-low; that
        // is the documented request contract, not a bug to fix here
        let (order_by, order_dir) = match self.order {
            TaskOrder::PriorityDesc => ("priority", "asc"),
            TaskOrder::CreatedAsc => ("createdAt", "asc"),
            TaskOrder::CreatedDesc => ("createdAt", "desc"),
        };

        ListQuery {
            status,
            period,
            order_by,
            order_dir,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "status:{} period:{} order:{}",
            self.status, self.period, self.order
        )
    }
}

/// Query parameters for `GET /todos`, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<&'static str>,
    pub period: Option<&'static str>,
    pub order_by: &'static str,
    pub order_dir: &'static str,
}

impl ListQuery {
    pub fn params(&self) -> Vec<(&'static str, &'static str)> {
        let mut params = Vec::with_capacity(4);
        if let Some(status) = self.status {
            params.push(("status", status));
        }
        if let Some(period) = self.period {
            params.push(("period", period));
        }
        params.push(("orderBy", self.order_by));
        params.push(("orderDir", self.order_dir));
        params
    }
}
