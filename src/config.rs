use clap::Args;

use crate::filter::CaseFilter;
use crate::summary::COMPLETED_STATUS;

/// Presentation limits and normalization policy shared by every command.
#[derive(Debug, Clone, Args)]
pub struct AnalyticsConfig {
    /// Rows per page in the case table
    #[arg(long, env = "HR_ANALYTICS_PAGE_SIZE", default_value_t = 10)]
    pub page_size: usize,
    /// Entries kept in the stage-transition and position rankings
    #[arg(long, env = "HR_ANALYTICS_TOP_N", default_value_t = 10)]
    pub top_n: usize,
    /// Trailing months covered by the monthly trend
    #[arg(long, env = "HR_ANALYTICS_TREND_MONTHS", default_value_t = 6)]
    pub trend_months: u32,
    /// Status value that marks a case as completed
    #[arg(long, env = "HR_ANALYTICS_COMPLETED_STATUS", default_value = COMPLETED_STATUS)]
    pub completed_status: String,
    /// Reject cases without `created_at` instead of stamping them with the current time
    #[arg(long, env = "HR_ANALYTICS_STRICT_CREATED_AT")]
    pub strict_created_at: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            top_n: 10,
            trend_months: 6,
            completed_status: COMPLETED_STATUS.to_string(),
            strict_created_at: false,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub department: Option<String>,
    #[arg(long)]
    pub job_position: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub min_days: Option<u32>,
    #[arg(long)]
    pub max_days: Option<u32>,
}

impl From<FilterArgs> for CaseFilter {
    fn from(args: FilterArgs) -> Self {
        CaseFilter {
            department: args.department,
            job_position: args.job_position,
            status: args.status,
            time_to_hire_min: args.min_days,
            time_to_hire_max: args.max_days,
        }
    }
}
