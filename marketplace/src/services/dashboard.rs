//! Role dashboards.

use std::sync::Arc;

use session::Role;
use time::Date;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{ChartSeries, Dashboard};

pub const DASHBOARD_PATH: &str = "/api/dashboard";

/// Months shown on dashboard charts.
pub const CHART_MONTHS: u8 = 6;

pub struct DashboardService {
    api: Arc<ApiClient>,
}

impl DashboardService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// The dashboard for `role`. A backend with no data yet answers `404`,
    /// which yields an all-zero dashboard. Users without a role have none.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the empty-state `404`.
    pub async fn for_role(&self, role: Role) -> Result<Option<Dashboard>, ApiError> {
        let dashboard = match role {
            Role::Admin => Dashboard::Admin(self.fetch("admin").await?),
            Role::Proveedor => Dashboard::Provider(self.fetch("provider").await?),
            Role::Cliente => Dashboard::Client(self.fetch("client").await?),
            Role::Default => return Ok(None),
        };
        Ok(Some(dashboard))
    }

    async fn fetch<T>(&self, segment: &str) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let kpis = self.api.get_optional(&format!("{DASHBOARD_PATH}/{segment}")).await?;
        Ok(kpis.unwrap_or_default())
    }
}

/// The chart series of `dashboard` for the months ending with `today`'s.
#[must_use]
pub fn series(dashboard: &Dashboard, today: Date) -> ChartSeries {
    ChartSeries::from_points(dashboard.points(), today, CHART_MONTHS)
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
