//! Role dashboards and the chart series built from their monthly points.

use serde::{Deserialize, Serialize};
use time::Date;

/// One month of a KPI series; `month` is `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminKpis {
    pub total_users: u64,
    pub total_providers: u64,
    pub total_spaces: u64,
    pub active_rentals: u64,
    pub monthly_revenue: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderKpis {
    pub published_spaces: u64,
    pub active_rentals: u64,
    pub upcoming_bookings: u64,
    /// Share of bookable time that was booked, 0.0-1.0.
    pub occupancy_rate: f64,
    pub monthly_revenue: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientKpis {
    pub active_bookings: u64,
    pub active_rentals: u64,
    pub pending_invoices: u64,
    pub monthly_spend: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", content = "kpis", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dashboard {
    Admin(AdminKpis),
    Provider(ProviderKpis),
    Client(ClientKpis),
}

impl Dashboard {
    /// The monthly series this dashboard charts: revenue for admins and
    /// providers, spend for clients.
    #[must_use]
    pub fn points(&self) -> &[MonthlyPoint] {
        match self {
            Self::Admin(kpis) => &kpis.monthly_revenue,
            Self::Provider(kpis) => &kpis.monthly_revenue,
            Self::Client(kpis) => &kpis.monthly_spend,
        }
    }
}

/// Chart-ready labels and values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    /// The `months` months ending with the month of `end`, oldest first.
    /// Months without a point are zero; duplicate points are summed and
    /// points outside the window ignored.
    #[must_use]
    pub fn from_points(points: &[MonthlyPoint], end: Date, months: u8) -> Self {
        let end_index = month_index(end.year(), u8::from(end.month()));
        let first = end_index - i32::from(months) + 1;
        let mut series = Self::default();
        for index in first..=end_index {
            let (year, month) = (index.div_euclid(12), index.rem_euclid(12) + 1);
            let label = format!("{year:04}-{month:02}");
            let value: f64 = points
                .iter()
                .filter(|p| parse_month(&p.month) == Some(index))
                .map(|p| p.value)
                .sum();
            series.labels.push(label);
            series.values.push(value);
        }
        series
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

fn month_index(year: i32, month: u8) -> i32 {
    year * 12 + i32::from(month) - 1
}

/// `YYYY-MM` or a full `YYYY-MM-DD` date, as a month index.
fn parse_month(raw: &str) -> Option<i32> {
    let mut parts = raw.trim().split('-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u8>().ok().filter(|m| (1..=12).contains(m))?;
    Some(month_index(year, month))
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
