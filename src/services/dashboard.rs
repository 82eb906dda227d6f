//! Dashboard sample data, embedded at build time and parsed once.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

const DASHBOARD_YAML: &str = include_str!("../../data/dashboard.yaml");

static DASHBOARD: LazyLock<Result<DashboardData, String>> =
    LazyLock::new(|| serde_yaml::from_str(DASHBOARD_YAML).map_err(|e| e.to_string()));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub kpis: Vec<Kpi>,
    pub monthly_generation: Vec<MonthlyGeneration>,
    pub plants: Vec<Plant>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGeneration {
    pub month: String,
    pub energy_mwh: f64,
    pub forecast_mwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    Wind,
    Solar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantStatus {
    Online,
    Maintenance,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub name: String,
    pub kind: PlantKind,
    pub capacity_mw: f64,
    pub status: PlantStatus,
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u32,
    pub severity: AlertSeverity,
    pub plant_id: String,
    pub message: String,
    pub raised_at: String,
}

/// The embedded sample data.
///
/// # Errors
///
/// Returns the YAML parse error if the embedded file is malformed.
pub fn dashboard_data() -> Result<&'static DashboardData, &'static str> {
    DASHBOARD.as_ref().map_err(String::as_str)
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
