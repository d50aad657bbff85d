use crate::{LeadRecord, LeadType};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Totals for one department as served by `/api/public/night-stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeptTotals {
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total: f64,
    #[serde(default, deserialize_with = "deserialize_breakdown")]
    pub breakdown: BTreeMap<String, f64>,
}

impl DeptTotals {
    pub fn sorted_breakdown(&self) -> Vec<(String, f64)> {
        sort_breakdown(&self.breakdown)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NightStats {
    #[serde(default)]
    pub billing: DeptTotals,
    #[serde(default)]
    pub insurance: DeptTotals,
}

impl NightStats {
    pub fn for_type(&self, lead_type: LeadType) -> &DeptTotals {
        match lead_type {
            LeadType::Billing => &self.billing,
            LeadType::Insurance => &self.insurance,
        }
    }
}

/// Per-department numbers on the manager dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeptStats {
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub today: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub night: f64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default, deserialize_with = "deserialize_breakdown")]
    pub breakdown: BTreeMap<String, f64>,
}

impl DeptStats {
    pub fn sorted_breakdown(&self) -> Vec<(String, f64)> {
        sort_breakdown(&self.breakdown)
    }
}

/// Payload of `/api/manager/data`. Missing sections default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerData {
    #[serde(default, deserialize_with = "deserialize_records")]
    pub billing: Vec<LeadRecord>,
    #[serde(default, deserialize_with = "deserialize_records")]
    pub insurance: Vec<LeadRecord>,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub stats_bill: DeptStats,
    #[serde(default, deserialize_with = "deserialize_or_default")]
    pub stats_ins: DeptStats,
}

impl ManagerData {
    pub fn leads(&self, lead_type: LeadType) -> &[LeadRecord] {
        match lead_type {
            LeadType::Billing => &self.billing,
            LeadType::Insurance => &self.insurance,
        }
    }

    pub fn stats(&self, lead_type: LeadType) -> &DeptStats {
        match lead_type {
            LeadType::Billing => &self.stats_bill,
            LeadType::Insurance => &self.stats_ins,
        }
    }
}

fn sort_breakdown(breakdown: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut rows: Vec<(String, f64)> = breakdown
        .iter()
        .map(|(agent, amount)| (agent.clone(), *amount))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

fn amount_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => crate::format::parse_amount(s),
        _ => 0.0,
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(amount_from_value(&Value::deserialize(deserializer)?))
}

fn deserialize_breakdown<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .map(|(agent, amount)| (agent, amount_from_value(&amount)))
        .collect())
}

// `null` sections come back when a worksheet is unavailable.
fn deserialize_records<'de, D>(deserializer: D) -> Result<Vec<LeadRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LeadRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_or_default<'de, D>(deserializer: D) -> Result<DeptStats, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DeptStats>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn night_stats_tolerates_missing_and_string_amounts() {
        let stats: NightStats = serde_json::from_value(serde_json::json!({
            "billing": {"total": "1,250.50", "breakdown": {"Haziq": 1000, "Areeb": "250.5"}}
        }))
        .expect("stats");

        assert_eq!(stats.billing.total, 1250.5);
        assert_eq!(stats.insurance, DeptTotals::default());
        let rows = stats.for_type(LeadType::Billing).sorted_breakdown();
        assert_eq!(rows[0], ("Haziq".to_string(), 1000.0));
        assert_eq!(rows[1], ("Areeb".to_string(), 250.5));
    }

    #[test]
    fn manager_data_defaults_absent_sections() {
        let data: ManagerData = serde_json::from_value(serde_json::json!({
            "billing": [{"Order ID": 5, "Status": "Submitted"}],
            "insurance": null,
            "stats_bill": {"today": 10.0, "night": 5.5, "pending": 1}
        }))
        .expect("manager data");

        assert_eq!(data.leads(LeadType::Billing).len(), 1);
        assert!(data.leads(LeadType::Insurance).is_empty());
        assert_eq!(data.stats(LeadType::Billing).pending, 1);
        assert_eq!(data.stats(LeadType::Insurance).today, 0.0);
    }
}
