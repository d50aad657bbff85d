//! Time-window analysis over the manager's cached leads.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use lead_core::format::parse_amount;
use lead_core::{fields, LeadRecord, LeadType, STATUS_CHARGED, STATUS_DECLINED, STATUS_SUBMITTED};
use std::collections::{BTreeMap, BTreeSet};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

pub const STATUS_FILTERS: [Option<&str>; 4] = [
    None,
    Some(STATUS_SUBMITTED),
    Some(STATUS_CHARGED),
    Some(STATUS_DECLINED),
];

pub const BILLING_COLUMNS: &[&str] = &[
    fields::RECORD_ID,
    fields::AGENT_NAME,
    fields::NAME,
    fields::PH_NUMBER,
    fields::ADDRESS,
    fields::EMAIL,
    fields::CARD_HOLDER,
    fields::CARD_NUMBER,
    fields::EXPIRY_DATE,
    fields::CVC,
    fields::CHARGE,
    fields::LLC,
    fields::PROVIDER,
    fields::DATE_OF_CHARGE,
    fields::STATUS,
    fields::TIMESTAMP,
    fields::PIN_CODE,
];

pub const INSURANCE_COLUMNS: &[&str] = &[
    fields::RECORD_ID,
    fields::AGENT_NAME,
    fields::NAME,
    fields::PH_NUMBER,
    fields::ADDRESS,
    fields::EMAIL,
    fields::CARD_HOLDER,
    fields::CARD_NUMBER,
    fields::EXPIRY_DATE,
    fields::CVC,
    fields::CHARGE,
    fields::LLC,
    fields::DATE_OF_CHARGE,
    fields::STATUS,
    fields::TIMESTAMP,
];

pub fn columns(lead_type: LeadType) -> &'static [&'static str] {
    match lead_type {
        LeadType::Billing => BILLING_COLUMNS,
        LeadType::Insurance => INSURANCE_COLUMNS,
    }
}

pub fn column_title(column: &str, lead_type: LeadType) -> String {
    if column == fields::RECORD_ID {
        lead_type.id_label().to_string()
    } else {
        column.replacen('_', " ", 1)
    }
}

/// Cell shown for a column, falling back through the alias columns.
pub fn column_value<'a>(record: &'a LeadRecord, column: &str) -> &'a str {
    let value = match column {
        fields::NAME => record.client_name(),
        fields::CHARGE => record.charge(),
        fields::PH_NUMBER => record.phone(),
        fields::RECORD_ID => record.business_id(),
        other => record.get(other),
    };
    value.unwrap_or_default()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisFilter {
    pub lead_type: LeadType,
    pub start_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_date: NaiveDate,
    pub end_time: Option<NaiveTime>,
    pub agent: Option<String>,
    pub status: Option<String>,
    pub search: String,
}

impl AnalysisFilter {
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            lead_type: LeadType::Billing,
            start_date: date,
            start_time: None,
            end_date: date,
            end_time: None,
            agent: None,
            status: None,
            search: String::new(),
        }
    }

    /// Inclusive bounds; explicit end times cover the whole minute.
    pub fn window(&self) -> (NaiveDateTime, NaiveDateTime) {
        let midnight = NaiveTime::default();
        let start = self
            .start_time
            .map(|time| time.with_second(0).unwrap_or(time))
            .unwrap_or(midnight);
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(midnight);
        let end = self
            .end_time
            .map(|time| time.with_second(59).unwrap_or(time))
            .unwrap_or(end_of_day);
        (self.start_date.and_time(start), self.end_date.and_time(end))
    }

    pub fn shift_start(&mut self, days: i64) {
        self.start_date += Duration::days(days);
    }

    pub fn shift_end(&mut self, days: i64) {
        self.end_date += Duration::days(days);
    }

    pub fn cycle_status(&mut self) {
        let current = STATUS_FILTERS
            .iter()
            .position(|status| *status == self.status.as_deref())
            .unwrap_or(0);
        let next = STATUS_FILTERS[(current + 1) % STATUS_FILTERS.len()];
        self.status = next.map(str::to_string);
    }

    /// Walks "all agents" followed by each known agent.
    pub fn cycle_agent(&mut self, agents: &[String]) {
        self.agent = match &self.agent {
            None => agents.first().cloned(),
            Some(current) => agents
                .iter()
                .position(|agent| agent == current)
                .and_then(|idx| agents.get(idx + 1))
                .cloned(),
        };
    }

    fn matches(&self, record: &LeadRecord, window: (NaiveDateTime, NaiveDateTime)) -> bool {
        let Some(at) = record.timestamp().and_then(parse_timestamp) else {
            return false;
        };
        if at < window.0 || at > window.1 {
            return false;
        }
        if let Some(agent) = &self.agent {
            if record.agent() != Some(agent.as_str()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if record.status().map(str::trim) != Some(status.as_str()) {
                return false;
            }
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || record
                .fields
                .values()
                .any(|value| value.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, PartialEq)]
pub struct AnalysisReport<'a> {
    /// Newest first.
    pub rows: Vec<&'a LeadRecord>,
    pub total_charged: f64,
    pub count: usize,
    pub average: f64,
    /// `HH:00` -> charged amount.
    pub hourly: BTreeMap<String, f64>,
    pub peak_hour: String,
}

pub fn analyze<'a>(records: &'a [LeadRecord], filter: &AnalysisFilter) -> AnalysisReport<'a> {
    let window = filter.window();
    let rows: Vec<&LeadRecord> = records
        .iter()
        .rev()
        .filter(|record| filter.matches(record, window))
        .collect();

    let mut total_charged = 0.0;
    let mut hourly: BTreeMap<String, f64> = BTreeMap::new();
    for record in &rows {
        if record.status().map(str::trim) != Some(STATUS_CHARGED) {
            continue;
        }
        let amount = record.charge().map(parse_amount).unwrap_or(0.0);
        total_charged += amount;
        if let Some(at) = record.timestamp().and_then(parse_timestamp) {
            *hourly.entry(format!("{:02}:00", at.hour())).or_insert(0.0) += amount;
        }
    }

    let mut peak_hour = "-".to_string();
    let mut peak = 0.0;
    for (hour, amount) in &hourly {
        if *amount > peak {
            peak = *amount;
            peak_hour = hour.clone();
        }
    }

    let count = rows.len();
    let average = if count == 0 {
        0.0
    } else {
        total_charged / count as f64
    };
    AnalysisReport {
        rows,
        total_charged,
        count,
        average,
        hourly,
        peak_hour,
    }
}

/// Distinct non-empty agent names, sorted.
pub fn agents(records: &[LeadRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(LeadRecord::agent)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
