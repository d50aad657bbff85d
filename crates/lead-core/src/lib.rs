use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod events;
pub mod format;
pub mod push_wire;
pub mod stats;

/// Sheet column names as the backend reports them.
pub mod fields {
    pub const RECORD_ID: &str = "Record_ID";
    pub const ORDER_ID: &str = "Order ID";
    pub const AGENT_NAME: &str = "Agent Name";
    pub const NAME: &str = "Name";
    pub const CLIENT_NAME: &str = "Client Name";
    pub const PH_NUMBER: &str = "Ph Number";
    pub const PHONE: &str = "Phone";
    pub const ADDRESS: &str = "Address";
    pub const EMAIL: &str = "Email";
    pub const CARD_HOLDER: &str = "Card Holder Name";
    pub const CARD_NUMBER: &str = "Card Number";
    pub const EXPIRY_DATE: &str = "Expiry Date";
    pub const CVC: &str = "CVC";
    pub const CHARGE: &str = "Charge";
    pub const CHARGE_AMOUNT: &str = "Charge Amount";
    pub const LLC: &str = "LLC";
    pub const PROVIDER: &str = "Provider";
    pub const DATE_OF_CHARGE: &str = "Date of Charge";
    pub const STATUS: &str = "Status";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const PIN_CODE: &str = "PIN Code";
}

pub const STATUS_SUBMITTED: &str = "Submitted";
pub const STATUS_CHARGED: &str = "Charged";
pub const STATUS_DECLINED: &str = "Declined";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LeadType {
    Billing,
    Insurance,
}

impl LeadType {
    pub const ALL: [LeadType; 2] = [LeadType::Billing, LeadType::Insurance];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadType::Billing => "billing",
            LeadType::Insurance => "insurance",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LeadType::Billing => "Billing",
            LeadType::Insurance => "Insurance",
        }
    }

    /// Human label of the business identifier.
    pub fn id_label(&self) -> &'static str {
        match self {
            LeadType::Billing => "Order ID",
            LeadType::Insurance => "Record ID",
        }
    }

    /// Form field carrying the business identifier on save.
    pub fn id_form_field(&self) -> &'static str {
        match self {
            LeadType::Billing => "order_id",
            LeadType::Insurance => "record_id",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            LeadType::Billing => LeadType::Insurance,
            LeadType::Insurance => LeadType::Billing,
        }
    }
}

impl fmt::Display for LeadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "billing" | "spectrum" => Ok(LeadType::Billing),
            "insurance" => Ok(LeadType::Insurance),
            other => Err(format!("Unknown lead type: {other}")),
        }
    }
}

/// Which surface the process is running as. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Billing,
    Insurance,
    Manager,
    Other,
}

impl Portal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Portal::Billing => "billing",
            Portal::Insurance => "insurance",
            Portal::Manager => "manager",
            Portal::Other => "other",
        }
    }

    /// Department served by an operator portal.
    pub fn department(&self) -> Option<LeadType> {
        match self {
            Portal::Billing => Some(LeadType::Billing),
            Portal::Insurance => Some(LeadType::Insurance),
            Portal::Manager | Portal::Other => None,
        }
    }

    /// Resolve a portal from a page path the way the web front end did.
    pub fn from_path(path: &str) -> Self {
        let path = path.to_lowercase();
        if path.contains("design") || path.contains("ebook") {
            Portal::Other
        } else if path.contains("manager") {
            Portal::Manager
        } else if path.contains("insurance") {
            Portal::Insurance
        } else {
            Portal::Billing
        }
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Portal {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "billing" => Ok(Portal::Billing),
            "insurance" => Ok(Portal::Insurance),
            "manager" => Ok(Portal::Manager),
            "other" => Ok(Portal::Other),
            other => Err(format!("Unknown portal: {other}")),
        }
    }
}

/// A sheet row keyed by column name. Cell values are normalised to strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadRecord {
    pub row_index: Option<u32>,
    pub fields: BTreeMap<String, String>,
}

impl LeadRecord {
    pub fn new(row_index: Option<u32>) -> Self {
        Self {
            row_index,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    /// Non-empty value of a column.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn business_id(&self) -> Option<&str> {
        self.first_of(&[fields::RECORD_ID, fields::ORDER_ID, "record_id"])
    }

    pub fn agent(&self) -> Option<&str> {
        self.first_of(&[fields::AGENT_NAME, "Agent"])
    }

    pub fn client_name(&self) -> Option<&str> {
        self.first_of(&[fields::NAME, fields::CLIENT_NAME])
    }

    pub fn charge(&self) -> Option<&str> {
        self.first_of(&[fields::CHARGE, fields::CHARGE_AMOUNT])
    }

    pub fn phone(&self) -> Option<&str> {
        self.first_of(&[fields::PH_NUMBER, fields::PHONE])
    }

    pub fn status(&self) -> Option<&str> {
        self.get(fields::STATUS)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get(fields::TIMESTAMP)
    }

    pub fn is_submitted(&self) -> bool {
        self.status()
            .map(|status| status.trim().eq_ignore_ascii_case(STATUS_SUBMITTED))
            .unwrap_or(false)
    }
}

impl<'de> Deserialize<'de> for LeadRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let mut record = LeadRecord::default();
        for (key, value) in map {
            if key == "row_index" {
                record.row_index = value_to_row_index(&value).map_err(D::Error::custom)?;
                continue;
            }
            record.fields.insert(key, value_to_cell(value));
        }
        if !record.fields.contains_key(fields::RECORD_ID) {
            if let Some(order_id) = record.fields.get(fields::ORDER_ID).cloned() {
                record.fields.insert(fields::RECORD_ID.to_string(), order_id);
            }
        }
        Ok(record)
    }
}

impl Serialize for LeadRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let extra = usize::from(self.row_index.is_some());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        if let Some(row_index) = self.row_index {
            map.serialize_entry("row_index", &row_index)?;
        }
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Summary of one row when an identifier matches several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(deserialize_with = "deserialize_row_index")]
    pub row_index: u32,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub charge: String,
    #[serde(default, deserialize_with = "deserialize_cell")]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    NotFound { message: String },
    Single(LeadRecord),
    Multiple(Vec<Candidate>),
}

/// Approve or decline from the manager's pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Approve,
    Decline,
}

impl Decision {
    pub fn status(&self) -> &'static str {
        match self {
            Decision::Approve => STATUS_CHARGED,
            Decision::Decline => STATUS_DECLINED,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Approve => "Approve",
            Decision::Decline => "Decline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub lead_type: LeadType,
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampMode {
    #[default]
    Keep,
    Now,
}

impl TimestampMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampMode::Keep => "keep",
            TimestampMode::Now => "now",
        }
    }
}

/// Body of `POST /api/save-lead`, for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveLead {
    pub lead_type: Option<LeadType>,
    pub is_edit: bool,
    pub business_id: String,
    pub agent: String,
    pub client_name: String,
    pub phone: String,
    pub address: String,
    pub email: String,
    pub card_holder: String,
    pub card_number: String,
    pub exp_date: String,
    pub cvc: String,
    pub charge_amt: String,
    pub llc: String,
    pub provider: String,
    pub pin_code: String,
    pub status: Option<String>,
    pub row_index: Option<u32>,
    pub original_timestamp: Option<String>,
    pub timestamp_mode: TimestampMode,
}

impl SaveLead {
    pub fn lead_type(&self) -> LeadType {
        self.lead_type.unwrap_or(LeadType::Billing)
    }

    /// Form-encoded pairs in the shape the backend expects.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        let lead_type = self.lead_type();
        let mut pairs: Vec<(String, String)> = vec![
            ("type".into(), lead_type.as_str().into()),
            ("is_edit".into(), self.is_edit.to_string()),
            (lead_type.id_form_field().into(), self.business_id.clone()),
            ("agent".into(), self.agent.clone()),
            ("client_name".into(), self.client_name.clone()),
            ("phone".into(), self.phone.clone()),
            ("address".into(), self.address.clone()),
            ("email".into(), self.email.clone()),
            ("card_holder".into(), self.card_holder.clone()),
            ("card_number".into(), self.card_number.clone()),
            ("exp_date".into(), self.exp_date.clone()),
            ("cvc".into(), self.cvc.clone()),
            ("charge_amt".into(), self.charge_amt.clone()),
            ("llc".into(), self.llc.clone()),
        ];
        if lead_type == LeadType::Billing {
            pairs.push(("provider".into(), self.provider.clone()));
            pairs.push(("pin_code".into(), self.pin_code.clone()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status".into(), status.clone()));
        }
        if self.is_edit {
            pairs.push(("timestamp_mode".into(), self.timestamp_mode.as_str().into()));
            if let Some(original) = &self.original_timestamp {
                pairs.push(("original_timestamp".into(), original.clone()));
            }
            if let Some(row_index) = self.row_index {
                pairs.push(("row_index".into(), row_index.to_string()));
            }
        }
        pairs
    }
}

/// Render any JSON cell as the string the sheet would show.
pub fn value_to_cell(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn value_to_row_index(value: &Value) -> Result<Option<u32>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|u| u32::try_from(u).ok())
            .map(Some)
            .ok_or_else(|| format!("invalid row_index: {n}")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|err| format!("invalid row_index '{s}': {err}")),
        other => Err(format!("invalid row_index: {other}")),
    }
}

fn deserialize_row_index<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_row_index(&value)
        .map_err(D::Error::custom)?
        .ok_or_else(|| D::Error::custom("missing row_index"))
}

/// Deserialize a string-or-number cell into a String
pub fn deserialize_cell<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_cell(Value::deserialize(deserializer)?))
}

pub fn deserialize_opt_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = value_to_cell(Value::deserialize(deserializer)?);
    Ok(if cell.trim().is_empty() { None } else { Some(cell) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_record_normalises_numeric_cells_and_mirrors_order_id() {
        let record: LeadRecord = serde_json::from_value(serde_json::json!({
            "row_index": 7,
            "Order ID": 1001,
            "Agent Name": "Haziq",
            "Client Name": "Jane Roe",
            "Charge Amount": 49.5,
            "Status": "Submitted"
        }))
        .expect("record");

        assert_eq!(record.row_index, Some(7));
        assert_eq!(record.business_id(), Some("1001"));
        assert_eq!(record.get(fields::RECORD_ID), Some("1001"));
        assert_eq!(record.client_name(), Some("Jane Roe"));
        assert_eq!(record.charge(), Some("49.5"));
        assert!(record.is_submitted());
    }

    #[test]
    fn lead_record_accepts_string_row_index_and_skips_blank_cells() {
        let record: LeadRecord = serde_json::from_value(serde_json::json!({
            "row_index": "12",
            "Name": "",
            "Client Name": "Fallback",
            "Status": " submitted "
        }))
        .expect("record");

        assert_eq!(record.row_index, Some(12));
        assert_eq!(record.client_name(), Some("Fallback"));
        assert!(record.is_submitted());
    }

    #[test]
    fn candidate_parses_mixed_cell_types() {
        let candidate: Candidate = serde_json::from_value(serde_json::json!({
            "row_index": 9,
            "name": "Unknown",
            "charge": 75,
            "timestamp": "2026-01-02 21:15:00"
        }))
        .expect("candidate");
        assert_eq!(candidate.row_index, 9);
        assert_eq!(candidate.charge, "75");
    }

    #[test]
    fn portal_from_path_matches_page_routing() {
        assert_eq!(Portal::from_path("/insurance"), Portal::Insurance);
        assert_eq!(Portal::from_path("/"), Portal::Billing);
        assert_eq!(Portal::from_path("/manager"), Portal::Manager);
        assert_eq!(Portal::from_path("/Design/page"), Portal::Other);
        assert_eq!(Portal::Insurance.department(), Some(LeadType::Insurance));
        assert_eq!(Portal::Manager.department(), None);
    }

    #[test]
    fn save_lead_edit_pairs_carry_row_and_timestamp() {
        let save = SaveLead {
            lead_type: Some(LeadType::Billing),
            is_edit: true,
            business_id: "A100".to_string(),
            row_index: Some(7),
            original_timestamp: Some("2026-01-02 21:15:00".to_string()),
            ..SaveLead::default()
        };
        let pairs = save.form_pairs();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("type"), Some("billing"));
        assert_eq!(get("is_edit"), Some("true"));
        assert_eq!(get("order_id"), Some("A100"));
        assert_eq!(get("row_index"), Some("7"));
        assert_eq!(get("timestamp_mode"), Some("keep"));
        assert_eq!(get("record_id"), None);
    }

    #[test]
    fn save_lead_create_pairs_omit_edit_fields_for_insurance() {
        let save = SaveLead {
            lead_type: Some(LeadType::Insurance),
            business_id: "INS-1".to_string(),
            row_index: Some(3),
            ..SaveLead::default()
        };
        let pairs = save.form_pairs();
        assert!(pairs.iter().any(|(k, v)| k == "record_id" && v == "INS-1"));
        assert!(!pairs.iter().any(|(k, _)| k == "row_index"));
        assert!(!pairs.iter().any(|(k, _)| k == "provider"));
    }
}
