//! Typed records for the endpoints the sweeps read
//!
//! Only the fields the tool reports on are modelled; the API returns many
//! more and unknown fields are ignored. Everything that is not needed to
//! identify a record is optional.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A list endpoint and the record type it yields
pub trait Resource {
    /// Path below the API root
    const ENDPOINT: &'static str;
    /// Human label used in progress and log output
    const LABEL: &'static str;

    type Record: DeserializeOwned + Serialize + Send + 'static;

    /// Locate the record array inside the envelope's `data` field
    fn records(data: Value) -> Result<Vec<Self::Record>, serde_json::Error> {
        serde_json::from_value(data)
    }
}

/// `GET sites`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub site_type: Option<String>,
    #[serde(default)]
    pub active_licenses: Option<u64>,
}

pub struct Sites;

impl Resource for Sites {
    const ENDPOINT: &'static str = "sites";
    const LABEL: &'static str = "sites";
    type Record = Site;

    // sites nest their array one level deeper: {"data": {"sites": [...]}}
    fn records(mut data: Value) -> Result<Vec<Site>, serde_json::Error> {
        let sites = data.get_mut("sites").map(Value::take).unwrap_or(Value::Null);
        serde_json::from_value(sites)
    }
}

/// `GET cloud-detection/alerts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAlert {
    pub alert_info: AlertInfo,
    #[serde(default)]
    pub rule_info: Option<RuleInfo>,
    #[serde(default)]
    pub agent_detection_info: Option<AgentDetectionInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInfo {
    pub alert_id: String,
    #[serde(default)]
    pub analyst_verdict: Option<String>,
    #[serde(default)]
    pub incident_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDetectionInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
}

pub struct Alerts;

impl Resource for Alerts {
    const ENDPOINT: &'static str = "cloud-detection/alerts";
    const LABEL: &'static str = "alerts";
    type Record = CloudAlert;
}

/// `GET threats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    pub id: String,
    #[serde(default)]
    pub threat_info: Option<ThreatInfo>,
    #[serde(default)]
    pub agent_realtime_info: Option<AgentRealtimeInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatInfo {
    #[serde(default)]
    pub threat_name: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<String>,
    #[serde(default)]
    pub mitigation_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRealtimeInfo {
    #[serde(default)]
    pub agent_computer_name: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
}

pub struct Threats;

impl Resource for Threats {
    const ENDPOINT: &'static str = "threats";
    const LABEL: &'static str = "threats";
    type Record = Threat;
}

/// `GET agents` (endpoints)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub computer_name: Option<String>,
    #[serde(default)]
    pub os_name: Option<String>,
    #[serde(default)]
    pub agent_version: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub network_status: Option<String>,
    #[serde(default)]
    pub last_active_date: Option<String>,
}

pub struct Agents;

impl Resource for Agents {
    const ENDPOINT: &'static str = "agents";
    const LABEL: &'static str = "agents";
    type Record = Agent;
}
