use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::rtp_transceiver::{RTCRtpReceiverId, RTCRtpSenderId};

/// StatsSelector narrows a stats request to the objects of one track.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatsSelector {
    /// None requests every report the engine has.
    #[default]
    None,
    Sender(RTCRtpSenderId),
    Receiver(RTCRtpReceiverId),
}

/// StatsReport is a stats snapshot keyed by report id.
///
/// Report bodies are opaque to this crate and kept in the JSON shape the
/// engine produced them in, e.g. `{"type": "outbound-rtp", "bytesSent": 42}`.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub reports: HashMap<String, serde_json::Value>,
}

impl StatsReport {
    pub fn insert(&mut self, id: &str, report: serde_json::Value) {
        self.reports.insert(id.to_owned(), report);
    }

    pub fn get(&self, id: &str) -> Option<&serde_json::Value> {
        self.reports.get(id)
    }

    /// reports_of_type returns the reports whose `type` field equals `stats_type`.
    pub fn reports_of_type<'a>(
        &'a self,
        stats_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a serde_json::Value)> + 'a {
        self.reports.iter().filter(move |(_, report)| {
            report.get("type").and_then(|t| t.as_str()) == Some(stats_type)
        })
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl Serialize for StatsReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.reports.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatsReport {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let root = value
            .as_object()
            .ok_or_else(|| serde::de::Error::custom("root object missing"))?;

        let mut reports = HashMap::new();
        for (key, report) in root {
            if !report.is_object() {
                return Err(serde::de::Error::custom(format!(
                    "stats report for key={key} is not an object: {report}"
                )));
            }
            reports.insert(key.clone(), report.clone());
        }

        Ok(StatsReport { reports })
    }
}
