//! Flattens raw encoder payloads into named readings

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Static sensors: key, display name, unit
pub const SENSOR_TYPES: [(&str, &str, &str); 5] = [
    ("system_cpu", "CPU Usage", "%"),
    ("system_mem", "Memory Usage", "%"),
    ("system_temp", "Core Temperature", "°C"),
    ("net_tx_rate", "Network TX Rate", "kbps"),
    ("net_rx_rate", "Network RX Rate", "kbps"),
];

/// Raw payloads from one poll of the three status endpoints
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub system: Value,
    pub network: Value,
    pub video_input: Value,
}

/// Values of the static sensors. `None` when the device did not report one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Readings {
    pub system_cpu: Option<f64>,
    pub system_mem: Option<f64>,
    pub system_temp: Option<f64>,
    pub net_tx_rate: Option<f64>,
    pub net_rx_rate: Option<f64>,
}

impl Readings {
    /// Look up a reading by its sensor key
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "system_cpu" => self.system_cpu,
            "system_mem" => self.system_mem,
            "system_temp" => self.system_temp,
            "net_tx_rate" => self.net_tx_rate,
            "net_rx_rate" => self.net_rx_rate,
            _ => None,
        }
    }
}

/// State of one video input channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInput {
    pub channel: i64,
    pub name: String,
    /// Signal present on the input
    pub available: bool,
    pub protocol: Option<String>,
    /// Every other field the device reported for the channel
    pub attributes: Map<String, Value>,
}

impl VideoInput {
    pub fn state(&self) -> &'static str {
        if self.available {
            "on"
        } else {
            "off"
        }
    }
}

/// Map system and network payloads to the static sensors.
///
/// Negative network rates are device glitches and are clamped to zero.
pub fn parse_states(snapshot: &Snapshot) -> Readings {
    let number = |value: &Value, key: &str| value.get(key).and_then(Value::as_f64);

    Readings {
        system_cpu: number(&snapshot.system, "cpu"),
        system_mem: number(&snapshot.system, "mem"),
        system_temp: number(&snapshot.system, "temperature"),
        net_tx_rate: number(&snapshot.network, "tx").map(|v| clamp_rate("net_tx_rate", v)),
        net_rx_rate: number(&snapshot.network, "rx").map(|v| clamp_rate("net_rx_rate", v)),
    }
}

fn clamp_rate(key: &str, value: f64) -> f64 {
    if value < 0.0 {
        debug!("Clamping negative {} value {} to 0", key, value);
        0.0
    } else {
        value
    }
}

/// Map the video input payload to one entry per channel.
///
/// Entries without a numeric `chnId` are skipped.
pub fn video_inputs(payload: &Value) -> Vec<VideoInput> {
    let Some(entries) = payload.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let channel = entry.get("chnId")?.as_i64()?;
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            // The device spells it this way
            let available = entry
                .get("avalible")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let protocol = entry
                .get("protocol")
                .and_then(Value::as_str)
                .map(String::from);
            let attributes = entry
                .iter()
                .filter(|(k, _)| k.as_str() != "chnId" && k.as_str() != "name")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            Some(VideoInput {
                channel,
                name,
                available,
                protocol,
                attributes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot {
            system: json!({"cpu": 23, "mem": 41.5, "temperature": 52}),
            network: json!({"tx": -12, "rx": 2048}),
            video_input: json!([
                {"chnId": 0, "name": "HDMI-A", "avalible": true, "protocol": "HDMI", "width": 1920},
                {"chnId": 1, "name": "SDI-B", "avalible": false},
                {"name": "no channel id"}
            ]),
        }
    }

    #[test]
    fn test_parse_states_clamps_negative_rates() {
        let readings = parse_states(&snapshot());
        assert_eq!(
            readings,
            Readings {
                system_cpu: Some(23.0),
                system_mem: Some(41.5),
                system_temp: Some(52.0),
                net_tx_rate: Some(0.0),
                net_rx_rate: Some(2048.0),
            }
        );
    }

    #[test]
    fn test_parse_states_with_missing_payloads() {
        let readings = parse_states(&Snapshot::default());
        assert_eq!(readings, Readings::default());
        for (key, _, _) in SENSOR_TYPES {
            assert_eq!(readings.get(key), None);
        }
    }

    #[test]
    fn test_video_inputs() {
        let inputs = video_inputs(&snapshot().video_input);
        assert_eq!(inputs.len(), 2);

        assert_eq!(inputs[0].channel, 0);
        assert_eq!(inputs[0].name, "HDMI-A");
        assert_eq!(inputs[0].state(), "on");
        assert_eq!(inputs[0].protocol.as_deref(), Some("HDMI"));
        assert_eq!(inputs[0].attributes.get("width"), Some(&json!(1920)));
        assert!(!inputs[0].attributes.contains_key("chnId"));
        assert!(!inputs[0].attributes.contains_key("name"));

        assert_eq!(inputs[1].state(), "off");
        assert_eq!(inputs[1].protocol, None);
    }

    #[test]
    fn test_video_inputs_from_non_array() {
        assert!(video_inputs(&json!({"chnId": 0})).is_empty());
        assert!(video_inputs(&Value::Null).is_empty());
    }
}
