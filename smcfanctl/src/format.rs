//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use serde::Serialize;
use smcfan_core::codec::{decode_rpm, decode_temperature, format_decidegrees};
use smcfan_core::{FanMode, FanRecord, KeyInfo, SensorRecord, SmcKey};

use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

/// What `info` reports about the connected SMC
#[derive(Debug, Clone, Serialize)]
pub struct SmcInfo {
    pub backend: String,
    pub revision: Vec<u8>,
    pub revision_type: Option<KeyInfo>,
    pub fan_count: Option<u8>,
}

/// One raw key read
#[derive(Debug, Clone, Serialize)]
pub struct KeyValue {
    pub key: SmcKey,
    pub data: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<KeyInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<String>,
}

/// One update of a sensor-driven fan
#[derive(Debug, Clone, Serialize)]
pub struct FollowStep {
    pub fan: u8,
    pub sensor: SmcKey,
    /// `None` when the sensor read failed
    pub temperature: Option<i16>,
    pub target_rpm: u16,
}

/// Decode a raw value for display based on its type tag
pub fn decode_value(info: &KeyInfo, data: &[u8]) -> Option<String> {
    match (info.data_type.as_str(), data) {
        ("fpe2", [hi, lo, ..]) => Some(format!("{} RPM", decode_rpm([*hi, *lo]))),
        ("sp78", [hi, lo, ..]) => Some(format_decidegrees(decode_temperature([*hi, *lo]))),
        ("ui8 ", [value]) => Some(value.to_string()),
        ("ui16", [hi, lo]) => Some(u16::from_be_bytes([*hi, *lo]).to_string()),
        ("ui32", [a, b, c, d]) => Some(u32::from_be_bytes([*a, *b, *c, *d]).to_string()),
        ("flag", [value]) => Some((*value != 0).to_string()),
        _ => None,
    }
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_mode(mode: FanMode) -> String {
    match mode {
        FanMode::Auto => mode.to_string().green().to_string(),
        FanMode::Manual => mode.to_string().yellow().to_string(),
        FanMode::SensorDriven => mode.to_string().cyan().to_string(),
    }
}

/// Format the SMC identification summary
pub fn format_info(info: &SmcInfo, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(info)?),
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&"SMC Information".bold().to_string());
            output.push('\n');
            output.push_str(&format!("Backend: {}", info.backend.cyan()));
            output.push('\n');
            output.push_str(&format!("Revision: {}", hex(&info.revision).yellow()));

            if let Some(key_info) = &info.revision_type {
                output.push('\n');
                output.push_str(&format!(
                    "Revision key: {} byte(s), type '{}', attributes 0x{:02X}",
                    key_info.data_size, key_info.data_type, key_info.attributes
                ));
            }

            if let Some(count) = info.fan_count {
                output.push('\n');
                output.push_str(&format!("Fans reported: {}", count.to_string().cyan()));
            }

            Ok(output)
        }
    }
}

/// Format discovered fans
pub fn format_fan_status(fans: &[FanRecord], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(fans)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct FanRow {
                #[tabled(rename = "Fan")]
                index: String,
                #[tabled(rename = "Label")]
                label: String,
                #[tabled(rename = "RPM")]
                rpm: String,
                #[tabled(rename = "Target")]
                target: String,
                #[tabled(rename = "Range")]
                range: String,
                #[tabled(rename = "Mode")]
                mode: String,
            }

            let rows: Vec<FanRow> = fans
                .iter()
                .map(|fan| FanRow {
                    index: fan.index.to_string(),
                    label: fan.label.cyan().to_string(),
                    rpm: if fan.current_rpm > 0 {
                        fan.current_rpm.to_string().green().to_string()
                    } else {
                        "0".red().to_string()
                    },
                    target: fan.target_rpm.to_string(),
                    range: format!("{}-{}", fan.limits.min_rpm, fan.limits.max_rpm),
                    mode: format_mode(fan.mode),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Fan Status:".bold(), table))
        }
    }
}

/// Format discovered temperature sensors
pub fn format_sensors(sensors: &[SensorRecord], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(sensors)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct SensorRow {
                #[tabled(rename = "#")]
                index: usize,
                #[tabled(rename = "Key")]
                key: String,
                #[tabled(rename = "Label")]
                label: String,
                #[tabled(rename = "Temperature")]
                temperature: String,
            }

            let rows: Vec<SensorRow> = sensors
                .iter()
                .map(|sensor| SensorRow {
                    index: sensor.index,
                    key: sensor.key.to_string().cyan().to_string(),
                    label: sensor.label.clone(),
                    temperature: if sensor.valid {
                        format_decidegrees(sensor.temperature).yellow().to_string()
                    } else {
                        "n/a".dimmed().to_string()
                    },
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Temperature Sensors:".bold(), table))
        }
    }
}

/// Format a raw key read
pub fn format_key_value(value: &KeyValue, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => {
            let mut output = format!(
                "{} [{}] {}",
                value.key.to_string().cyan(),
                value.data.len(),
                hex(&value.data).yellow()
            );
            if let Some(decoded) = &value.decoded {
                output.push_str(&format!(" ({})", decoded.green()));
            }
            Ok(output)
        }
    }
}

/// Format a key-type query result
pub fn format_key_info(key: SmcKey, info: &KeyInfo, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "key": key,
            "data_size": info.data_size,
            "data_type": info.data_type,
            "attributes": info.attributes,
        }))?),
        OutputFormat::Table => Ok(format!(
            "{}: {} byte(s), type '{}', attributes 0x{:02X}",
            key.to_string().cyan(),
            info.data_size,
            info.data_type.yellow(),
            info.attributes
        )),
    }
}

/// Format one control-loop update as a single line
pub fn format_follow_step(step: &FollowStep, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(step)?),
        OutputFormat::Table => {
            let temperature = match step.temperature {
                Some(t) => format_decidegrees(t).yellow().to_string(),
                None => "read failed".red().to_string(),
            };
            Ok(format!(
                "Fan {}: {} {} → {} RPM",
                step.fan,
                step.sensor.to_string().cyan(),
                temperature,
                step.target_rpm.to_string().green()
            ))
        }
    }
}

/// Format a success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}

/// Format a warning message
pub fn format_warning(message: &str) -> String {
    format!("{} {}", "!".yellow().bold(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smcfan_core::FanLimits;

    fn key(text: &str) -> SmcKey {
        SmcKey::new(text).unwrap()
    }

    fn key_info(data_type: &str, size: u8) -> KeyInfo {
        KeyInfo {
            data_size: size,
            data_type: data_type.to_string(),
            attributes: 0xC0,
        }
    }

    #[test]
    fn test_format_success() {
        let message = format_success("Operation completed");
        assert!(message.contains("✓"));
        assert!(message.contains("Operation completed"));
    }

    #[test]
    fn test_decode_value_by_type() {
        assert_eq!(
            decode_value(&key_info("fpe2", 2), &[0x51, 0x40]).as_deref(),
            Some("5200 RPM")
        );
        assert_eq!(
            decode_value(&key_info("sp78", 2), &[0x2D, 0x00]).as_deref(),
            Some("45.0°C")
        );
        assert_eq!(decode_value(&key_info("ui8 ", 1), &[4]).as_deref(), Some("4"));
        assert_eq!(
            decode_value(&key_info("ui16", 2), &[0x01, 0x00]).as_deref(),
            Some("256")
        );
        assert_eq!(decode_value(&key_info("{rev", 6), &[1, 2, 3, 4, 5, 6]), None);
        // Truncated payload
        assert_eq!(decode_value(&key_info("fpe2", 2), &[0x51]), None);
    }

    #[test]
    fn test_format_fan_status_json() {
        let fans = vec![FanRecord {
            index: 2,
            label: "EXHAUST".to_string(),
            current_rpm: 1200,
            target_rpm: 1500,
            limits: FanLimits::new(500, 2800),
            mode: FanMode::Manual,
            sensor: None,
        }];

        let output = format_fan_status(&fans, &OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["index"], 2);
        assert_eq!(parsed[0]["mode"], "manual");
        assert_eq!(parsed[0]["limits"]["max_rpm"], 2800);
        assert!(parsed[0].get("sensor").is_none());
    }

    #[test]
    fn test_format_fan_status_table() {
        colored::control::set_override(false);
        let fans = vec![FanRecord {
            index: 0,
            label: "PCI".to_string(),
            current_rpm: 800,
            target_rpm: 800,
            limits: FanLimits::new(600, 2900),
            mode: FanMode::Auto,
            sensor: None,
        }];

        let output = format_fan_status(&fans, &OutputFormat::Table).unwrap();
        assert!(output.contains("PCI"));
        assert!(output.contains("600-2900"));
        assert!(output.contains("auto"));
    }

    #[test]
    fn test_format_sensors_marks_invalid() {
        colored::control::set_override(false);
        let sensors = vec![
            SensorRecord {
                index: 0,
                key: key("TA0P"),
                label: "Ambient".to_string(),
                temperature: 225,
                valid: true,
            },
            SensorRecord {
                index: 1,
                key: key("TC0P"),
                label: "CPU Proximity".to_string(),
                temperature: 450,
                valid: false,
            },
        ];

        let output = format_sensors(&sensors, &OutputFormat::Table).unwrap();
        assert!(output.contains("22.5°C"));
        assert!(output.contains("n/a"));
        assert!(!output.contains("45.0°C"));
    }

    #[test]
    fn test_format_follow_step() {
        colored::control::set_override(false);
        let step = FollowStep {
            fan: 1,
            sensor: key("TC0P"),
            temperature: None,
            target_rpm: 2800,
        };

        let line = format_follow_step(&step, &OutputFormat::Table).unwrap();
        assert!(line.contains("read failed"));
        assert!(line.contains("2800 RPM"));

        let json = format_follow_step(&step, &OutputFormat::Json).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains("\"temperature\":null"));
    }

    #[test]
    fn test_format_key_value_json() {
        let value = KeyValue {
            key: key("F0Ac"),
            data: vec![0x0C, 0x80],
            info: Some(key_info("fpe2", 2)),
            decoded: Some("800 RPM".to_string()),
        };

        let output = format_key_value(&value, &OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["key"], "F0Ac");
        assert_eq!(parsed["data"], serde_json::json!([12, 128]));
        assert_eq!(parsed["decoded"], "800 RPM");
    }
}
