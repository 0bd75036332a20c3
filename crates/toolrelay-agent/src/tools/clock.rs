//! Clock tool — current date and time.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::{json, Value};

use super::base::{optional_string, Tool};

/// Reports the current time in UTC or the server's local zone.
pub struct ClockTool;

fn describe<Tz: TimeZone>(now: DateTime<Tz>, zone: &str) -> Value
where
    Tz::Offset: std::fmt::Display,
{
    json!({
        "iso": now.to_rfc3339(),
        "unix": now.timestamp(),
        "timezone": zone,
        "formatted": now.format("%A, %B %-d, %Y %H:%M:%S %Z").to_string(),
    })
}

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "enum": ["utc", "local"],
                    "description": "Report UTC (default) or the server's local time"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
        let zone = optional_string(&params, "timezone").unwrap_or_else(|| "utc".to_string());
        match zone.to_ascii_lowercase().as_str() {
            "utc" => Ok(describe(Utc::now(), "utc")),
            "local" => Ok(describe(Local::now(), "local")),
            other => anyhow::bail!("Unsupported timezone '{other}', expected 'utc' or 'local'"),
        }
    }
}
