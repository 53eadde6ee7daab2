use chrono::Utc;
use serde::Serialize;

/// One JSON line on stdout.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub ts: String,
    pub event: &'static str,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl Reply {
    pub fn is_error(&self) -> bool {
        self.event == "error"
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// `data` should be a JSON object; its fields land beside `ts` and `event`.
pub fn reply(event: &'static str, data: serde_json::Value) -> Reply {
    Reply {
        ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        event,
        data,
    }
}

pub fn emit(reply: &Reply) {
    println!("{}", reply.to_line());
}
