//! Structured JSON-line logging.
//!
//! One JSON object per line on stdout, tagged with timestamp, level and
//! module. Call sites build fields with `obj`/`v_str`/`v_num`.

use std::sync::OnceLock;

use chrono::Utc;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

static MIN_LEVEL: OnceLock<Level> = OnceLock::new();

fn min_level() -> Level {
    *MIN_LEVEL.get_or_init(Level::from_env)
}

pub fn ts_now() -> String {
    Utc::now().to_rfc3339()
}

pub fn log_at(level: Level, module: &str, mut fields: Map<String, Value>) {
    if level < min_level() {
        return;
    }
    fields.insert("ts".to_string(), Value::String(ts_now()));
    fields.insert("level".to_string(), Value::String(level.as_str().to_string()));
    fields.insert("module".to_string(), Value::String(module.to_string()));
    println!("{}", Value::Object(fields));
}

pub fn json_log(module: &str, fields: Map<String, Value>) {
    log_at(Level::Info, module, fields);
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert((*key).to_string(), value.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
