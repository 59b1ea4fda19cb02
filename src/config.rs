use crate::histogram::{ColumnDescription, ColumnKind};

/// Driver configuration, environment-sourced.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    /// Remote object the first request addresses; empty string is the
    /// root dataset object.
    pub table_object_id: String,
    pub column: String,
    pub column_kind: ColumnKind,
    /// Group-by column; set for a Trellis plot, absent for one panel.
    pub group_by: Option<String>,
    /// Display bucket budget; 0 derives it from the view width.
    pub target_buckets: usize,
    /// Fine resolution requested from the server.
    pub fine_buckets: u32,
    pub sampling_rate: f64,
    pub view_width: f64,
    pub view_height: f64,
    pub min_panel_width: f64,
    pub min_panel_height: f64,
}

fn parse_kind(value: &str) -> ColumnKind {
    match value {
        "integer" => ColumnKind::Integer,
        "string" => ColumnKind::String,
        "date" => ColumnKind::Date,
        _ => ColumnKind::Double,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_url: std::env::var("SERVER_URL")
                .unwrap_or_else(|_| "ws://localhost:8080/rpc".to_string()),
            table_object_id: std::env::var("TABLE_OBJECT_ID").unwrap_or_default(),
            column: std::env::var("COLUMN").unwrap_or_else(|_| "value".to_string()),
            column_kind: parse_kind(
                &std::env::var("COLUMN_KIND").unwrap_or_else(|_| "double".to_string()),
            ),
            group_by: std::env::var("GROUP_BY").ok().filter(|v| !v.is_empty()),
            target_buckets: std::env::var("TARGET_BUCKETS").ok().and_then(|v| v.parse().ok()).unwrap_or(0),
            fine_buckets: std::env::var("FINE_BUCKETS").ok().and_then(|v| v.parse().ok()).unwrap_or(400),
            sampling_rate: std::env::var("SAMPLING_RATE").ok().and_then(|v| v.parse().ok()).unwrap_or(1.0),
            view_width: std::env::var("VIEW_WIDTH").ok().and_then(|v| v.parse().ok()).unwrap_or(800.0),
            view_height: std::env::var("VIEW_HEIGHT").ok().and_then(|v| v.parse().ok()).unwrap_or(520.0),
            min_panel_width: std::env::var("MIN_PANEL_W").ok().and_then(|v| v.parse().ok()).unwrap_or(40.0),
            min_panel_height: std::env::var("MIN_PANEL_H").ok().and_then(|v| v.parse().ok()).unwrap_or(40.0),
        }
    }

    pub fn column_description(&self) -> ColumnDescription {
        ColumnDescription {
            name: self.column.clone(),
            kind: self.column_kind,
        }
    }
}
