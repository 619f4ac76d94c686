use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use client_core::{Endpoints, SyncConfig};
use url::Url;

const RUN_ID_PLACEHOLDER: &str = "{run_id}";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub active_status_url: String,
    pub full_status_url: String,
    pub run_id: Option<String>,
    pub sequence_length: usize,
    pub start_date: Option<String>,
    pub poll_interval_ms: u64,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub request_timeout_ms: u64,
    pub stall_threshold: u32,
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub fps: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active_status_url: "http://127.0.0.1:8000/api/active".into(),
            full_status_url: "http://127.0.0.1:8000/api/bogo/{run_id}".into(),
            run_id: None,
            sequence_length: 10,
            start_date: None,
            poll_interval_ms: 1000,
            base_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            request_timeout_ms: 10_000,
            stall_threshold: 1,
            canvas_width: 960.0,
            canvas_height: 360.0,
            fps: 30,
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match parse_file(&raw) {
            Ok(file_cfg) => apply_values(&mut settings, |key| file_cfg.get(key).cloned()),
            Err(err) => tracing::warn!(path = %path.display(), "config: ignoring unreadable file: {err}"),
        }
    }

    apply_values(&mut settings, |key| {
        std::env::var(format!("APP__{}", key.to_ascii_uppercase())).ok()
    });

    settings
}

fn parse_file(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    let table: HashMap<String, toml::Value> = toml::from_str(raw)?;
    Ok(table
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                toml::Value::String(text) => text,
                toml::Value::Integer(number) => number.to_string(),
                toml::Value::Float(number) => number.to_string(),
                _ => return None,
            };
            Some((key, text))
        })
        .collect())
}

fn apply_values(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("active_status_url") {
        settings.active_status_url = v;
    }
    if let Some(v) = lookup("full_status_url") {
        settings.full_status_url = v;
    }
    if let Some(v) = lookup("run_id") {
        settings.run_id = Some(v);
    }
    if let Some(v) = lookup("start_date") {
        settings.start_date = Some(v);
    }
    if let Some(v) = lookup("sequence_length").and_then(|v| v.parse().ok()) {
        settings.sequence_length = v;
    }
    if let Some(v) = lookup("poll_interval_ms").and_then(|v| v.parse().ok()) {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = lookup("base_backoff_ms").and_then(|v| v.parse().ok()) {
        settings.base_backoff_ms = v;
    }
    if let Some(v) = lookup("max_backoff_ms").and_then(|v| v.parse().ok()) {
        settings.max_backoff_ms = v;
    }
    if let Some(v) = lookup("request_timeout_ms").and_then(|v| v.parse().ok()) {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = lookup("stall_threshold").and_then(|v| v.parse().ok()) {
        settings.stall_threshold = v;
    }
    if let Some(v) = lookup("canvas_width").and_then(|v| v.parse().ok()) {
        settings.canvas_width = v;
    }
    if let Some(v) = lookup("canvas_height").and_then(|v| v.parse().ok()) {
        settings.canvas_height = v;
    }
    if let Some(v) = lookup("fps").and_then(|v| v.parse().ok()) {
        settings.fps = v;
    }
}

impl Settings {
    pub fn to_sync_config(&self) -> anyhow::Result<SyncConfig> {
        let run_id = self
            .run_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("run id is required (--run-id or APP__RUN_ID)"))?;

        let active_status = Url::parse(&self.active_status_url)
            .with_context(|| format!("invalid active status url '{}'", self.active_status_url))?;
        let full_status_url = self.full_status_url.replace(RUN_ID_PLACEHOLDER, run_id);
        let full_status = Url::parse(&full_status_url)
            .with_context(|| format!("invalid full status url '{full_status_url}'"))?;

        let mut config = SyncConfig::new(
            Endpoints {
                active_status,
                full_status,
            },
            run_id,
            self.sequence_length,
        )
        .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
        .with_backoff(
            Duration::from_millis(self.base_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
        .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
        .with_stall_threshold(self.stall_threshold);

        if let Some(raw) = &self.start_date {
            let start_date: NaiveDateTime = raw
                .parse()
                .with_context(|| format!("invalid start date '{raw}'"))?;
            config = config.with_start_date(start_date);
        }

        config.validate().context("invalid sync configuration")?;
        Ok(config)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
