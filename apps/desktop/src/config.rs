use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the backend's REST command endpoint. There is no sane
    /// default; a missing value is surfaced to the user.
    pub connection_string: Option<String>,
    /// Initial speed slider position, 0..=150.
    pub initial_speed: f64,
    /// Client extent of the headless drawing surface.
    pub surface_width: f64,
    pub surface_height: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection_string: None,
            initial_speed: 75.0,
            surface_width: 800.0,
            surface_height: 600.0,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("desktop.toml") {
        apply_file(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("APP__CONNECTION_STRING") {
        settings.connection_string = Some(v);
    }
    if let Ok(v) = std::env::var("APP__INITIAL_SPEED") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.initial_speed = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__SURFACE_WIDTH") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.surface_width = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__SURFACE_HEIGHT") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.surface_height = parsed;
        }
    }

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("connection_string").and_then(|v| v.as_str()) {
        settings.connection_string = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("initial_speed").and_then(|v| v.as_float()) {
        settings.initial_speed = v;
    }
    if let Some(v) = file_cfg.get("surface_width").and_then(|v| v.as_float()) {
        settings.surface_width = v;
    }
    if let Some(v) = file_cfg.get("surface_height").and_then(|v| v.as_float()) {
        settings.surface_height = v;
    }
}
