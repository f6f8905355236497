use serde::Deserialize;
use std::io::ErrorKind;
use std::{error::Error, fs};

const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub binding: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            binding: "0.0.0.0".to_string(),
            port: 3000,
            db_path: "tarefa.redb".to_string(),
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiry_days: 30,
        }
    }
}

impl Settings {
    /// Read settings.json from the working directory; defaults when absent.
    pub fn load() -> Result<Settings, Box<dyn Error>> {
        match fs::read_to_string(SETTINGS_FILENAME) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }
}
