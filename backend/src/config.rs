//! Process configuration read once from the environment (and an optional `.env`).
//!
//! Every value has a default so the server starts with no configuration at all.
//! Values that fail to parse are logged and replaced by their default.

use crate::pipeline::generate::GenerationSettings;
use crate::pipeline::qr::{parse_color, QrOptions};
use log::warn;
use std::env;
use std::str::FromStr;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_PATH: &str = "qrcard.sqlite";
const DEFAULT_PUBLIC_BASE_URL: &str = "https://vcard-frontend.vercel.app";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// SQLite file backing the durable store.
    pub database_path: String,
    /// Base of the public contact page URL encoded into each QR code.
    pub public_base_url: String,
    /// Rows processed concurrently during generation; 1 means strictly sequential.
    pub generation_workers: usize,
    pub max_upload_bytes: usize,
    pub qr: QrOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            generation_workers: 1,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            qr: QrOptions::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let default_qr = QrOptions::default();

        let qr = QrOptions {
            error_correction: parsed(&lookup, "QR_ERROR_CORRECTION", default_qr.error_correction),
            width: parsed(&lookup, "QR_WIDTH", default_qr.width),
            margin: parsed(&lookup, "QR_MARGIN", default_qr.margin),
            dark: color(&lookup, "QR_DARK_COLOR", default_qr.dark),
            light: color(&lookup, "QR_LIGHT_COLOR", default_qr.light),
        };

        AppConfig {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT", defaults.port),
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            public_base_url: lookup("PUBLIC_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.public_base_url),
            generation_workers: parsed(&lookup, "GENERATION_WORKERS", defaults.generation_workers)
                .max(1),
            max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            qr,
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            public_base_url: self.public_base_url.clone(),
            qr: self.qr.clone(),
            workers: self.generation_workers,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}

fn color<F>(lookup: &F, key: &str, default: [u8; 4]) -> [u8; 4]
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_color(&raw).unwrap_or_else(|| {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}
