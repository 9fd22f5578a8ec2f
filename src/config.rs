use anyhow::Result;
use serde::Deserialize;

use crate::audio::CaptureFormat;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub session: SessionSettings,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub language: String,
    #[serde(default)]
    pub hotwords: Vec<String>,
    #[serde(default)]
    pub manual_punctuation: bool,
    pub domain: String,
    pub end_user_id: String,
    /// Session identifier; generated when absent
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub window_secs: u32,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            url: self.connection.url.clone(),
            language: self.session.language.clone(),
            hotwords: self.session.hotwords.clone(),
            manual_punctuation: self.session.manual_punctuation,
            domain: self.session.domain.clone(),
            end_user_id: self.session.end_user_id.clone(),
            uid: self
                .session
                .uid
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn capture_format(&self) -> CaptureFormat {
        CaptureFormat {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            window_secs: self.audio.window_secs,
            ..CaptureFormat::default()
        }
    }
}
