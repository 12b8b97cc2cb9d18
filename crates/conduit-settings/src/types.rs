use serde::{Deserialize, Serialize};

/// Root settings for every conduit process.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConduitSettings {
    pub origin: OriginSettings,
    pub relay: RelaySettings,
    pub client: ClientSettings,
    pub logging: LoggingSettings,
}

/// Origin service: bind address and event pacing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OriginSettings {
    pub host: String,
    pub port: u16,
    /// Delay between typed characters of a progress stage.
    pub char_delay_ms: u64,
    /// Typing plus pause for one stage.
    pub stage_budget_ms: u64,
    /// Delay before each chat token.
    pub token_delay_ms: u64,
}

impl Default for OriginSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            char_delay_ms: 30,
            stage_budget_ms: 3_000,
            token_delay_ms: 50,
        }
    }
}

/// Relay service: bind address, upstream origin and connection lifetime.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub host: String,
    pub port: u16,
    pub origin_url: String,
    pub timeout_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            origin_url: "http://localhost:8001".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Terminal consumer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    pub relay_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
