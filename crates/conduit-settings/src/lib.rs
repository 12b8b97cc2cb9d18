pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{ClientSettings, ConduitSettings, LoggingSettings, OriginSettings, RelaySettings};
