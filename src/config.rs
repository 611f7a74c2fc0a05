use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Chatstream";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default reasoning delimiters sent to and expected from the model.
pub const DEFAULT_START_TAG: &str = "<think>";
pub const DEFAULT_END_TAG: &str = "</think>";

/// Default transport base URL (a local OpenAI-compatible gateway).
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Get the application data directory (~/Chatstream/ on all platforms)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Path of the conversation/settings database.
pub fn db_path() -> PathBuf {
    app_data_dir().join("chatstream.db")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}
