use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::settings::Settings;

/// Get a raw setting value by key. Returns None if not set.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
    match stmt.query_row([key], |row| row.get::<_, String>(0)) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Set a raw setting value (upsert).
pub fn put_setting(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Load settings, falling back to defaults for anything unset or unreadable.
pub fn load_settings(conn: &Connection) -> Result<Settings, DatabaseError> {
    let defaults = Settings::default();
    Ok(Settings {
        api_key: get_setting(conn, "apiKey")?.unwrap_or(defaults.api_key),
        base_url: get_setting(conn, "baseUrl")?.unwrap_or(defaults.base_url),
        selected_model: get_setting(conn, "selectedModel")?.unwrap_or(defaults.selected_model),
        system_content: get_setting(conn, "systemContent")?.unwrap_or(defaults.system_content),
        parameters: get_setting(conn, "parameters")?
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(defaults.parameters),
        start_tag: get_setting(conn, "startTag")?.unwrap_or(defaults.start_tag),
        end_tag: get_setting(conn, "endTag")?.unwrap_or(defaults.end_tag),
        parameter_mode: get_setting(conn, "parameterMode")?
            .and_then(|raw| serde_json::from_str(&format!("\"{raw}\"")).ok())
            .unwrap_or(defaults.parameter_mode),
    })
}

/// Persist every settings field under its own key.
pub fn save_settings(conn: &Connection, settings: &Settings) -> Result<(), DatabaseError> {
    put_setting(conn, "apiKey", &settings.api_key)?;
    put_setting(conn, "baseUrl", &settings.base_url)?;
    put_setting(conn, "selectedModel", &settings.selected_model)?;
    put_setting(conn, "systemContent", &settings.system_content)?;
    let parameters =
        serde_json::to_string(&settings.parameters).unwrap_or_else(|_| "{}".to_string());
    put_setting(conn, "parameters", &parameters)?;
    put_setting(conn, "startTag", &settings.start_tag)?;
    put_setting(conn, "endTag", &settings.end_tag)?;
    put_setting(conn, "parameterMode", settings.parameter_mode.as_str())?;
    Ok(())
}
