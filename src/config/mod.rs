//! Persistent default settings backed by SQLite.
//!
//! Shares a database with [`History`](crate::history::History). Pass the
//! same path to both.

use std::fmt;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::consts::{DEFAULT_IMAGE, DEFAULT_MODEL, DEFAULT_RUNTIME, DEFAULT_WORKSPACE};

/// A setting the CLI falls back to when the matching flag is not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Setting {
    /// Host directory mounted into the container.
    Workspace,
    /// Container image to run.
    Image,
    /// Default Real-ESRGAN model.
    Model,
    /// Container runtime program (docker, podman).
    Runtime,
}

impl Setting {
    pub const ALL: [Setting; 4] = [
        Setting::Workspace,
        Setting::Image,
        Setting::Model,
        Setting::Runtime,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Setting::Workspace => "workspace",
            Setting::Image => "image",
            Setting::Model => "model",
            Setting::Runtime => "runtime",
        }
    }

    /// Value used when neither a flag nor a stored setting is present.
    pub fn default_value(&self) -> &'static str {
        match self {
            Setting::Workspace => DEFAULT_WORKSPACE,
            Setting::Image => DEFAULT_IMAGE,
            Setting::Model => DEFAULT_MODEL,
            Setting::Runtime => DEFAULT_RUNTIME,
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Persistent settings store.
pub struct Settings {
    conn: Mutex<Connection>,
}

impl Settings {
    /// Open or create the settings table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open settings database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create settings table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("settings connection poisoned"))
    }

    /// Stored value, if any.
    pub fn get(&self, setting: Setting) -> Result<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query([setting.key()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Flag value, else stored value, else the built-in default.
    pub fn resolve(&self, setting: Setting, flag: Option<&str>) -> Result<String> {
        if let Some(value) = flag {
            return Ok(value.to_string());
        }
        Ok(self
            .get(setting)?
            .unwrap_or_else(|| setting.default_value().to_string()))
    }

    /// Set a value (upsert).
    pub fn set(&self, setting: Setting, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [setting.key(), value],
        )?;
        Ok(())
    }

    /// Remove a stored value, reverting to the default.
    pub fn remove(&self, setting: Setting) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM settings WHERE key = ?1", [setting.key()])?;
        Ok(())
    }

    /// Every setting with its effective value and whether it is stored.
    pub fn list(&self) -> Result<Vec<(Setting, String, bool)>> {
        Setting::ALL
            .iter()
            .map(|&setting| -> Result<(Setting, String, bool)> {
                Ok(match self.get(setting)? {
                    Some(value) => (setting, value, true),
                    None => (setting, setting.default_value().to_string(), false),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_settings() -> Settings {
        Settings::open(":memory:").unwrap()
    }

    #[test]
    fn get_returns_none_for_unset() {
        let settings = mem_settings();
        assert!(settings.get(Setting::Image).unwrap().is_none());
    }

    #[test]
    fn set_and_get() {
        let settings = mem_settings();
        settings.set(Setting::Model, "realesrgan-x4plus").unwrap();
        assert_eq!(
            settings.get(Setting::Model).unwrap().unwrap(),
            "realesrgan-x4plus"
        );
    }

    #[test]
    fn set_overwrites_existing() {
        let settings = mem_settings();
        settings.set(Setting::Runtime, "docker").unwrap();
        settings.set(Setting::Runtime, "podman").unwrap();
        assert_eq!(settings.get(Setting::Runtime).unwrap().unwrap(), "podman");
    }

    #[test]
    fn remove_reverts_to_default() {
        let settings = mem_settings();
        settings.set(Setting::Image, "localhost/video2x:dev").unwrap();
        settings.remove(Setting::Image).unwrap();
        assert_eq!(settings.resolve(Setting::Image, None).unwrap(), DEFAULT_IMAGE);
    }

    #[test]
    fn remove_unset_is_ok() {
        mem_settings().remove(Setting::Workspace).unwrap();
    }

    #[test]
    fn resolve_precedence() {
        let settings = mem_settings();
        assert_eq!(
            settings.resolve(Setting::Workspace, None).unwrap(),
            DEFAULT_WORKSPACE
        );

        settings.set(Setting::Workspace, "/data/ws").unwrap();
        assert_eq!(settings.resolve(Setting::Workspace, None).unwrap(), "/data/ws");

        assert_eq!(
            settings
                .resolve(Setting::Workspace, Some("/flag/ws"))
                .unwrap(),
            "/flag/ws"
        );
    }

    #[test]
    fn list_marks_stored_values() {
        let settings = mem_settings();
        settings.set(Setting::Runtime, "podman").unwrap();
        let listed = settings.list().unwrap();
        assert_eq!(listed.len(), Setting::ALL.len());
        for (setting, value, stored) in listed {
            if setting == Setting::Runtime {
                assert_eq!(value, "podman");
                assert!(stored);
            } else {
                assert_eq!(value, setting.default_value());
                assert!(!stored);
            }
        }
    }

    #[test]
    fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings-test.db");
        let path_str = path.to_str().unwrap();

        {
            let settings = Settings::open(path_str).unwrap();
            settings.set(Setting::Model, "persisted").unwrap();
        }

        {
            let settings = Settings::open(path_str).unwrap();
            assert_eq!(settings.get(Setting::Model).unwrap().unwrap(), "persisted");
        }
    }
}
