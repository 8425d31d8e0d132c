use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use anyhow::{Context, Result};
use shared::domain::Session;
use tracing::warn;

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "jwt";

/// Key/value store persisted by the login flow for the browser session.
pub trait SessionStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(session: &Session) -> Result<Self> {
        let store = Self::new();
        store.set_item(USER_KEY, serde_json::to_string(session)?);
        Ok(store)
    }

    pub fn set_item(&self, key: &str, value: impl Into<String>) {
        if let Ok(mut items) = self.items.write() {
            items.insert(key.to_string(), value.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut items) = self.items.write() {
            items.clear();
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().ok()?.get(key).cloned()
    }
}

/// Read-only session store backed by a JSON object file.
///
/// Values that are not strings are kept in their JSON form so that
/// `{"user": {"type": "Employee"}}` and `{"user": "{\"type\":\"Employee\"}"}`
/// both load.
pub struct FileSessionStore {
    path: PathBuf,
    items: HashMap<String, String>,
}

impl FileSessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read session file '{}'", path.display()))?;
        let values: HashMap<String, serde_json::Value> = serde_json::from_str(&raw)
            .with_context(|| format!("session file '{}' is not a JSON object", path.display()))?;
        let items = values
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(text) => (key, text),
                other => (key, other.to_string()),
            })
            .collect();
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }
}

/// Reads the current user. A missing or malformed entry means "no session".
pub fn load_session(store: &dyn SessionStore) -> Option<Session> {
    let raw = store.get_item(USER_KEY)?;
    match serde_json::from_str::<Session>(&raw) {
        Ok(session) => Some(session),
        Err(err) => {
            warn!("session: ignoring malformed user entry: {err}");
            None
        }
    }
}

pub fn load_token(store: &dyn SessionStore) -> Option<String> {
    store.get_item(TOKEN_KEY).filter(|token| !token.is_empty())
}
