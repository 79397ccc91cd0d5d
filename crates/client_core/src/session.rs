use std::{collections::HashMap, fs, path::PathBuf};

use shared::domain::{CustomerId, Session};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const TOKEN_SLOT: &str = "wallet_token";
pub const CUSTOMER_ID_SLOT: &str = "wallet_customer_id";
pub const NAME_SLOT: &str = "wallet_name";

const SESSION_SLOTS: [&str; 3] = [TOKEN_SLOT, CUSTOMER_ID_SLOT, NAME_SLOT];

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to access session file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("session file '{path}' is not valid json: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Named string slots with batch writes, so callers never observe a half-written session.
pub trait SlotStorage: Send {
    fn read(&self, key: &str) -> Result<Option<String>, SessionStoreError>;
    fn write_all(&mut self, entries: &[(&str, String)]) -> Result<(), SessionStoreError>;
    fn remove_all(&mut self, keys: &[&str]) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: HashMap<String, String>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            slots: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl SlotStorage for MemorySlots {
    fn read(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        Ok(self.slots.get(key).cloned())
    }

    fn write_all(&mut self, entries: &[(&str, String)]) -> Result<(), SessionStoreError> {
        for (key, value) in entries {
            self.slots.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_all(&mut self, keys: &[&str]) -> Result<(), SessionStoreError> {
        for key in keys {
            self.slots.remove(*key);
        }
        Ok(())
    }
}

/// Slots persisted as one JSON object. Writes go through a sibling temp file
/// and a rename.
#[derive(Debug, Clone)]
pub struct FileSlots {
    path: PathBuf,
}

impl FileSlots {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load_map(&self) -> Result<HashMap<String, String>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(SessionStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| SessionStoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    /// Like `load_map`, but a corrupt file reads as empty so it can be overwritten.
    fn load_map_for_rewrite(&self) -> Result<HashMap<String, String>, SessionStoreError> {
        match self.load_map() {
            Err(SessionStoreError::Format { .. }) => Ok(HashMap::new()),
            other => other,
        }
    }

    fn remove_file(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn store_map(&self, map: &HashMap<String, String>) -> Result<(), SessionStoreError> {
        let io_err = |source| SessionStoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let body = serde_json::to_string_pretty(map).map_err(|source| SessionStoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl SlotStorage for FileSlots {
    fn read(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        Ok(self.load_map()?.remove(key))
    }

    fn write_all(&mut self, entries: &[(&str, String)]) -> Result<(), SessionStoreError> {
        // A corrupt file is replaced rather than blocking a fresh login.
        let mut map = self.load_map_for_rewrite()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        self.store_map(&map)
    }

    /// Falls back to deleting the whole file when it cannot be rewritten, so
    /// removed slots never survive a restart.
    fn remove_all(&mut self, keys: &[&str]) -> Result<(), SessionStoreError> {
        let rewritten = self.load_map_for_rewrite().and_then(|mut map| {
            for key in keys {
                map.remove(*key);
            }
            self.store_map(&map)
        });
        match rewritten {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    "session: rewrite of '{}' failed, removing file: {err}",
                    self.path.display()
                );
                self.remove_file()
            }
        }
    }
}

pub struct SessionStore {
    slots: Box<dyn SlotStorage>,
    current: Option<Session>,
}

impl SessionStore {
    /// An empty store over `slots`; call [`SessionStore::load`] to pick up a persisted session.
    pub fn new(slots: Box<dyn SlotStorage>) -> Self {
        Self {
            slots,
            current: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySlots::new()))
    }

    pub fn load(&mut self) -> Option<&Session> {
        self.current = match self.read_persisted() {
            Ok(Some(session)) => {
                info!("session: restored customer_id={}", session.customer_id);
                Some(session)
            }
            Ok(None) => {
                if let Err(err) = self.slots.remove_all(&SESSION_SLOTS) {
                    warn!("session: failed to drop partial slots: {err}");
                }
                None
            }
            Err(err) => {
                warn!("session: unreadable persisted session, starting signed out: {err}");
                None
            }
        };
        self.current.as_ref()
    }

    fn read_persisted(&self) -> Result<Option<Session>, SessionStoreError> {
        let Some(token) = self.slots.read(TOKEN_SLOT)?.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let Some(customer_id) = self
            .slots
            .read(CUSTOMER_ID_SLOT)?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
        else {
            debug!("session: token present without a usable customer id");
            return Ok(None);
        };
        let Some(name) = self.slots.read(NAME_SLOT)? else {
            debug!("session: token present without a display name");
            return Ok(None);
        };
        Ok(Some(Session {
            token,
            customer_id: CustomerId(customer_id),
            name,
        }))
    }

    pub fn set(
        &mut self,
        token: impl Into<String>,
        customer_id: CustomerId,
        name: impl Into<String>,
    ) -> Result<(), SessionStoreError> {
        let session = Session {
            token: token.into(),
            customer_id,
            name: name.into(),
        };
        self.slots.write_all(&[
            (TOKEN_SLOT, session.token.clone()),
            (CUSTOMER_ID_SLOT, session.customer_id.0.to_string()),
            (NAME_SLOT, session.name.clone()),
        ])?;
        info!("session: stored customer_id={}", session.customer_id);
        self.current = Some(session);
        Ok(())
    }

    /// The in-memory session is dropped even when the persisted slots could
    /// not be removed; the error tells the caller a restart may restore it.
    pub fn clear(&mut self) -> Result<(), SessionStoreError> {
        if self.current.take().is_some() {
            info!("session: cleared");
        }
        self.slots.remove_all(&SESSION_SLOTS)
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }
}
