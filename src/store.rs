// Local key-value persistence: one JSON file per collection.
// Keys carry a version suffix; bumping it starts that collection from empty.

use std::{fs, io, path::PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;
use crate::models::{DailyLog, FocusSession, Goal, UserProfile};

pub const GOALS_KEY: &str = "goals_v1";
pub const SESSIONS_KEY: &str = "sessions_v1";
pub const DAILY_LOGS_KEY: &str = "daily_logs_v1";
pub const PROFILE_KEY: &str = "profile_v1";

#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct Loaded {
    pub goals: Vec<Goal>,
    pub sessions: Vec<FocusSession>,
    pub logs: Vec<DailyLog>,
    pub profile: UserProfile,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    // Missing key -> None
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let text = match fs::read_to_string(self.path(key)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let path = self.path(key);
        let tmp_path = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(value)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load_all(&self) -> AppResult<Loaded> {
        Ok(Loaded {
            goals: self.load(GOALS_KEY)?.unwrap_or_default(),
            sessions: self.load(SESSIONS_KEY)?.unwrap_or_default(),
            logs: self.load(DAILY_LOGS_KEY)?.unwrap_or_default(),
            profile: self.load(PROFILE_KEY)?.unwrap_or_default(),
        })
    }
}
