use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GleanerError, Result};
use crate::config::Config;
use crate::store::SqliteRunLog;

pub struct AppContext {
    pub config: Config,
    pub run_log: Arc<SqliteRunLog>,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let run_log = Arc::new(SqliteRunLog::new(&db_path)?);
        Ok(Self { config, run_log })
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let run_log = Arc::new(SqliteRunLog::in_memory()?);
        Ok(Self { config, run_log })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GleanerError::Config("Could not find data directory".into()))?;
        let gleaner_dir = data_dir.join("gleaner");
        std::fs::create_dir_all(&gleaner_dir)?;
        Ok(gleaner_dir.join("runs.db"))
    }
}
