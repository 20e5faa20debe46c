// prefs.rs — 记住上次使用的投影模式
//
// 文件格式：{ "projection": 1 }，编号与 uniform 一致（0 = gnomonic, 1 = stereographic）

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::projection::ProjectionMode;

const PREFS_FILE: &str = "pano360-preferences.json";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default)]
    projection: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
}

impl Preferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 优先放在可执行文件旁边，否则放在工作目录
    pub fn default_location() -> Self {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                return Self::new(dir.join(PREFS_FILE));
            }
        }
        Self::new(PREFS_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在时返回 Ok(None)
    pub fn load_projection(&self) -> Result<Option<ProjectionMode>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ViewerError::io(&self.path, e)),
        };
        let stored: StoredPreferences =
            serde_json::from_str(&text).map_err(|source| ViewerError::Parse {
                what: "preferences",
                source,
            })?;

        match stored.projection {
            None => Ok(None),
            Some(index) => ProjectionMode::from_index(index)
                .map(Some)
                .ok_or(ViewerError::InvalidProjection(index)),
        }
    }

    pub fn save_projection(&self, mode: ProjectionMode) -> Result<()> {
        let stored = StoredPreferences {
            projection: Some(mode.index()),
        };
        let text = serde_json::to_string_pretty(&stored).map_err(|source| ViewerError::Parse {
            what: "preferences",
            source,
        })?;
        std::fs::write(&self.path, text).map_err(|e| ViewerError::io(&self.path, e))?;
        log::debug!("Saved projection preference {} to {}", mode.name(), self.path.display());
        Ok(())
    }
}
