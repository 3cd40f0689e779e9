use crate::error::{Error, Result};
use crate::shell::IdentityProvider;
use crate::storage::{JsonFileStorage, SLOT_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 保存スロットのパスを上書きする環境変数
pub const STATE_ENV: &str = "ANSWER_REVIEW_STATE";

const APP_DIR: &str = "answer-review";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// サインイン中のレビュアー名
    pub reviewer: Option<String>,
    pub state_path: Option<PathBuf>,
    pub highlight_matches: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join(APP_DIR).join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            reviewer: None,
            state_path: None,
            highlight_matches: false,
        }
    }

    /// 保存スロットのパス
    ///
    /// 優先順位: 環境変数 > 設定ファイル > データディレクトリ
    pub fn state_path(&self) -> Result<PathBuf> {
        self.resolve_state_path(std::env::var_os(STATE_ENV).map(PathBuf::from))
    }

    fn resolve_state_path(&self, from_env: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = from_env {
            return Ok(path);
        }
        if let Some(path) = &self.state_path {
            return Ok(path.clone());
        }
        let data = dirs::data_dir()
            .ok_or_else(|| Error::Config("データディレクトリが見つかりません".into()))?;
        Ok(data.join(APP_DIR).join(SLOT_NAME))
    }

    pub fn storage(&self) -> Result<JsonFileStorage> {
        Ok(JsonFileStorage::new(self.state_path()?))
    }

    /// レビュアー名を設定（保存は呼び出し側）
    pub fn sign_in(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Config("レビュアー名が空です".into()));
        }
        self.reviewer = Some(name.to_string());
        Ok(())
    }

    pub fn sign_out(&mut self) {
        self.reviewer = None;
    }
}

impl IdentityProvider for Config {
    fn is_signed_in(&self) -> bool {
        self.reviewer.is_some()
    }

    fn display_name(&self) -> Option<&str> {
        self.reviewer.as_deref()
    }
}
