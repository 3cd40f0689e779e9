//! プロジェクトの永続化
//!
//! 1つの名前付きスロットにプロジェクト全体をJSONで保存する。
//! 保存先は `ProjectStorage` トレイトで差し替え可能。

use crate::error::Result;
use crate::types::EvaluationProject;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// スロット名
pub const SLOT_NAME: &str = "evaluation_project.json";

/// 永続化インターフェース
pub trait ProjectStorage {
    /// スロットを読み込む（未保存なら `None`）
    fn load(&self) -> Result<Option<EvaluationProject>>;

    fn save(&mut self, project: &EvaluationProject) -> Result<()>;

    /// スロットを削除
    fn clear(&mut self) -> Result<()>;
}

/// 保存形式（完了件数は互換性のため出力するが読み込み時は無視）
#[derive(Serialize)]
struct SlotDocument<'a> {
    #[serde(flatten)]
    project: &'a EvaluationProject,
    completed: usize,
}

pub fn to_slot_json(project: &EvaluationProject) -> Result<String> {
    let doc = SlotDocument {
        project,
        completed: project.completed(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn from_slot_json(json: &str) -> Result<EvaluationProject> {
    Ok(serde_json::from_str(json)?)
}

/// JSONファイル1つをスロットとして使う
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// ディレクトリ内の既定スロット
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SLOT_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProjectStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<EvaluationProject>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let project: EvaluationProject = serde_json::from_reader(reader)?;
        debug!(path = %self.path.display(), "loaded project slot");
        Ok(Some(project))
    }

    fn save(&mut self, project: &EvaluationProject) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, to_slot_json(project)?)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            debug!(path = %self.path.display(), "cleared project slot");
        }
        Ok(())
    }
}

/// メモリ上のスロット（テスト・一時利用）
///
/// ファイル版と同じくJSON文字列で保持する。
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Option<String>,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 任意の文字列をスロットに入れた状態で作成
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Some(raw.into()),
            writes: 0,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// 書き込み回数
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ProjectStorage for MemoryStorage {
    fn load(&self) -> Result<Option<EvaluationProject>> {
        self.slot.as_deref().map(from_slot_json).transpose()
    }

    fn save(&mut self, project: &EvaluationProject) -> Result<()> {
        self.slot = Some(to_slot_json(project)?);
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.slot = None;
        Ok(())
    }
}

/// 書き込み失敗を切り替えられるスロット（テスト用）
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingStorage {
    pub inner: MemoryStorage,
    pub fail_saves: bool,
}

#[cfg(test)]
impl ProjectStorage for FailingStorage {
    fn load(&self) -> Result<Option<EvaluationProject>> {
        self.inner.load()
    }

    fn save(&mut self, project: &EvaluationProject) -> Result<()> {
        if self.fail_saves {
            return Err(std::io::Error::other("disk full").into());
        }
        self.inner.save(project)
    }

    fn clear(&mut self) -> Result<()> {
        self.inner.clear()
    }
}
