use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use answer_review_common::spreadsheet::{self, SourceFormat};
use answer_review_common::{EvaluationItem, EvaluationProject};

/// ファイルを読み込んでプロジェクトを作成（ワーカースレッドで実行）
pub fn load_project(path: &Path, name: &str) -> Result<EvaluationProject> {
    let format = SourceFormat::from_path(path)?;
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let project = spreadsheet::project_from_bytes(format, &bytes, name)?;
    Ok(project)
}

pub fn export_items(items: &[EvaluationItem], project_name: &str, dir: &Path) -> Result<PathBuf> {
    let path = spreadsheet::write_export(items, project_name, dir)
        .with_context(|| format!("export to {}", dir.display()))?;
    Ok(path)
}

/// 入力ファイル名からプロジェクト名の初期値を作る
pub fn suggested_name(path: &Path) -> String {
    spreadsheet::default_project_name(path)
}
