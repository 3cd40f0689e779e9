//! スプレッドシートの取り込み

use crate::error::{ReviewError, Result};
use answer_review_common::spreadsheet::{self, SourceFormat};
use answer_review_common::{EvaluationStore, Notice, ProjectStorage};
use std::path::Path;
use tracing::info;

/// ファイルを読み込み、新しいプロジェクトとしてストアに設定
///
/// 失敗時はストアを変更しない。
pub async fn import_into<S: ProjectStorage>(
    store: &mut EvaluationStore<S>,
    path: &Path,
    name: Option<&str>,
) -> Result<Notice> {
    let format = SourceFormat::from_path(path)?;
    if !path.exists() {
        return Err(ReviewError::FileNotFound(path.display().to_string()));
    }

    let bytes = tokio::fs::read(path).await?;
    let name = match name {
        Some(name) => name.to_string(),
        None => spreadsheet::default_project_name(path),
    };

    let project = spreadsheet::project_from_bytes(format, &bytes, &name)?;
    let count = project.total();
    store.set_project(project)?;
    info!(file = %path.display(), count, "imported project");

    Ok(Notice::uploaded(count))
}
