//! 進捗表示とExcel出力

use crate::error::{ReviewError, Result};
use answer_review_common::spreadsheet;
use answer_review_common::{EvaluationProject, EvaluationStore, ProjectStorage};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// プロジェクト概要の各行
pub fn summary_lines(project: &EvaluationProject) -> Vec<String> {
    let last_updated = project
        .last_updated
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");
    vec![
        format!("Project Summary: {}", project.name),
        format!(
            "  Evaluation Progress: {} of {} items ({}%)",
            project.completed(),
            project.total(),
            project.progress()
        ),
        format!("  Last Updated: {}", last_updated),
    ]
}

fn progress_bar(project: &EvaluationProject) -> ProgressBar {
    let bar = ProgressBar::new(project.total() as u64);
    if let Ok(style) = ProgressStyle::with_template("  [{bar:30.green/white}] {pos}/{len}") {
        bar.set_style(style.progress_chars("█▓░"));
    }
    bar.set_position(project.completed() as u64);
    bar
}

pub fn print_summary(project: &EvaluationProject) {
    println!("📊 answer-review - 進捗\n");
    let mut lines = summary_lines(project).into_iter();
    if let Some(title) = lines.next() {
        println!("{}", title);
    }
    progress_bar(project).abandon();
    for line in lines {
        println!("{}", line);
    }
}

/// 全項目をExcelに書き出す
pub fn export_project<S: ProjectStorage>(
    store: &EvaluationStore<S>,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    let project = store.project().ok_or(ReviewError::NoProject)?;
    let dir = output_dir.unwrap_or_else(|| Path::new("."));
    Ok(spreadsheet::write_export(store.all_items(), &project.name, dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_review_common::{EvaluationItem, MemoryStorage, Relevance, Factuality};
    use tempfile::tempdir;

    fn project() -> EvaluationProject {
        let items = vec![
            EvaluationItem::new("1", "Q", "A", "L").with_judgments(
                Some(true),
                Some(Relevance::High),
                Some(Factuality::Correct),
            ),
            EvaluationItem::new("2", "Q", "A", "L"),
            EvaluationItem::new("3", "Q", "A", "L"),
        ];
        EvaluationProject::from_items("harvest", items).unwrap()
    }

    #[test]
    fn test_summary_lines() {
        let lines = summary_lines(&project());
        assert_eq!(lines[0], "Project Summary: harvest");
        assert_eq!(lines[1], "  Evaluation Progress: 1 of 3 items (33%)");
        assert!(lines[2].starts_with("  Last Updated: "));
    }

    #[test]
    fn test_export_without_project() {
        let store = EvaluationStore::new(MemoryStorage::new());
        assert!(matches!(export_project(&store, None), Err(ReviewError::NoProject)));
    }

    #[test]
    fn test_export_writes_named_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = EvaluationStore::new(MemoryStorage::new());
        store.set_project(project()).unwrap();

        let out = dir.path().join("out");
        let path = export_project(&store, Some(&out)).unwrap();
        assert!(path.exists());
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("harvest_evaluations_"));
        assert!(file_name.ends_with(".xlsx"));
    }
}
