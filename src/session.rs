//! 設定・サインイン確認・ストアの用意

use crate::error::{ReviewError, Result};
use answer_review_common::{
    Config, EvaluationStore, IdentityProvider, JsonFileStorage, Notice, NoticeLevel, ProjectStorage,
};
use tracing::debug;

/// サインイン済みならレビュアー名を返す
pub fn require_reviewer(identity: &dyn IdentityProvider) -> Result<String> {
    if !identity.is_signed_in() {
        return Err(ReviewError::NotSignedIn);
    }
    Ok(identity.display_name().unwrap_or_default().to_string())
}

/// 保存スロットを開いてプロジェクトを復元
pub fn open_store(config: &Config) -> Result<EvaluationStore<JsonFileStorage>> {
    let storage = config.storage()?;
    debug!(path = %storage.path().display(), "opening project slot");
    Ok(restore_store(storage))
}

pub fn restore_store<S: ProjectStorage>(storage: S) -> EvaluationStore<S> {
    let mut store = EvaluationStore::new(storage);
    if let Some(notice) = store.restore() {
        print_notice(&notice);
    }
    store
}

pub fn notice_line(notice: &Notice) -> String {
    let mark = match notice.level {
        NoticeLevel::Success => "✔",
        NoticeLevel::Info => "ℹ",
        NoticeLevel::Warning => "⚠",
        NoticeLevel::Error => "✖",
    };
    format!("{} {}", mark, notice)
}

pub fn print_notice(notice: &Notice) {
    println!("{}", notice_line(notice));
}
