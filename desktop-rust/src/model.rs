use std::path::PathBuf;

use answer_review_common::workflow::Key;
use answer_review_common::{EvaluationProject, Factuality, Relevance};

/// アップロードフォーム
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub path: Option<PathBuf>,
    pub name: String,
}

/// ワーカースレッドからの通知
pub enum UiMessage {
    ImportDone(anyhow::Result<EvaluationProject>),
    ExportDone(anyhow::Result<PathBuf>),
}

/// 描画中に集めて、描画後にまとめて適用する操作
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SignIn,
    SignOut,
    PickFile,
    DropFile(PathBuf),
    Upload,
    SetAgreement(bool),
    SetRelevance(Relevance),
    SetFactuality(Factuality),
    SetHighlight(bool),
    /// 評価画面でのキー入力
    Key { key: Key, in_text_input: bool },
    Next,
    Previous,
    ShowResults,
    /// 出力先を選んで書き出す
    Export,
    ExportTo(PathBuf),
    Reset,
}
