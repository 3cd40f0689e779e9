use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Common(#[from] answer_review_common::Error),

    #[error("サインインしていません。`answer-review config --sign-in NAME` で設定してください")]
    NotSignedIn,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("プロジェクトがありません。`answer-review import FILE` で取り込んでください")]
    NoProject,

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl From<dialoguer::Error> for ReviewError {
    fn from(e: dialoguer::Error) -> Self {
        ReviewError::Prompt(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
