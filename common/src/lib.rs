//! Answer Review Common Library
//!
//! CLIとデスクトップ版で共有される評価ロジック

pub mod config;
pub mod delimited;
pub mod error;
pub mod highlight;
pub mod notice;
pub mod shell;
pub mod spreadsheet;
pub mod storage;
pub mod store;
pub mod types;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
pub use notice::{Notice, NoticeLevel};
pub use shell::{IdentityProvider, Screen, Shell, ShellEvent, View};
pub use spreadsheet::{import_project, SourceFormat};
pub use storage::{JsonFileStorage, MemoryStorage, ProjectStorage};
pub use store::{EvaluationStore, StoreEvent};
pub use types::{EvaluationItem, EvaluationProject, Factuality, Relevance};
pub use workflow::{EvaluationWorkflow, Key, Navigation, WorkflowOptions};
