//! answer-review CLI
//!
//! スプレッドシートを取り込み、LLM回答を1件ずつ評価してExcelに書き出す。

pub mod cli;
pub mod error;
pub mod import;
pub mod review;
pub mod session;
pub mod summary;
