//! 評価データの型定義
//!
//! - EvaluationItem: 質問・正解・LLM回答と3つの判定
//! - EvaluationProject: 評価セッション（項目リスト＋カーソル）
//! - Relevance / Factuality: 判定値

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 関連度（5段階）
///
/// 保存時は `"3 (Moderate Relevance)"` のようなラベル文字列になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relevance {
    Irrelevant = 1,
    Low = 2,
    Moderate = 3,
    High = 4,
    Accurate = 5,
}

impl Relevance {
    pub const ALL: [Relevance; 5] = [
        Relevance::Irrelevant,
        Relevance::Low,
        Relevance::Moderate,
        Relevance::High,
        Relevance::Accurate,
    ];

    pub fn score(self) -> u8 {
        self as u8
    }

    pub fn from_score(score: i64) -> Option<Self> {
        match score {
            1 => Some(Relevance::Irrelevant),
            2 => Some(Relevance::Low),
            3 => Some(Relevance::Moderate),
            4 => Some(Relevance::High),
            5 => Some(Relevance::Accurate),
            _ => None,
        }
    }

    /// ラジオボタンの選択値（"1"〜"5"）からラベルへ変換
    ///
    /// 範囲外の値は `1 (Irrelevant)` に倒す。
    pub fn from_choice(choice: &str) -> Self {
        choice
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(Self::from_score)
            .unwrap_or(Relevance::Irrelevant)
    }

    pub fn label(self) -> &'static str {
        match self {
            Relevance::Irrelevant => "1 (Irrelevant)",
            Relevance::Low => "2 (Low Relevance)",
            Relevance::Moderate => "3 (Moderate Relevance)",
            Relevance::High => "4 (High Relevance)",
            Relevance::Accurate => "5 (Accurate Relevance)",
        }
    }

    /// 数値・数字文字列・ラベルのいずれかを解釈
    pub fn parse_loose(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(n) = text.parse::<f64>() {
            return Self::from_number(n);
        }

        let mut chars = text.chars();
        let digit = chars.next()?.to_digit(10)?;
        match chars.next() {
            None => Self::from_score(i64::from(digit)),
            Some(c) if c.is_whitespace() || c == '(' => Self::from_score(i64::from(digit)),
            Some(_) => None,
        }
    }

    pub fn from_number(n: f64) -> Option<Self> {
        if n.fract() != 0.0 {
            return None;
        }
        Self::from_score(n as i64)
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Relevance {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse_loose(s).ok_or_else(|| format!("Unknown relevance: {}", s))
    }
}

impl Serialize for Relevance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Relevance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // 旧データは数値で保存されている場合がある
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        let parsed = match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Relevance::from_number(n),
            Repr::Text(s) => Relevance::parse_loose(&s),
        };
        parsed.ok_or_else(|| serde::de::Error::custom("relevance must be 1-5"))
    }
}

/// 事実性（3区分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Factuality {
    Correct,
    PartiallyCorrect,
    Incorrect,
}

impl Factuality {
    pub const ALL: [Factuality; 3] = [
        Factuality::Correct,
        Factuality::PartiallyCorrect,
        Factuality::Incorrect,
    ];

    /// 表示用ラベル
    pub fn label(self) -> &'static str {
        match self {
            Factuality::Correct => "Correct",
            Factuality::PartiallyCorrect => "Partially Correct",
            Factuality::Incorrect => "Incorrect",
        }
    }

    /// 保存値（大文字）
    pub fn stored_value(self) -> &'static str {
        match self {
            Factuality::Correct => "CORRECT",
            Factuality::PartiallyCorrect => "PARTIALLY CORRECT",
            Factuality::Incorrect => "INCORRECT",
        }
    }
}

impl fmt::Display for Factuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stored_value())
    }
}

impl FromStr for Factuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        Factuality::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("Unknown factuality: {}", s))
    }
}

impl TryFrom<String> for Factuality {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Factuality> for String {
    fn from(value: Factuality) -> Self {
        value.stored_value().to_string()
    }
}

/// 評価項目
///
/// 判定フィールドはセッター経由でのみ変更し、`isCompleted` は常に
/// 3つの判定がすべて揃っているかどうかと一致する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub answer_llm: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    agriculture_consensus: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    relevance: Option<Relevance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    factuality: Option<Factuality>,

    #[serde(rename = "isCompleted", default)]
    is_completed: bool,
}

impl EvaluationItem {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        answer_llm: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            answer_llm: answer_llm.into(),
            ..Default::default()
        }
    }

    /// 判定をまとめて設定（読み込み時用）
    pub fn with_judgments(
        mut self,
        agriculture_consensus: Option<bool>,
        relevance: Option<Relevance>,
        factuality: Option<Factuality>,
    ) -> Self {
        self.agriculture_consensus = agriculture_consensus;
        self.relevance = relevance;
        self.factuality = factuality;
        self.sync_completion();
        self
    }

    pub fn agriculture_consensus(&self) -> Option<bool> {
        self.agriculture_consensus
    }

    pub fn relevance(&self) -> Option<Relevance> {
        self.relevance
    }

    pub fn factuality(&self) -> Option<Factuality> {
        self.factuality
    }

    pub fn set_agriculture_consensus(&mut self, value: bool) {
        self.agriculture_consensus = Some(value);
        self.sync_completion();
    }

    pub fn set_relevance(&mut self, value: Relevance) {
        self.relevance = Some(value);
        self.sync_completion();
    }

    pub fn set_factuality(&mut self, value: Factuality) {
        self.factuality = Some(value);
        self.sync_completion();
    }

    /// 3つの判定がすべて設定済みか
    pub fn has_all_judgments(&self) -> bool {
        self.agriculture_consensus.is_some() && self.relevance.is_some() && self.factuality.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// 保存値を信用せず完了フラグを再計算
    pub(crate) fn sync_completion(&mut self) {
        self.is_completed = self.has_all_judgments();
    }
}

/// 評価プロジェクト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationProject {
    pub id: String,
    pub name: String,
    pub items: Vec<EvaluationItem>,
    pub current_index: usize,
    pub last_updated: DateTime<Utc>,
}

impl EvaluationProject {
    /// アップロードされた項目から新規プロジェクトを作成
    ///
    /// カーソルは最初の未完了項目（全件完了済みなら最後の項目）に置く。
    pub fn from_items(name: &str, items: Vec<EvaluationItem>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::ProjectNameRequired);
        }
        if items.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let now = Utc::now();
        let mut project = Self {
            id: now.timestamp_millis().to_string(),
            name: name.to_string(),
            items,
            current_index: 0,
            last_updated: now,
        };
        project.current_index = project.first_unjudged_index();
        project.normalize();
        Ok(project)
    }

    /// 完了件数（毎回全件を走査する）
    pub fn completed(&self) -> usize {
        self.items.iter().filter(|item| item.has_all_judgments()).count()
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// 進捗率（0〜100）
    pub fn progress(&self) -> u8 {
        progress_percent(self.completed(), self.total())
    }

    pub fn current_item(&self) -> Option<&EvaluationItem> {
        self.items.get(self.current_index)
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.items.len()
    }

    pub fn first_unjudged_index(&self) -> usize {
        self.items
            .iter()
            .position(|item| !item.has_all_judgments())
            .unwrap_or_else(|| self.items.len().saturating_sub(1))
    }

    /// 完了フラグの再計算とカーソルの範囲補正
    pub(crate) fn normalize(&mut self) {
        for item in &mut self.items {
            item.sync_completion();
        }
        let max = self.items.len().saturating_sub(1);
        if self.current_index > max {
            self.current_index = max;
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// `round(completed / total * 100)`、total が 0 なら 0
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}
