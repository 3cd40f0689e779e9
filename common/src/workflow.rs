//! 評価ワークフロー
//!
//! ストアの現在項目の作業コピーを持ち、入力のたびに即保存する。
//! ストアの変更はチャネルで受け取り、`sync` で作業コピーに反映する。

use crate::error::{Error, Result};
use crate::highlight::{self, Segment};
use crate::notice::Notice;
use crate::storage::ProjectStorage;
use crate::store::{EvaluationStore, StoreEvent, SubscriptionId};
use crate::types::{EvaluationItem, Factuality, Relevance};
use std::sync::mpsc::{self, Receiver};
use tracing::debug;

pub const INCOMPLETE_MESSAGE: &str = "Please fill all the fields before proceeding";

/// 表示オプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// 回答間の共通単語を強調表示する
    pub highlight: bool,
}

/// 移動の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Moved { index: usize },
    /// 境界なので移動なし
    Unchanged,
    /// 未入力の項目がある
    Blocked(Notice),
    /// 最後の項目まで評価済み（結果画面へ）
    Finished,
}

/// キー入力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowRight,
    ArrowLeft,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Next,
    Previous,
}

/// キーを操作に対応付ける（テキスト入力中は無視）
pub fn key_action(key: Key, focus_in_text_input: bool) -> Option<KeyAction> {
    if focus_in_text_input {
        return None;
    }
    match key {
        Key::ArrowRight | Key::Char('n') => Some(KeyAction::Next),
        Key::ArrowLeft | Key::Char('p') => Some(KeyAction::Previous),
        _ => None,
    }
}

/// 強調区間に分割した両回答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedAnswers<'a> {
    pub answer: Vec<Segment<'a>>,
    pub answer_llm: Vec<Segment<'a>>,
}

pub struct EvaluationWorkflow {
    local: Option<EvaluationItem>,
    options: WorkflowOptions,
    events: Receiver<StoreEvent>,
    subscription: SubscriptionId,
}

impl EvaluationWorkflow {
    /// ストアに接続して現在項目を読み込む
    pub fn attach<S: ProjectStorage>(store: &mut EvaluationStore<S>, options: WorkflowOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        let subscription = store.subscribe(move |event| {
            // 受信側が破棄済みなら送信失敗は無視
            let _ = tx.send(event.clone());
        });
        Self {
            local: store.current_item().cloned(),
            options,
            events: rx,
            subscription,
        }
    }

    pub fn detach<S: ProjectStorage>(self, store: &mut EvaluationStore<S>) {
        store.unsubscribe(self.subscription);
    }

    /// 溜まった変更通知を処理する。変更があれば `true`
    pub fn sync<S: ProjectStorage>(&mut self, store: &EvaluationStore<S>) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            debug!(?event, "workflow sync");
            changed = true;
        }
        if changed {
            self.local = store.current_item().cloned();
        }
        changed
    }

    pub fn item(&self) -> Option<&EvaluationItem> {
        self.local.as_ref()
    }

    pub fn options(&self) -> WorkflowOptions {
        self.options
    }

    pub fn set_highlight(&mut self, on: bool) {
        self.options.highlight = on;
    }

    pub fn toggle_highlight(&mut self) -> bool {
        self.options.highlight = !self.options.highlight;
        self.options.highlight
    }

    /// 3項目すべて入力済みか
    pub fn is_complete(&self) -> bool {
        self.local.as_ref().is_some_and(|item| item.has_all_judgments())
    }

    pub fn badge(&self) -> &'static str {
        if self.is_complete() {
            "Complete"
        } else {
            "Incomplete"
        }
    }

    pub fn set_agreement<S: ProjectStorage>(&mut self, store: &mut EvaluationStore<S>, value: bool) -> Result<Notice> {
        self.update(store, |item| item.set_agriculture_consensus(value))
    }

    /// 未入力からのトグルは `true`
    pub fn toggle_agreement<S: ProjectStorage>(&mut self, store: &mut EvaluationStore<S>) -> Result<Notice> {
        self.update(store, |item| {
            let next = !item.agriculture_consensus().unwrap_or(false);
            item.set_agriculture_consensus(next);
        })
    }

    /// 選択値（"1"〜"5"）で関連度を設定
    pub fn choose_relevance<S: ProjectStorage>(&mut self, store: &mut EvaluationStore<S>, choice: &str) -> Result<Notice> {
        self.set_relevance(store, Relevance::from_choice(choice))
    }

    pub fn set_relevance<S: ProjectStorage>(&mut self, store: &mut EvaluationStore<S>, value: Relevance) -> Result<Notice> {
        self.update(store, |item| item.set_relevance(value))
    }

    pub fn set_factuality<S: ProjectStorage>(&mut self, store: &mut EvaluationStore<S>, value: Factuality) -> Result<Notice> {
        self.update(store, |item| item.set_factuality(value))
    }

    fn update<S, F>(&mut self, store: &mut EvaluationStore<S>, edit: F) -> Result<Notice>
    where
        S: ProjectStorage,
        F: FnOnce(&mut EvaluationItem),
    {
        self.sync(store);
        let mut item = self.local.clone().ok_or(Error::NoActiveProject)?;
        edit(&mut item);
        store.save_evaluation(item)?;
        self.sync(store);
        Ok(Notice::success(
            "Evaluation saved",
            "Your evaluation has been saved automatically.",
        ))
    }

    /// 次の項目へ（未入力があれば移動しない）
    pub fn next<S: ProjectStorage>(&mut self, store: &mut EvaluationStore<S>) -> Result<Navigation> {
        self.sync(store);
        if self.local.is_none() {
            return Ok(Navigation::Unchanged);
        }
        if !self.is_complete() {
            return Ok(Navigation::Blocked(Notice::warning(
                "Incomplete evaluation",
                INCOMPLETE_MESSAGE,
            )));
        }
        if store.project().is_some_and(|p| p.is_last()) {
            return Ok(Navigation::Finished);
        }
        self.moved(store, |store| store.next_item())
    }

    pub fn prev<S: ProjectStorage>(&mut self, store: &mut EvaluationStore<S>) -> Result<Navigation> {
        self.sync(store);
        self.moved(store, |store| store.prev_item())
    }

    fn moved<S, F>(&mut self, store: &mut EvaluationStore<S>, step: F) -> Result<Navigation>
    where
        S: ProjectStorage,
        F: FnOnce(&mut EvaluationStore<S>) -> Result<bool>,
    {
        if !step(store)? {
            return Ok(Navigation::Unchanged);
        }
        self.sync(store);
        let index = store.project().map_or(0, |p| p.current_index);
        Ok(Navigation::Moved { index })
    }

    /// キー入力を処理。対応しないキーは `None`
    pub fn handle_key<S: ProjectStorage>(
        &mut self,
        store: &mut EvaluationStore<S>,
        key: Key,
        focus_in_text_input: bool,
    ) -> Result<Option<Navigation>> {
        match key_action(key, focus_in_text_input) {
            Some(KeyAction::Next) => self.next(store).map(Some),
            Some(KeyAction::Previous) => self.prev(store).map(Some),
            None => Ok(None),
        }
    }

    /// 両回答を強調区間に分割（強調オフなら分割しない）
    pub fn highlighted_answers(&self) -> Option<HighlightedAnswers<'_>> {
        let item = self.local.as_ref()?;
        let words = if self.options.highlight {
            highlight::matching_words(&item.answer, &item.answer_llm)
        } else {
            Default::default()
        };
        Some(HighlightedAnswers {
            answer: highlight::highlight(&item.answer, &words),
            answer_llm: highlight::highlight(&item.answer_llm, &words),
        })
    }
}
