//! 評価ストア
//!
//! 現在のプロジェクトとカーソルを保持し、変更のたびに永続化して購読者へ通知する。
//! 完了件数はキャッシュせず、項目リストから毎回数え直す。

use crate::error::{Error, Result};
use crate::notice::Notice;
use crate::storage::ProjectStorage;
use crate::types::{EvaluationItem, EvaluationProject};
use tracing::{debug, warn};

/// ストアの変更通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// 新しいプロジェクトに置き換え
    ProjectReplaced,
    /// 起動時に保存済みプロジェクトを復元
    ProjectRestored,
    ItemSaved { index: usize },
    CursorMoved { from: usize, to: usize },
    ProjectReset,
}

pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(&StoreEvent)>;

pub struct EvaluationStore<S: ProjectStorage> {
    storage: S,
    project: Option<EvaluationProject>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl<S: ProjectStorage> EvaluationStore<S> {
    /// 空のストアを作成（復元は `restore` で行う）
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            project: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// 保存済みプロジェクトを読み込む
    ///
    /// 壊れたデータはログに残してプロジェクトなしで続行する。
    pub fn restore(&mut self) -> Option<Notice> {
        let mut project = match self.storage.load() {
            Ok(Some(project)) => project,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to load saved project: {}", e);
                return None;
            }
        };
        project.normalize();

        let notice = Notice::info(
            "Project loaded",
            format!(
                "Resumed project \"{}\" with {}/{} evaluations completed.",
                project.name,
                project.completed(),
                project.total()
            ),
        );
        debug!(name = %project.name, index = project.current_index, "restored project");
        self.project = Some(project);
        self.emit(StoreEvent::ProjectRestored);
        Some(notice)
    }

    pub fn project(&self) -> Option<&EvaluationProject> {
        self.project.as_ref()
    }

    pub fn has_project(&self) -> bool {
        self.project.is_some()
    }

    /// プロジェクトを置き換え（以前のものは破棄）
    pub fn set_project(&mut self, mut project: EvaluationProject) -> Result<()> {
        project.normalize();
        self.storage.save(&project)?;
        debug!(name = %project.name, items = project.total(), "project replaced");
        self.project = Some(project);
        self.emit(StoreEvent::ProjectReplaced);
        Ok(())
    }

    pub fn current_item(&self) -> Option<&EvaluationItem> {
        self.project.as_ref().and_then(|p| p.current_item())
    }

    /// カーソル位置の項目を置き換えて保存
    ///
    /// 書き込みに失敗した場合はメモリ上のプロジェクトも変更しない。
    pub fn save_evaluation(&mut self, mut item: EvaluationItem) -> Result<()> {
        let mut project = self.project.clone().ok_or(Error::NoActiveProject)?;
        let index = project.current_index;
        let slot = project.items.get_mut(index).ok_or(Error::NoActiveProject)?;

        item.sync_completion();
        *slot = item;
        project.touch();

        self.commit(project)?;
        self.emit(StoreEvent::ItemSaved { index });
        Ok(())
    }

    /// 次の項目へ。末尾では何もせず `false`
    pub fn next_item(&mut self) -> Result<bool> {
        self.move_cursor(1)
    }

    /// 前の項目へ。先頭では何もせず `false`
    pub fn prev_item(&mut self) -> Result<bool> {
        self.move_cursor(-1)
    }

    fn move_cursor(&mut self, delta: isize) -> Result<bool> {
        let Some(current) = self.project.as_ref() else {
            return Ok(false);
        };

        let from = current.current_index;
        let to = match from.checked_add_signed(delta) {
            Some(to) if to < current.items.len() => to,
            _ => return Ok(false),
        };

        let mut project = current.clone();
        project.current_index = to;
        project.touch();

        self.commit(project)?;
        self.emit(StoreEvent::CursorMoved { from, to });
        Ok(true)
    }

    /// 完了件数（全件走査）
    pub fn completed(&self) -> usize {
        self.project.as_ref().map_or(0, |p| p.completed())
    }

    pub fn total(&self) -> usize {
        self.project.as_ref().map_or(0, |p| p.total())
    }

    /// 進捗率（0〜100）
    pub fn progress(&self) -> u8 {
        self.project.as_ref().map_or(0, |p| p.progress())
    }

    /// 保存スロットとメモリ上のプロジェクトを消去
    pub fn reset_project(&mut self) -> Result<()> {
        self.storage.clear()?;
        self.project = None;
        self.emit(StoreEvent::ProjectReset);
        Ok(())
    }

    pub fn all_items(&self) -> &[EvaluationItem] {
        self.project.as_ref().map_or(&[], |p| p.items.as_slice())
    }

    /// 変更通知を購読
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// 保存に成功した場合のみ差し替える
    fn commit(&mut self, project: EvaluationProject) -> Result<()> {
        self.storage.save(&project)?;
        self.project = Some(project);
        Ok(())
    }

    fn emit(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FailingStorage, MemoryStorage};
    use crate::types::{Factuality, Relevance};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn items(n: usize) -> Vec<EvaluationItem> {
        (1..=n)
            .map(|i| EvaluationItem::new(i.to_string(), format!("Q{i}"), format!("A{i}"), format!("L{i}")))
            .collect()
    }

    fn store_with(n: usize) -> EvaluationStore<MemoryStorage> {
        let mut store = EvaluationStore::new(MemoryStorage::new());
        let project = EvaluationProject::from_items("demo", items(n)).unwrap();
        store.set_project(project).unwrap();
        store
    }

    fn judged(mut item: EvaluationItem) -> EvaluationItem {
        item.set_agriculture_consensus(true);
        item.set_relevance(Relevance::High);
        item.set_factuality(Factuality::Correct);
        item
    }

    #[test]
    fn test_empty_store() {
        let mut store = EvaluationStore::new(MemoryStorage::new());
        assert!(store.project().is_none());
        assert!(store.current_item().is_none());
        assert_eq!(store.progress(), 0);
        assert!(store.all_items().is_empty());
        assert!(!store.next_item().unwrap());
        assert!(matches!(
            store.save_evaluation(EvaluationItem::default()),
            Err(Error::NoActiveProject)
        ));
    }

    #[test]
    fn test_save_evaluation_updates_completed_and_persists() {
        let mut store = store_with(5);
        let before = store.project().unwrap().last_updated;

        let item = judged(store.current_item().unwrap().clone());
        store.save_evaluation(item).unwrap();

        assert_eq!(store.completed(), 1);
        assert_eq!(store.progress(), 20);
        assert!(store.current_item().unwrap().is_completed());
        assert!(store.project().unwrap().last_updated >= before);

        let persisted = store.storage().load().unwrap().unwrap();
        assert_eq!(persisted.completed(), 1);
        assert!(store.storage().raw().unwrap().contains("\"completed\": 1"));
    }

    #[test]
    fn test_resaving_judged_item_does_not_double_count() {
        let mut store = store_with(3);
        let item = judged(store.current_item().unwrap().clone());
        store.save_evaluation(item.clone()).unwrap();
        store.save_evaluation(item).unwrap();
        assert_eq!(store.completed(), 1);
    }

    #[test]
    fn test_navigation_clamped_without_writes() {
        let mut store = store_with(2);
        let writes = store.storage().writes();

        assert!(!store.prev_item().unwrap());
        assert_eq!(store.storage().writes(), writes);

        assert!(store.next_item().unwrap());
        assert_eq!(store.project().unwrap().current_index, 1);

        let writes = store.storage().writes();
        let snapshot = store.project().unwrap().clone();
        assert!(!store.next_item().unwrap());
        assert_eq!(store.storage().writes(), writes);
        assert_eq!(store.project().unwrap(), &snapshot);
    }

    #[test]
    fn test_judge_then_next_scenario() {
        let mut store = store_with(5);
        let item = judged(store.current_item().unwrap().clone());
        store.save_evaluation(item).unwrap();
        store.next_item().unwrap();

        let project = store.project().unwrap();
        assert_eq!(project.current_index, 1);
        assert_eq!(project.completed(), 1);

        let persisted = store.storage().load().unwrap().unwrap();
        assert_eq!(persisted.current_index, 1);
        assert_eq!(persisted.completed(), 1);
    }

    #[test]
    fn test_restore_from_slot() {
        let mut first = store_with(3);
        let item = judged(first.current_item().unwrap().clone());
        first.save_evaluation(item).unwrap();
        let raw = first.storage().raw().unwrap().to_string();

        let mut store = EvaluationStore::new(MemoryStorage::with_raw(raw));
        let notice = store.restore().expect("notice");
        assert_eq!(notice.title, "Project loaded");
        assert_eq!(
            notice.description,
            "Resumed project \"demo\" with 1/3 evaluations completed."
        );
        assert_eq!(store.completed(), 1);
    }

    #[test]
    fn test_restore_corrupt_slot_is_silent() {
        let mut store = EvaluationStore::new(MemoryStorage::with_raw("{ definitely not json"));
        assert!(store.restore().is_none());
        assert!(store.project().is_none());
    }

    #[test]
    fn test_restore_clamps_cursor() {
        let json = r#"{"id":"1","name":"x","items":[{"id":"1","question":"Q","answer":"A","answer_llm":"L"}],
            "currentIndex":9,"completed":0,"lastUpdated":"2025-01-01T00:00:00Z"}"#;
        let mut store = EvaluationStore::new(MemoryStorage::with_raw(json));
        store.restore();
        assert_eq!(store.project().unwrap().current_index, 0);
        assert_eq!(store.current_item().unwrap().id, "1");
    }

    #[test]
    fn test_reset_project() {
        let mut store = store_with(2);
        store.reset_project().unwrap();
        assert!(store.project().is_none());
        assert!(store.storage().raw().is_none());
    }

    #[test]
    fn test_subscribers_receive_events() {
        let mut store = EvaluationStore::new(MemoryStorage::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store
            .set_project(EvaluationProject::from_items("demo", items(2)).unwrap())
            .unwrap();
        store.next_item().unwrap();
        store.next_item().unwrap();
        store.reset_project().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                StoreEvent::ProjectReplaced,
                StoreEvent::CursorMoved { from: 0, to: 1 },
                StoreEvent::ProjectReset,
            ]
        );

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
    }

    fn failing_store(n: usize) -> EvaluationStore<FailingStorage> {
        let mut store = EvaluationStore::new(FailingStorage::default());
        store
            .set_project(EvaluationProject::from_items("demo", items(n)).unwrap())
            .unwrap();
        store
    }

    #[test]
    fn test_failed_write_leaves_cursor_and_events_untouched() {
        let mut store = failing_store(3);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        let snapshot = store.project().unwrap().clone();

        store.storage_mut().fail_saves = true;
        assert!(store.next_item().is_err());
        let item = judged(store.current_item().unwrap().clone());
        assert!(store.save_evaluation(item).is_err());

        assert_eq!(store.project().unwrap(), &snapshot);
        assert!(seen.borrow().is_empty());

        store.storage_mut().fail_saves = false;
        assert!(store.next_item().unwrap());
        assert_eq!(store.current_item().unwrap().id, "2");
        assert_eq!(*seen.borrow(), vec![StoreEvent::CursorMoved { from: 0, to: 1 }]);
    }

    mod completion_props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Agree(bool),
            Rate(u8),
            Fact(u8),
            Next,
            Prev,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<bool>().prop_map(Op::Agree),
                (1u8..=5).prop_map(Op::Rate),
                (0u8..3).prop_map(Op::Fact),
                Just(Op::Next),
                Just(Op::Prev),
            ]
        }

        proptest! {
            #[test]
            fn completed_matches_judged_items(n in 1usize..6, ops in prop::collection::vec(op(), 0..40)) {
                let mut store = store_with(n);
                for op in ops {
                    match op {
                        Op::Next => { store.next_item().unwrap(); }
                        Op::Prev => { store.prev_item().unwrap(); }
                        other => {
                            let mut item = store.current_item().unwrap().clone();
                            match other {
                                Op::Agree(v) => item.set_agriculture_consensus(v),
                                Op::Rate(r) => item.set_relevance(Relevance::from_score(r as i64).unwrap()),
                                Op::Fact(f) => item.set_factuality(Factuality::ALL[f as usize]),
                                _ => unreachable!(),
                            }
                            store.save_evaluation(item).unwrap();
                        }
                    }

                    let project = store.project().unwrap();
                    let judged = project.items.iter().filter(|i| i.has_all_judgments()).count();
                    prop_assert_eq!(store.completed(), judged);
                    prop_assert!(project.items.iter().all(|i| i.is_completed() == i.has_all_judgments()));
                    prop_assert!(project.current_index < project.total());
                }
            }
        }
    }
}
