//! 対話式評価ループ

use crate::error::Result;
use crate::session::print_notice;
use answer_review_common::highlight;
use answer_review_common::workflow::{EvaluationWorkflow, Key, Navigation, WorkflowOptions};
use answer_review_common::{EvaluationStore, Factuality, ProjectStorage};
use dialoguer::Input;

const HELP: &str = "操作: [n/→]次へ [p/←]前へ [a]合意切替 [y/no]合意 [1-5]関連度 [c/pc/i]事実性 [h]強調 [r]結果 [q]終了";

/// 対話アクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    /// 移動キー
    Navigate(Key),
    ToggleAgreement,
    Agreement(bool),
    /// 関連度の選択値（"1"〜"5"）
    Relevance(String),
    Factuality(Factuality),
    ToggleHighlight,
    /// 結果画面へ
    Results,
    Quit,
}

/// ループの終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Quit,
    Results,
    NoProject,
}

/// 入力文字列をアクションに変換
///
/// 移動は `n`/`p` か文字の `→`/`←`。端末の矢印キーは入力欄の行編集で消費される。
pub fn parse_action(input: &str) -> Option<ReviewAction> {
    let trimmed = input.trim();
    let action = match trimmed {
        "n" => ReviewAction::Navigate(Key::Char('n')),
        "p" => ReviewAction::Navigate(Key::Char('p')),
        "→" => ReviewAction::Navigate(Key::ArrowRight),
        "←" => ReviewAction::Navigate(Key::ArrowLeft),
        "a" => ReviewAction::ToggleAgreement,
        "y" | "yes" => ReviewAction::Agreement(true),
        "no" => ReviewAction::Agreement(false),
        "1" | "2" | "3" | "4" | "5" => ReviewAction::Relevance(trimmed.to_string()),
        "c" => ReviewAction::Factuality(Factuality::Correct),
        "pc" => ReviewAction::Factuality(Factuality::PartiallyCorrect),
        "i" => ReviewAction::Factuality(Factuality::Incorrect),
        "h" => ReviewAction::ToggleHighlight,
        "r" => ReviewAction::Results,
        "q" | "Q" => ReviewAction::Quit,
        _ => return None,
    };
    Some(action)
}

fn ansi_mark(word: &str) -> String {
    format!("\u{1b}[1;33m{}\u{1b}[0m", word)
}

/// 現在の項目を表示用の行にする
pub fn render_item<S: ProjectStorage>(
    workflow: &EvaluationWorkflow,
    store: &EvaluationStore<S>,
    mark: fn(&str) -> String,
) -> Vec<String> {
    let (Some(item), Some(project)) = (workflow.item(), store.project()) else {
        return Vec::new();
    };

    let (answer, answer_llm) = match workflow.highlighted_answers() {
        Some(h) => (join_segments(&h.answer, mark), join_segments(&h.answer_llm, mark)),
        None => (item.answer.clone(), item.answer_llm.clone()),
    };

    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    vec![
        format!(
            "[{}/{}] Id: {}  ({})  進捗 {}/{} ({}%)",
            project.current_index + 1,
            project.total(),
            item.id,
            workflow.badge(),
            project.completed(),
            project.total(),
            project.progress()
        ),
        format!("  Question:   {}", item.question),
        format!("  Answer:     {}", answer),
        format!("  Answer LLM: {}", answer_llm),
        format!(
            "  Agriculture consensus: {}  Relevance: {}  Factuality: {}",
            or_dash(item.agriculture_consensus().map(|v| if v { "Yes".into() } else { "No".into() })),
            or_dash(item.relevance().map(|r| r.label().to_string())),
            or_dash(item.factuality().map(|f| f.label().to_string())),
        ),
    ]
}

fn join_segments(segments: &[highlight::Segment<'_>], mark: fn(&str) -> String) -> String {
    segments
        .iter()
        .map(|s| if s.marked { mark(s.text) } else { s.text.to_string() })
        .collect()
}

/// アクションを1つ適用。ループを抜ける場合は `Some`
pub fn apply_action<S: ProjectStorage>(
    workflow: &mut EvaluationWorkflow,
    store: &mut EvaluationStore<S>,
    action: ReviewAction,
) -> Result<Option<ReviewOutcome>> {
    let notice = match action {
        ReviewAction::Navigate(key) => {
            match workflow.handle_key(store, key, false)? {
                Some(Navigation::Blocked(notice)) => print_notice(&notice),
                Some(Navigation::Finished) => return Ok(Some(ReviewOutcome::Results)),
                Some(Navigation::Unchanged) => println!("  → これ以上移動できません"),
                Some(Navigation::Moved { .. }) | None => {}
            }
            return Ok(None);
        }
        ReviewAction::ToggleAgreement => workflow.toggle_agreement(store)?,
        ReviewAction::Agreement(value) => workflow.set_agreement(store, value)?,
        ReviewAction::Relevance(choice) => workflow.choose_relevance(store, &choice)?,
        ReviewAction::Factuality(value) => workflow.set_factuality(store, value)?,
        ReviewAction::ToggleHighlight => {
            let on = workflow.toggle_highlight();
            println!("  → 強調表示: {}", if on { "ON" } else { "OFF" });
            return Ok(None);
        }
        ReviewAction::Results => return Ok(Some(ReviewOutcome::Results)),
        ReviewAction::Quit => return Ok(Some(ReviewOutcome::Quit)),
    };
    print_notice(&notice);
    Ok(None)
}

/// 対話式で評価
pub fn run_review<S: ProjectStorage>(
    store: &mut EvaluationStore<S>,
    options: WorkflowOptions,
) -> Result<ReviewOutcome> {
    if store.project().is_none() {
        return Ok(ReviewOutcome::NoProject);
    }

    let mut workflow = EvaluationWorkflow::attach(store, options);
    println!("---");
    println!("{}", HELP);
    println!("---\n");

    let outcome = loop {
        workflow.sync(store);
        for line in render_item(&workflow, store, ansi_mark) {
            println!("{}", line);
        }

        let input: String = Input::new()
            .with_prompt("操作")
            .allow_empty(true)
            .interact_text()?;

        match parse_action(&input) {
            Some(action) => {
                if let Some(outcome) = apply_action(&mut workflow, store, action)? {
                    break outcome;
                }
            }
            None => println!("  → 不明な操作です\n{}", HELP),
        }
        println!();
    };

    workflow.detach(store);
    Ok(outcome)
}
