//! 取り込み → 評価 → Excel出力 の統合テスト

use answer_review::import::import_into;
use answer_review::summary::export_project;
use answer_review_common::spreadsheet::{self, SourceFormat};
use answer_review_common::workflow::{EvaluationWorkflow, Navigation, WorkflowOptions};
use answer_review_common::{
    EvaluationStore, Factuality, JsonFileStorage, ProjectStorage, Relevance,
};
use std::path::Path;
use tempfile::tempdir;

const FIVE_ROWS: &str = "\
Id,Questions,Answers,Answer_LLM
1,What is crop rotation?,Alternating crops,Rotating crops each season
2,Best time to sow wheat?,Autumn,Late autumn
3,\"Why lime soil?\",Raises pH,\"Raises soil pH, reduces acidity\"
4,What is mulch?,Ground cover,Material covering soil
5,Drip irrigation?,Water at roots,Delivers water to roots
";

fn write_csv(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("agri_qa.csv");
    std::fs::write(&path, FIVE_ROWS).unwrap();
    path
}

/// 5行のファイルを取り込むと先頭から評価開始
#[tokio::test]
async fn test_import_five_rows() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut store = EvaluationStore::new(JsonFileStorage::in_dir(&dir.path().join("state")));

    import_into(&mut store, &write_csv(dir.path()), None).await.unwrap();

    let project = store.project().unwrap();
    assert_eq!(project.total(), 5);
    assert_eq!(project.current_index, 0);
    assert_eq!(store.completed(), 0);
    assert_eq!(project.items[2].answer_llm, "Raises soil pH, reduces acidity");
    assert!(store.storage().path().exists());
}

/// 評価して次へ進むと保存スロットに反映される
#[tokio::test]
async fn test_judge_then_next_is_persisted() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = dir.path().join("state");
    let mut store = EvaluationStore::new(JsonFileStorage::in_dir(&state));
    import_into(&mut store, &write_csv(dir.path()), None).await.unwrap();

    let mut wf = EvaluationWorkflow::attach(&mut store, WorkflowOptions::default());
    wf.set_agreement(&mut store, true).unwrap();
    wf.choose_relevance(&mut store, "5").unwrap();
    wf.set_factuality(&mut store, Factuality::Correct).unwrap();
    assert_eq!(wf.next(&mut store).unwrap(), Navigation::Moved { index: 1 });

    let reloaded = JsonFileStorage::in_dir(&state).load().unwrap().unwrap();
    assert_eq!(reloaded.current_index, 1);
    assert_eq!(reloaded.completed(), 1);

    let raw = std::fs::read_to_string(JsonFileStorage::in_dir(&state).path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["completed"], 1);
    assert_eq!(json["items"][0]["relevance"], "5 (Accurate Relevance)");
    assert_eq!(json["items"][0]["factuality"], "CORRECT");
    assert_eq!(json["items"][0]["isCompleted"], true);
}

/// 出力したExcelを再度取り込んでも内容が保たれる
#[tokio::test]
async fn test_export_then_reimport() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut store = EvaluationStore::new(JsonFileStorage::in_dir(&dir.path().join("state")));
    import_into(&mut store, &write_csv(dir.path()), Some("agri")).await.unwrap();

    let mut wf = EvaluationWorkflow::attach(&mut store, WorkflowOptions::default());
    wf.set_agreement(&mut store, false).unwrap();
    wf.set_relevance(&mut store, Relevance::Moderate).unwrap();
    wf.set_factuality(&mut store, Factuality::PartiallyCorrect).unwrap();
    wf.next(&mut store).unwrap();
    wf.choose_relevance(&mut store, "2").unwrap();

    let path = export_project(&store, Some(&dir.path().join("out"))).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let items = spreadsheet::parse_tabular(SourceFormat::Xlsx, &bytes).unwrap();

    assert_eq!(items.len(), 5);
    for (exported, original) in items.iter().zip(store.all_items()) {
        assert_eq!(exported.id, original.id);
        assert_eq!(exported.question, original.question);
        assert_eq!(exported.answer, original.answer);
        assert_eq!(exported.answer_llm, original.answer_llm);
        assert_eq!(exported.agriculture_consensus(), original.agriculture_consensus());
        assert_eq!(exported.relevance(), original.relevance());
        assert_eq!(exported.factuality(), original.factuality());
    }
    assert!(items[0].is_completed());
    assert_eq!(items[1].relevance(), Some(Relevance::Low));
    assert!(!items[1].is_completed());
}
