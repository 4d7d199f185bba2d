mod common;

use common::*;
use serde_json::json;
use statq::progress::{self, EventType};
use statq::resolver::{HierarchicalNavigator, TableResolver};
use statq::AgentError;
use tokio_util::sync::CancellationToken;

fn catalogue() -> MemoryApi {
    let population = summary("07459", "Population by region", &["region", "year"]);
    let projections = summary("03027", "Population projections", &["region", "year"]);
    let employment = summary("11607", "Employed persons", &["sex", "year"]);
    MemoryApi::new()
        .with_folder("", vec![folder("be", "Population"), folder("al", "Labour market")])
        .with_folder("be", vec![folder("be01", "Population count"), folder("be02", "Projections")])
        .with_folder("al", vec![table_entry(&employment)])
        .with_folder("be01", vec![table_entry(&population)])
        .with_folder("be02", vec![table_entry(&projections), table_entry(&population)])
        .with_table(population, None)
        .with_table(projections, None)
        .with_table(employment, None)
}

#[tokio::test]
async fn walks_the_tree_and_ranks_what_it_finds() {
    let oracle = ScriptedOracle::new()
        .answer("select_entries", json!({ "selected": ["folder:be"] }))
        .answer("select_entries", json!({ "selected": ["folder:be01", "folder:be02"] }))
        .answer("select_table", json!({ "tableId": "07459", "reasoning": "counts, not projections" }));
    let harness = Harness::new(oracle, catalogue());
    let (tx, rx) = progress::channel();
    let cancel = CancellationToken::new();

    let table_id = HierarchicalNavigator::new(5, 2)
        .resolve(harness.context(&tx, &cancel), "population by region", &[])
        .await
        .unwrap();
    drop(tx);

    assert_eq!(table_id, "07459");
    assert_eq!(harness.api.folder_requests(), vec!["", "be", "be01", "be02"]);

    // The shared table is offered once.
    let ranking = &harness.oracle.requests("select_table")[0];
    assert_eq!(ranking.schema["properties"]["tableId"]["enum"], json!(["07459", "03027", "NONE"]));

    let events = rx.collect().await;
    let navigation: Vec<&str> = events
        .iter()
        .filter(|e| e.event_type == EventType::Nav)
        .map(|e| e.content.as_str())
        .collect();
    assert_eq!(
        navigation,
        vec![
            "Exploring Population",
            "Exploring Population count",
            "Exploring Projections",
            "Selected table 07459: Population by region"
        ]
    );
}

#[tokio::test]
async fn cyclic_folders_terminate() {
    let only = summary("05803", "Births", &["year"]);
    let api = MemoryApi::new()
        .with_folder("", vec![folder("a", "A")])
        .with_folder("a", vec![folder("b", "B")])
        .with_folder("b", vec![folder("a", "A again"), table_entry(&only)])
        .with_table(only, None);
    let oracle = ScriptedOracle::new()
        .answer("select_entries", json!({ "selected": ["folder:a"] }))
        .answer("select_entries", json!({ "selected": ["folder:b"] }));
    let harness = Harness::new(oracle, api);
    let (tx, _rx) = progress::channel();
    let cancel = CancellationToken::new();

    let table_id = HierarchicalNavigator::new(10, 3)
        .resolve(harness.context(&tx, &cancel), "births", &[])
        .await
        .unwrap();

    assert_eq!(table_id, "05803");
    assert_eq!(harness.api.folder_requests(), vec!["", "a", "b"]);
    assert_eq!(harness.oracle.requests("select_entries").len(), 2);
}

#[tokio::test]
async fn depth_bound_stops_an_endless_chain() {
    let mut api = MemoryApi::new();
    let mut oracle = ScriptedOracle::new();
    for level in 0..20 {
        let id = if level == 0 { String::new() } else { format!("f{}", level) };
        let child = format!("f{}", level + 1);
        api = api.with_folder(&id, vec![folder(&child, &format!("Level {}", level + 1))]);
        oracle = oracle.answer("select_entries", json!({ "selected": [format!("folder:{}", child)] }));
    }
    let harness = Harness::new(oracle, api);
    let (tx, _rx) = progress::channel();
    let cancel = CancellationToken::new();

    let err = HierarchicalNavigator::new(3, 1)
        .resolve(harness.context(&tx, &cancel), "anything", &[])
        .await
        .unwrap_err();

    assert!(err.is_inconclusive(), "{:?}", err);
    assert_eq!(harness.api.folder_requests().len(), 3);
    assert_eq!(harness.oracle.requests("select_entries").len(), 2);
}

#[tokio::test]
async fn breadth_is_enforced_by_the_answer_schema() {
    let oracle = ScriptedOracle::new()
        .answer("select_entries", json!({ "selected": ["folder:be", "folder:al"] }))
        .answer("select_entries", json!({ "selected": ["folder:be"] }))
        .answer("select_entries", json!({ "selected": ["folder:be01"] }));
    let harness = Harness::new(oracle, catalogue());
    let (tx, _rx) = progress::channel();
    let cancel = CancellationToken::new();

    let table_id = HierarchicalNavigator::new(5, 1)
        .resolve(harness.context(&tx, &cancel), "population", &[])
        .await
        .unwrap();

    assert_eq!(table_id, "07459");
    let first = harness.oracle.requests("select_entries");
    // The two-folder answer was rejected and retried at the same level.
    assert_eq!(first.len(), 3);
    assert!(first[1].messages.last().unwrap().content.contains("RETRY ATTEMPT 1"));
}

#[tokio::test]
async fn failed_folder_fetch_aborts_resolution() {
    let api = MemoryApi::new().with_folder("", vec![folder("gone", "Removed folder")]);
    let oracle = ScriptedOracle::new().answer("select_entries", json!({ "selected": ["folder:gone"] }));
    let harness = Harness::new(oracle, api);
    let (tx, _rx) = progress::channel();
    let cancel = CancellationToken::new();

    let err = HierarchicalNavigator::new(5, 3)
        .resolve(harness.context(&tx, &cancel), "anything", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Upstream { .. }), "{:?}", err);
}
