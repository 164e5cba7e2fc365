//! End-to-end exercise of the table coordinator's event hooks (spec.md
//! §4.3) against a fake [`RowSource`], matching S1/S6-style scenarios from
//! spec.md §8 without a real Postgres connection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use pgcache_client::{BigColumns, RowSource, Table, TableEvent};
use pgcache_data::{Binding, Hooks};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, thiserror::Error)]
#[error("fake row source error: {0}")]
struct FakeError(String);

struct FakeRowSource {
    responses: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
}

impl FakeRowSource {
    fn new() -> Self {
        FakeRowSource {
            responses: RwLock::new(HashMap::new()),
        }
    }

    fn respond(&self, sql: impl Into<String>, rows: Vec<Map<String, Value>>) {
        self.responses.write().insert(sql.into(), rows);
    }
}

#[async_trait]
impl RowSource for FakeRowSource {
    type Error = FakeError;

    async fn query(&self, sql: &str) -> Result<Vec<Map<String, Value>>, Self::Error> {
        self.responses
            .read()
            .get(sql)
            .cloned()
            .ok_or_else(|| FakeError(format!("no fixture for query: {sql}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Score {
    student_id: i64,
    score: i64,
}

fn row(student_id: i64, score: i64) -> Map<String, Value> {
    json!({"student_id": student_id, "score": score}).as_object().unwrap().clone()
}

#[tokio::test]
async fn init_loads_every_row_into_every_binding() {
    let source = Arc::new(FakeRowSource::new());
    source.respond("SELECT * FROM scores", vec![row(1001, 98), row(1002, 55)]);

    let mut table = Table::new("scores", source, "SELECT * FROM scores", None);
    let target = Arc::new(RwLock::new(HashMap::<i64, i64>::new()));
    table.add_binding(
        Binding::map(
            "scores",
            Some(target.clone()),
            "StudentId",
            |r: &Score| r.student_id,
            Some("Score"),
            |r: &Score| r.score,
            Hooks::none(),
        )
        .unwrap(),
    );

    table.dispatch(TableEvent::Init).await.unwrap();

    let expected: HashMap<i64, i64> = [(1001, 98), (1002, 55)].into_iter().collect();
    assert_eq!(*target.read(), expected);
}

#[tokio::test]
async fn create_then_update_then_delete() {
    let source = Arc::new(FakeRowSource::new());
    let mut table = Table::new("scores", source, "SELECT * FROM scores", None);
    let target = Arc::new(RwLock::new(HashMap::<i64, i64>::new()));
    table.add_binding(
        Binding::map(
            "scores",
            Some(target.clone()),
            "StudentId",
            |r: &Score| r.student_id,
            Some("Score"),
            |r: &Score| r.score,
            Hooks::none(),
        )
        .unwrap(),
    );

    table.dispatch(TableEvent::Create(row(1001, 98))).await.unwrap();
    assert_eq!(target.read().get(&1001), Some(&98));

    table
        .dispatch(TableEvent::Update(row(1001, 98), row(1001, 100)))
        .await
        .unwrap();
    assert_eq!(target.read().get(&1001), Some(&100));

    table.dispatch(TableEvent::Delete(row(1001, 100))).await.unwrap();
    assert!(target.read().is_empty());
}

#[tokio::test]
async fn malformed_create_event_is_dropped_not_propagated() {
    let source = Arc::new(FakeRowSource::new());
    let mut table = Table::new("scores", source, "SELECT * FROM scores", None);
    let target = Arc::new(RwLock::new(HashMap::<i64, i64>::new()));
    table.add_binding(
        Binding::map(
            "scores",
            Some(target.clone()),
            "StudentId",
            |r: &Score| r.student_id,
            Some("Score"),
            |r: &Score| r.score,
            Hooks::none(),
        )
        .unwrap(),
    );

    let mut missing_score = Map::new();
    missing_score.insert("student_id".to_string(), json!(1001));
    let result = table.dispatch(TableEvent::Create(missing_score)).await;

    assert!(result.is_ok());
    assert!(target.read().is_empty());
}

#[tokio::test]
async fn conn_loss_reloads_from_load_sql() {
    let source = Arc::new(FakeRowSource::new());
    source.respond("SELECT * FROM scores", vec![row(1001, 98)]);

    let mut table = Table::new("scores", source, "SELECT * FROM scores", None);
    let target = Arc::new(RwLock::new(HashMap::<i64, i64>::new()));
    table.add_binding(
        Binding::map(
            "scores",
            Some(target.clone()),
            "StudentId",
            |r: &Score| r.student_id,
            Some("Score"),
            |r: &Score| r.score,
            Hooks::none(),
        )
        .unwrap(),
    );

    table.dispatch(TableEvent::ConnLoss).await.unwrap();
    assert_eq!(target.read().get(&1001), Some(&98));
}

#[tokio::test]
async fn create_with_big_columns_merges_secondary_query() {
    let source = Arc::new(FakeRowSource::new());
    let mut extra = Map::new();
    extra.insert("score".to_string(), json!(100));
    source.respond("SELECT score FROM scores WHERE student_id = 1001", vec![extra]);

    let big_columns = BigColumns::new(|new: &Map<String, Value>| {
        let id = new["student_id"].as_i64().unwrap();
        format!("SELECT score FROM scores WHERE student_id = {id}")
    });
    let mut table = Table::new("scores", source, "SELECT * FROM scores", Some(big_columns));
    let target = Arc::new(RwLock::new(HashMap::<i64, i64>::new()));
    table.add_binding(
        Binding::map(
            "scores",
            Some(target.clone()),
            "StudentId",
            |r: &Score| r.student_id,
            Some("Score"),
            |r: &Score| r.score,
            Hooks::none(),
        )
        .unwrap(),
    );

    let mut new = Map::new();
    new.insert("student_id".to_string(), json!(1001));
    table.dispatch(TableEvent::Create(new)).await.unwrap();

    assert_eq!(target.read().get(&1001), Some(&100));
}
