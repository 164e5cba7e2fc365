//! An end-to-end exercise of the projection engine, table coordinator, and
//! introspection directory working together against a fake row source
//! (spec.md §8 S6-style scenario), without a real PostgreSQL connection —
//! that leg is `pgcache_listener::Listener`, which this test does not
//! stand up.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use pgcache::{Binding, Entry, Hooks, KeyKind, KeyValue, Registry, Table, TableEvent};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, thiserror::Error)]
#[error("fake row source error: {0}")]
struct FakeError(String);

struct FakeRowSource {
    rows: Vec<Map<String, Value>>,
}

#[async_trait]
impl pgcache::RowSource for FakeRowSource {
    type Error = FakeError;

    async fn query(&self, _sql: &str) -> Result<Vec<Map<String, Value>>, Self::Error> {
        Ok(self.rows.clone())
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
async fn full_load_then_changes_are_visible_through_registry() {
    let source = Arc::new(FakeRowSource {
        rows: vec![row(1001, 98), row(1002, 55)],
    });
    let target = Arc::new(RwLock::new(HashMap::<i64, i64>::new()));

    let mut table = Table::new("scores", source, "SELECT * FROM scores", None);
    table.add_binding(
        Binding::map(
            "scores",
            Some(target.clone()),
            "StudentId",
            |r: &Score| r.student_id,
            Some("Score"),
            |r: &Score| r.score,
            Hooks::none().with_precond(|r: &Score| r.score >= 0 && r.score <= 100),
        )
        .unwrap(),
    );
    let table = Arc::new(table);

    table.dispatch(TableEvent::Init).await.unwrap();
    assert_eq!(target.read().len(), 2);

    let registry = Registry::new();
    let lookup_target = target.clone();
    registry.register(
        Entry::new("app", "scores", "map[StudentId:int64]Score:int64", vec![KeyKind::Integer], {
            let target = target.clone();
            move || target.read().len()
        })
        .with_lookup(move |keys| match keys {
            [KeyValue::Integer(id)] => lookup_target.read().get(id).copied().map(Value::from),
            _ => None,
        })
        .with_reload(table.clone() as Arc<dyn pgcache::Reloadable>),
    );

    assert_eq!(registry.size("app", "scores", "map[StudentId:int64]Score:int64"), Some(2));
    assert_eq!(
        registry
            .lookup("app", "scores", "map[StudentId:int64]Score:int64", "1001")
            .unwrap()
            .unwrap(),
        Some(Value::from(98))
    );

    table.dispatch(TableEvent::Create(row(1003, 101))).await.unwrap();
    assert_eq!(target.read().len(), 2, "score 101 violates the precond and is dropped");

    table.dispatch(TableEvent::Delete(row(1002, 55))).await.unwrap();
    assert_eq!(registry.size("app", "scores", "map[StudentId:int64]Score:int64"), Some(1));

    registry
        .reload("app", "scores", "map[StudentId:int64]Score:int64")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(registry.size("app", "scores", "map[StudentId:int64]Score:int64"), Some(2));
}
