use std::collections::BTreeSet;

use api_contract_diff::{
    diff_content, diff_required, infer_schema, Category, ChangeKind, Mode, RecordSchema,
    ReportBuilder, SchemaBuilder, Status,
};
use serde_json::{json, Map, Value};

fn samples() -> Vec<Value> {
    vec![
        json!(null),
        json!(true),
        json!(3.25),
        json!("Affenpinscher"),
        json!([]),
        json!({}),
        json!([1, 1, 2, "two", null]),
        json!({"a": {"b": [{"c": 1}, {"c": 2, "d": [3, 4]}]}}),
        json!([
            {"id": 1, "name": "Affenpinscher", "weight": {"metric": "3 - 6"}},
            {"id": 2, "name": "Afghan Hound", "height": {"metric": "64 - 69"}}
        ]),
    ]
}

/// Reverse every array and rebuild every object, recursively.
fn reorder(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().rev().map(reorder).collect()),
        Value::Object(members) => {
            let mut reordered = Map::new();
            for (key, member) in members.iter().rev() {
                reordered.insert(key.clone(), reorder(member));
            }
            Value::Object(reordered)
        }
        other => other.clone(),
    }
}

fn content_report(lhs: &Value, rhs: &Value) -> api_contract_diff::Report {
    ReportBuilder::new(Mode::Content, "old.json", "new.json")
        .changes(diff_content(lhs, rhs))
        .build()
}

#[test]
fn reflexivity() {
    for doc in samples() {
        let report = content_report(&doc, &doc);
        assert_eq!(report.total_differences, 0, "{doc}");
        assert_eq!(report.status, Status::Pass);
    }
}

#[test]
fn order_insensitivity() {
    for doc in samples() {
        assert_eq!(diff_content(&doc, &reorder(&doc)), vec![], "{doc}");
    }
}

#[test]
fn key_removal() {
    let report = content_report(&json!({"a": 1, "b": 2}), &json!({"a": 1}));
    assert_eq!(report.total_differences, 1);
    assert!(matches!(
        &report.category(Category::RemovedValues)[0].change,
        ChangeKind::KeyRemoved { removed, .. } if removed == "b"
    ));
}

#[test]
fn key_addition() {
    let report = content_report(&json!({"a": 1}), &json!({"a": 1, "c": 3}));
    assert_eq!(report.total_differences, 1);
    assert!(matches!(
        &report.category(Category::AddedKeys)[0].change,
        ChangeKind::KeyAdded { added, value } if added == "c" && value == &json!(3)
    ));
}

#[test]
fn combined_example() {
    let report = content_report(&json!({"a": 1, "b": 2}), &json!({"a": 1, "c": 3}));
    assert_eq!(report.category(Category::RemovedValues).len(), 1);
    assert_eq!(report.category(Category::AddedKeys).len(), 1);
    assert_eq!(report.total_differences, 2);
    assert_eq!(report.status, Status::Fail);
    insta::assert_snapshot!(report.message, @"API content compared successfully");
}

#[test]
fn value_changes_carry_full_values() {
    let old = json!({"weight": {"imperial": "6 - 13", "metric": "3 - 6"}});
    let new = json!({"weight": "3 - 6 kg"});
    let changes = diff_content(&old, &new);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, ".weight");
    assert_eq!(
        changes[0].change,
        ChangeKind::ValueChanged {
            old_value: old["weight"].clone(),
            new_value: new["weight"].clone(),
        }
    );
}

#[test]
fn inference_is_deterministic() {
    for doc in samples() {
        let once = serde_json::to_value(infer_schema(&doc)).unwrap();
        let twice = serde_json::to_value(infer_schema(&doc)).unwrap();
        let reordered = serde_json::to_value(infer_schema(&reorder(&doc))).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, reordered);
    }
}

#[test]
fn inference_by_builder_matches_array_document() {
    let mut builder = SchemaBuilder::new();
    builder.add_sample(&json!([{"a": 1}]));
    builder.add_sample(&json!([{"a": 2, "b": 3}]));
    assert_eq!(
        serde_json::to_value(builder.to_schema()).unwrap(),
        serde_json::to_value(infer_schema(&json!([{"a": 1}, {"a": 2, "b": 3}]))).unwrap()
    );
}

#[test]
fn required_is_intersection() {
    let schema = infer_schema(&json!([{"a": 1}, {"a": 1, "b": 2}]));
    let record = RecordSchema::locate(&schema).unwrap();
    assert_eq!(record.path, ".?");
    assert_eq!(record.required, BTreeSet::from(["a".to_owned()]));
}

#[test]
fn required_symmetry() {
    let old = infer_schema(&json!([{"a": 1, "b": 2}, {"a": 1, "b": 3}]));
    let new = infer_schema(&json!([{"a": 1, "c": 2}, {"c": 1}]));

    let required = |changes: Vec<api_contract_diff::Change>, removed: bool| {
        changes
            .into_iter()
            .filter_map(|change| match change.change {
                ChangeKind::RequiredRemoved { property } if removed => Some(property),
                ChangeKind::RequiredAdded { property } if !removed => Some(property),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
    };

    let forward_removed = required(diff_required(&old, &new), true);
    let backward_added = required(diff_required(&new, &old), false);
    assert_eq!(forward_removed, BTreeSet::from(["a".to_owned(), "b".to_owned()]));
    assert_eq!(forward_removed, backward_added);
}

#[test]
fn pass_scenario() {
    let doc = json!([{"id": 1, "name": "Affenpinscher"}]);
    let report = content_report(&doc, &doc.clone());
    assert_eq!(report.status, Status::Pass);
    assert_eq!(report.total_differences, 0);
    assert!(report.differences.values().all(Vec::is_empty));
    assert_eq!(report.differences.len(), Category::CONTENT.len());
}
