use std::collections::{BTreeMap, VecDeque};

use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use serde_json::{Map, Value};

use crate::{Change, ChangeKind};

/// Cost for an assignment that must never be chosen.
const UNPAIRABLE: i64 = 1 << 32;

/// Above this many matrix cells the assignment falls back to pairing leftovers by position.
const MAX_ASSIGNMENT_CELLS: usize = 250_000;

/// Two elements only pair when their differences weigh at most this fraction of the leaves of
/// both elements combined.
const PAIR_CUTOFF: (i64, i64) = (3, 10);

pub struct ContentWalker {
    pub changes: Vec<Change>,
}

impl ContentWalker {
    pub fn new() -> Self {
        Self { changes: vec![] }
    }

    pub fn diff(&mut self, json_path: &str, lhs: &Value, rhs: &Value) {
        match (lhs, rhs) {
            (Value::Object(lhs), Value::Object(rhs)) => self.diff_objects(json_path, lhs, rhs),
            (Value::Array(lhs), Value::Array(rhs)) => self.diff_arrays(json_path, lhs, rhs),
            // type mismatches are value changes too
            (lhs, rhs) if !values_equal(lhs, rhs) => self.changes.push(Change {
                path: json_path.to_owned(),
                change: ChangeKind::ValueChanged {
                    old_value: lhs.clone(),
                    new_value: rhs.clone(),
                },
            }),
            _ => (),
        }
    }

    fn diff_objects(
        &mut self,
        json_path: &str,
        lhs: &Map<String, Value>,
        rhs: &Map<String, Value>,
    ) {
        for (key, value) in lhs.iter().filter(|(key, _)| !rhs.contains_key(*key)) {
            self.changes.push(Change {
                path: json_path.to_owned(),
                change: ChangeKind::KeyRemoved {
                    removed: key.clone(),
                    value: value.clone(),
                },
            });
        }

        for (key, value) in rhs.iter().filter(|(key, _)| !lhs.contains_key(*key)) {
            self.changes.push(Change {
                path: json_path.to_owned(),
                change: ChangeKind::KeyAdded {
                    added: key.clone(),
                    value: value.clone(),
                },
            });
        }

        for (key, lhs_child) in lhs {
            if let Some(rhs_child) = rhs.get(key) {
                let new_path = format!("{json_path}.{key}");
                self.diff(&new_path, lhs_child, rhs_child);
            }
        }
    }

    /// Arrays are compared as multisets: equal elements cancel out regardless of position, and
    /// the leftovers are paired up by a minimum-cost assignment before descending into them.
    fn diff_arrays(&mut self, json_path: &str, lhs: &[Value], rhs: &[Value]) {
        let mut rhs_pool: BTreeMap<String, VecDeque<usize>> = BTreeMap::new();
        for (j, value) in rhs.iter().enumerate() {
            rhs_pool.entry(fingerprint(value)).or_default().push_back(j);
        }

        let mut lhs_rest = vec![];
        for (i, value) in lhs.iter().enumerate() {
            let matched = rhs_pool
                .get_mut(&fingerprint(value))
                .and_then(VecDeque::pop_front);
            if matched.is_none() {
                lhs_rest.push(i);
            }
        }
        let mut rhs_rest: Vec<usize> = rhs_pool.into_values().flatten().collect();
        rhs_rest.sort_unstable();

        let lhs_items: Vec<&Value> = lhs_rest.iter().map(|&i| &lhs[i]).collect();
        let rhs_items: Vec<&Value> = rhs_rest.iter().map(|&j| &rhs[j]).collect();

        for pairing in pair_elements(&lhs_items, &rhs_items) {
            match pairing {
                (Some(l), Some(r)) => {
                    let new_path = format!("{json_path}[{}]", lhs_rest[l]);
                    self.diff(&new_path, lhs_items[l], rhs_items[r]);
                }
                (Some(l), None) => self.changes.push(Change {
                    path: json_path.to_owned(),
                    change: ChangeKind::ItemRemoved {
                        value: lhs_items[l].clone(),
                    },
                }),
                (None, Some(r)) => self.changes.push(Change {
                    path: json_path.to_owned(),
                    change: ChangeKind::ItemAdded {
                        value: rhs_items[r].clone(),
                    },
                }),
                (None, None) => (),
            }
        }
    }
}

impl Default for ContentWalker {
    fn default() -> Self {
        Self::new()
    }
}

/// Decide which leftover elements describe the same record.
///
/// Scalars never pair, so they are settled without building anything. Objects are matched
/// against objects and arrays against arrays, each by its own assignment.
fn pair_elements(lhs: &[&Value], rhs: &[&Value]) -> Vec<(Option<usize>, Option<usize>)> {
    let mut partner: Vec<Option<usize>> = vec![None; lhs.len()];
    let mut rhs_paired = vec![false; rhs.len()];

    let kinds: [fn(&Value) -> bool; 2] = [Value::is_object, Value::is_array];
    for is_kind in kinds {
        let lhs_idx: Vec<usize> = (0..lhs.len()).filter(|&i| is_kind(lhs[i])).collect();
        let rhs_idx: Vec<usize> = (0..rhs.len()).filter(|&j| is_kind(rhs[j])).collect();
        let lhs_kind: Vec<&Value> = lhs_idx.iter().map(|&i| lhs[i]).collect();
        let rhs_kind: Vec<&Value> = rhs_idx.iter().map(|&j| rhs[j]).collect();

        for (a, b) in assign(&lhs_kind, &rhs_kind) {
            partner[lhs_idx[a]] = Some(rhs_idx[b]);
            rhs_paired[rhs_idx[b]] = true;
        }
    }

    let mut pairs: Vec<_> = partner
        .into_iter()
        .enumerate()
        .map(|(i, j)| (Some(i), j))
        .collect();
    pairs.extend(
        rhs_paired
            .iter()
            .enumerate()
            .filter(|(_, paired)| !**paired)
            .map(|(j, _)| (None, Some(j))),
    );
    pairs
}

/// Minimum-cost pairing of `lhs` with `rhs`, as `(lhs index, rhs index)` pairs.
///
/// The matrix has one row per element of the shorter side, one column per element of the
/// longer side plus one "unpaired" column per row. A pair is weighted by what it saves over
/// reporting both elements as removed and added, so an unpaired column costs nothing.
fn assign(lhs: &[&Value], rhs: &[&Value]) -> Vec<(usize, usize)> {
    if lhs.is_empty() || rhs.is_empty() {
        return vec![];
    }
    if lhs.len() > rhs.len() {
        return assign(rhs, lhs).into_iter().map(|(j, i)| (i, j)).collect();
    }

    let (n, m) = (lhs.len(), rhs.len());
    let columns = m + n;
    if n * columns > MAX_ASSIGNMENT_CELLS {
        tracing::debug!(n, m, "array too large for assignment, pairing by position");
        return (0..n)
            .filter(|&k| pair_cost(lhs[k], rhs[k]).is_some())
            .map(|k| (k, k))
            .collect();
    }

    let rhs_leaves: Vec<i64> = rhs.iter().map(|v| leaf_count(v)).collect();
    let mut weights = Vec::with_capacity(n * columns);
    for l in lhs {
        let lhs_leaves = leaf_count(l);
        for j in 0..columns {
            let weight = match rhs.get(j) {
                Some(r) => pair_cost(l, r).map_or(UNPAIRABLE, |c| c - lhs_leaves - rhs_leaves[j]),
                None => 0,
            };
            weights.push(weight);
        }
    }

    let Ok(matrix) = Matrix::from_vec(n, columns, weights) else {
        return vec![];
    };
    let (_, assignment) = kuhn_munkres_min(&matrix);
    tracing::debug!(n, m, "paired array leftovers");

    assignment
        .into_iter()
        .enumerate()
        .filter(|&(_, j)| j < m)
        .collect()
}

/// Cost of treating `lhs` and `rhs` as the same element, or `None` when they cannot be the
/// same element. Only containers of the same kind are ever paired, and only while they have
/// more in common than not.
fn pair_cost(lhs: &Value, rhs: &Value) -> Option<i64> {
    if !pairable(lhs, rhs) {
        return None;
    }
    let mut walker = ContentWalker::new();
    walker.diff("", lhs, rhs);
    let cost: i64 = walker.changes.iter().map(change_cost).sum();

    let (num, den) = PAIR_CUTOFF;
    (cost * den <= (leaf_count(lhs) + leaf_count(rhs)) * num).then_some(cost)
}

fn pairable(lhs: &Value, rhs: &Value) -> bool {
    matches!(
        (lhs, rhs),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

fn change_cost(change: &Change) -> i64 {
    match &change.change {
        ChangeKind::KeyRemoved { value, .. }
        | ChangeKind::KeyAdded { value, .. }
        | ChangeKind::ItemRemoved { value }
        | ChangeKind::ItemAdded { value } => leaf_count(value),
        _ => 1,
    }
}

fn leaf_count(value: &Value) -> i64 {
    let count = match value {
        Value::Array(items) => items.iter().map(leaf_count).sum(),
        Value::Object(members) => members.values().map(leaf_count).sum(),
        _ => 1,
    };
    count.max(1)
}

/// Structural equality that ignores member order, array element order and the integer/float
/// distinction of numbers.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(_), Value::Number(_)) => fingerprint(lhs) == fingerprint(rhs),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            fingerprint(lhs) == fingerprint(rhs)
        }
        _ => lhs == rhs,
    }
}

/// Canonical text form of a value: two values have the same fingerprint iff they are equal
/// under [`values_equal`].
fn fingerprint(value: &Value) -> String {
    let mut out = String::new();
    write_fingerprint(value, &mut out);
    out
}

fn write_fingerprint(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if let Some(u) = n.as_u64() {
                out.push_str(&u.to_string());
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.fract() == 0.0 && f.abs() < 9.0e15 {
                    out.push_str(&(f as i64).to_string());
                } else {
                    out.push_str(&f.to_string());
                }
            }
        }
        Value::String(s) => {
            out.push('"');
            for c in s.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
        Value::Array(items) => {
            let mut parts: Vec<String> = items.iter().map(fingerprint).collect();
            parts.sort_unstable();
            out.push('[');
            out.push_str(&parts.join(","));
            out.push(']');
        }
        Value::Object(members) => {
            let mut parts: Vec<(&String, String)> =
                members.iter().map(|(k, v)| (k, fingerprint(v))).collect();
            parts.sort_unstable();
            out.push('{');
            for (idx, (key, part)) in parts.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_fingerprint(&Value::String(key.clone()), out);
                out.push(':');
                out.push_str(&part);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn diff(lhs: Value, rhs: Value) -> Vec<Change> {
        let mut walker = ContentWalker::new();
        walker.diff("", &lhs, &rhs);
        walker.changes
    }

    #[test]
    fn numbers_compare_numerically() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!(1.5)));
        assert!(!values_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn nested_arrays_ignore_order() {
        assert!(values_equal(
            &json!({"a": [[1, 2], [3]]}),
            &json!({"a": [[3], [2, 1]]})
        ));
    }

    #[test]
    fn strings_with_separators_do_not_collide() {
        assert!(!values_equal(&json!(["a,b"]), &json!(["a", "b"])));
        assert!(!values_equal(&json!(["a\",\"b"]), &json!(["a", "b"])));
    }

    #[test]
    fn type_mismatch_is_value_change() {
        let changes = diff(json!({"a": 1}), json!({"a": "1"}));
        assert_eq!(
            changes,
            vec![Change {
                path: ".a".to_owned(),
                change: ChangeKind::ValueChanged {
                    old_value: json!(1),
                    new_value: json!("1"),
                },
            }]
        );
    }

    #[test]
    fn null_versus_present() {
        let changes = diff(json!({"a": null}), json!({"a": {"b": 1}}));
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].change, ChangeKind::ValueChanged { .. }));
    }

    #[test]
    fn reordered_records_pair_up() {
        let changes = diff(
            json!([{"id": 1, "name": "akita"}, {"id": 2, "name": "boxer"}]),
            json!([{"id": 2, "name": "boxer"}, {"id": 1, "name": "Akita"}]),
        );
        assert_eq!(
            changes,
            vec![Change {
                path: "[0].name".to_owned(),
                change: ChangeKind::ValueChanged {
                    old_value: json!("akita"),
                    new_value: json!("Akita"),
                },
            }]
        );
    }

    #[test]
    fn records_pair_with_closest_match() {
        let changes = diff(
            json!([{"id": 1, "name": "a", "size": "s"}, {"id": 2, "name": "b", "size": "m"}]),
            json!([{"id": 2, "name": "b", "size": "l"}, {"id": 1, "name": "a", "size": "xs"}]),
        );
        let paths: Vec<_> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["[0].size", "[1].size"]);
    }

    #[test]
    fn unmatched_scalars_are_item_changes() {
        let changes = diff(json!([1, 2, 3]), json!([3, 1, 4]));
        assert_eq!(
            changes,
            vec![
                Change {
                    path: "".to_owned(),
                    change: ChangeKind::ItemRemoved { value: json!(2) },
                },
                Change {
                    path: "".to_owned(),
                    change: ChangeKind::ItemAdded { value: json!(4) },
                },
            ]
        );
    }

    #[test]
    fn duplicates_count_as_multiset() {
        let changes = diff(json!(["a", "a"]), json!(["a"]));
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].change, ChangeKind::ItemRemoved { .. }));
    }

    #[test]
    fn unrelated_record_is_added_not_paired() {
        let changes = diff(json!([]), json!([{"id": 3}]));
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].change, ChangeKind::ItemAdded { .. }));
    }

    #[test]
    fn wholesale_replacement_stays_unpaired() {
        let changes = diff(json!([{"a": 1}]), json!([{"x": 1, "y": 2, "z": 3}]));
        let kinds: Vec<_> = changes.iter().map(|c| c.change.category()).collect();
        assert_eq!(
            kinds,
            vec![crate::Category::RemovedItems, crate::Category::AddedItems]
        );
    }

    #[test]
    fn records_without_common_values_stay_unpaired() {
        let changes = diff(
            json!([{"id": 1, "name": "Affenpinscher"}]),
            json!([{"id": 99, "name": "Basenji"}]),
        );
        assert_eq!(
            changes,
            vec![
                Change {
                    path: "".to_owned(),
                    change: ChangeKind::ItemRemoved {
                        value: json!({"id": 1, "name": "Affenpinscher"}),
                    },
                },
                Change {
                    path: "".to_owned(),
                    change: ChangeKind::ItemAdded {
                        value: json!({"id": 99, "name": "Basenji"}),
                    },
                },
            ]
        );
    }

    #[test]
    fn scalar_array_growth_stays_cheap() {
        let grown = Value::Array((1..=20_000).map(|i| json!(i)).collect());
        let changes = diff(json!([0]), grown);
        assert_eq!(changes.len(), 20_001);
        assert_eq!(changes[0].change, ChangeKind::ItemRemoved { value: json!(0) });
        assert!(changes[1..]
            .iter()
            .all(|c| matches!(c.change, ChangeKind::ItemAdded { .. })));
    }

    #[test]
    fn one_record_finds_its_match_among_many() {
        let records = (0..2_000)
            .map(|i| json!({"id": i, "name": format!("breed {i}")}))
            .collect();
        let changes = diff(
            json!([{"id": 5, "name": "breed five"}]),
            Value::Array(records),
        );
        assert_eq!(changes.len(), 2_000);
        assert_eq!(
            changes[0],
            Change {
                path: "[0].name".to_owned(),
                change: ChangeKind::ValueChanged {
                    old_value: json!("breed five"),
                    new_value: json!("breed 5"),
                },
            }
        );
        assert_eq!(
            changes
                .iter()
                .filter(|c| matches!(c.change, ChangeKind::ItemAdded { .. }))
                .count(),
            1_999
        );
    }

    #[test]
    fn objects_never_pair_with_arrays() {
        let changes = diff(json!([{"a": [1]}]), json!([[{"a": 1}]]));
        let kinds: Vec<_> = changes.iter().map(|c| c.change.category()).collect();
        assert_eq!(
            kinds,
            vec![crate::Category::RemovedItems, crate::Category::AddedItems]
        );
    }
}
