use serde_json::Value;

/// Deep-merges `patch` into `target`. Objects merge key-by-key so subtrees
/// absent from the patch survive; any other pairing, arrays included,
/// replaces the target value with the patch value.
pub fn merge_tree(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_val) in patch_map {
                merge_tree(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    patch_val,
                );
            }
        }
        (target_slot, patch_val) => *target_slot = patch_val.clone(),
    }
}

/// Dot-joined paths of leaves added or changed between two documents, with
/// their new values. Removed keys are not reported; the merge never drops
/// keys, so removals only happen inside wholesale replacements whose new
/// leaves are reported anyway.
pub fn changed_paths(previous: &Value, current: &Value) -> Vec<(String, Value)> {
    let mut changes = Vec::new();
    walk(previous, current, "", &mut changes);
    changes
}

fn walk(previous: &Value, current: &Value, prefix: &str, changes: &mut Vec<(String, Value)>) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match prev_map.get(key) {
                    Some(prev_val) => walk(prev_val, curr_val, &path, changes),
                    None => {
                        if curr_val.is_object() {
                            walk(
                                &Value::Object(serde_json::Map::new()),
                                curr_val,
                                &path,
                                changes,
                            );
                        } else {
                            changes.push((path, curr_val.clone()));
                        }
                    }
                }
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((prefix.to_string(), curr.clone()));
        }
        _ => {}
    }
}
