use serde_json::{Map, Value};

/// Deep-merges `overlay` into `base`.
///
/// Objects merge key by key, arrays are unioned (primitive elements are
/// deduplicated, objects and arrays are appended as-is) and any other
/// value from the overlay replaces the base.
pub(crate) fn merge_settings(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => Value::Object(merge_objects(base, overlay)),
        (Value::Array(base), Value::Array(overlay)) => Value::Array(merge_arrays(base, overlay)),
        (_, overlay) => overlay.clone(),
    }
}

fn merge_objects(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let next = match merged.get(key) {
            Some(existing) => merge_settings(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}

fn merge_arrays(base: &[Value], overlay: &[Value]) -> Vec<Value> {
    let mut merged = base.to_vec();
    for item in overlay {
        if is_primitive(item) && merged.contains(item) {
            continue;
        }
        merged.push(item.clone());
    }
    merged
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}
