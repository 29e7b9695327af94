use serde_json::Value as JsonValue;

/// Walk a dot path such as `data.items[0].id` or `data.items.0.id` into a JSON value.
///
/// An empty path returns the value itself.
pub fn lookup_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut cur = value;
    for raw in path.split('.').filter(|s| !s.is_empty()) {
        let (key, indexes) = split_indexes(raw)?;
        if !key.is_empty() {
            cur = match cur {
                JsonValue::Object(map) => map.get(key)?,
                JsonValue::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        for i in indexes {
            cur = cur.as_array()?.get(i)?;
        }
    }
    Some(cur)
}

fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };
    let key = &segment[..open];
    let mut indexes = Vec::new();
    let mut rest = &segment[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].trim().parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((key, indexes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walks_objects_and_arrays() {
        let v = json!({"data": {"items": [{"id": 7}, {"id": 9}]}});
        assert_eq!(lookup_path(&v, "data.items[1].id"), Some(&json!(9)));
        assert_eq!(lookup_path(&v, "data.items.0.id"), Some(&json!(7)));
        assert_eq!(lookup_path(&v, ""), Some(&v));
        assert_eq!(lookup_path(&v, "data.missing"), None);
        assert_eq!(lookup_path(&v, "data.items[5]"), None);
    }
}
