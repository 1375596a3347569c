use serde_json::Value;

/// Look up a dot-separated path such as `data.items[0].id`.
///
/// `name` reads an object field; `name[i]` reads field `name` and then
/// index `i` of that array. Any missing step yields `None`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| step(current, segment))
}

fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match parse_segment(segment)? {
        (name, None) => current.as_object()?.get(name),
        (name, Some(index)) => current.as_object()?.get(name)?.as_array()?.get(index),
    }
}

fn parse_segment(segment: &str) -> Option<(&str, Option<usize>)> {
    match segment.strip_suffix(']') {
        Some(rest) => {
            let (name, index) = rest.split_once('[')?;
            Some((name, Some(index.trim().parse().ok()?)))
        }
        None => Some((segment, None)),
    }
}
