use std::collections::BTreeMap;

/// Renders an equality-based label selector, e.g. `a=b,c=d`.
pub fn to_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns `true` if every pair of `selector` is present in `labels`.
///
/// An empty selector matches everything.
pub fn matches(
    labels: Option<&BTreeMap<String, String>>,
    selector: &BTreeMap<String, String>,
) -> bool {
    selector.iter().all(|(key, value)| {
        labels
            .and_then(|labels| labels.get(key))
            .map(|found| found == value)
            .unwrap_or_default()
    })
}
