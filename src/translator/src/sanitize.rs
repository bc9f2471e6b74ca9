/// Make a backend metric type usable as a Prometheus metric name.
///
/// Every character outside `[A-Za-z0-9:_]` becomes `_`, and a leading digit
/// gets a `_` prefix. Applying it twice yields the same result.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len() + 1);

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.push('_');
    }

    sanitized.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == ':' || c == '_' {
            c
        } else {
            '_'
        }
    }));

    sanitized
}
