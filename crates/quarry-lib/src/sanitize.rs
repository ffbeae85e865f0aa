/// Make one path segment out of an identifier component.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, so distinct inputs may
/// collide but the result can never climb out of its parent directory.
pub fn sanitize_segment(component: &str) -> String {
    component
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' })
        .collect()
}
