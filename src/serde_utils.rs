/// `skip_serializing_if` predicate for optional strings the server treats
/// as absent when empty.
pub fn is_blank(value: &Option<&str>) -> bool {
    value.is_none_or(str::is_empty)
}
