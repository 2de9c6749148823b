/// Keeps a supplied value only if it has non-whitespace content.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(String::new())), None);
        assert_eq!(non_blank(Some(" \t".to_string())), None);
        assert_eq!(non_blank(Some("phone".to_string())), Some("phone".to_string()));
    }
}
