/// Display form of a segment label: invisible characters stripped, whitespace collapsed.
pub(crate) fn normalize_segment(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key used for merging and exclusion checks.
pub(crate) fn segment_key(value: &str) -> String {
    normalize_segment(value).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_removes_invisible_characters_and_extra_spaces() {
        assert_eq!(normalize_segment("\u{feff}Semi -  Detached "), "Semi - Detached");
        assert_eq!(segment_key("  CONDO\u{200b} "), "condo");
    }
}
