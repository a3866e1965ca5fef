pub fn preview_line(value: &str, limit: usize) -> String {
    let cut = value.char_indices().nth(limit).map(|(index, _)| index);
    let head = &value[..cut.unwrap_or(value.len())];
    let mut out = head.replace('\n', " ");
    if cut.is_some() {
        out.push_str("...");
    }
    out
}

pub fn or_default(value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| default.to_string())
}
