pub const MAX_SKILL_NAME_LEN: usize = 100;

/// Build an ILIKE pattern matching `search` anywhere in the name.
pub fn contains_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Trimmed skill name, or `None` when blank or too long.
pub fn clean_skill_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_SKILL_NAME_LEN {
        return None;
    }
    Some(name)
}
