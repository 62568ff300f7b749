use std::collections::HashSet;

/// One guessed upstream location, already resolved against the entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// path relative to the vendor base URL, always starting with '/'
    pub path: String,
}

/// Build the ordered, deduplicated candidate list.
///
/// Static templates always precede discovered ones. Paths are compared
/// exactly after normalization (vendor paths are case-sensitive) and the
/// first occurrence wins.
pub fn build_candidates(
    static_templates: &[String],
    discovered: &[String],
    id: Option<&str>,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    static_templates
        .iter()
        .chain(discovered)
        .filter_map(|template| resolve_path(template, id))
        .filter(|path| seen.insert(path.clone()))
        .map(|path| Candidate { path })
        .collect()
}

/// `/` + template without surrounding slashes, plus the encoded id segment.
/// Empty templates and dot-segment ids resolve to nothing.
pub fn resolve_path(template: &str, id: Option<&str>) -> Option<String> {
    let trimmed = template.trim().trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let mut path = format!("/{}", trimmed);
    if let Some(id) = id {
        if !is_valid_id(id) {
            return None;
        }
        path.push('/');
        path.push_str(&urlencoding::encode(id));
    }
    Some(path)
}

/// An id must stay one segment below the resource: `.` and `..` would be
/// collapsed by URL parsing and escape the allow-listed path.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".."
}
