//! Hierarchical key paths and the group stack.
//!
//! Keys are '/'-delimited paths. Groups pushed with `begin_group` prefix every
//! key passed to the database afterwards.

/// Path separator for keys and groups.
pub const SEPARATOR: char = '/';

/// A LIFO stack of group segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStack {
    segments: Vec<String>,
}

impl GroupStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a group segment. Surrounding separators are trimmed.
    pub fn push(&mut self, prefix: &str) {
        self.segments
            .push(prefix.trim_matches(SEPARATOR).to_string());
    }

    /// Pop the innermost group segment.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// Number of segments pushed, including empty ones.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The effective group: every non-empty segment joined by '/'.
    pub fn group(&self) -> String {
        let mut group = String::new();
        for segment in self.segments.iter().filter(|s| !s.is_empty()) {
            if !group.is_empty() {
                group.push(SEPARATOR);
            }
            group.push_str(segment);
        }
        group
    }

    /// Resolve a local key against the current group.
    pub fn effective_key(&self, key: &str) -> String {
        effective_key(&self.group(), key)
    }
}

/// Join a group and a local key.
pub fn effective_key(group: &str, key: &str) -> String {
    match (group.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => group.to_string(),
        (false, false) => format!("{}{}{}", group, SEPARATOR, key),
    }
}

/// True if `candidate` is `key` itself or lies anywhere below it.
pub fn is_path_or_child(candidate: &str, key: &str) -> bool {
    match candidate.strip_prefix(key) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// True if `candidate` lies strictly below `key`.
pub fn is_strict_child(candidate: &str, key: &str) -> bool {
    candidate.len() > key.len() + 1 && is_path_or_child(candidate, key)
}

/// What sits directly under a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildSegment<'a> {
    /// A leaf key directly inside the group.
    Key(&'a str),
    /// The first segment of a deeper path.
    Group(&'a str),
}

/// Classify `candidate` relative to `group`.
///
/// Returns `None` when `candidate` is not inside `group`.
pub fn child_segment<'a>(candidate: &'a str, group: &str) -> Option<ChildSegment<'a>> {
    let rest = if group.is_empty() {
        candidate
    } else {
        candidate.strip_prefix(group)?.strip_prefix(SEPARATOR)?
    };

    if rest.is_empty() {
        return None;
    }

    match rest.split_once(SEPARATOR) {
        Some((head, _)) => Some(ChildSegment::Group(head)),
        None => Some(ChildSegment::Key(rest)),
    }
}
