use crate::notes::Note;

/// The query as typed, or `None` when it is blank. Surrounding whitespace
/// only decides blankness; a non-blank query is matched verbatim.
pub fn normalize_query(query: &str) -> Option<&str> {
    if query.trim().is_empty() {
        None
    } else {
        Some(query)
    }
}

/// Case-insensitive substring match against title or body.
pub fn note_matches(note: &Note, query: &str) -> bool {
    match normalize_query(query) {
        None => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            note.title.to_lowercase().contains(&needle) || note.body.to_lowercase().contains(&needle)
        }
    }
}

/// Notes matching `query`, in their original relative order. A blank query
/// keeps every note.
pub fn filter<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let Some(needle) = normalize_query(query) else {
        return notes.iter().collect();
    };
    let needle = needle.to_lowercase();
    notes
        .iter()
        .filter(|note| {
            note.title.to_lowercase().contains(&needle) || note.body.to_lowercase().contains(&needle)
        })
        .collect()
}
