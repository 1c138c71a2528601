use super::model::{Note, NoteId};

/// Moves `dragged` into the slot `target` occupies before the move and returns
/// the new order. Equal ids or an unknown id leave the order untouched.
pub fn move_before(notes: &[Note], dragged: NoteId, target: NoteId) -> Vec<Note> {
    let mut reordered = notes.to_vec();
    apply_move(&mut reordered, dragged, target);
    reordered
}

/// In-place form of [`move_before`]. Returns whether the order changed.
pub fn apply_move(notes: &mut Vec<Note>, dragged: NoteId, target: NoteId) -> bool {
    if dragged == target {
        return false;
    }
    let Some(from) = notes.iter().position(|note| note.id == dragged) else {
        return false;
    };
    let Some(to) = notes.iter().position(|note| note.id == target) else {
        return false;
    };
    let moved = notes.remove(from);
    notes.insert(to, moved);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: i64, title: &str) -> Note {
        Note {
            id: NoteId(id),
            title: title.to_string(),
            body: String::new(),
            updated_at: 0,
            starred: false,
            images: Vec::new(),
        }
    }

    fn ids(notes: &[Note]) -> Vec<i64> {
        notes.iter().map(|note| note.id.0).collect()
    }

    #[test]
    fn moves_last_note_to_front() {
        let notes = vec![note(1, "A"), note(2, "B"), note(3, "C")];
        let moved = move_before(&notes, NoteId(3), NoteId(1));
        assert_eq!(ids(&moved), vec![3, 1, 2]);
    }

    #[test]
    fn moving_down_lands_in_target_slot() {
        let notes = vec![note(1, "A"), note(2, "B"), note(3, "C")];
        let moved = move_before(&notes, NoteId(1), NoteId(3));
        assert_eq!(ids(&moved), vec![2, 3, 1]);
    }

    #[test]
    fn adjacent_moves_undo_each_other() {
        let notes = vec![note(1, "A"), note(2, "B"), note(3, "C"), note(4, "D")];
        for window in [(1, 2), (2, 3), (3, 4)] {
            let (a, b) = (NoteId(window.0), NoteId(window.1));
            let there = move_before(&notes, a, b);
            let back = move_before(&there, b, a);
            assert_eq!(ids(&back), ids(&notes), "pair {window:?}");
        }
    }

    #[test]
    fn same_or_missing_ids_are_noops() {
        let mut notes = vec![note(1, "A"), note(2, "B")];
        assert!(!apply_move(&mut notes, NoteId(1), NoteId(1)));
        assert!(!apply_move(&mut notes, NoteId(7), NoteId(1)));
        assert!(!apply_move(&mut notes, NoteId(1), NoteId(7)));
        assert_eq!(ids(&notes), vec![1, 2]);
    }
}
