use std::time::{Duration, Instant};

use crate::config::GestureConfig;
use crate::notes::NoteId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Pointer,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn beyond(&self, other: &Position, distance: f32) -> bool {
        (self.x - other.x).abs() > distance || (self.y - other.y).abs() > distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    LongPress(NoteId),
    Tap(NoteId),
    DragStarted(NoteId),
    DragOver { dragged: NoteId, over: NoteId },
    Drop { dragged: NoteId, target: NoteId },
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Pressed {
        modality: Modality,
        note: NoteId,
        origin: Position,
        at: Instant,
        editing: bool,
    },
    /// Moved too far before the long-press fired; the release is ignored.
    Scrolling,
    LongPressed,
    Dragging {
        dragged: NoteId,
        over: Option<NoteId>,
    },
}

/// Turns press/move/release input into board gestures. Time is passed in so
/// the long-press timer can be driven from the UI tick and from tests.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    long_press: Duration,
    move_cancel_distance: f32,
    phase: Phase,
}

impl GestureTracker {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            long_press: config.long_press,
            move_cancel_distance: config.move_cancel_distance,
            phase: Phase::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn long_press_pending(&self) -> bool {
        matches!(self.phase, Phase::Pressed { .. })
    }

    /// The note being dragged and the note currently under it.
    pub fn drag(&self) -> Option<(NoteId, Option<NoteId>)> {
        match self.phase {
            Phase::Dragging { dragged, over } => Some((dragged, over)),
            _ => None,
        }
    }

    pub fn press(
        &mut self,
        modality: Modality,
        note: NoteId,
        position: Position,
        editing: bool,
        at: Instant,
    ) {
        self.phase = Phase::Pressed {
            modality,
            note,
            origin: position,
            at,
            editing,
        };
    }

    pub fn motion(
        &mut self,
        position: Position,
        hovered: Option<NoteId>,
        _at: Instant,
    ) -> Option<Gesture> {
        match self.phase {
            Phase::Pressed {
                modality,
                note,
                origin,
                editing,
                ..
            } => {
                if modality == Modality::Pointer && editing {
                    if let Some(over) = hovered.filter(|over| *over != note) {
                        self.phase = Phase::Dragging {
                            dragged: note,
                            over: Some(over),
                        };
                        return Some(Gesture::DragStarted(note));
                    }
                }
                if position.beyond(&origin, self.move_cancel_distance) {
                    self.phase = Phase::Scrolling;
                    return Some(Gesture::Cancelled);
                }
                None
            }
            Phase::Dragging { dragged, over } => {
                if hovered.is_some() && hovered != over {
                    self.phase = Phase::Dragging {
                        dragged,
                        over: hovered,
                    };
                    return hovered.map(|over| Gesture::DragOver { dragged, over });
                }
                None
            }
            Phase::Idle | Phase::Scrolling | Phase::LongPressed => None,
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<Gesture> {
        let Phase::Pressed {
            modality,
            note,
            at,
            editing,
            ..
        } = self.phase
        else {
            return None;
        };
        if now.saturating_duration_since(at) < self.long_press {
            return None;
        }
        if editing && modality == Modality::Touch {
            self.phase = Phase::Dragging {
                dragged: note,
                over: Some(note),
            };
            tracing::trace!(note_id = %note, "touch drag armed");
            Some(Gesture::DragStarted(note))
        } else {
            self.phase = Phase::LongPressed;
            Some(Gesture::LongPress(note))
        }
    }

    pub fn release(&mut self, hovered: Option<NoteId>, now: Instant) -> Option<Gesture> {
        if let Some(fired) = self.tick(now) {
            // The timer elapsed between ticks: the press was a long-press.
            if let Gesture::LongPress(_) = fired {
                self.phase = Phase::Idle;
                return Some(fired);
            }
        }
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        match phase {
            Phase::Pressed { note, .. } => Some(Gesture::Tap(note)),
            Phase::Dragging { dragged, over } => match hovered.or(over) {
                Some(target) if target != dragged => Some(Gesture::Drop { dragged, target }),
                _ => Some(Gesture::Cancelled),
            },
            Phase::Idle | Phase::Scrolling | Phase::LongPressed => None,
        }
    }

    pub fn cancel(&mut self) -> Option<Gesture> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => None,
            _ => Some(Gesture::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: NoteId = NoteId(1);
    const B: NoteId = NoteId(2);

    fn tracker() -> GestureTracker {
        GestureTracker::new(&GestureConfig::default())
    }

    fn origin() -> Position {
        Position::new(0.0, 0.0)
    }

    #[test]
    fn quick_release_is_a_tap() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Pointer, A, origin(), false, start);
        assert_eq!(tracker.tick(start + Duration::from_millis(100)), None);
        assert_eq!(
            tracker.release(Some(A), start + Duration::from_millis(120)),
            Some(Gesture::Tap(A))
        );
        assert!(tracker.is_idle());
    }

    #[test]
    fn held_press_fires_long_press_once() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Touch, A, origin(), false, start);
        assert_eq!(
            tracker.tick(start + Duration::from_millis(500)),
            Some(Gesture::LongPress(A))
        );
        assert_eq!(tracker.tick(start + Duration::from_millis(900)), None);
        assert_eq!(tracker.release(Some(A), start + Duration::from_millis(950)), None);
    }

    #[test]
    fn long_press_elapsed_between_ticks_still_fires_on_release() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Pointer, A, origin(), false, start);
        assert_eq!(
            tracker.release(Some(A), start + Duration::from_millis(700)),
            Some(Gesture::LongPress(A))
        );
    }

    #[test]
    fn movement_past_threshold_cancels_and_swallows_release() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Touch, A, origin(), false, start);
        assert_eq!(tracker.motion(Position::new(3.0, 4.0), Some(A), start), None);
        assert_eq!(
            tracker.motion(Position::new(0.0, 11.0), Some(B), start),
            Some(Gesture::Cancelled)
        );
        assert_eq!(tracker.tick(start + Duration::from_secs(1)), None);
        assert_eq!(tracker.release(Some(B), start + Duration::from_secs(1)), None);
    }

    #[test]
    fn pointer_drag_in_editing_drops_onto_target() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Pointer, A, origin(), true, start);
        assert_eq!(tracker.motion(origin(), Some(A), start), None);
        assert_eq!(
            tracker.motion(Position::new(0.0, 3.0), Some(B), start),
            Some(Gesture::DragStarted(A))
        );
        assert_eq!(tracker.drag(), Some((A, Some(B))));
        assert_eq!(
            tracker.release(Some(B), start + Duration::from_millis(200)),
            Some(Gesture::Drop {
                dragged: A,
                target: B
            })
        );
    }

    #[test]
    fn pointer_outside_editing_never_drags() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Pointer, A, origin(), false, start);
        assert_eq!(tracker.motion(Position::new(0.0, 3.0), Some(B), start), None);
        assert_eq!(tracker.drag(), None);
    }

    #[test]
    fn touch_drag_in_editing_needs_long_press() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Touch, A, origin(), true, start);
        assert_eq!(tracker.motion(Position::new(0.0, 2.0), Some(B), start), None);
        assert_eq!(
            tracker.tick(start + Duration::from_millis(600)),
            Some(Gesture::DragStarted(A))
        );
        let later = start + Duration::from_millis(700);
        assert_eq!(
            tracker.motion(Position::new(0.0, 40.0), Some(B), later),
            Some(Gesture::DragOver {
                dragged: A,
                over: B
            })
        );
        assert_eq!(
            tracker.release(None, later),
            Some(Gesture::Drop {
                dragged: A,
                target: B
            })
        );
    }

    #[test]
    fn dropping_onto_itself_is_cancelled() {
        let mut tracker = tracker();
        let start = Instant::now();
        tracker.press(Modality::Touch, A, origin(), true, start);
        tracker.tick(start + Duration::from_millis(500));
        assert_eq!(tracker.release(Some(A), start), Some(Gesture::Cancelled));
    }

    #[test]
    fn cancel_clears_pending_press() {
        let mut tracker = tracker();
        let start = Instant::now();
        assert_eq!(tracker.cancel(), None);
        tracker.press(Modality::Pointer, A, origin(), false, start);
        assert!(tracker.long_press_pending());
        assert_eq!(tracker.cancel(), Some(Gesture::Cancelled));
        assert_eq!(tracker.tick(start + Duration::from_secs(2)), None);
    }
}
