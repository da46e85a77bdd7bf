//! Drag gestures → proposed section order.
//!
//! The controller never touches the store. It tracks which item is lifted and
//! where it would land, and on drop hands back the full reordered sequence for
//! [`PageSectionStore::reorder`](crate::PageSectionStore::reorder).
//!
//! ```text
//! Idle ──pointer_down──▶ Pressed ──moved ≥ activation──▶ Dragging ──pointer_up──▶ Idle
//!   │                       └──pointer_up (click)──▶ Idle        │
//!   └──────────drag_start (keyboard lift)──────────────────────────┘
//! ```
//!
//! Only vertical displacement counts when resolving the drop target; the list
//! is a single column.

use strum::{Display, EnumString};

use crate::constants::DRAG_ACTIVATION_DISTANCE;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Vertical extent of one list item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemRect {
    pub top: f32,
    pub height: f32,
}

impl ItemRect {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn center(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Keyboard nudge direction for a lifted item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum KeyDirection {
    Up,
    Down,
}

/// Move `items[from]` to index `to`; everything else keeps its relative order.
///
/// Out-of-range indices return the input unchanged.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    if from < out.len() && to < out.len() && from != to {
        let item = out.remove(from);
        out.insert(to, item);
    }
    out
}

/// Index of the item whose center is nearest to the dragged item's center
/// after moving it by `dy`. Ties go to the lower index.
pub fn closest_center(rects: &[ItemRect], active: usize, dy: f32) -> Option<usize> {
    let moved = rects.get(active)?.center() + dy;
    rects
        .iter()
        .enumerate()
        .map(|(i, r)| (i, (r.center() - moved).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[derive(Clone, Debug, PartialEq)]
enum DragPhase<K> {
    Idle,
    Pressed {
        key: K,
        index: usize,
        origin: Point,
    },
    Dragging {
        key: K,
        /// Slot the item was lifted from, for hit-testing during the gesture.
        from: usize,
        over: usize,
        /// Pointer position at press; `None` for keyboard drags.
        origin: Option<Point>,
    },
}

/// Tracks one drag gesture over a list of `K` keys.
///
/// The lifted item is remembered by key, not by slot: the list may be
/// reloaded mid-drag, and the drop moves whichever slot holds that key then.
#[derive(Clone, Debug)]
pub struct DragReorderController<K> {
    phase: DragPhase<K>,
    activation_distance: f32,
}

impl<K: Clone + PartialEq> Default for DragReorderController<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + PartialEq> DragReorderController<K> {
    pub fn new() -> Self {
        Self::with_activation_distance(DRAG_ACTIVATION_DISTANCE)
    }

    pub fn with_activation_distance(activation_distance: f32) -> Self {
        Self {
            phase: DragPhase::Idle,
            activation_distance,
        }
    }

    /// Key of the lifted item, once a drag is active.
    pub fn active(&self) -> Option<&K> {
        match &self.phase {
            DragPhase::Dragging { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Current drop target.
    pub fn over(&self) -> Option<usize> {
        match self.phase {
            DragPhase::Dragging { over, .. } => Some(over),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active().is_some()
    }

    pub fn pointer_down(&mut self, index: usize, key: K, at: Point) {
        self.phase = DragPhase::Pressed {
            key,
            index,
            origin: at,
        };
    }

    /// Track the pointer. Returns the drop target while dragging.
    pub fn pointer_move(&mut self, at: Point, rects: &[ItemRect]) -> Option<usize> {
        let (from, origin) = match &self.phase {
            DragPhase::Pressed { index, origin, .. } => {
                if origin.distance(at) < self.activation_distance {
                    return None;
                }
                (*index, *origin)
            }
            DragPhase::Dragging {
                from,
                origin: Some(origin),
                ..
            } => (*from, *origin),
            _ => return self.over(),
        };

        let target = closest_center(rects, from, at.y - origin.y).unwrap_or(from);
        let key = match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Pressed { key, .. } | DragPhase::Dragging { key, .. } => key,
            DragPhase::Idle => return None,
        };
        self.phase = DragPhase::Dragging {
            key,
            from,
            over: target,
            origin: Some(origin),
        };
        Some(target)
    }

    /// Release the pointer. A press that never activated is a click.
    pub fn pointer_up(&mut self, items: &[K]) -> Option<Vec<K>> {
        let over = self.over();
        self.drag_end(items, over)
    }

    /// Lift an item without a pointer (keyboard).
    pub fn drag_start(&mut self, index: usize, key: K) {
        self.phase = DragPhase::Dragging {
            key,
            from: index,
            over: index,
            origin: None,
        };
    }

    /// Point the lifted item at an explicit target.
    pub fn drag_over(&mut self, index: usize) {
        if let DragPhase::Dragging { over, .. } = &mut self.phase {
            *over = index;
        }
    }

    /// Drop the lifted item on slot `over` of `items`.
    ///
    /// The item is found in `items` by key. Returns the reordered sequence,
    /// or `None` when nothing is lifted, the item is no longer in the list,
    /// it was dropped outside the list, or it landed where it already is.
    pub fn drag_end(&mut self, items: &[K], over: Option<usize>) -> Option<Vec<K>> {
        let phase = std::mem::replace(&mut self.phase, DragPhase::Idle);
        let DragPhase::Dragging { key, .. } = phase else {
            return None;
        };
        let to = over?;
        let from = items.iter().position(|item| item == &key)?;
        if to == from || to >= items.len() {
            return None;
        }
        Some(move_item(items, from, to))
    }

    pub fn drag_cancel(&mut self) {
        self.phase = DragPhase::Idle;
    }

    /// Nudge the lifted item one slot, clamped to the list.
    pub fn key_move(&mut self, direction: KeyDirection, len: usize) -> Option<usize> {
        let DragPhase::Dragging { over, .. } = &mut self.phase else {
            return None;
        };
        *over = match direction {
            KeyDirection::Up => over.saturating_sub(1),
            KeyDirection::Down => (*over + 1).min(len.saturating_sub(1)),
        };
        Some(*over)
    }

    /// Keyboard drop at the current target.
    pub fn finish(&mut self, items: &[K]) -> Option<Vec<K>> {
        let over = self.over();
        self.drag_end(items, over)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rects(n: usize) -> Vec<ItemRect> {
        (0..n).map(|i| ItemRect::new(i as f32 * 40.0, 40.0)).collect()
    }

    #[test]
    fn test_move_item_to_front() {
        assert_eq!(move_item(&["9", "5", "7"], 2, 0), vec!["7", "9", "5"]);
    }

    #[test]
    fn test_move_item_to_back() {
        assert_eq!(move_item(&["a", "b", "c", "d"], 0, 3), vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn test_move_item_out_of_range_is_identity() {
        assert_eq!(move_item(&[1, 2, 3], 5, 0), vec![1, 2, 3]);
    }

    #[test]
    fn test_move_item_is_permutation() {
        let items: Vec<u32> = (0..6).collect();
        for from in 0..items.len() {
            for to in 0..items.len() {
                let mut moved = move_item(&items, from, to);
                assert_eq!(moved[to], items[from]);
                moved.sort();
                assert_eq!(moved, items);
            }
        }
    }

    #[test]
    fn test_closest_center_by_vertical_offset() {
        let rects = rects(3);
        assert_eq!(closest_center(&rects, 0, 0.0), Some(0));
        assert_eq!(closest_center(&rects, 0, 45.0), Some(1));
        assert_eq!(closest_center(&rects, 2, -200.0), Some(0));
        assert_eq!(closest_center(&rects, 7, 0.0), None);
    }

    #[test]
    fn test_small_pointer_travel_is_a_click() {
        let mut drag = DragReorderController::new();
        drag.pointer_down(0, "a", Point::new(10.0, 10.0));
        assert_eq!(drag.pointer_move(Point::new(14.0, 14.0), &rects(3)), None);
        assert!(!drag.is_dragging());
        assert_eq!(drag.pointer_up(&["a", "b", "c"]), None);
    }

    #[test]
    fn test_horizontal_travel_activates_but_does_not_move() {
        let mut drag = DragReorderController::new();
        drag.pointer_down(1, "b", Point::new(0.0, 60.0));
        assert_eq!(drag.pointer_move(Point::new(300.0, 60.0), &rects(3)), Some(1));
        assert_eq!(drag.pointer_up(&["a", "b", "c"]), None);
    }

    #[test]
    fn test_pointer_drag_up_two_slots() {
        let mut drag = DragReorderController::new();
        drag.pointer_down(2, "7", Point::new(5.0, 100.0));
        drag.pointer_move(Point::new(5.0, 60.0), &rects(3));
        assert_eq!(drag.pointer_move(Point::new(5.0, 18.0), &rects(3)), Some(0));
        assert_eq!(drag.pointer_up(&["9", "5", "7"]), Some(vec!["7", "9", "5"]));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_drop_outside_list_does_nothing() {
        let mut drag = DragReorderController::new();
        drag.drag_start(0, "a");
        assert_eq!(drag.drag_end(&["a", "b"], None), None);
        assert_eq!(drag.active(), None);
    }

    #[test]
    fn test_drop_on_origin_does_nothing() {
        let mut drag = DragReorderController::new();
        drag.drag_start(1, "b");
        assert_eq!(drag.drag_end(&["a", "b"], Some(1)), None);
    }

    #[test]
    fn test_keyboard_reorder_clamps() {
        let mut drag = DragReorderController::new();
        assert_eq!(drag.key_move(KeyDirection::Down, 3), None);

        drag.drag_start(1, "b");
        assert_eq!(drag.key_move(KeyDirection::Down, 3), Some(2));
        assert_eq!(drag.key_move(KeyDirection::Down, 3), Some(2));
        assert_eq!(drag.finish(&["a", "b", "c"]), Some(vec!["a", "c", "b"]));

        drag.drag_start(0, "a");
        assert_eq!(drag.key_move(KeyDirection::Up, 3), Some(0));
        assert_eq!(drag.finish(&["a", "b", "c"]), None);
    }

    #[test]
    fn test_drop_follows_lifted_key_after_list_changes() {
        let mut drag = DragReorderController::new();
        drag.drag_start(0, "7");
        // The list reloads in a different order before the drop.
        assert_eq!(drag.drag_end(&["9", "7", "5"], Some(2)), Some(vec!["9", "5", "7"]));
    }

    #[test]
    fn test_drop_of_vanished_item_does_nothing() {
        let mut drag = DragReorderController::new();
        drag.drag_start(1, "5");
        assert_eq!(drag.drag_end(&["9", "7"], Some(0)), None);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_cancel_forgets_lift() {
        let mut drag = DragReorderController::new();
        drag.drag_start(0, "a");
        drag.drag_over(2);
        drag.drag_cancel();
        assert_eq!(drag.drag_end(&["a", "b", "c"], Some(2)), None);
    }

    #[test]
    fn test_direction_parses_case_insensitively() {
        assert_eq!("UP".parse::<KeyDirection>().unwrap(), KeyDirection::Up);
        assert_eq!(KeyDirection::Down.to_string(), "down");
    }
}
