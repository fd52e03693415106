//! Drag selection state

use capture_gdi::Rect;

/// In-progress or committed drag rectangle in window coordinates.
///
/// Extents stay signed while the drag is live: the anchor is fixed, so
/// dragging up or left makes width or height negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SelectionRect {
    /// Sentinel for "no selection".
    pub const INVALID: SelectionRect = SelectionRect {
        x: -1,
        y: -1,
        width: -1,
        height: -1,
    };

    pub fn is_invalid(&self) -> bool {
        *self == Self::INVALID
    }

    /// Equivalent rectangle with non-negative extents: a negative extent
    /// is flipped by subtracting its absolute size from the matching
    /// origin coordinate, so the covered pixel region is unchanged.
    pub fn normalized(&self) -> Rect {
        let mut x = self.x;
        let mut y = self.y;
        let mut width = self.width;
        let mut height = self.height;

        if width < 0 {
            width = -width;
            x -= width;
        }

        if height < 0 {
            height = -height;
            y -= height;
        }

        Rect::new(x, y, width as u32, height as u32)
    }
}

/// Pointer-drag state machine: idle until a press, dragging until the
/// matching release commits the rectangle.
#[derive(Debug)]
pub struct DragTracker {
    rect: SelectionRect,
    dragging: bool,
}

impl DragTracker {
    pub fn new() -> Self {
        Self {
            rect: SelectionRect::INVALID,
            dragging: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Current raw rectangle; the sentinel outside a drag.
    pub fn rect(&self) -> SelectionRect {
        self.rect
    }

    /// Pointer down: anchor at (x, y) with a 1x1 extent so the rectangle
    /// is visibly non-empty from the first frame.
    pub fn press(&mut self, x: i32, y: i32) {
        self.rect = SelectionRect {
            x,
            y,
            width: 1,
            height: 1,
        };
        self.dragging = true;
    }

    /// Pointer move: recompute signed extents from the fixed anchor.
    pub fn motion(&mut self, x: i32, y: i32) {
        if self.dragging {
            self.rect.width = x - self.rect.x;
            self.rect.height = y - self.rect.y;
        }
    }

    /// Pointer up: commit the drag. Returns the raw rectangle and resets
    /// the tracker to idle with the sentinel. `None` when no drag was
    /// live (a stray button-up).
    pub fn release(&mut self) -> Option<SelectionRect> {
        if !self.dragging {
            return None;
        }

        let committed = self.rect;
        self.rect = SelectionRect::INVALID;
        self.dragging = false;
        Some(committed)
    }
}

impl Default for DragTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_gdi::ScreenBuffer;

    #[test]
    fn normalize_flips_negative_extents() {
        let raw = SelectionRect {
            x: 100,
            y: 100,
            width: -50,
            height: -30,
        };
        assert_eq!(raw.normalized(), Rect::new(50, 70, 50, 30));
    }

    #[test]
    fn normalize_keeps_positive_extents() {
        let raw = SelectionRect {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
        };
        assert_eq!(raw.normalized(), Rect::new(10, 20, 30, 40));
    }

    #[test]
    fn press_starts_with_visible_placeholder() {
        let mut tracker = DragTracker::new();
        tracker.press(40, 50);
        assert!(tracker.is_dragging());
        assert_eq!(
            tracker.rect(),
            SelectionRect {
                x: 40,
                y: 50,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn motion_moves_extents_not_anchor() {
        let mut tracker = DragTracker::new();
        tracker.press(100, 100);
        tracker.motion(150, 130);
        assert_eq!(
            tracker.rect(),
            SelectionRect {
                x: 100,
                y: 100,
                width: 50,
                height: 30
            }
        );

        // Reversing direction flips the sign, the anchor stays put.
        tracker.motion(60, 80);
        assert_eq!(
            tracker.rect(),
            SelectionRect {
                x: 100,
                y: 100,
                width: -40,
                height: -20
            }
        );
    }

    #[test]
    fn motion_without_press_is_ignored() {
        let mut tracker = DragTracker::new();
        tracker.motion(10, 10);
        assert_eq!(tracker.rect(), SelectionRect::INVALID);
    }

    #[test]
    fn release_commits_and_resets_to_sentinel() {
        let mut tracker = DragTracker::new();
        tracker.press(10, 10);
        tracker.motion(110, 60);
        let committed = tracker.release().unwrap();

        assert_eq!(committed.normalized(), Rect::new(10, 10, 100, 50));
        assert!(!tracker.is_dragging());
        assert!(tracker.rect().is_invalid());
        assert!(tracker.release().is_none());
    }

    #[test]
    fn forward_and_reversed_drags_commit_the_same_region() {
        let mut forward = DragTracker::new();
        forward.press(10, 10);
        forward.motion(110, 60);
        let fwd = forward.release().unwrap().normalized();

        let mut reversed = DragTracker::new();
        reversed.press(110, 60);
        reversed.motion(10, 10);
        let rev = reversed.release().unwrap().normalized();

        assert_eq!(fwd, rev);
        assert_eq!(fwd, Rect::new(10, 10, 100, 50));
    }

    #[test]
    fn committed_drag_extracts_the_pixels_under_it() {
        let shot = ScreenBuffer {
            pixels: (0..200u32 * 100).collect(),
            width: 200,
            height: 100,
            virtual_left: 0,
            virtual_top: 0,
        };

        let mut tracker = DragTracker::new();
        tracker.press(110, 60);
        tracker.motion(10, 10);
        let rect = tracker.release().unwrap().normalized();

        let region = shot.extract(rect).unwrap();
        assert_eq!((region.width, region.height), (100, 50));
        assert_eq!(region.pixels[0], 10 * 200 + 10);
    }
}
