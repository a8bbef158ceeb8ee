use crate::perception::types::{CaptureRegion, PagePoint, ScrollOffset, ViewportRect};

/// Regions narrower or shorter than this (page units) are rejected.
pub const MIN_CAPTURE_EXTENT: f64 = 10.0;

/// What a pointer or key event did to the selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureStep {
    /// Not armed, or a move/up without a preceding down.
    Ignored,
    Started(ViewportRect),
    Updated(ViewportRect),
    Finished(CaptureRegion),
    TooSmall(CaptureRegion),
    Cancelled,
}

/// Interactive rectangle selection.
///
/// Points are tracked in page space so a drag that scrolls the page keeps its
/// anchor. `arm` is called when capture starts; a completed, rejected or
/// cancelled selection disarms again.
#[derive(Debug, Default)]
pub struct RegionCapture {
    armed: bool,
    anchor: Option<PagePoint>,
}

impl RegionCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.armed = true;
        self.anchor = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_selecting(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn pointer_down(&mut self, client: PagePoint, scroll: ScrollOffset) -> CaptureStep {
        if !self.armed {
            return CaptureStep::Ignored;
        }
        self.anchor = Some(scroll.to_page(client));
        CaptureStep::Started(ViewportRect {
            left: client.x,
            top: client.y,
            width: 0.0,
            height: 0.0,
        })
    }

    pub fn pointer_move(&mut self, client: PagePoint, scroll: ScrollOffset) -> CaptureStep {
        let Some(anchor) = self.anchor.filter(|_| self.armed) else {
            return CaptureStep::Ignored;
        };
        let region = CaptureRegion::from_corners(anchor, scroll.to_page(client));
        CaptureStep::Updated(region.to_viewport(scroll))
    }

    pub fn pointer_up(&mut self, client: PagePoint, scroll: ScrollOffset) -> CaptureStep {
        let Some(anchor) = self.anchor.filter(|_| self.armed) else {
            return CaptureStep::Ignored;
        };
        self.armed = false;
        self.anchor = None;

        let region = CaptureRegion::from_corners(anchor, scroll.to_page(client));
        if region.is_at_least(MIN_CAPTURE_EXTENT) {
            CaptureStep::Finished(region)
        } else {
            CaptureStep::TooSmall(region)
        }
    }

    pub fn cancel(&mut self) -> CaptureStep {
        if !self.armed {
            return CaptureStep::Ignored;
        }
        self.armed = false;
        self.anchor = None;
        CaptureStep::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_SCROLL: ScrollOffset = ScrollOffset { x: 0.0, y: 0.0 };

    #[test]
    fn test_events_ignored_until_armed() {
        let mut capture = RegionCapture::new();
        assert_eq!(capture.pointer_down(PagePoint::new(1.0, 1.0), NO_SCROLL), CaptureStep::Ignored);
        assert_eq!(capture.pointer_up(PagePoint::new(50.0, 50.0), NO_SCROLL), CaptureStep::Ignored);
        assert_eq!(capture.cancel(), CaptureStep::Ignored);
    }

    #[test]
    fn test_drag_produces_page_region() {
        let mut capture = RegionCapture::new();
        capture.arm();
        capture.pointer_down(PagePoint::new(10.0, 20.0), ScrollOffset::new(0.0, 100.0));
        let step = capture.pointer_up(PagePoint::new(60.0, 70.0), ScrollOffset::new(0.0, 100.0));
        match step {
            CaptureStep::Finished(region) => {
                assert_eq!(region.origin, PagePoint::new(10.0, 120.0));
                assert_eq!(region.width, 50.0);
                assert_eq!(region.height, 50.0);
            }
            other => panic!("unexpected step: {other:?}"),
        }
        assert!(!capture.is_armed());
    }

    #[test]
    fn test_selection_survives_scroll_during_drag() {
        let mut capture = RegionCapture::new();
        capture.arm();
        capture.pointer_down(PagePoint::new(100.0, 300.0), ScrollOffset::new(0.0, 0.0));
        // page scrolled by 200 while dragging; pointer ends at the same viewport y
        let moved = capture.pointer_move(PagePoint::new(200.0, 300.0), ScrollOffset::new(0.0, 200.0));
        assert_eq!(
            moved,
            CaptureStep::Updated(ViewportRect {
                left: 100.0,
                top: 100.0,
                width: 100.0,
                height: 200.0,
            })
        );
        let step = capture.pointer_up(PagePoint::new(200.0, 300.0), ScrollOffset::new(0.0, 200.0));
        match step {
            CaptureStep::Finished(region) => {
                assert_eq!(region.origin, PagePoint::new(100.0, 300.0));
                assert_eq!(region.height, 200.0);
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_small_region_rejected() {
        let mut capture = RegionCapture::new();
        capture.arm();
        capture.pointer_down(PagePoint::new(10.0, 10.0), NO_SCROLL);
        let step = capture.pointer_up(PagePoint::new(15.0, 80.0), NO_SCROLL);
        assert!(matches!(step, CaptureStep::TooSmall(r) if r.width == 5.0));
        assert!(!capture.is_armed());
    }

    #[test]
    fn test_cancel_mid_drag_resets() {
        let mut capture = RegionCapture::new();
        capture.arm();
        capture.pointer_down(PagePoint::new(10.0, 10.0), NO_SCROLL);
        assert!(capture.is_selecting());
        assert_eq!(capture.cancel(), CaptureStep::Cancelled);
        assert!(!capture.is_armed());
        assert!(!capture.is_selecting());
        assert_eq!(capture.pointer_up(PagePoint::new(90.0, 90.0), NO_SCROLL), CaptureStep::Ignored);
    }
}
