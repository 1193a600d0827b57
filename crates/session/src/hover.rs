//! Hover preview lifecycle.
//!
//! A preview is either idle, shown at an anchor, or placed at a rect. Every
//! `show` hands out a [`PreviewHandle`]; calls made with a handle from an
//! earlier preview are ignored, so a late pointer sample can't resurrect a
//! preview that was already torn down.

use std::{
    ops::{Deref, DerefMut},
    time::{Duration, Instant},
};

use chanview_types::preview::{Point, Positioner, Rect, Size};
use tracing::{debug, warn};

use crate::schedule::Throttle;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum HoverState {
    #[default]
    Idle,
    Showing {
        anchor: Point,
    },
    Positioning {
        anchor: Point,
        rect: Rect,
    },
}

/// What the preview shows.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverContent {
    pub url: String,
    pub natural: Option<Size>,
    pub is_video: bool,
    pub autoplay: bool,
}

/// What to do after the media failed to load.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaFallback {
    Retry { url: String, after: Duration },
    Hide,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    generation: u64,
}

#[derive(Debug)]
pub struct HoverPreview {
    positioner: Positioner,
    viewport: Size,
    state: HoverState,
    content: Option<HoverContent>,
    generation: u64,
    throttle: Throttle<Point>,
    retried: bool,
}

impl HoverPreview {
    const RETRY_DELAY: Duration = Duration::from_secs(3);

    pub fn new(positioner: Positioner, viewport: Size, throttle: Duration) -> Self {
        HoverPreview {
            positioner,
            viewport,
            state: HoverState::Idle,
            content: None,
            generation: 0,
            throttle: Throttle::new(throttle),
            retried: false,
        }
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    pub fn content(&self) -> Option<&HoverContent> {
        self.content.as_ref()
    }

    pub fn rect(&self) -> Option<Rect> {
        match self.state {
            HoverState::Positioning { rect, .. } => Some(rect),
            _ => None,
        }
    }

    pub fn is_active(&self, handle: PreviewHandle) -> bool {
        handle.generation == self.generation && self.state != HoverState::Idle
    }

    /// Replaces any current preview with `content` at `anchor` and places it
    /// right away. The returned guard tears the preview down when dropped
    /// unless it is [kept](PreviewGuard::keep).
    pub fn show(&mut self, content: HoverContent, anchor: Point, now: Instant) -> PreviewGuard<'_> {
        self.teardown();
        debug!("Showing preview of {}", content.url);
        self.content = Some(content);
        self.state = HoverState::Showing { anchor };
        if let Some(anchor) = self.throttle.offer(anchor, now) {
            self.place(anchor);
        }
        let handle = PreviewHandle {
            generation: self.generation,
        };
        PreviewGuard {
            preview: self,
            handle,
            armed: true,
        }
    }

    fn place(&mut self, anchor: Point) -> Option<Rect> {
        let natural = self.content.as_ref()?.natural;
        let rect = self.positioner.place(anchor, natural, self.viewport);
        self.state = HoverState::Positioning { anchor, rect };
        Some(rect)
    }

    /// Feeds a pointer sample; returns the new rect when it was placed.
    pub fn pointer_moved(
        &mut self,
        handle: PreviewHandle,
        at: Point,
        now: Instant,
    ) -> Option<Rect> {
        if !self.is_active(handle) {
            return None;
        }
        let at = self.throttle.offer(at, now)?;
        self.place(at)
    }

    /// Places the newest held pointer sample once the throttle allows it.
    pub fn flush(&mut self, handle: PreviewHandle, now: Instant) -> Option<Rect> {
        if !self.is_active(handle) {
            return None;
        }
        let at = self.throttle.flush(now)?;
        self.place(at)
    }

    /// When a held pointer sample should be flushed.
    pub fn next_flush(&self) -> Option<Instant> {
        self.throttle.next_deadline()
    }

    pub fn leave(&mut self, handle: PreviewHandle) {
        if self.is_active(handle) {
            self.teardown();
        }
    }

    pub fn click(&mut self, handle: PreviewHandle) {
        self.leave(handle);
    }

    /// The first failure is retried once with a cache-busting url, the
    /// second one hides the preview.
    pub fn media_failed(&mut self, handle: PreviewHandle) -> MediaFallback {
        if !self.is_active(handle) {
            return MediaFallback::Hide;
        }
        if self.retried || self.content.is_none() {
            warn!("Preview media failed again, hiding preview");
            self.teardown();
            return MediaFallback::Hide;
        }
        let Some(content) = self.content.as_mut() else {
            return MediaFallback::Hide;
        };
        let url = cache_busted(&content.url, chrono::Utc::now().timestamp_millis());
        warn!("Preview media failed, retrying as {}", url);
        content.url = url.clone();
        self.retried = true;
        MediaFallback::Retry {
            url,
            after: Self::RETRY_DELAY,
        }
    }

    /// New viewport bounds; a placed preview is placed again.
    pub fn resize(&mut self, viewport: Size) -> Option<Rect> {
        self.viewport = viewport;
        match self.state {
            HoverState::Positioning { anchor, .. } | HoverState::Showing { anchor } => {
                self.place(anchor)
            }
            HoverState::Idle => None,
        }
    }

    fn teardown(&mut self) {
        if self.state != HoverState::Idle {
            debug!("Tearing down preview");
        }
        self.state = HoverState::Idle;
        self.content = None;
        self.retried = false;
        self.throttle.reset();
        self.generation += 1;
    }
}

fn cache_busted(url: &str, stamp: i64) -> String {
    let base = url.split_once('?').map_or(url, |(base, _)| base);
    format!("{}?{}", base, stamp)
}

/// Borrow of a shown preview that tears it down on drop.
#[derive(Debug)]
pub struct PreviewGuard<'a> {
    preview: &'a mut HoverPreview,
    handle: PreviewHandle,
    armed: bool,
}

impl PreviewGuard<'_> {
    pub fn handle(&self) -> PreviewHandle {
        self.handle
    }

    /// Leaves the preview up; exit paths must then go through the handle.
    pub fn keep(mut self) -> PreviewHandle {
        self.armed = false;
        self.handle
    }
}

impl Deref for PreviewGuard<'_> {
    type Target = HoverPreview;

    fn deref(&self) -> &HoverPreview {
        &*self.preview
    }
}

impl DerefMut for PreviewGuard<'_> {
    fn deref_mut(&mut self) -> &mut HoverPreview {
        &mut *self.preview
    }
}

impl Drop for PreviewGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.preview.leave(self.handle);
        }
    }
}
