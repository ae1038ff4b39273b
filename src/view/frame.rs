//! Frame scheduling
//!
//! The view never renders on its own; it asks a [`FrameHost`] for a frame
//! and renders when the host calls back into [`View::on_frame`].
//!
//! [`View::on_frame`]: super::View::on_frame

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Whatever drives the display loop (a window's redraw request, a timer)
pub trait FrameHost {
    /// Ask for one frame callback at the next opportunity
    fn request_frame(&mut self);
}

impl<F: FnMut()> FrameHost for F {
    fn request_frame(&mut self) {
        self();
    }
}

/// Host that only counts requests, for headless loops and tests.
///
/// Clones share the same counter, so one clone can be handed to the view
/// while the driver keeps another to poll.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameHost {
    requests: Arc<AtomicU32>,
}

impl ManualFrameHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests made since the last [`take_requests`](Self::take_requests)
    #[must_use]
    pub fn pending(&self) -> u32 {
        self.requests.load(Ordering::Acquire)
    }

    /// Consume all outstanding requests, returning how many there were
    pub fn take_requests(&self) -> u32 {
        self.requests.swap(0, Ordering::AcqRel)
    }

    /// Consume outstanding requests, returning whether a frame is due
    pub fn take_request(&self) -> bool {
        self.take_requests() > 0
    }
}

impl FrameHost for ManualFrameHost {
    fn request_frame(&mut self) {
        self.requests.fetch_add(1, Ordering::AcqRel);
    }
}
