//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame scheduling (`requestAnimationFrame` on web, manual elsewhere)
//! - Physics ticking on its own interval (`setInterval` on web)
//! - Presentation surface and image loading (web)
//! - Input listener registration (web)

#[cfg(target_arch = "wasm32")]
pub mod web;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Ticket for one scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequest(pub i32);

/// Handle for a repeating physics ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickerHandle(pub i32);

/// Something that calls the game back once per display frame, and on a
/// separate fixed interval for physics
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
    /// Begin calling the physics tick every `interval` seconds
    fn start_ticker(&mut self, interval: f32) -> TickerHandle;
    fn stop_ticker(&mut self, handle: TickerHandle);
}

/// Interval and next deadline (ms) of a manual ticker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ticker {
    pub interval_ms: f64,
    next_ms: Option<f64>,
}

pub type Tickers = Rc<RefCell<BTreeMap<TickerHandle, Ticker>>>;

/// Scheduler driven by the caller. Outstanding requests are observable so
/// a leaked frame callback shows up in tests.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameScheduler {
    next: i32,
    pending: Rc<RefCell<BTreeSet<FrameRequest>>>,
    tickers: Tickers,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the outstanding requests
    pub fn pending(&self) -> Rc<RefCell<BTreeSet<FrameRequest>>> {
        Rc::clone(&self.pending)
    }

    /// Shared view of the running tickers
    pub fn tickers(&self) -> Tickers {
        Rc::clone(&self.tickers)
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.next += 1;
        let request = FrameRequest(self.next);
        self.pending.borrow_mut().insert(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.pending.borrow_mut().remove(&request);
    }

    fn start_ticker(&mut self, interval: f32) -> TickerHandle {
        self.next += 1;
        let handle = TickerHandle(self.next);
        self.tickers.borrow_mut().insert(
            handle,
            Ticker {
                interval_ms: f64::from(interval.max(f32::EPSILON)) * 1000.0,
                next_ms: None,
            },
        );
        handle
    }

    fn stop_ticker(&mut self, handle: TickerHandle) {
        self.tickers.borrow_mut().remove(&handle);
    }
}

/// Hand out every outstanding request, as a display refresh would
pub fn fire_pending(pending: &RefCell<BTreeSet<FrameRequest>>) -> Vec<FrameRequest> {
    std::mem::take(&mut *pending.borrow_mut()).into_iter().collect()
}

/// Timestamps (ms) of every tick due up to `now_ms`, oldest first. A new
/// ticker first fires at the clock time it is polled.
pub fn due_ticks(tickers: &RefCell<BTreeMap<TickerHandle, Ticker>>, now_ms: f64) -> Vec<f64> {
    let mut due = Vec::new();
    for ticker in tickers.borrow_mut().values_mut() {
        let next = ticker.next_ms.get_or_insert(now_ms);
        while *next <= now_ms {
            due.push(*next);
            *next += ticker.interval_ms;
        }
    }
    due.sort_by(f64::total_cmp);
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_tracks_requests() {
        let mut scheduler = ManualFrameScheduler::new();
        let pending = scheduler.pending();
        let a = scheduler.request_frame();
        let b = scheduler.request_frame();
        assert_ne!(a, b);
        assert_eq!(pending.borrow().len(), 2);
        scheduler.cancel_frame(a);
        assert_eq!(fire_pending(&pending), vec![b]);
        assert!(pending.borrow().is_empty());
    }

    #[test]
    fn test_ticker_fires_on_its_own_interval() {
        let mut scheduler = ManualFrameScheduler::new();
        let tickers = scheduler.tickers();
        let handle = scheduler.start_ticker(0.25);

        assert_eq!(due_ticks(&tickers, 100.0), vec![100.0]);
        assert!(due_ticks(&tickers, 200.0).is_empty());
        assert_eq!(due_ticks(&tickers, 860.0), vec![350.0, 600.0, 850.0]);

        scheduler.stop_ticker(handle);
        assert!(due_ticks(&tickers, 2000.0).is_empty());
    }
}
