//! In-flight request accounting that drives a global loading indicator.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::_prelude::*;

/// Receiver of the global busy signal.
///
/// `show` fires when the in-flight count leaves zero and `hide` when it returns to zero. Only
/// [`InFlightTracker`] calls these.
pub trait LoadingIndicator
where
	Self: Send + Sync,
{
	/// At least one request is in flight.
	fn show(&self);

	/// No request is in flight.
	fn hide(&self);
}

/// Indicator that ignores every transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopIndicator;
impl LoadingIndicator for NoopIndicator {
	fn show(&self) {}

	fn hide(&self) {}
}

/// Indicator backed by an atomic flag, for consumers that poll.
#[derive(Debug, Default)]
pub struct LoadingFlag(AtomicBool);
impl LoadingFlag {
	/// Returns `true` while the indicator is shown.
	pub fn is_visible(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}
impl LoadingIndicator for LoadingFlag {
	fn show(&self) {
		self.0.store(true, Ordering::Release);
	}

	fn hide(&self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Counts in-flight requests and forwards zero-crossings to a [`LoadingIndicator`].
pub struct InFlightTracker {
	count: Mutex<usize>,
	indicator: Arc<dyn LoadingIndicator>,
}
impl InFlightTracker {
	/// Creates a tracker that reports to `indicator`.
	pub fn new(indicator: Arc<dyn LoadingIndicator>) -> Self {
		Self { count: Mutex::new(0), indicator }
	}

	/// Registers a dispatch. The returned guard releases it on drop.
	pub fn begin(self: &Arc<Self>) -> InFlightGuard {
		let mut count = self.count.lock();

		*count += 1;

		if *count == 1 {
			self.indicator.show();
		}

		InFlightGuard { tracker: Arc::clone(self) }
	}

	/// Current number of in-flight requests.
	pub fn in_flight(&self) -> usize {
		*self.count.lock()
	}

	/// Returns `true` while at least one request is in flight.
	pub fn is_busy(&self) -> bool {
		self.in_flight() > 0
	}

	fn release(&self) {
		let mut count = self.count.lock();
		let was_busy = *count > 0;

		*count = count.saturating_sub(1);

		if was_busy && *count == 0 {
			self.indicator.hide();
		}
	}
}
impl Debug for InFlightTracker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InFlightTracker").field("in_flight", &self.in_flight()).finish()
	}
}
impl Default for InFlightTracker {
	fn default() -> Self {
		Self::new(Arc::new(NoopIndicator))
	}
}

/// RAII handle for one in-flight request.
pub struct InFlightGuard {
	tracker: Arc<InFlightTracker>,
}
impl Debug for InFlightGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("InFlightGuard(..)")
	}
}
impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.tracker.release();
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::panic::{self, AssertUnwindSafe};
	// self
	use super::*;

	#[derive(Default)]
	struct RecordingIndicator(Mutex<Vec<&'static str>>);
	impl LoadingIndicator for RecordingIndicator {
		fn show(&self) {
			self.0.lock().push("show");
		}

		fn hide(&self) {
			self.0.lock().push("hide");
		}
	}

	#[test]
	fn indicator_fires_only_on_zero_crossings() {
		let indicator = Arc::new(RecordingIndicator::default());
		let tracker = Arc::new(InFlightTracker::new(indicator.clone()));
		let first = tracker.begin();
		let second = tracker.begin();

		assert_eq!(tracker.in_flight(), 2);

		drop(first);

		assert!(tracker.is_busy());

		drop(second);

		assert_eq!(tracker.in_flight(), 0);
		assert_eq!(*indicator.0.lock(), vec!["show", "hide"]);
	}

	#[test]
	fn release_never_goes_negative() {
		let flag = Arc::new(LoadingFlag::default());
		let tracker = Arc::new(InFlightTracker::new(flag.clone()));

		tracker.release();

		assert_eq!(tracker.in_flight(), 0);
		assert!(!flag.is_visible());

		let guard = tracker.begin();

		assert!(flag.is_visible());

		drop(guard);

		assert!(!flag.is_visible());
	}

	#[test]
	fn guards_release_on_unwind() {
		let tracker = Arc::new(InFlightTracker::default());
		let cloned = tracker.clone();
		let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
			let _guard = cloned.begin();

			panic!("request handler failed");
		}));

		assert!(outcome.is_err());
		assert_eq!(tracker.in_flight(), 0);
	}
}
