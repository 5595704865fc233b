//! Single-flight coordination for 401 recovery.
//!
//! A request that receives a 401 calls [`RefreshCoordinator::enter`] with the bearer it was sent
//! with and gets one of three tickets:
//!
//! - [`RefreshTicket::Lead`]: no refresh is running, so this caller performs it. The
//!   [`RefreshLease`] clears the in-progress flag and resolves every waiter when it is settled or
//!   dropped.
//! - [`RefreshTicket::Wait`]: a refresh is already running, so the caller parks on a oneshot
//!   channel until the leader settles.
//! - [`RefreshTicket::Reuse`]: a refresh already replaced the bearer this request was sent with,
//!   so the caller replays with the current token and no new refresh happens. A request sent
//!   without a bearer never reuses, since its token was absent or expired.
//!
//! The in-progress flag, the waiter list, the current bearer, and the session epoch share one
//! lock that is never held across `.await`. Waiters are only enqueued while the flag is set and
//! are drained in the same critical section that clears it.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Result every participant of a refresh observes.
pub type RefreshOutcome = Result<TokenSecret, ApiError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

#[derive(Default)]
struct RefreshState {
	in_progress: bool,
	waiters: Vec<Waiter>,
	current: Option<TokenSecret>,
	epoch: u64,
}

/// Owner of the refresh-in-progress flag, the waiter queue, and the default bearer.
#[derive(Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Decides how a request that was sent with `sent` and received a 401 recovers.
	pub fn enter(self: &Arc<Self>, sent: Option<&TokenSecret>) -> RefreshTicket {
		let mut state = self.state.lock();

		if state.in_progress {
			let (tx, rx) = oneshot::channel();

			state.waiters.push(tx);

			return RefreshTicket::Wait(RefreshWaiter(rx));
		}

		match &state.current {
			Some(current) if sent.is_some_and(|sent| sent != current) =>
				RefreshTicket::Reuse(current.clone()),
			_ => {
				state.in_progress = true;

				RefreshTicket::Lead(RefreshLease {
					coordinator: Arc::clone(self),
					epoch: state.epoch,
					settled: false,
				})
			},
		}
	}

	/// Starts a new session whose default bearer is `token`.
	pub fn begin_session(&self, token: TokenSecret) {
		let mut state = self.state.lock();

		state.epoch = state.epoch.wrapping_add(1);
		state.current = Some(token);
	}

	/// Ends the current session and forgets the default bearer.
	pub fn end_session(&self) {
		let mut state = self.state.lock();

		state.epoch = state.epoch.wrapping_add(1);
		state.current = None;
	}

	/// Identifier of the current session; changes on every login and logout.
	pub fn epoch(&self) -> u64 {
		self.state.lock().epoch
	}

	/// Bearer installed by the last login or successful refresh.
	pub fn current(&self) -> Option<TokenSecret> {
		self.state.lock().current.clone()
	}

	/// Returns `true` while a leader holds the refresh lease.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_progress
	}

	/// Number of callers parked on the running refresh.
	pub fn waiting(&self) -> usize {
		self.state.lock().waiters.len()
	}

	fn settle(&self, epoch: u64, outcome: &RefreshOutcome) {
		let waiters = {
			let mut state = self.state.lock();

			state.in_progress = false;

			if state.epoch == epoch {
				if let Ok(token) = outcome {
					state.current = Some(token.clone());
				}
			}

			std::mem::take(&mut state.waiters)
		};

		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("in_progress", &state.in_progress)
			.field("waiting", &state.waiters.len())
			.field("current_set", &state.current.is_some())
			.field("epoch", &state.epoch)
			.finish()
	}
}

/// How a 401 should be recovered.
#[derive(Debug)]
pub enum RefreshTicket {
	/// Perform the refresh and settle the lease.
	Lead(RefreshLease),
	/// Wait for the running refresh.
	Wait(RefreshWaiter),
	/// Replay with this already refreshed token.
	Reuse(TokenSecret),
}

/// Exclusive right to perform the running refresh.
///
/// Settling (or dropping) the lease clears the in-progress flag and resolves every waiter with
/// the same outcome. A lease dropped without being settled rejects waiters with
/// [`ApiError::refresh_abandoned`].
pub struct RefreshLease {
	coordinator: Arc<RefreshCoordinator>,
	epoch: u64,
	settled: bool,
}
impl RefreshLease {
	/// Session epoch observed when the lease was granted.
	pub fn epoch(&self) -> u64 {
		self.epoch
	}

	/// Publishes `outcome` to every waiter and returns it to the leader.
	pub fn settle(mut self, outcome: RefreshOutcome) -> RefreshOutcome {
		self.settled = true;
		self.coordinator.settle(self.epoch, &outcome);

		outcome
	}
}
impl Debug for RefreshLease {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshLease").field("epoch", &self.epoch).finish()
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(self.epoch, &Err(ApiError::refresh_abandoned()));
		}
	}
}

/// Parked caller waiting for the running refresh.
#[derive(Debug)]
pub struct RefreshWaiter(oneshot::Receiver<RefreshOutcome>);
impl RefreshWaiter {
	/// Resolves with the leader's outcome.
	pub async fn wait(self) -> RefreshOutcome {
		self.0.await.unwrap_or_else(|_| Err(ApiError::refresh_abandoned()))
	}
}
