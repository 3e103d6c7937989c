// Copyright (C) 2023 QuerentAI LLC.
// This file is part of Querent.

// The Licensed Work is licensed under the Business Source License 1.1 (BSL 1.1).
// You may use this file in compliance with the BSL 1.1, subject to the following restrictions:
// 1. You may not use the Licensed Work for AI-related services, database services,
//    or any service or product offering that provides database, big data, or analytics
//    services to third parties unless explicitly authorized by QuerentAI LLC.
// 2. For more details, see the LICENSE file or visit https://mariadb.com/bsl11/.

// For inquiries about alternative licensing arrangements, please contact contact@querent.xyz.

// The Licensed Work is provided "AS IS", WITHOUT WARRANTY OF ANY KIND, express or implied,
// including but not limited to the warranties of merchantability, fitness for a particular purpose,
// and non-infringement. See the Business Source License for more details.

// This software includes code developed by QuerentAI LLC (https://querent.ai).

use std::{
	cell::RefCell,
	future::Future,
	pin::Pin,
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Arc, Mutex,
	},
	task::{Context, Poll, Waker},
};

use futures::{
	future::LocalBoxFuture,
	task::{waker, ArcWake},
	FutureExt,
};
use tokio::{sync::watch, task::JoinHandle};

thread_local! {
	static CURRENT_SCHEDULER: RefCell<Option<SchedulerHandle>> = RefCell::new(None);
}

/// Book-keeping shared by every process of one running troupe.
///
/// The scheduler itself is tokio: processes are tasks on a single-threaded
/// `LocalSet`, and two of them only ever interleave at a park point. What this
/// type adds is quiescence detection. `live` counts processes that have been
/// spawned and have not finished, `parked` counts processes currently waiting
/// on an inbox. The moment every live process is parked, nothing can ever run
/// again (a parked process is only woken by a send, and only a live process
/// can send), so the run is over. Processes waiting on a timer are live and
/// not parked, which keeps the troupe running until the timer fires.
struct SchedulerCore {
	live: AtomicUsize,
	parked: AtomicUsize,
	idle_tx: watch::Sender<bool>,
	processes: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Clone)]
pub(crate) struct SchedulerHandle {
	core: Arc<SchedulerCore>,
}

impl SchedulerHandle {
	pub(crate) fn new() -> SchedulerHandle {
		let (idle_tx, _idle_rx) = watch::channel(false);
		SchedulerHandle {
			core: Arc::new(SchedulerCore {
				live: AtomicUsize::new(0),
				parked: AtomicUsize::new(0),
				idle_tx,
				processes: Mutex::new(Vec::new()),
			}),
		}
	}

	/// Returns the scheduler of the troupe currently running on this thread.
	///
	/// Effects only execute under a troupe, so a missing scheduler is a
	/// programming error, not a runtime condition.
	pub(crate) fn current() -> SchedulerHandle {
		CURRENT_SCHEDULER
			.with(|cell| cell.borrow().clone())
			.expect("effects can only run inside a troupe")
	}

	/// Installs `self` as the scheduler of this thread until the guard drops.
	pub(crate) fn enter(&self) -> EnterGuard {
		let previous =
			CURRENT_SCHEDULER.with(|cell| cell.borrow_mut().replace(self.clone()));
		EnterGuard { previous }
	}

	/// Registers a new process and queues its body for a later turn.
	///
	/// The body never runs within the current turn, which is what makes the
	/// address returned by a spawn usable before the child has executed.
	pub(crate) fn spawn_process(&self, process: impl Future<Output = ()> + 'static) {
		self.core.live.fetch_add(1, Ordering::SeqCst);
		let alive = LiveGuard { scheduler: self.clone() };
		let handle = tokio::task::spawn_local(async move {
			let _alive = alive;
			process.await;
		});
		self.core
			.processes
			.lock()
			.expect("scheduler process list is never poisoned")
			.push(handle);
	}

	pub(crate) fn idle_rx(&self) -> watch::Receiver<bool> {
		self.core.idle_tx.subscribe()
	}

	pub(crate) fn take_processes(&self) -> Vec<JoinHandle<()>> {
		std::mem::take(
			&mut *self
				.core
				.processes
				.lock()
				.expect("scheduler process list is never poisoned"),
		)
	}

	fn note_parked(&self) {
		self.core.parked.fetch_add(1, Ordering::SeqCst);
		self.maybe_flag_idle();
	}

	fn note_unparked(&self) {
		self.core.parked.fetch_sub(1, Ordering::SeqCst);
	}

	fn note_finished(&self) {
		self.core.live.fetch_sub(1, Ordering::SeqCst);
		self.maybe_flag_idle();
	}

	fn maybe_flag_idle(&self) {
		let live = self.core.live.load(Ordering::SeqCst);
		let parked = self.core.parked.load(Ordering::SeqCst);
		if live == parked {
			self.core.idle_tx.send_replace(true);
		}
	}
}

pub(crate) struct EnterGuard {
	previous: Option<SchedulerHandle>,
}

impl Drop for EnterGuard {
	fn drop(&mut self) {
		let previous = self.previous.take();
		CURRENT_SCHEDULER.with(|cell| *cell.borrow_mut() = previous);
	}
}

struct LiveGuard {
	scheduler: SchedulerHandle,
}

impl Drop for LiveGuard {
	// Runs on normal completion and on unwind, so a panicking process still
	// leaves the counters consistent.
	fn drop(&mut self) {
		self.scheduler.note_finished();
	}
}

/// Wraps a receive so the scheduler knows the process is parked.
///
/// The counter moves on the wake side, not on the poll side: a send that hands
/// a message to this waiter unparks the process immediately, before the task
/// is polled again. Otherwise the window between wake and poll would read as
/// idle.
pub(crate) struct Parked<T> {
	future: LocalBoxFuture<'static, T>,
	scheduler: SchedulerHandle,
	state: Option<Arc<ParkState>>,
}

struct ParkState {
	scheduler: SchedulerHandle,
	parked: AtomicBool,
	waker: Mutex<Waker>,
}

impl ArcWake for ParkState {
	fn wake_by_ref(this: &Arc<Self>) {
		if this.parked.swap(false, Ordering::SeqCst) {
			this.scheduler.note_unparked();
		}
		this.waker
			.lock()
			.expect("park state waker is never poisoned")
			.wake_by_ref();
	}
}

impl<T> Parked<T> {
	pub(crate) fn new(
		scheduler: SchedulerHandle,
		future: impl Future<Output = T> + 'static,
	) -> Parked<T> {
		Parked { future: future.boxed_local(), scheduler, state: None }
	}
}

impl<T> Future for Parked<T> {
	type Output = T;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
		let this = self.get_mut();
		let state = match &this.state {
			Some(state) => {
				*state.waker.lock().expect("park state waker is never poisoned") =
					cx.waker().clone();
				state.clone()
			},
			None => {
				let state = Arc::new(ParkState {
					scheduler: this.scheduler.clone(),
					parked: AtomicBool::new(false),
					waker: Mutex::new(cx.waker().clone()),
				});
				this.state = Some(state.clone());
				state
			},
		};
		let park_waker = waker(state.clone());
		let mut park_cx = Context::from_waker(&park_waker);
		match this.future.poll_unpin(&mut park_cx) {
			Poll::Ready(value) => {
				if state.parked.swap(false, Ordering::SeqCst) {
					this.scheduler.note_unparked();
				}
				Poll::Ready(value)
			},
			Poll::Pending => {
				if !state.parked.swap(true, Ordering::SeqCst) {
					this.scheduler.note_parked();
				}
				Poll::Pending
			},
		}
	}
}

impl<T> Drop for Parked<T> {
	fn drop(&mut self) {
		if let Some(state) = &self.state {
			if state.parked.swap(false, Ordering::SeqCst) {
				self.scheduler.note_unparked();
			}
		}
	}
}
