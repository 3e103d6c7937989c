use std::{cell::RefCell, fmt, rc::Rc};

use thiserror::Error;
use tokio::task::LocalSet;

use crate::{scheduler::SchedulerHandle, spawn, Address, Effect, Inbox};

/// Troupe serves as the top-level context in which processes run.
///
/// It is *not* a singleton. A typical application will usually have only one
/// troupe hosting all of the processes but it is not a requirement.
///
/// In particular, unit tests all have their own troupe and hence can be
/// executed in parallel.
pub struct Troupe {
	#[cfg_attr(not(any(test, feature = "testsuite")), allow(dead_code))]
	accelerated_time: bool,
}

impl Default for Troupe {
	fn default() -> Troupe {
		Troupe::new()
	}
}

impl Troupe {
	/// Creates a new troupe.
	pub fn new() -> Troupe {
		Troupe { accelerated_time: false }
	}

	/// Creates a troupe where time is accelerated.
	///
	/// Sleeps complete in a way that exhibits a behavior as close as possible
	/// to what would have happened with normal time but faster. Time jumps
	/// only happen when every process is parked or sleeping.
	#[cfg(any(test, feature = "testsuite"))]
	pub fn with_accelerated_time() -> Troupe {
		Troupe { accelerated_time: true }
	}

	/// Runs `effect` as the root process and drives the scheduler until the
	/// troupe goes quiescent.
	///
	/// Quiescent means that every process has either finished or parked on a
	/// receive that nothing can satisfy anymore, and no timer is pending. The
	/// run does not stop when the root effect finishes: processes it spawned
	/// keep running until they finish or park, so their side effects are
	/// complete when this returns.
	///
	/// Returns the root result, or [`RunError::Stalled`] if the root effect
	/// itself was still parked at quiescence. A process that panicked has its
	/// panic resumed on this thread.
	pub fn run<A, E>(&self, effect: Effect<A, E>) -> Result<Result<A, E>, RunError>
	where
		A: 'static,
		E: 'static,
	{
		let mut builder = tokio::runtime::Builder::new_current_thread();
		builder.enable_all();
		#[cfg(any(test, feature = "testsuite"))]
		if self.accelerated_time {
			builder.start_paused(true);
		}
		let runtime = builder.build()?;
		let scheduler = SchedulerHandle::new();
		let _enter = scheduler.enter();
		let local = LocalSet::new();
		let root_outcome = Rc::new(RefCell::new(None));
		local.block_on(&runtime, {
			let scheduler = scheduler.clone();
			let root_outcome = root_outcome.clone();
			async move {
				scheduler.spawn_process(async move {
					let outcome = effect.run().await;
					*root_outcome.borrow_mut() = Some(outcome);
				});
				let mut idle_rx = scheduler.idle_rx();
				while !*idle_rx.borrow_and_update() {
					idle_rx
						.changed()
						.await
						.expect("the scheduler outlives its processes");
				}
			}
		});
		// Forever-parked processes are dropped here, without resuming.
		drop(local);
		for process in scheduler.take_processes() {
			if !process.is_finished() {
				continue;
			}
			if let Err(join_error) = runtime.block_on(process) {
				if join_error.is_panic() {
					std::panic::resume_unwind(join_error.into_panic());
				}
			}
		}
		root_outcome.take().ok_or(RunError::Stalled)
	}
}

/// Error returned by [`Troupe::run`].
#[derive(Debug, Error)]
pub enum RunError {
	#[error("every process is parked and the root effect can no longer make progress")]
	Stalled,
	#[error("failed to start the runtime")]
	Runtime(#[from] std::io::Error),
}

/// An exit address that treats any failure as fatal.
///
/// On `Err(error)`, the error is printed to standard error and the host
/// process exits with status -1. On `Ok`, nothing happens. Backed by a direct
/// handler, so it can be handed to any number of spawns.
pub fn exit_on_error<A, E>() -> Address<Result<A, E>>
where
	A: 'static,
	E: fmt::Display + 'static,
{
	Address::from_handler("exit-on-error", |result: Result<A, E>| {
		if let Err(error) = result {
			eprintln!("{error}");
			std::process::exit(-1);
		}
	})
}

/// An exit address that reports failures and moves on.
///
/// On `Err(error)`, the error is printed to standard error. On `Ok`, nothing
/// happens.
pub fn log_on_error<A, E>() -> Address<Result<A, E>>
where
	A: 'static,
	E: fmt::Display + 'static,
{
	Address::from_handler("log-on-error", |result: Result<A, E>| {
		if let Err(error) = result {
			eprintln!("{error}");
		}
	})
}

/// Entry point for programs whose main logic is a root actor.
///
/// Creates a troupe, spawns `root` with [`exit_on_error`] as its exit
/// address, and drives the scheduler until the troupe goes quiescent. A root
/// actor that ends up parked forever is a normal way for a program to finish.
pub fn program<M: 'static>(root: impl FnOnce(Inbox<M>) -> Effect<(), String> + 'static) {
	let troupe = Troupe::new();
	let boot: Effect<(), String> = spawn(root, &exit_on_error()).map(|_root_address| ());
	match troupe.run(boot) {
		Ok(_) | Err(RunError::Stalled) => {},
		Err(error) => {
			eprintln!("{error}");
			std::process::exit(1);
		},
	}
}
