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

use std::sync::Arc;

use tracing::debug;

use crate::{scheduler::SchedulerHandle, Address, Effect, Inbox};

/// Registers the process body with the scheduler and returns its address.
///
/// The terminal result of the body goes to `on_exit` exactly once, after the
/// body's effect has finished. The inbox dies with the body: once the result
/// is posted, sends to the returned address are dead letters.
pub(crate) fn do_spawn<M, A, E>(
	scheduler: &SchedulerHandle,
	actor: impl FnOnce(Inbox<M>) -> Effect<A, E> + 'static,
	on_exit: Address<Result<A, E>>,
) -> Address<M>
where
	M: 'static,
	A: 'static,
	E: 'static,
{
	let inbox = Inbox::named("process");
	let address = inbox.address();
	let process_id: Arc<str> = inbox.id().into();
	debug!(process = %process_id, "spawn-process");
	scheduler.spawn_process(async move {
		let outcome = actor(inbox).fut.await;
		match &outcome {
			Ok(_) => debug!(process = %process_id, "process-exit"),
			Err(_) => debug!(process = %process_id, "process-exit-failure"),
		}
		on_exit.deliver(outcome);
	});
	address
}

/// Starts `actor` as a new process and yields its address.
///
/// The address is available to the caller right away, while the child body
/// only runs on a later scheduler turn. Anything sent to the address in the
/// meantime is waiting in the child's inbox before its first receive.
///
/// `on_exit` is the process's single exit channel: it receives `Ok(value)` or
/// `Err(error)` exactly once, when the body finishes. Pass
/// [`crate::exit_on_error`] or [`crate::log_on_error`] when all that matters
/// is that failures surface somewhere.
pub fn spawn<M, A, E, X>(
	actor: impl FnOnce(Inbox<M>) -> Effect<A, E> + 'static,
	on_exit: &Address<Result<A, E>>,
) -> Effect<Address<M>, X>
where
	M: 'static,
	A: 'static,
	E: 'static,
	X: 'static,
{
	let on_exit = on_exit.clone();
	Effect::new(async move { Ok(do_spawn(&SchedulerHandle::current(), actor, on_exit)) })
}

/// Starts a process that applies `work` to every message it receives.
///
/// The loop never finishes on its own, so `on_exit` only ever sees an error:
/// the first failure returned by `work` stops the worker and is forwarded.
pub fn spawn_worker<M, E, X>(
	mut work: impl FnMut(M) -> Effect<(), E> + 'static,
	on_exit: &Address<Result<(), E>>,
) -> Effect<Address<M>, X>
where
	M: 'static,
	E: 'static,
	X: 'static,
{
	spawn(
		move |inbox| {
			Effect::new(async move {
				loop {
					let message = match inbox.receive::<E>().fut.await {
						Ok(message) => message,
						Err(error) => return Err(error),
					};
					work(message).fut.await?;
				}
			})
		},
		on_exit,
	)
}

/// Runs `effect` in a hidden process and forwards its result to `on_done`.
///
/// The caller continues immediately. This is fire-and-forget with a landing
/// place for the outcome.
pub fn defer_to<A, E, X>(on_done: &Address<Result<A, E>>, effect: Effect<A, E>) -> Effect<(), X>
where
	A: 'static,
	E: 'static,
	X: 'static,
{
	let on_done = on_done.clone();
	Effect::new(async move {
		let scheduler = SchedulerHandle::current();
		scheduler.spawn_process(async move {
			on_done.deliver(effect.fut.await);
		});
		Ok(())
	})
}
