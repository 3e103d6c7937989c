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

// This software includes code developed by QuerentAI LLC (https://querent.xyz).

use std::fmt;

use crate::{
	scheduler::SchedulerHandle,
	spawn::do_spawn,
	Address, Effect, Inbox,
};

/// The eventual result of a computation running in its own process.
///
/// A promise is a one-shot inbox of `Result<A, E>`. The hidden process started
/// by [`promise`] posts its terminal result there, and [`Promise::join`]
/// consumes it. Joining takes the promise by value, so waiting twice is not
/// expressible.
pub struct Promise<A, E> {
	inbox: Inbox<Result<A, E>>,
}

impl<A: 'static, E: 'static> Promise<A, E> {
	/// Parks until the result is available, then yields it.
	///
	/// If the result arrived before the join, it is taken without parking.
	pub fn join(self) -> Effect<A, E> {
		self.inbox.receive().and_then(Effect::from_result)
	}
}

impl<A: 'static, E: 'static> fmt::Debug for Promise<A, E> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_tuple("Promise").field(&self.inbox.id()).finish()
	}
}

/// Starts `effect` in a hidden process and yields a [`Promise`] of its result.
///
/// The caller continues immediately; the effect body runs on a later
/// scheduler turn, interleaved with the caller.
pub fn promise<A, E, X>(effect: Effect<A, E>) -> Effect<Promise<A, E>, X>
where
	A: 'static,
	E: 'static,
	X: 'static,
{
	Effect::new(async move {
		let scheduler = SchedulerHandle::current();
		let inbox = Inbox::named("promise");
		let resolve = inbox.address();
		scheduler.spawn_process(async move {
			resolve.deliver(effect.fut.await);
		});
		Ok(Promise { inbox })
	})
}

/// Spawns `actor` and pairs its address with a promise of its exit result.
///
/// This is [`crate::spawn`] with the on-exit channel folded into the return
/// value instead of being supplied by the caller.
pub fn spawn_with_promise<M, A, E, X>(
	actor: impl FnOnce(Inbox<M>) -> Effect<A, E> + 'static,
) -> Effect<(Address<M>, Promise<A, E>), X>
where
	M: 'static,
	A: 'static,
	E: 'static,
	X: 'static,
{
	Effect::new(async move {
		let inbox = Inbox::named("promise");
		let on_exit = inbox.address();
		let address = do_spawn(&SchedulerHandle::current(), actor, on_exit);
		Ok((address, Promise { inbox }))
	})
}
