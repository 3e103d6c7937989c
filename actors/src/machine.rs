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

use crate::{spawn, Address, Effect, Inbox};

/// An actor factored into an initial setup and a message-indexed transition.
///
/// Both functions are pure in the sense that they only build values: the
/// returned effects run under the machine's process, one at a time, between
/// receives. The model is handed over by value on every transition, so no
/// state is shared and no locking exists.
pub trait StateMachine {
	type Args: 'static;
	type Model: 'static;
	type Msg: 'static;
	type Error: 'static;

	/// Builds the initial model and a warm-up effect that runs once, before
	/// the first receive.
	fn init(args: Self::Args) -> (Self::Model, Effect<(), Self::Error>);

	/// Consumes one message and the current model, producing the next model
	/// and the effect to run before the next receive.
	fn update(
		message: Self::Msg,
		model: Self::Model,
	) -> (Self::Model, Effect<(), Self::Error>);
}

/// Starts a [`StateMachine`] as a process and yields its address.
///
/// The warm-up effect of `init` runs first. If it fails, the error goes to
/// `on_exit` and the receive loop never starts; the address is still returned,
/// and messages sent to it go nowhere. Otherwise the process loops forever:
/// receive, update, run the emitted effect. Each iteration parks on the
/// receive, so the loop holds no growing state.
///
/// A failing update effect stops the machine and is forwarded to `on_exit`.
/// Success is never forwarded, because the loop has no normal end.
pub fn spawn_state_machine<SM, X>(
	args: SM::Args,
	on_exit: &Address<Result<(), SM::Error>>,
) -> Effect<Address<SM::Msg>, X>
where
	SM: StateMachine,
	X: 'static,
{
	spawn(
		move |inbox: Inbox<SM::Msg>| {
			Effect::new(async move {
				let (mut model, warmup) = SM::init(args);
				warmup.fut.await?;
				loop {
					let message = match inbox.receive::<SM::Error>().fut.await {
						Ok(message) => message,
						Err(error) => return Err(error),
					};
					let (next_model, effect) = SM::update(message, model);
					model = next_model;
					effect.fut.await?;
				}
			})
		},
		on_exit,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		call, log_on_error,
		tests::{Counter, CounterMsg},
		Troupe,
	};

	#[test]
	fn test_counter_increments_and_reports_its_value() {
		let troupe = Troupe::new();
		let replies = Inbox::<i64>::new();
		let reply_to = replies.address();
		let result = troupe.run(
			spawn_state_machine::<Counter, String>(7, &log_on_error()).and_then(
				move |counter| {
					counter
						.send(CounterMsg::Increment)
						.keep(counter.send(CounterMsg::Increment))
						.keep(counter.send(CounterMsg::SendValueTo(reply_to)))
						.keep(replies.receive())
				},
			),
		);
		assert_eq!(result.unwrap(), Ok(9));
	}

	#[test]
	fn test_call_asks_a_fresh_counter_for_its_value() {
		let troupe = Troupe::new();
		let result = troupe.run(
			spawn_state_machine::<Counter, String>(0, &log_on_error())
				.and_then(|counter| call(&counter, CounterMsg::SendValueTo)),
		);
		assert_eq!(result.unwrap(), Ok(0));
	}

	#[test]
	fn test_init_failure_reaches_on_exit_and_the_loop_never_starts() {
		struct Broken;
		impl StateMachine for Broken {
			type Args = ();
			type Model = ();
			type Msg = u32;
			type Error = String;

			fn init(_args: ()) -> ((), Effect<(), String>) {
				((), Effect::fail("bad seed".to_string()))
			}

			fn update(_message: u32, model: ()) -> ((), Effect<(), String>) {
				(model, Effect::none())
			}
		}

		let troupe = Troupe::new();
		let exits = Inbox::<Result<(), String>>::new();
		let on_exit = exits.address();
		let result = troupe.run(
			spawn_state_machine::<Broken, String>((), &on_exit)
				.and_then(|machine| machine.send(1))
				.keep(exits.receive::<String>()),
		);
		assert_eq!(result.unwrap(), Ok(Err("bad seed".to_string())));
	}

	#[test]
	fn test_update_failure_stops_the_machine() {
		struct Fuse;
		impl StateMachine for Fuse {
			type Args = ();
			type Model = u32;
			type Msg = u32;
			type Error = String;

			fn init(_args: ()) -> (u32, Effect<(), String>) {
				(0, Effect::none())
			}

			fn update(message: u32, burnt: u32) -> (u32, Effect<(), String>) {
				if message > 10 {
					(burnt, Effect::fail(format!("overload: {message}")))
				} else {
					(burnt + message, Effect::none())
				}
			}
		}

		let troupe = Troupe::new();
		let exits = Inbox::<Result<(), String>>::new();
		let on_exit = exits.address();
		let result = troupe.run(
			spawn_state_machine::<Fuse, String>((), &on_exit)
				.and_then(|fuse| fuse.send(3).keep(fuse.send(99)))
				.keep(exits.receive::<String>()),
		);
		assert_eq!(result.unwrap(), Ok(Err("overload: 99".to_string())));
	}
}
