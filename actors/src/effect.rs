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

use std::{future::Future, time::Duration};

use futures::{future::LocalBoxFuture, FutureExt};

use crate::future::promise;

/// A deferred computation with a success channel of type `A` and a failure
/// channel of type `E`.
///
/// Building an `Effect` performs nothing. The value describes work that is
/// carried out when a process runs it under a [`crate::Troupe`], which is the
/// only place effects execute.
///
/// An `Effect` is consumed by running it. Describing the same work twice means
/// building the value twice, and the side effects happen twice.
///
/// The failure channel behaves like `Result`: [`Effect::fail`] short-circuits
/// every subsequent [`Effect::and_then`] until a [`Effect::recover`] or
/// [`Effect::map_err`] takes it over.
pub struct Effect<A, E> {
	pub(crate) fut: LocalBoxFuture<'static, Result<A, E>>,
}

impl<A: 'static, E: 'static> Effect<A, E> {
	pub(crate) fn new<Fut>(fut: Fut) -> Self
	where
		Fut: Future<Output = Result<A, E>> + 'static,
	{
		Effect { fut: fut.boxed_local() }
	}

	pub(crate) async fn run(self) -> Result<A, E> {
		self.fut.await
	}

	/// An effect that immediately yields `value`.
	pub fn succeed(value: A) -> Self {
		Effect::new(async move { Ok(value) })
	}

	/// An effect that immediately fails with `error`.
	pub fn fail(error: E) -> Self {
		Effect::new(async move { Err(error) })
	}

	/// Lifts an already computed `Result` into an effect.
	pub fn from_result(result: Result<A, E>) -> Self {
		Effect::new(async move { result })
	}

	/// Applies `f` to the success value. Failures pass through untouched.
	pub fn map<B: 'static>(self, f: impl FnOnce(A) -> B + 'static) -> Effect<B, E> {
		Effect::new(async move { self.fut.await.map(f) })
	}

	/// Runs `self`, then feeds its success value to `next`.
	///
	/// If `self` fails, `next` is never called and the error passes through.
	pub fn and_then<B: 'static>(
		self,
		next: impl FnOnce(A) -> Effect<B, E> + 'static,
	) -> Effect<B, E> {
		Effect::new(async move {
			match self.fut.await {
				Ok(value) => next(value).fut.await,
				Err(error) => Err(error),
			}
		})
	}

	/// Runs `handler` if `self` fails. Success values pass through untouched.
	///
	/// The handler picks a fresh error type: recovering removes the old one by
	/// construction.
	pub fn recover<E2: 'static>(
		self,
		handler: impl FnOnce(E) -> Effect<A, E2> + 'static,
	) -> Effect<A, E2> {
		Effect::new(async move {
			match self.fut.await {
				Ok(value) => Ok(value),
				Err(error) => handler(error).fut.await,
			}
		})
	}

	/// Applies `f` to the failure value. Success values pass through untouched.
	pub fn map_err<E2: 'static>(self, f: impl FnOnce(E) -> E2 + 'static) -> Effect<A, E2> {
		Effect::new(async move { self.fut.await.map_err(f) })
	}

	/// Runs `self`, then `next`, yielding the value of `next`.
	pub fn keep<B: 'static>(self, next: Effect<B, E>) -> Effect<B, E> {
		self.and_then(move |_| next)
	}

	/// Runs `self`, then `next`, yielding the value of `self`.
	pub fn ignore<B: 'static>(self, next: Effect<B, E>) -> Effect<A, E> {
		self.and_then(move |value| next.map(move |_| value))
	}
}

impl<E: 'static> Effect<(), E> {
	/// The effect that does nothing.
	pub fn none() -> Self {
		Effect::succeed(())
	}
}

impl<F: 'static, E: 'static> Effect<F, E> {
	/// Applicative application: runs `self` to obtain a function, then
	/// `argument` to obtain its input.
	pub fn and_map<A: 'static, B: 'static>(self, argument: Effect<A, E>) -> Effect<B, E>
	where
		F: FnOnce(A) -> B,
	{
		Effect::new(async move {
			let f = self.fut.await?;
			let value = argument.fut.await?;
			Ok(f(value))
		})
	}
}

/// Combines two effects with a pure function.
///
/// The arguments run sequentially, left to right. This is observable when they
/// have side effects.
pub fn map2<A, B, Z, E>(
	f: impl FnOnce(A, B) -> Z + 'static,
	first: Effect<A, E>,
	second: Effect<B, E>,
) -> Effect<Z, E>
where
	A: 'static,
	B: 'static,
	Z: 'static,
	E: 'static,
{
	Effect::new(async move {
		let a = first.fut.await?;
		let b = second.fut.await?;
		Ok(f(a, b))
	})
}

/// Combines three effects with a pure function, sequentially left to right.
pub fn map3<A, B, C, Z, E>(
	f: impl FnOnce(A, B, C) -> Z + 'static,
	first: Effect<A, E>,
	second: Effect<B, E>,
	third: Effect<C, E>,
) -> Effect<Z, E>
where
	A: 'static,
	B: 'static,
	C: 'static,
	Z: 'static,
	E: 'static,
{
	Effect::new(async move {
		let a = first.fut.await?;
		let b = second.fut.await?;
		let c = third.fut.await?;
		Ok(f(a, b, c))
	})
}

/// Combines four effects with a pure function, sequentially left to right.
pub fn map4<A, B, C, D, Z, E>(
	f: impl FnOnce(A, B, C, D) -> Z + 'static,
	first: Effect<A, E>,
	second: Effect<B, E>,
	third: Effect<C, E>,
	fourth: Effect<D, E>,
) -> Effect<Z, E>
where
	A: 'static,
	B: 'static,
	C: 'static,
	D: 'static,
	Z: 'static,
	E: 'static,
{
	Effect::new(async move {
		let a = first.fut.await?;
		let b = second.fut.await?;
		let c = third.fut.await?;
		let d = fourth.fut.await?;
		Ok(f(a, b, c, d))
	})
}

/// Runs the effects in order, discarding their values.
///
/// Stops at the first failure. Effects that already ran are not undone.
pub fn batch<E: 'static>(effects: Vec<Effect<(), E>>) -> Effect<(), E> {
	Effect::new(async move {
		for effect in effects {
			effect.fut.await?;
		}
		Ok(())
	})
}

/// Runs the effects in order and collects their values.
///
/// Stops at the first failure. Effects that already ran are not undone.
pub fn sequence<A: 'static, E: 'static>(effects: Vec<Effect<A, E>>) -> Effect<Vec<A>, E> {
	Effect::new(async move {
		let mut values = Vec::with_capacity(effects.len());
		for effect in effects {
			values.push(effect.fut.await?);
		}
		Ok(values)
	})
}

/// Runs the effects interleaved and collects their values in input order.
///
/// Each effect runs as its own hidden process, so they make progress
/// independently of each other. The first failure, in input order, is
/// reported. Peers are not cancelled when that happens: they run to
/// completion and their results are discarded.
pub fn concurrent<A: 'static, E: 'static>(effects: Vec<Effect<A, E>>) -> Effect<Vec<A>, E> {
	Effect::new(async move {
		let mut promises = Vec::with_capacity(effects.len());
		for effect in effects {
			promises.push(promise(effect).fut.await?);
		}
		let mut values = Vec::with_capacity(promises.len());
		for promise in promises {
			values.push(promise.join().fut.await?);
		}
		Ok(values)
	})
}

/// Writes `line` followed by a newline to standard output.
pub fn print<E: 'static>(line: impl Into<String>) -> Effect<(), E> {
	let line = line.into();
	Effect::new(async move {
		println!("{line}");
		Ok(())
	})
}

/// Parks the running process for at least `duration`.
pub fn sleep<E: 'static>(duration: Duration) -> Effect<(), E> {
	Effect::new(async move {
		tokio::time::sleep(duration).await;
		Ok(())
	})
}

/// Terminates the host process with `status`. Does not return, so any effect
/// sequenced after it is unreachable and its success type is free.
pub fn exit<A: 'static, E: 'static>(status: i32) -> Effect<A, E> {
	Effect::new(async move {
		let never: Result<A, E> = std::process::exit(status);
		never
	})
}

#[cfg(test)]
mod tests {
	use std::{
		cell::{Cell, RefCell},
		rc::Rc,
		time::Duration,
	};

	use super::*;
	use crate::{Inbox, Troupe};

	fn note(
		log: &Rc<RefCell<Vec<&'static str>>>,
		entry: &'static str,
	) -> Effect<(), String> {
		let log = log.clone();
		Effect::none().map(move |_| log.borrow_mut().push(entry))
	}

	#[test]
	fn test_and_then_feeds_the_success_value() {
		let troupe = Troupe::new();
		let result =
			troupe.run(Effect::<i32, String>::succeed(3).and_then(|n| Effect::succeed(n * 2)));
		assert_eq!(result.unwrap(), Ok(6));
	}

	#[test]
	fn test_fail_skips_every_continuation() {
		let troupe = Troupe::new();
		let touched = Rc::new(Cell::new(false));
		let flag = touched.clone();
		let result = troupe.run(Effect::<i32, String>::fail("boom".to_string()).and_then(
			move |n| {
				flag.set(true);
				Effect::succeed(n)
			},
		));
		assert_eq!(result.unwrap(), Err("boom".to_string()));
		assert!(!touched.get());
	}

	#[test]
	fn test_recover_handles_the_failure() {
		let troupe = Troupe::new();
		let result = troupe.run(
			Effect::<i32, String>::fail("boom".to_string())
				.recover(|error| Effect::<_, String>::succeed(error.len() as i32)),
		);
		assert_eq!(result.unwrap(), Ok(4));
	}

	#[test]
	fn test_recover_passes_successes_through() {
		let troupe = Troupe::new();
		let touched = Rc::new(Cell::new(false));
		let flag = touched.clone();
		let result = troupe.run(Effect::<i32, String>::succeed(7).recover(move |_| {
			flag.set(true);
			Effect::<_, String>::succeed(0)
		}));
		assert_eq!(result.unwrap(), Ok(7));
		assert!(!touched.get());
	}

	#[test]
	fn test_map_and_map_err_touch_one_channel_each() {
		let troupe = Troupe::new();
		let ok = troupe.run(Effect::<i32, String>::succeed(20).map(|n| n + 1));
		assert_eq!(ok.unwrap(), Ok(21));
		let err = troupe
			.run(Effect::<i32, String>::fail("oh".to_string()).map_err(|error| error.len()));
		assert_eq!(err.unwrap(), Err(2));
	}

	#[test]
	fn test_and_map_applies_the_wrapped_function() {
		let troupe = Troupe::new();
		let result = troupe
			.run(Effect::<_, String>::succeed(|n: i32| n + 1).and_map(Effect::succeed(41)));
		assert_eq!(result.unwrap(), Ok(42));
	}

	#[test]
	fn test_map2_runs_arguments_left_to_right() {
		let troupe = Troupe::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let first = note(&log, "first").map(|_| 1);
		let second = note(&log, "second").map(|_| 2);
		let result = troupe.run(map2(|a, b| a + b, first, second));
		assert_eq!(result.unwrap(), Ok(3));
		assert_eq!(*log.borrow(), ["first", "second"]);
	}

	#[test]
	fn test_keep_and_ignore_pick_one_value() {
		let troupe = Troupe::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let kept = note(&log, "a").map(|_| 1).keep(note(&log, "b").map(|_| 2));
		assert_eq!(troupe.run(kept).unwrap(), Ok(2));
		let ignored = note(&log, "c").map(|_| 3).ignore(note(&log, "d").map(|_| 4));
		assert_eq!(troupe.run(ignored).unwrap(), Ok(3));
		assert_eq!(*log.borrow(), ["a", "b", "c", "d"]);
	}

	#[test]
	fn test_sequence_collects_in_order_and_short_circuits() {
		let troupe = Troupe::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let result = troupe.run(sequence(vec![
			note(&log, "a").map(|_| 1),
			note(&log, "b").map(|_| 2),
		]));
		assert_eq!(result.unwrap(), Ok(vec![1, 2]));
		assert_eq!(*log.borrow(), ["a", "b"]);

		let log = Rc::new(RefCell::new(Vec::new()));
		let result = troupe.run(sequence(vec![
			note(&log, "a").map(|_| 1),
			Effect::fail("stop".to_string()),
			note(&log, "never").map(|_| 3),
		]));
		assert_eq!(result.unwrap(), Err("stop".to_string()));
		assert_eq!(*log.borrow(), ["a"]);
	}

	#[test]
	fn test_batch_runs_in_order_and_short_circuits() {
		let troupe = Troupe::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let result = troupe.run(batch(vec![
			note(&log, "a"),
			Effect::fail("stop".to_string()),
			note(&log, "never"),
		]));
		assert_eq!(result.unwrap(), Err("stop".to_string()));
		assert_eq!(*log.borrow(), ["a"]);
	}

	#[test]
	fn test_empty_lists_yield_their_neutral_values() {
		let troupe = Troupe::new();
		assert_eq!(troupe.run(batch::<String>(Vec::new())).unwrap(), Ok(()));
		assert_eq!(
			troupe.run(sequence::<i32, String>(Vec::new())).unwrap(),
			Ok(Vec::new())
		);
		assert_eq!(
			troupe.run(concurrent::<i32, String>(Vec::new())).unwrap(),
			Ok(Vec::new())
		);
	}

	#[test]
	fn test_concurrent_keeps_input_order() {
		let troupe = Troupe::with_accelerated_time();
		let result = troupe.run(concurrent(vec![
			sleep::<String>(Duration::from_millis(30)).map(|_| 1),
			sleep::<String>(Duration::from_millis(10)).map(|_| 2),
			Effect::succeed(3),
		]));
		assert_eq!(result.unwrap(), Ok(vec![1, 2, 3]));
	}

	#[test]
	fn test_concurrent_reports_first_failure_and_peers_still_finish() {
		let troupe = Troupe::with_accelerated_time();
		let probe = Inbox::<&'static str>::new();
		let done = probe.address();
		let result = troupe.run(concurrent(vec![
			Effect::<i32, &'static str>::succeed(1),
			Effect::fail("x"),
			sleep(Duration::from_millis(50)).keep(done.send("peer-finished")).map(|_| 3),
		]));
		assert_eq!(result.unwrap(), Err("x"));
		assert_eq!(probe.drain_for_test(), vec!["peer-finished"]);
	}
}
