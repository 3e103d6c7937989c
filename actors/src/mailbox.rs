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

use std::{fmt, rc::Rc, sync::Arc};

use tracing::debug;

use crate::{
	quid::new_quid,
	scheduler::{Parked, SchedulerHandle},
	Effect,
};

/// A FIFO message queue owned by one process.
///
/// The inbox is the receiving end. Any number of [`Address`] values can point
/// at it, each with its own view of the message type. Dropping the inbox is
/// what ends its life: every address minted from it then becomes a dead-letter
/// sink whose sends succeed without any observable effect.
///
/// An unbounded flume channel backs the queue. The channel either holds
/// pending messages or pending receivers, never both, so a send hands its
/// message to the oldest parked receiver when there is one and enqueues it
/// otherwise.
pub struct Inbox<M> {
	label: Arc<str>,
	tx: flume::Sender<M>,
	rx: flume::Receiver<M>,
}

impl<M: 'static> Inbox<M> {
	/// Allocates a fresh inbox with its own identity.
	pub fn new() -> Inbox<M> {
		Inbox::named("inbox")
	}

	pub(crate) fn named(kind: &str) -> Inbox<M> {
		let (tx, rx) = flume::unbounded();
		Inbox { label: new_quid(kind).into(), tx, rx }
	}

	/// An identifier for logging. Unique per inbox, stable for its lifetime.
	pub fn id(&self) -> &str {
		&self.label
	}

	/// The identity address: sends of `M` go to this inbox untouched.
	pub fn address(&self) -> Address<M> {
		self.address_with(|message| message)
	}

	/// An address that accepts `V` and applies `tag` before delivery.
	///
	/// One inbox can hand out any number of differently typed addresses this
	/// way. The transform runs on the sender's side, at delivery time.
	pub fn address_with<V: 'static>(&self, tag: impl Fn(V) -> M + 'static) -> Address<V> {
		let tx = self.tx.clone();
		let label = self.label.clone();
		Address {
			label: self.label.clone(),
			deliver: Rc::new(move |value| {
				if tx.send(tag(value)).is_err() && *crate::LOG_DEAD_LETTERS {
					debug!(inbox = %label, "dropping message sent to a dead inbox");
				}
			}),
		}
	}

	/// Takes the next message, parking the process while the queue is empty.
	///
	/// Messages are handed out in arrival order. If several receives are
	/// outstanding on the same inbox, the oldest one is served first. A
	/// receive on an inbox that can no longer be sent to parks forever.
	pub fn receive<E: 'static>(&self) -> Effect<M, E> {
		let rx = self.rx.clone();
		Effect::new(async move {
			let scheduler = SchedulerHandle::current();
			let message = Parked::new(scheduler, async move {
				match rx.recv_async().await {
					Ok(message) => message,
					Err(_all_senders_gone) => futures::future::pending().await,
				}
			})
			.await;
			Ok(message)
		})
	}

	/// Empties the queue without parking and returns the pending messages.
	#[cfg(any(test, feature = "testsuite"))]
	pub fn drain_for_test(&self) -> Vec<M> {
		let mut messages = Vec::new();
		while let Ok(message) = self.rx.try_recv() {
			messages.push(message);
		}
		messages
	}
}

impl<M: 'static> Default for Inbox<M> {
	fn default() -> Inbox<M> {
		Inbox::new()
	}
}

impl<M> fmt::Debug for Inbox<M> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_tuple("Inbox").field(&self.label).finish()
	}
}

/// A send-only capability targeting one inbox, or a direct handler.
///
/// It is lightweight to clone. Addresses do not keep their inbox alive: once
/// the owning process is gone, sending becomes a silent no-op. A sender can
/// therefore never be failed by the independent lifecycle of the receiver,
/// and [`Address::send`] has a free error type.
pub struct Address<V> {
	label: Arc<str>,
	deliver: Rc<dyn Fn(V)>,
}

impl<V: 'static> Address<V> {
	/// An address backed by a plain function instead of an inbox.
	pub(crate) fn from_handler(label: &str, handler: impl Fn(V) + 'static) -> Address<V> {
		Address { label: label.into(), deliver: Rc::new(handler) }
	}

	/// Delivers `value` to the target. Never fails.
	///
	/// The message is fully enqueued (or handed to a parked receiver) before
	/// this effect completes, so a send followed by another operation of the
	/// sender is visible to the target first.
	pub fn send<E: 'static>(&self, value: V) -> Effect<(), E> {
		let address = self.clone();
		Effect::new(async move {
			address.deliver(value);
			Ok(())
		})
	}

	pub(crate) fn deliver(&self, value: V) {
		(self.deliver)(value)
	}
}

impl<V> Clone for Address<V> {
	fn clone(&self) -> Self {
		Address { label: self.label.clone(), deliver: self.deliver.clone() }
	}
}

impl<V> fmt::Debug for Address<V> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_tuple("Address").field(&self.label).finish()
	}
}

/// Request/reply over a throwaway inbox.
///
/// `request` receives the address replies should go to and builds the message
/// to send. The effect completes when the reply arrives.
///
/// ```ignore
/// let value = call(&counter, CounterMsg::SendValueTo);
/// ```
pub fn call<M, R, E>(
	address: &Address<M>,
	request: impl FnOnce(Address<R>) -> M + 'static,
) -> Effect<R, E>
where
	M: 'static,
	R: 'static,
	E: 'static,
{
	let address = address.clone();
	Effect::new(async move {
		let reply_inbox = Inbox::named("reply");
		address.deliver(request(reply_inbox.address()));
		reply_inbox.receive::<E>().fut.await
	})
}
