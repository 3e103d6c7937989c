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

//! Fixture actors shared by the unit tests of several modules.

use std::{cell::RefCell, rc::Rc};

use crate::{machine::StateMachine, Address, Effect};

#[derive(Debug)]
pub(crate) enum SpeakerMsg {
	Say(String),
	Yell(String),
}

/// A worker body that records what it would have said.
pub(crate) fn speaker(
	transcript: Rc<RefCell<Vec<String>>>,
) -> impl FnMut(SpeakerMsg) -> Effect<(), String> {
	move |message| {
		let line = match message {
			SpeakerMsg::Say(line) => line,
			SpeakerMsg::Yell(line) => line.to_uppercase(),
		};
		transcript.borrow_mut().push(line);
		Effect::none()
	}
}

#[derive(Debug)]
pub(crate) enum CounterMsg {
	Increment,
	SendValueTo(Address<i64>),
}

/// A counter keeping one integer of state, queryable by message.
pub(crate) struct Counter;

impl StateMachine for Counter {
	type Args = i64;
	type Model = i64;
	type Msg = CounterMsg;
	type Error = String;

	fn init(start: i64) -> (i64, Effect<(), String>) {
		(start, Effect::none())
	}

	fn update(message: CounterMsg, value: i64) -> (i64, Effect<(), String>) {
		match message {
			CounterMsg::Increment => (value + 1, Effect::none()),
			CounterMsg::SendValueTo(reply_to) => (value, reply_to.send(value)),
		}
	}
}
