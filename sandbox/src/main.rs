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

use std::time::Duration;

use actors::{
	batch, call, concurrent, log_on_error, print, program, sleep, spawn_state_machine,
	spawn_worker, Address, Effect, Inbox, StateMachine,
};
use clap::{Arg, Command};
use tracing::info;

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();
	let matches = Command::new("sandbox")
		.about("Demo programs for the troupe runtime")
		.arg(
			Arg::new("demo")
				.help("Which demo to run")
				.value_parser(["speak", "countdown", "fanout"])
				.default_value("speak"),
		)
		.get_matches();
	let demo = matches.get_one::<String>("demo").map(String::as_str);
	info!(demo = demo.unwrap_or("speak"), "starting demo");
	match demo {
		Some("countdown") => countdown(),
		Some("fanout") => fanout(),
		_ => speak(),
	}
}

#[derive(Debug)]
enum SpeakerMsg {
	Say(String),
	Yell(String),
}

fn announcer() -> impl FnMut(SpeakerMsg) -> Effect<(), String> {
	|message| match message {
		SpeakerMsg::Say(line) => print(line),
		SpeakerMsg::Yell(line) => print(line.to_uppercase()),
	}
}

/// One worker, two messages, two lines on stdout.
fn speak() {
	program(|_root: Inbox<()>| {
		spawn_worker(announcer(), &log_on_error()).and_then(|voice| {
			voice
				.send(SpeakerMsg::Say("The play begins".to_string()))
				.keep(voice.send(SpeakerMsg::Yell("places, everyone".to_string())))
		})
	});
}

/// Plain sequenced effects, no second process involved.
fn countdown() {
	program(|_root: Inbox<()>| {
		let ticks = (1..=3u32)
			.rev()
			.map(|n| print(format!("{n}...")).keep(sleep(Duration::from_millis(300))))
			.collect();
		batch(ticks).keep(print("liftoff"))
	});
}

#[derive(Debug)]
enum TallyMsg {
	Add(u64),
	Total(Address<u64>),
}

struct Tally;

impl StateMachine for Tally {
	type Args = u64;
	type Model = u64;
	type Msg = TallyMsg;
	type Error = String;

	fn init(start: u64) -> (u64, Effect<(), String>) {
		(start, Effect::none())
	}

	fn update(message: TallyMsg, total: u64) -> (u64, Effect<(), String>) {
		match message {
			TallyMsg::Add(amount) => (total + amount, Effect::none()),
			TallyMsg::Total(reply_to) => (total, reply_to.send(total)),
		}
	}
}

/// Four concurrent jobs feeding one state machine, then a request/reply.
fn fanout() {
	program(|_root: Inbox<()>| {
		spawn_state_machine::<Tally, String>(0, &log_on_error()).and_then(|tally| {
			let jobs = (1..=4u64)
				.map(|n| {
					let tally = tally.clone();
					sleep(Duration::from_millis(25 * n))
						.keep(tally.send(TallyMsg::Add(n * n)))
				})
				.collect();
			concurrent(jobs)
				.and_then(move |_| call(&tally, TallyMsg::Total))
				.and_then(|total| print(format!("sum of squares: {total}")))
		})
	});
}
