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

#![deny(clippy::disallowed_methods)]

//! actors is the troupe runtime: cooperative actors over composable effects.
//!
//! It solves the following problem:
//! - describe side effects as values that can be sequenced, mapped, recovered
//!   and combined, without running anything.
//! - run many cooperating processes that communicate only through
//!   asynchronous messages, interleaving only where a process parks.
//! - keep request/reply, deferred results and state machine loops as thin
//!   layers over one inbox primitive.
//!
//! A program builds an [`Effect`] and hands it to a [`Troupe`] (or to
//! [`program`], which wires up a root actor). Processes are spawned with
//! [`spawn`] and talk through [`Address`] values minted from their [`Inbox`].

use once_cell::sync::Lazy;
use tracing::warn;

mod effect;
mod future;
mod machine;
mod mailbox;
pub(crate) mod quid;
pub(crate) mod scheduler;
mod spawn;
mod troupe;

#[cfg(test)]
pub(crate) mod tests;

pub use effect::{batch, concurrent, exit, map2, map3, map4, print, sequence, sleep, Effect};
pub use future::{promise, spawn_with_promise, Promise};
pub use machine::{spawn_state_machine, StateMachine};
pub use mailbox::{call, Address, Inbox};
pub use spawn::{defer_to, spawn, spawn_worker};
pub use troupe::{exit_on_error, log_on_error, program, RunError, Troupe};

/// Whether a message sent to a dead inbox leaves a debug log line.
///
/// Dead-letter sends succeed silently by default: a sender must not care
/// about the lifecycle of the receiver. Set `TROUPE_LOG_DEAD_LETTERS=1` to
/// make the drops visible while chasing a lost message.
pub(crate) static LOG_DEAD_LETTERS: Lazy<bool> = Lazy::new(dead_letter_logging_from_env);

fn dead_letter_logging_from_env() -> bool {
	match std::env::var("TROUPE_LOG_DEAD_LETTERS") {
		Ok(value) => match value.as_str() {
			"1" | "true" | "on" => true,
			"0" | "false" | "off" | "" => false,
			unexpected => {
				warn!(
					"failed to parse `TROUPE_LOG_DEAD_LETTERS={unexpected}` as a boolean, \
                     keeping dead-letter logging off"
				);
				false
			},
		},
		Err(std::env::VarError::NotUnicode(os_str)) => {
			warn!(
				"failed to parse `TROUPE_LOG_DEAD_LETTERS={os_str:?}` as a valid unicode \
                 string, keeping dead-letter logging off"
			);
			false
		},
		Err(std::env::VarError::NotPresent) => false,
	}
}
