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

use rand::{distributions::Alphanumeric, prelude::*};

const BIRDS: &[&str] = &[
	"avocet", "bittern", "crane", "dunlin", "egret", "finch", "godwit", "heron", "kestrel",
	"lapwing", "merlin", "osprey", "petrel", "plover", "raven", "sanderling", "shrike", "skua",
	"swift", "tern", "wagtail", "wren",
];

/// Returns a readable unique id for an inbox or process of the given kind.
pub(crate) fn new_quid(kind: &str) -> String {
	let mut rng = rand::thread_rng();
	let bird = BIRDS[rng.gen_range(0..BIRDS.len())];
	let slug: String = rng.sample_iter(&Alphanumeric).take(4).map(char::from).collect();
	format!("{kind}-{bird}-{slug}")
}
