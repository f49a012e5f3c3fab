//! # Leader election test cases
//!
//! This subproject provides integration scenarios for the election monitor and the gated
//! worker, running several candidates against one in-memory coordination store.

#[macro_use]
extern crate log;
extern crate election_modules;
extern crate zk_election;

mod steps;


#[cfg(test)]
mod tests {
	use super::cases;

	#[test]
	fn smoke() {
		cases::smoke::run();
	}

	#[test]
	fn failover() {
		cases::failover::run();
	}

	#[test]
	fn disconnect() {
		cases::disconnect::run();
	}

	#[test]
	fn mutual_exclusion() {
		cases::mutual_exclusion::run();
	}

	#[test]
	fn sink_failure() {
		cases::sink_failure::run();
	}
}
