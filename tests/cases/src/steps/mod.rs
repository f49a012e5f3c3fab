use std::thread;
use std::time::{Duration, Instant};

use zk_election::{ElectionConfiguration, GateTimings};

pub mod cluster;

pub fn sleep_millis(millis: u64) {
	thread::sleep(Duration::from_millis(millis));
}

pub fn get_wait_timeout() -> Duration {
	Duration::from_secs(5)
}

pub fn get_election_configuration() -> ElectionConfiguration {
	ElectionConfiguration {
		endpoint: "inproc:2181".to_string(),
		..ElectionConfiguration::default()
	}
}

pub fn get_gate_timings() -> GateTimings {
	GateTimings {
		tick_delay: Duration::from_millis(50),
	}
}

/// Polls the condition until it holds or the timeout elapses.
pub fn wait_until<F>(timeout: Duration, condition: F) -> bool
	where F: Fn() -> bool {
	let deadline = Instant::now() + timeout;
	loop {
		if condition() {
			return true;
		}
		if Instant::now() >= deadline {
			return false;
		}
		sleep_millis(20);
	}
}
