//! Termination signal handling.
//!
//! There is no shutdown command; SIGINT or SIGTERM is the only way to stop
//! the daemon. The handler runs on its own thread so a cycle in flight
//! never blocks the exit.

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

pub fn handle_termination() {
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).expect("No signals :(. This really should never happen");

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
            log::info!("Received signal {signal}, shutting down");
            std::process::exit(0);
        }
    });
}
