//! Optional network-reachability diagnostic.
//!
//! Annotates log messages only — it never gates control flow. The
//! Downstream Probe remains the sole authority on holiday vs. outage; this
//! just tells an operator whether a failing reconnect correlates with "no
//! internet route at all" or "route exists, something else is wrong".

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const PROBE_TARGETS: [&str; 2] = ["8.8.8.8:53", "1.1.1.1:53"];

/// Best-effort raw TCP connect to a well-known DNS resolver. Never errors;
/// any failure along the way is reported as unreachable.
pub async fn is_internet_available() -> bool {
    tokio::task::spawn_blocking(|| PROBE_TARGETS.iter().any(|target| probe_one(target)))
        .await
        .unwrap_or(false)
}

fn probe_one(target: &str) -> bool {
    let Ok(mut addrs) = target.to_socket_addrs() else {
        return false;
    };
    addrs
        .next()
        .map(|addr| TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolvable_target_is_not_reachable() {
        assert!(!probe_one("this-host-does-not-resolve.invalid:53"));
    }
}
