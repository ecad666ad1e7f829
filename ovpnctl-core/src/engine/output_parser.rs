//! Pattern-based parser for openvpn process output
//!
//! Turns openvpn log lines into [`EngineEvent`]s using regex patterns

use crate::engine::EngineEvent;
use regex::Regex;

/// Parser for openvpn stdout
pub struct OutputParser {
    /// Pattern for "Initialization Sequence Completed"
    connected_pattern: Regex,
    /// Pattern for "Peer Connection Initiated with [AF_INET]203.0.113.7:1194"
    peer_initiated_pattern: Regex,
    /// Pattern for assigned tunnel address, iproute2 and netlink forms
    assign_ip_pattern: Regex,
    auth_failed_pattern: Regex,
    /// Pattern for soft restarts
    reconnecting_pattern: Regex,
    /// Pattern for "SIGTERM[hard,] received, process exiting"
    exiting_pattern: Regex,
    tls_error_pattern: Regex,
    resolve_error_pattern: Regex,
    tun_error_pattern: Regex,
    options_error_pattern: Regex,
}

impl OutputParser {
    /// Create a new OutputParser with compiled regex patterns
    pub fn new() -> Self {
        Self {
            connected_pattern: Regex::new(r"Initialization Sequence Completed")
                .expect("Failed to compile connected pattern"),
            peer_initiated_pattern: Regex::new(r"Peer Connection Initiated with (?:\[AF_INET6?\])?(\S+)")
                .expect("Failed to compile peer_initiated pattern"),
            assign_ip_pattern: Regex::new(
                r"(?:ip addr add dev (\S+) (\S+)|net_addr_v4_add: (\S+) dev (\S+))",
            )
            .expect("Failed to compile assign_ip pattern"),
            auth_failed_pattern: Regex::new(r"AUTH_FAILED")
                .expect("Failed to compile auth_failed pattern"),
            reconnecting_pattern: Regex::new(r"SIGUSR1\[[^\]]*\] received|Restart pause")
                .expect("Failed to compile reconnecting pattern"),
            exiting_pattern: Regex::new(r"(SIG\w+)\[[^\]]*\] received, process exiting")
                .expect("Failed to compile exiting pattern"),
            tls_error_pattern: Regex::new(r"TLS Error|TLS handshake failed")
                .expect("Failed to compile tls_error pattern"),
            resolve_error_pattern: Regex::new(r"RESOLVE: Cannot resolve host address: (\S+)")
                .expect("Failed to compile resolve_error pattern"),
            tun_error_pattern: Regex::new(r"(?i)cannot open tun/tap dev|cannot ioctl TUNSETIFF")
                .expect("Failed to compile tun_error pattern"),
            options_error_pattern: Regex::new(r"Options error: (.*)")
                .expect("Failed to compile options_error pattern"),
        }
    }

    /// Parse a line of openvpn output
    ///
    /// Returns `None` for lines that carry no lifecycle information
    pub fn parse_line(&self, line: &str) -> Option<EngineEvent> {
        let line = line.trim();

        if self.connected_pattern.is_match(line) {
            return Some(EngineEvent::new("CONNECTED", ""));
        }

        if let Some(captures) = self.peer_initiated_pattern.captures(line) {
            let peer = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            return Some(EngineEvent::new("CONNECTING", peer));
        }

        if let Some(captures) = self.assign_ip_pattern.captures(line) {
            // iproute2 form is "dev ADDR", netlink form is "ADDR dev"
            let (device, addr) = match (captures.get(1), captures.get(2)) {
                (Some(dev), Some(addr)) => (dev.as_str(), addr.as_str()),
                _ => (
                    captures.get(4).map(|m| m.as_str()).unwrap_or_default(),
                    captures.get(3).map(|m| m.as_str()).unwrap_or_default(),
                ),
            };
            return Some(EngineEvent::new("ASSIGN_IP", format!("{} {}", device, addr)));
        }

        if self.auth_failed_pattern.is_match(line) {
            return Some(EngineEvent::error("AUTH_FAILED", line, true));
        }

        if let Some(captures) = self.options_error_pattern.captures(line) {
            let detail = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            return Some(EngineEvent::error("CONFIG_ERROR", detail, true));
        }

        if self.tun_error_pattern.is_match(line) {
            return Some(EngineEvent::error("TUN_ERROR", line, true));
        }

        if let Some(captures) = self.resolve_error_pattern.captures(line) {
            let host = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            return Some(EngineEvent::error("RESOLVE_ERROR", host, false));
        }

        if self.tls_error_pattern.is_match(line) {
            return Some(EngineEvent::error("TLS_ERROR", line, false));
        }

        if self.reconnecting_pattern.is_match(line) {
            return Some(EngineEvent::new("RECONNECTING", line));
        }

        if let Some(captures) = self.exiting_pattern.captures(line) {
            let signal = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            return Some(EngineEvent::new("DISCONNECTED", signal));
        }

        None
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}
