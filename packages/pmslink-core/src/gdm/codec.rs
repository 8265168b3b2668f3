//! GDM datagram parsing.
//!
//! Datagrams are plain text: a first line naming the verb or status, then
//! newline-separated `Key: value` headers. Servers are inconsistent about
//! `\r\n` vs `\n` and header casing, so parsing is lenient on both.

use std::net::SocketAddr;

use super::types::{DiscoveryMessage, MessageKind};

/// Checks if `haystack` contains `needle` (ASCII case-insensitive, no allocation).
#[inline]
fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Checks if `s` starts with `prefix` (ASCII case-insensitive, no allocation).
#[inline]
fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Classifies a datagram by its first line.
///
/// Status lines other than `200 OK` yield None.
fn classify(first_line: &str) -> Option<MessageKind> {
    if starts_with_ignore_ascii_case(first_line, "M-SEARCH") {
        Some(MessageKind::Search)
    } else if starts_with_ignore_ascii_case(first_line, "HELLO") {
        Some(MessageKind::Hello)
    } else if starts_with_ignore_ascii_case(first_line, "BYE") {
        Some(MessageKind::Bye)
    } else if starts_with_ignore_ascii_case(first_line, "HTTP/")
        && contains_ignore_ascii_case(first_line, "200 OK")
    {
        Some(MessageKind::Response)
    } else {
        None
    }
}

/// Parses one `Key: value` line. Lines without a colon are not headers.
fn parse_header(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Parses a GDM datagram.
///
/// Returns None for empty datagrams, unknown verbs and non-OK statuses.
pub fn parse_datagram(data: &str, sender: SocketAddr) -> Option<DiscoveryMessage> {
    let mut lines = data.lines().map(str::trim).filter(|l| !l.is_empty());
    let kind = classify(lines.next()?)?;
    let headers = lines.filter_map(parse_header).collect();

    Some(DiscoveryMessage {
        kind,
        sender,
        headers,
    })
}

/// Returns true if the datagram is a client discovery search.
pub fn is_search_request(data: &str) -> bool {
    data.contains(crate::protocol_constants::GDM_SEARCH_PREFIX)
}
