use crate::error::TraceError;
use hopmap_model::HopEvent;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Parses one `traceroute` hop line into a single event.
///
/// Accepts both `3  host (10.0.0.3)  1.2 ms` and numeric `3  10.0.0.3  1.2 ms`.
/// With several probes on one line the first answer wins; a line where every
/// probe is `*` becomes a timeout.
pub fn parse_hop_line(line: &str) -> Result<HopEvent, TraceError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let first = tokens
        .first()
        .ok_or_else(|| TraceError::Parse(line.to_string()))?;

    if !first.chars().all(|c| c.is_ascii_digit()) {
        return Err(TraceError::Parse(line.to_string()));
    }
    let distance: u32 = first
        .parse()
        .map_err(|_| TraceError::Parse(line.to_string()))?;

    Ok(first_reply(distance, &tokens[1..]).unwrap_or_else(|| HopEvent::timeout(distance)))
}

fn first_reply(distance: u32, tokens: &[&str]) -> Option<HopEvent> {
    let mut responder: Option<(Ipv4Addr, &str)> = None;
    let mut pending_name: Option<&str> = None;
    let mut i = 0;

    while i < tokens.len() {
        let tok = tokens[i];

        if tok == "*" || tok.starts_with('!') {
            i += 1;
            continue;
        }

        if let Ok(addr) = tok.parse::<Ipv4Addr>() {
            responder = Some((addr, ""));
            pending_name = Some(tok);
            i += 1;
            continue;
        }

        if let Some(addr) = bracketed_ipv4(tok) {
            let name = pending_name
                .filter(|name| *name != addr.to_string())
                .unwrap_or("");
            responder = Some((addr, name));
            pending_name = None;
            i += 1;
            continue;
        }

        let next = tokens.get(i + 1).copied();
        if let Some((ms, consumed_next)) = parse_rtt(tok, next) {
            if let Some((addr, name)) = responder {
                return Some(HopEvent::reply(distance, addr, name, ms_to_duration(ms)));
            }
            i += if consumed_next { 2 } else { 1 };
            continue;
        }

        pending_name = Some(tok);
        i += 1;
    }

    None
}

fn bracketed_ipv4(token: &str) -> Option<Ipv4Addr> {
    token
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|inner| inner.parse().ok())
}

fn parse_rtt(token: &str, next: Option<&str>) -> Option<(f64, bool)> {
    if let Some(num) = token.strip_suffix("ms") {
        if let Ok(val) = num.parse::<f64>() {
            return valid_rtt(val).map(|val| (val, false));
        }
    }

    if let Ok(val) = token.parse::<f64>() {
        if matches!(next, Some(next_tok) if next_tok.starts_with("ms")) {
            return valid_rtt(val).map(|val| (val, true));
        }
    }

    None
}

fn valid_rtt(val: f64) -> Option<f64> {
    (val.is_finite() && val >= 0.0).then_some(val)
}

fn ms_to_duration(ms: f64) -> Duration {
    Duration::from_micros((ms * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_line_is_rejected() {
        let line = "traceroute to 1.1.1.1 (1.1.1.1), 30 hops max, 60 byte packets";
        assert!(parse_hop_line(line).is_err());
        assert!(parse_hop_line("   ").is_err());
    }

    #[test]
    fn rtt_accepts_glued_suffix() {
        assert_eq!(parse_rtt("1.5ms", None), Some((1.5, false)));
        assert_eq!(parse_rtt("1.5", Some("ms")), Some((1.5, true)));
        assert_eq!(parse_rtt("1.5", Some("x")), None);
        assert_eq!(parse_rtt("-1.0ms", None), None);
    }
}
