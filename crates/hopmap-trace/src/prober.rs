use crate::conduit::HopSender;
use crate::error::TraceError;
use crate::parser::parse_hop_line;
use std::io::{BufRead, BufReader, Read};
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::process::{ChildStdout, Command, Stdio};
use std::thread;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOptions {
    /// Highest TTL probed, inclusive.
    pub max_distance: u32,
    pub first_distance: u32,
    /// Extra attempts per distance before it is reported as a timeout.
    pub retries: u32,
    pub wait_ms: u64,
    /// Skip reverse lookups of responders.
    pub numeric: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            max_distance: 64,
            first_distance: 1,
            retries: 0,
            wait_ms: 3000,
            numeric: false,
        }
    }
}

/// Source of hop events for one round.
///
/// `probe` owns the sending half of the round's conduit and the round ends when
/// it is dropped, so implementations must not keep it past their return.
pub trait Prober: Sync {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr, TraceError> {
        resolve_ipv4(host)
    }

    fn probe(&self, host: &str, options: &ProbeOptions, conduit: HopSender)
        -> Result<(), TraceError>;
}

pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, TraceError> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    let resolved: Vec<IpAddr> = (host, 0)
        .to_socket_addrs()
        .map_err(|source| TraceError::Resolve {
            host: host.to_string(),
            source,
        })?
        .map(|addr| addr.ip())
        .collect();

    resolved
        .iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| TraceError::NoIpv4 {
            host: host.to_string(),
            resolved,
        })
}

/// Runs the system `traceroute` binary and streams its hop lines.
#[derive(Debug, Clone)]
pub struct SystemTraceroute {
    program: String,
}

impl Default for SystemTraceroute {
    fn default() -> Self {
        Self::new("traceroute")
    }
}

impl SystemTraceroute {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub fn arguments(&self, host: &str, options: &ProbeOptions) -> Vec<String> {
        let wait_secs = ((options.wait_ms + 999) / 1000).max(1);

        let mut args = Vec::new();
        // Linux traceroute is dual-stack; hop addresses are IPv4 only
        if cfg!(target_os = "linux") {
            args.push("-4".to_string());
        }
        args.extend([
            "-q".to_string(),
            (options.retries + 1).to_string(),
            "-f".to_string(),
            options.first_distance.max(1).to_string(),
            "-m".to_string(),
            options.max_distance.to_string(),
            "-w".to_string(),
            wait_secs.to_string(),
        ]);
        if options.numeric {
            args.push("-n".to_string());
        }
        args.push(host.to_string());
        args
    }
}

impl Prober for SystemTraceroute {
    fn probe(
        &self,
        host: &str,
        options: &ProbeOptions,
        conduit: HopSender,
    ) -> Result<(), TraceError> {
        let args = self.arguments(host, options);
        debug!(program = %self.program, ?args, "spawning probe");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TraceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TraceError::ProbeFailed {
                    host: host.to_string(),
                    message: "missing traceroute output pipes".to_string(),
                });
            }
        };

        let stderr_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = BufReader::new(stderr).read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        });

        let streamed = stream_hops(stdout, &conduit);
        drop(conduit);

        // stop a child nobody is listening to any more
        if !matches!(streamed, Ok(true)) {
            let _ = child.kill();
        }
        let status = child.wait()?;
        let stderr_text = stderr_reader.join().unwrap_or_default();
        streamed?;

        if !status.success() {
            return Err(TraceError::ProbeFailed {
                host: host.to_string(),
                message: format!("traceroute exited with {status}: {}", stderr_text.trim()),
            });
        }

        Ok(())
    }
}

/// Forwards parsed hop lines until stdout closes. Returns false when the
/// collector hung up first. Bytes that are not UTF-8 are replaced, not fatal.
fn stream_hops(stdout: ChildStdout, conduit: &HopSender) -> Result<bool, TraceError> {
    for line in BufReader::new(stdout).split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        match parse_hop_line(&line) {
            Ok(event) => {
                if conduit.send(event).is_err() {
                    return Ok(false);
                }
            }
            Err(err) => trace!("skipping line: {err}"),
        }
    }
    Ok(true)
}
