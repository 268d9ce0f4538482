use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{host} has no IPv4 address (resolved to {resolved:?})")]
    NoIpv4 { host: String, resolved: Vec<IpAddr> },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe against {host} failed: {message}")]
    ProbeFailed { host: String, message: String },

    #[error("unparsable hop line: {0}")]
    Parse(String),

    #[error("round count must be at least 1")]
    NoRounds,

    #[error("round collector panicked")]
    CollectorPanicked,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
