use crate::collector::collect_with;
use crate::conduit::hop_conduit;
use crate::error::TraceError;
use crate::prober::{ProbeOptions, Prober};
use chrono::{SecondsFormat, Utc};
use hopmap_model::{HopEvent, HostTrace, Round};
use std::thread;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TraceSettings {
    pub probe: ProbeOptions,
    /// Probe rounds issued per target.
    pub rounds: u32,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            probe: ProbeOptions::default(),
            rounds: 3,
        }
    }
}

/// Resolves `host` and runs `settings.rounds` rounds against it, one after
/// another.
///
/// A failing round keeps whatever events arrived before the failure and records
/// the error on the round; only resolution failure aborts the host.
pub fn trace_host<P, F>(
    prober: &P,
    host: &str,
    settings: &TraceSettings,
    observer: &F,
) -> Result<HostTrace, TraceError>
where
    P: Prober + ?Sized,
    F: Fn(&HopEvent) + Sync,
{
    if settings.rounds == 0 {
        return Err(TraceError::NoRounds);
    }

    let address = prober.resolve(host)?;
    info!(
        "traceroute to {host} ({address}), {} hops max",
        settings.probe.max_distance
    );

    let started_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut rounds = Vec::with_capacity(settings.rounds as usize);

    for index in 0..settings.rounds {
        let round = run_round(prober, host, &settings.probe, observer)?;
        if let Some(error) = &round.error {
            warn!(host, round = index, %error, "probe round failed");
        }
        rounds.push(round);
    }

    Ok(HostTrace {
        target: host.to_string(),
        address,
        started_at_utc,
        rounds,
    })
}

/// Traces every host in order, handing each finished trace to `on_host` before
/// starting the next. Hosts that fail are logged and skipped.
pub fn trace_hosts<P, F, H>(
    prober: &P,
    hosts: &[String],
    settings: &TraceSettings,
    observer: &F,
    mut on_host: H,
) -> Result<Vec<HostTrace>, TraceError>
where
    P: Prober + ?Sized,
    F: Fn(&HopEvent) + Sync,
    H: FnMut(&HostTrace),
{
    if settings.rounds == 0 {
        return Err(TraceError::NoRounds);
    }

    let mut traces = Vec::with_capacity(hosts.len());
    for host in hosts {
        match trace_host(prober, host, settings, observer) {
            Ok(trace) => {
                on_host(&trace);
                traces.push(trace);
            }
            Err(err) => warn!(host = %host, error = %err, "skipping host"),
        }
    }

    Ok(traces)
}

fn run_round<P, F>(
    prober: &P,
    host: &str,
    options: &ProbeOptions,
    observer: &F,
) -> Result<Round, TraceError>
where
    P: Prober + ?Sized,
    F: Fn(&HopEvent) + Sync,
{
    let (sender, receiver) = hop_conduit();

    thread::scope(|scope| {
        let collector = scope.spawn(move || collect_with(receiver, observer));
        let outcome = prober.probe(host, options, sender);
        let mut round = collector
            .join()
            .map_err(|_| TraceError::CollectorPanicked)?;

        if let Err(err) = outcome {
            round.error = Some(err.to_string());
        }
        Ok(round)
    })
}
