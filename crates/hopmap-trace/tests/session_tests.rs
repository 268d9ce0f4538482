use hopmap_model::HopEvent;
use hopmap_trace::{
    collect, hop_conduit, trace_host, trace_hosts, HopSender, ProbeOptions, Prober, TraceError,
    TraceSettings,
};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

fn reply(distance: u32, last_octet: u8, name: &str, micros: u64) -> HopEvent {
    HopEvent::reply(
        distance,
        Ipv4Addr::new(10, 0, 0, last_octet),
        name,
        Duration::from_micros(micros),
    )
}

/// Replays scripted rounds per host; a round may end with an error.
struct FakeProber {
    rounds: HashMap<String, Vec<(Vec<HopEvent>, Option<&'static str>)>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeProber {
    fn new() -> Self {
        Self {
            rounds: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn script(mut self, host: &str, rounds: Vec<(Vec<HopEvent>, Option<&'static str>)>) -> Self {
        self.rounds.insert(host.to_string(), rounds);
        self
    }
}

impl Prober for FakeProber {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr, TraceError> {
        if self.rounds.contains_key(host) {
            Ok(Ipv4Addr::new(192, 0, 2, 1))
        } else {
            Err(TraceError::NoIpv4 {
                host: host.to_string(),
                resolved: Vec::new(),
            })
        }
    }

    fn probe(
        &self,
        host: &str,
        _options: &ProbeOptions,
        conduit: HopSender,
    ) -> Result<(), TraceError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry(host.to_string()).or_insert(0);
            *entry += 1;
            *entry - 1
        };
        let (events, error) = &self.rounds[host][index];
        for event in events {
            conduit.send(event.clone()).unwrap();
        }
        match error {
            Some(message) => Err(TraceError::ProbeFailed {
                host: host.to_string(),
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn settings(rounds: u32) -> TraceSettings {
    TraceSettings {
        probe: ProbeOptions::default(),
        rounds,
    }
}

#[test]
fn collected_round_matches_emission_order() {
    let emitted = vec![
        reply(1, 1, "gw", 1_000),
        HopEvent::timeout(2),
        reply(3, 3, "", 7_500),
        reply(3, 4, "", 7_900),
    ];
    let (sender, receiver) = hop_conduit();
    let to_send = emitted.clone();
    let producer = thread::spawn(move || {
        for event in to_send {
            sender.send(event).unwrap();
            thread::sleep(Duration::from_millis(2));
        }
    });

    let round = collect(receiver);
    producer.join().unwrap();

    assert_eq!(round.events, emitted);
    assert!(round.error.is_none());
}

#[test]
fn round_errors_are_kept_per_round() {
    let prober = FakeProber::new().script(
        "r1",
        vec![
            (vec![reply(1, 1, "gw", 1_000)], Some("destination unreachable")),
            (vec![reply(1, 1, "gw", 1_100), reply(2, 2, "", 5_000)], None),
            (Vec::new(), Some("socket failure")),
        ],
    );

    let seen = AtomicUsize::new(0);
    let trace = trace_host(&prober, "r1", &settings(3), &|_: &HopEvent| {
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    assert_eq!(trace.target, "r1");
    assert_eq!(trace.rounds.len(), 3);
    assert_eq!(trace.rounds[0].events.len(), 1);
    assert!(trace.rounds[0]
        .error
        .as_deref()
        .unwrap()
        .contains("destination unreachable"));
    assert!(trace.rounds[1].error.is_none());
    assert_eq!(trace.rounds[1].events.len(), 2);
    assert!(trace.rounds[2].events.is_empty());
    assert!(trace.rounds[2].error.as_deref().unwrap().contains("socket failure"));
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn unresolvable_host_is_skipped() {
    let prober = FakeProber::new()
        .script("a", vec![(vec![reply(1, 1, "", 900)], None)])
        .script("c", vec![(vec![reply(1, 5, "", 800)], None)]);
    let hosts = vec!["a".to_string(), "nowhere".to_string(), "c".to_string()];

    let mut reported = Vec::new();
    let traces = trace_hosts(&prober, &hosts, &settings(1), &|_: &HopEvent| {}, |trace| {
        reported.push(trace.target.clone())
    })
    .unwrap();

    let targets: Vec<&str> = traces.iter().map(|trace| trace.target.as_str()).collect();
    assert_eq!(targets, vec!["a", "c"]);
    assert_eq!(reported, vec!["a".to_string(), "c".to_string()]);
}

#[test]
fn zero_rounds_is_rejected() {
    let prober = FakeProber::new().script("a", Vec::new());
    let err = trace_host(&prober, "a", &settings(0), &|_: &HopEvent| {}).unwrap_err();
    assert!(matches!(err, TraceError::NoRounds));
}
