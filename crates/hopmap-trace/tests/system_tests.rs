#![cfg(unix)]

use hopmap_model::HopEvent;
use hopmap_trace::{trace_host, ProbeOptions, SystemTraceroute, TraceSettings};
use std::fs;
use std::net::Ipv4Addr;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn install_script(name: &str, body: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hopmap-trace-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn non_utf8_hop_name_does_not_end_the_round() {
    let script = install_script(
        "fake_traceroute.sh",
        include_str!("fixtures/fake_traceroute.sh"),
    );
    let prober = SystemTraceroute::new(&script.to_string_lossy());
    let settings = TraceSettings {
        probe: ProbeOptions::default(),
        rounds: 1,
    };

    let started = Instant::now();
    let trace = trace_host(&prober, "10.0.0.3", &settings, &|_: &HopEvent| {}).unwrap();
    let elapsed = started.elapsed();

    let round = &trace.rounds[0];
    assert!(round.error.is_none(), "unexpected error: {:?}", round.error);
    let distances: Vec<u32> = round.events.iter().map(|hop| hop.distance).collect();
    assert_eq!(distances, vec![1, 2, 3]);
    assert_eq!(round.events[1].address, Ipv4Addr::new(10, 0, 0, 2));
    assert!(round.events[1].host_name.starts_with("caf"));
    assert_eq!(round.events[2].identity(), "10.0.0.3");

    // the round only ends once the script has exited
    assert!(elapsed >= Duration::from_millis(900));

    let _ = fs::remove_file(&script);
}
