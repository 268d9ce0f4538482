use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use hopmap_graph::build_graph;
use hopmap_model::{HopEvent, HostTrace, TopologyGraph, TraceFile};
use hopmap_render::{atomic_write, render, render_to_file, to_dot, OutputFormat};
use hopmap_report::{aggregate, format_hop, format_report};
use hopmap_trace::{trace_hosts, ProbeOptions, SystemTraceroute, TraceSettings};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hopmap", version, about = "Repeated traceroute with a merged topology graph")]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Trace(TraceArgs),
    Graph(GraphArgs),
    Run(RunArgs),
}

#[derive(Args, Clone)]
struct TargetArgs {
    /// File with one target per line; `#` starts a comment.
    #[arg(long)]
    targets: Option<PathBuf>,

    #[arg(long = "target")]
    target_list: Vec<String>,

    #[arg(value_name = "HOST")]
    hosts: Vec<String>,
}

#[derive(Args, Clone, Serialize)]
struct ProbeArgs {
    #[arg(short = 'm', long, default_value_t = 64)]
    max_hops: u32,

    #[arg(short = 'f', long, default_value_t = 1)]
    first_hop: u32,

    /// Probes per hop; extra probes only retry a silent hop.
    #[arg(short = 'q', long, default_value_t = 1)]
    queries: u32,

    /// Rounds per target.
    #[arg(short = 't', long, default_value_t = 3)]
    times: u32,

    #[arg(long, default_value_t = 3000)]
    wait_ms: u64,

    #[arg(short = 'n', long)]
    numeric: bool,

    /// Do not print hops while rounds are running.
    #[arg(long)]
    quiet: bool,
}

impl ProbeArgs {
    fn settings(&self) -> TraceSettings {
        TraceSettings {
            probe: ProbeOptions {
                max_distance: self.max_hops,
                first_distance: self.first_hop,
                retries: self.queries.saturating_sub(1),
                wait_ms: self.wait_ms,
                numeric: self.numeric,
            },
            rounds: self.times,
        }
    }
}

#[derive(Args)]
#[command(
    about = "Probe targets and print the hop report. Only target networks you own or have permission to test."
)]
struct TraceArgs {
    #[command(flatten)]
    targets: TargetArgs,

    #[command(flatten)]
    probe: ProbeArgs,

    /// Write the collected rounds as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
#[command(about = "Build and render the topology graph of a trace file")]
struct GraphArgs {
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file; DOT goes to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value = "dot")]
    format: String,

    /// Also write the graph as JSON.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Args)]
#[command(about = "Trace, report, build and render in one go")]
struct RunArgs {
    #[command(flatten)]
    targets: TargetArgs,

    #[command(flatten)]
    probe: ProbeArgs,

    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long, default_value = "png")]
    format: String,

    /// Echo the DOT text to stdout.
    #[arg(long)]
    print_dot: bool,
}

#[derive(Serialize)]
struct RunOutputs {
    traces: PathBuf,
    graph_json: PathBuf,
    graph_dot: PathBuf,
    graph_image: Option<PathBuf>,
    run: PathBuf,
}

impl RunOutputs {
    fn in_dir(out_dir: &Path, format: OutputFormat) -> Self {
        Self {
            traces: out_dir.join("traces.json"),
            graph_json: out_dir.join("graph.json"),
            graph_dot: out_dir.join("graph.dot"),
            graph_image: (format != OutputFormat::Dot)
                .then(|| out_dir.join(format!("graph.{}", format.extension()))),
            run: out_dir.join("run.json"),
        }
    }
}

#[derive(Serialize)]
struct RunReceipt {
    version: String,
    started_at_utc: String,
    finished_at_utc: String,
    targets: Vec<String>,
    traced: usize,
    probe: ProbeArgs,
    outputs: RunOutputs,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli.command) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Trace(args) => run_trace(args).map(|_| ()),
        Commands::Graph(args) => run_graph(args),
        Commands::Run(args) => run_run(args),
    }
}

fn run_trace(args: TraceArgs) -> Result<TraceFile> {
    let hosts = load_targets(&args.targets)?;
    let trace_file = trace_and_report(&hosts, &args.probe)?;

    if let Some(out) = &args.out {
        write_json(out, &trace_file)?;
        info!("wrote {} host traces to {:?}", trace_file.hosts.len(), out);
    }

    Ok(trace_file)
}

fn run_graph(args: GraphArgs) -> Result<()> {
    let format: OutputFormat = args.format.parse()?;
    let contents = fs::read_to_string(&args.in_path)
        .with_context(|| format!("failed to read input {:?}", args.in_path))?;
    let trace_file: TraceFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse traces {:?}", args.in_path))?;

    let graph = build_graph(trace_file.rounds());
    info!(
        "graph has {} nodes and {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );

    if let Some(json) = &args.json {
        write_json(json, &graph)?;
    }

    match (&args.out, format) {
        (Some(out), format) => render_to_file(&graph, format, out)
            .with_context(|| format!("failed to render graph to {:?}", out)),
        (None, OutputFormat::Dot) => {
            let bytes = render(&graph, OutputFormat::Dot)?;
            std::io::stdout()
                .write_all(&bytes)
                .context("failed to write DOT to stdout")
        }
        (None, other) => bail!("--out is required for {} output", other.extension()),
    }
}

fn run_run(args: RunArgs) -> Result<()> {
    let started_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let format: OutputFormat = args.format.parse()?;
    let hosts = load_targets(&args.targets)?;

    let out_dir = args.out_dir.clone().unwrap_or_else(default_out_dir);
    if out_dir.exists() && !out_dir.is_dir() {
        bail!("output path {:?} exists and is not a directory", out_dir);
    }
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output directory {:?}", out_dir))?;

    let trace_file = trace_and_report(&hosts, &args.probe)?;
    if trace_file.hosts.is_empty() {
        warn!("no target could be traced; the graph will be empty");
    }

    let receipt = RunReceipt {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at_utc,
        finished_at_utc: String::new(),
        targets: hosts,
        traced: trace_file.hosts.len(),
        probe: args.probe,
        outputs: RunOutputs::in_dir(&out_dir, format),
    };
    write_run_outputs(&trace_file, format, args.print_dot, receipt)
}

/// Writes traces, graph JSON and DOT, then the image. The receipt is written
/// last even when the image fails, with no image listed.
fn write_run_outputs(
    trace_file: &TraceFile,
    format: OutputFormat,
    print_dot: bool,
    mut receipt: RunReceipt,
) -> Result<()> {
    write_json(&receipt.outputs.traces, trace_file)?;

    let graph = build_graph(trace_file.rounds());
    write_json(&receipt.outputs.graph_json, &graph)?;
    write_dot(&graph, &receipt.outputs.graph_dot, print_dot)?;

    let rendered = match &receipt.outputs.graph_image {
        Some(image_path) => render_to_file(&graph, format, image_path)
            .with_context(|| format!("failed to render graph to {:?}", image_path))
            .map(|()| info!("wrote {:?}", image_path)),
        None => Ok(()),
    };
    if rendered.is_err() {
        receipt.outputs.graph_image = None;
    }

    receipt.finished_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    write_json(&receipt.outputs.run, &receipt)?;
    rendered
}

/// Probes every host and prints its report as soon as its rounds are done.
fn trace_and_report(hosts: &[String], probe: &ProbeArgs) -> Result<TraceFile> {
    let settings = probe.settings();
    let prober = SystemTraceroute::default();
    let quiet = probe.quiet;

    let live = |event: &HopEvent| {
        if !quiet {
            println!("{}", format_hop(event));
        }
    };
    let print_report = |trace: &HostTrace| {
        if !quiet {
            println!();
        }
        info!(
            "{} ({}): {} rounds",
            trace.target,
            trace.address,
            trace.rounds.len()
        );
        print!("{}", format_report(&aggregate(&trace.rounds)));
    };

    let traces = trace_hosts(&prober, hosts, &settings, &live, print_report)?;
    Ok(TraceFile::new(traces))
}

fn write_dot(graph: &TopologyGraph, path: &Path, echo: bool) -> Result<()> {
    let dot = to_dot(graph)?;
    if echo {
        print!("{dot}");
    }
    atomic_write(path, dot.as_bytes()).with_context(|| format!("failed to write {:?}", path))
}

fn load_targets(args: &TargetArgs) -> Result<Vec<String>> {
    let mut targets: Vec<String> = Vec::new();

    if let Some(path) = &args.targets {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read targets file {:?}", path))?;
        targets.extend(parse_targets(&contents));
    }

    targets.extend(args.target_list.iter().cloned());
    targets.extend(args.hosts.iter().cloned());

    if targets.is_empty() {
        return Err(anyhow!(
            "no targets provided (use HOST, --target or --targets)"
        ));
    }

    Ok(targets)
}

fn parse_targets(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

fn default_out_dir() -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    PathBuf::from("output").join(stamp)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &json).with_context(|| format!("failed to write {:?}", path))
}
