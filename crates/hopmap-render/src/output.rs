use crate::dot::to_dot;
use crate::error::RenderError;
use hopmap_model::TopologyGraph;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dot,
    Png,
    Svg,
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Dot => "dot",
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" | "gv" => Ok(OutputFormat::Dot),
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(RenderError::UnknownFormat(other.to_string())),
        }
    }
}

/// Serializes the graph; image formats go through the Graphviz `dot` binary.
pub fn render(graph: &TopologyGraph, format: OutputFormat) -> Result<Vec<u8>, RenderError> {
    let dot = to_dot(graph)?;
    match format {
        OutputFormat::Dot => Ok(dot.into_bytes()),
        image => run_dot(dot, image),
    }
}

pub fn render_to_file(
    graph: &TopologyGraph,
    format: OutputFormat,
    path: &Path,
) -> Result<(), RenderError> {
    let bytes = render(graph, format)?;
    atomic_write(path, &bytes)
}

fn run_dot(dot: String, format: OutputFormat) -> Result<Vec<u8>, RenderError> {
    debug!(format = format.extension(), "rasterizing with dot");

    let mut child = Command::new("dot")
        .arg(format!("-T{}", format.extension()))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RenderError::Spawn {
            program: "dot".to_string(),
            source,
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| RenderError::DotFailed {
        status: "not started".to_string(),
        stderr: "missing dot stdin".to_string(),
    })?;
    let writer = thread::spawn(move || stdin.write_all(dot.as_bytes()));

    let output = child.wait_with_output()?;
    let written = writer.join();

    if !output.status.success() {
        return Err(RenderError::DotFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    if let Ok(result) = written {
        result?;
    }

    Ok(output.stdout)
}

/// Writes through a temp file in the same directory and renames it into place.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), RenderError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let write_err = |source: std::io::Error| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };

    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp_path = temp_path(path);
    let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(err));
    }

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("output");
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    parent.join(format!(".{}.part-{}-{}", file_name, pid, stamp))
}
