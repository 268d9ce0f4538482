use crate::aggregate::Aggregated;
use hopmap_model::{format_elapsed, HopEvent};

const LABEL_WIDTH: usize = 3;
const TIMEOUT_MARK: &str = "   *";

/// Single event as printed while a round is still running.
pub fn format_hop(event: &HopEvent) -> String {
    let label = format!("{:<width$}", event.distance, width = LABEL_WIDTH);
    if event.success {
        format!(
            "{} {} ({}) {}",
            label,
            event.identity(),
            event.address,
            format_elapsed(event.elapsed)
        )
    } else {
        format!("{}{}", label, TIMEOUT_MARK)
    }
}

/// Renders one line per responder cluster.
///
/// Repeated replies from the same responder collapse onto its line as extra
/// timings, and a distance already labelled on an earlier line is printed as
/// blanks of the same width.
pub fn format_report(aggregated: &Aggregated) -> String {
    let mut out = String::new();

    for (&distance, clusters) in &aggregated.distances {
        let mut labelled: Option<u32> = None;

        for cluster in clusters {
            let mut line = String::new();
            let mut prev_identity: Option<String> = None;

            for event in &cluster.events {
                if !event.success {
                    if line.is_empty() {
                        line.push_str(&distance_label(distance, &mut labelled));
                    }
                    line.push_str(TIMEOUT_MARK);
                    continue;
                }

                let identity = event.identity();
                if prev_identity.as_deref() == Some(identity.as_str()) {
                    line.push(' ');
                    line.push_str(&format_elapsed(event.elapsed));
                    continue;
                }

                if !line.is_empty() {
                    line.push_str("  ");
                }
                line.push_str(&distance_label(distance, &mut labelled));
                line.push_str(&format!(
                    " {} ({}) {}",
                    identity,
                    event.address,
                    format_elapsed(event.elapsed)
                ));
                prev_identity = Some(identity);
            }

            out.push_str(&line);
            out.push('\n');
        }
    }

    out
}

fn distance_label(distance: u32, labelled: &mut Option<u32>) -> String {
    let label = format!("{:<width$}", distance, width = LABEL_WIDTH);
    if labelled.replace(distance) == Some(distance) {
        " ".repeat(label.len())
    } else {
        label
    }
}
