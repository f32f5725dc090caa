//! Support code for the `clinker-runner` binary: argument parsing and
//! plain-text rendering of session output.

use std::fmt::Write as _;

use clinker_client::endpoints::JobParameters;
use clinker_core::compare::{ComparisonRow, MetricGroup};
use clinker_core::scenario::ResultSet;
use clinker_core::stage::ProgressSnapshot;

/// A command-line argument that is not `name=value`.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("expected name=value, got {0:?}")]
pub struct ParameterError(pub String);

/// Parse `name=value` arguments into job parameters, keeping their order.
///
/// The value may itself contain `=`; the name may not be blank.
pub fn parse_parameters<I>(args: I) -> Result<JobParameters, ParameterError>
where
    I: IntoIterator<Item = String>,
{
    let mut parameters = JobParameters::new();
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                parameters.insert(name.trim(), value);
            }
            _ => return Err(ParameterError(arg)),
        }
    }
    Ok(parameters)
}

/// One status line for a progress reading, e.g. `[ 45%] Stage 2`.
pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    format!("[{:>3}%] {}", snapshot.percent(), snapshot.display_stage())
}

/// Render one metric group as an aligned text table, one column per scenario.
pub fn render_table(results: &ResultSet, group: MetricGroup, rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:<10}", group.as_str());
    for scenario in results {
        let _ = write!(out, "{:>12}", format!("#{}", scenario.id));
    }
    out.push('\n');

    for row in rows {
        let _ = write!(out, "{:<10}", row.metric);
        for value in &row.values {
            let _ = write!(out, "{value:>12.3}");
        }
        out.push('\n');
    }
    out
}
