//! Console rendering of a sort run.

use crate::CliError;
use sleepsort_runtime::{Emissions, SortReport};
use std::io::Write;

/// Print one variant: a header, one entity per line as it arrives, and a
/// blank separator line.
///
/// Each line is flushed immediately so the unbuffered variant can be
/// watched live. With `timing` set, the elapsed time is printed before the
/// separator.
pub fn write_variant<W: Write>(
    out: &mut W,
    mut emissions: Emissions,
    timing: bool,
) -> Result<SortReport, CliError> {
    writeln!(out, "{}", emissions.variant())?;
    out.flush()?;

    for entity in emissions.by_ref() {
        writeln!(out, "{}", entity)?;
        out.flush()?;
    }

    let report = emissions.finish()?;
    if timing {
        writeln!(
            out,
            "elapsed: {} ms ({} emitted)",
            report.elapsed.as_millis(),
            report.emitted
        )?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(report)
}
