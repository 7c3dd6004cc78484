//! Output files written under `./output_info/` (spec section 6), grounded
//! in `original_source`'s `RuntimeDataManager.cpp` end-of-run dump.

use crate::error::MtaResult;
use crate::stats::Statistics;
use crate::trace::Trace;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const OUTPUT_DIR: &str = "output_info";

pub fn ensure_output_dir(root: &Path) -> MtaResult<PathBuf> {
    let dir = root.join(OUTPUT_DIR);
    std::fs::create_dir_all(&dir).map_err(|e| crate::error::MtaError::InvariantViolation(format!("cannot create {}: {e}", dir.display())))?;
    Ok(dir)
}

/// `TraceN.bitcode` / `<prefix_name>.bitcode`: an ordered event dump.
pub fn write_event_dump(dir: &Path, stem: &str, trace: &Trace) -> MtaResult<()> {
    let path = dir.join(format!("{stem}.bitcode"));
    let mut out = String::new();
    for &id in &trace.path {
        let e = trace.event(id);
        out.push_str(&format!("{}\t{}\t{}\t{:?}\n", e.id, e.thread_id, e.event_name, e.kind));
    }
    write_file(&path, &out)
}

/// `TraceN.z3expr` / `<prefix_name>.z3expr`: the solver script and model
/// (or just the assertion-verification solver state for the initial
/// dump) that produced the trace or prefix.
pub fn write_solver_dump(dir: &Path, stem: &str, script: &str) -> MtaResult<()> {
    let path = dir.join(format!("{stem}.z3expr"));
    write_file(&path, script)
}

pub fn write_statistics(dir: &Path, stats: &Statistics) -> MtaResult<()> {
    let json = serde_json::to_string_pretty(stats)
        .map_err(|e| crate::error::MtaError::InvariantViolation(format!("statistics serialization failed: {e}")))?;
    write_file(&dir.join("statistics.info"), &json)?;
    write_file(&dir.join("statics.txt"), &stats.render_text())
}

/// Writes `statistics.info`/`statics.txt` when `dir` is `Some` (i.e. an
/// output directory was requested via `Orchestrator::with_output_dir`); a
/// no-op otherwise.
pub fn write_statistics_if_enabled(dir: Option<&Path>, stats: &Statistics) -> MtaResult<()> {
    match dir {
        Some(dir) => write_statistics(dir, stats),
        None => Ok(()),
    }
}

fn write_file(path: &Path, contents: &str) -> MtaResult<()> {
    let mut f = std::fs::File::create(path)
        .map_err(|e| crate::error::MtaError::InvariantViolation(format!("cannot write {}: {e}", path.display())))?;
    f.write_all(contents.as_bytes())
        .map_err(|e| crate::error::MtaError::InvariantViolation(format!("cannot write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn event_dump_writes_one_line_per_path_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = Trace::new(1);
        trace.insert_event(0, EventKind::Normal);
        trace.insert_event(0, EventKind::Normal);
        write_event_dump(dir.path(), "Trace1", &trace).unwrap();
        let contents = std::fs::read_to_string(dir.path().join("Trace1.bitcode")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn statistics_writes_both_json_and_text() {
        let dir = tempfile::tempdir().unwrap();
        write_statistics(dir.path(), &Statistics::default()).unwrap();
        assert!(dir.path().join("statistics.info").exists());
        assert!(dir.path().join("statics.txt").exists());
    }
}
