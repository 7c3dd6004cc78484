//! Statistics (spec section 4.10 / 6): per-run counters and aggregated
//! timings, grounded in `original_source`'s `RuntimeDataManager.cpp`
//! end-of-run dump. Serialized to `statistics.info` (JSON) and
//! `statics.txt` (human-readable) by `output::write_statistics`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct Statistics {
    pub traces_explored: u64,
    pub traces_deduped: u64,
    pub thread_count_total: u64,
    pub instruction_count: u64,
    pub lock_count: u64,
    pub lock_pair_count: u64,
    pub signal_count: u64,
    pub wait_count: u64,
    pub shared_variable_count: u64,
    pub read_count: u64,
    pub write_count: u64,
    pub sat_branch_count: u64,
    pub unsat_branch_count: u64,
    pub unsat_by_pre_solve_count: u64,
    pub assertion_failures: u64,

    #[serde(with = "duration_millis")]
    pub solving_time: Duration,
    #[serde(with = "duration_millis")]
    pub running_time: Duration,
    #[serde(with = "duration_millis")]
    pub dtam_time: Duration,
    #[serde(with = "duration_millis")]
    pub pts_time: Duration,
}

impl Statistics {
    /// Folds one trace's counters in (spec section 6 output-file list:
    /// "thread count, instructions, locks, lock pairs, signals/waits,
    /// shared vars, reads/writes").
    pub fn record_trace(&mut self, trace: &crate::trace::Trace) {
        self.traces_explored += 1;
        self.thread_count_total += trace.thread_events.len() as u64;
        self.instruction_count += trace.events().len() as u64;
        self.lock_count += trace.all_lock_unlock.values().map(|v| v.len() as u64).sum::<u64>();
        self.lock_pair_count += trace.all_lock_unlock.values().map(|v| v.iter().filter(|p| p.unlock_event.is_some()).count() as u64).sum::<u64>();
        self.signal_count += trace.all_signal.values().map(|v| v.len() as u64).sum::<u64>();
        self.wait_count += trace.all_wait.values().map(|v| v.len() as u64).sum::<u64>();
        self.shared_variable_count += trace.var_thread.values().filter(|&&t| t == 0).count() as u64;
        self.read_count += trace.read_set.values().map(|v| v.len() as u64).sum::<u64>();
        self.write_count += trace.write_set.values().map(|v| v.len() as u64).sum::<u64>();
    }

    pub fn record_flip(&mut self, flip: &crate::encoder::FlipStats) {
        self.sat_branch_count += flip.sat as u64;
        self.unsat_branch_count += flip.unsat as u64;
        self.unsat_by_pre_solve_count += flip.unsat_by_pre_solve as u64;
    }

    /// Human-readable rendering for `statics.txt` (spec section 6).
    pub fn render_text(&self) -> String {
        format!(
            "traces_explored={}\ntraces_deduped={}\nthread_count_total={}\ninstruction_count={}\n\
             lock_count={}\nlock_pair_count={}\nsignal_count={}\nwait_count={}\n\
             shared_variable_count={}\nread_count={}\nwrite_count={}\n\
             sat_branch_count={}\nunsat_branch_count={}\nunsat_by_pre_solve_count={}\n\
             assertion_failures={}\nsolving_time_ms={}\nrunning_time_ms={}\ndtam_time_ms={}\npts_time_ms={}\n",
            self.traces_explored,
            self.traces_deduped,
            self.thread_count_total,
            self.instruction_count,
            self.lock_count,
            self.lock_pair_count,
            self.signal_count,
            self.wait_count,
            self.shared_variable_count,
            self.read_count,
            self.write_count,
            self.sat_branch_count,
            self.unsat_branch_count,
            self.unsat_by_pre_solve_count,
            self.assertion_failures,
            self.solving_time.as_millis(),
            self.running_time.as_millis(),
            self.dtam_time.as_millis(),
            self.pts_time.as_millis(),
        )
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
