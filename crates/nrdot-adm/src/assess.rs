use nrdot_config::Triggers;
use nrdot_types::PipelineState;

/// Determines the desired degradation level index (0 = baseline) from the current
/// `PipelineState`, per the fixed four-tier ladder: L3 on severe memory/queue
/// pressure, L2 on elevated memory/queue pressure, L1 if any individual trigger
/// threshold is exceeded, L0 otherwise. The tier count is fixed regardless of how
/// many levels are configured; callers clamp to `levels.len() - 1`.
pub fn desired_level(state: &PipelineState, triggers: &Triggers) -> usize {
    if state.mem_util_pct >= 90.0 || state.queue_util_pct >= 90.0 {
        3
    } else if state.mem_util_pct >= 80.0 || state.queue_util_pct >= 80.0 {
        2
    } else if state.mem_util_pct > triggers.mem_util_high
        || state.queue_util_pct > triggers.queue_util_high
        || state.cpu_util_pct > triggers.cpu_util_high
        || state.err_rate_pct > triggers.err_rate_high
        || state.p99_latency_ms > triggers.p99_latency_high_ms
    {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(mem: f64, queue: f64) -> PipelineState {
        PipelineState {
            mem_util_pct: mem,
            queue_util_pct: queue,
            cpu_util_pct: 0.0,
            err_rate_pct: 0.0,
            p99_latency_ms: 0.0,
        }
    }

    #[test]
    fn severe_pressure_reaches_l3() {
        let triggers = Triggers::default();
        assert_eq!(desired_level(&state(91.0, 0.0), &triggers), 3);
        assert_eq!(desired_level(&state(0.0, 95.0), &triggers), 3);
    }

    #[test]
    fn elevated_pressure_reaches_l2() {
        let triggers = Triggers::default();
        assert_eq!(desired_level(&state(82.0, 0.0), &triggers), 2);
    }

    #[test]
    fn any_individual_trigger_reaches_l1() {
        let triggers = Triggers::default();
        let mut s = state(0.0, 0.0);
        s.err_rate_pct = 15.0;
        assert_eq!(desired_level(&s, &triggers), 1);
    }

    #[test]
    fn nominal_state_is_l0() {
        let triggers = Triggers::default();
        assert_eq!(desired_level(&state(10.0, 10.0), &triggers), 0);
    }
}
