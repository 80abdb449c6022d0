//! Reset-to-maximum through the external cpufreq tool
use log::{debug, warn};
use std::process::Command;

pub const RESET_COMMAND: &str = "cpufreq-set";

/// Restores one core to its maximum frequency. Best-effort: implementations
/// report failures through the log and never abort the caller.
pub trait FrequencyReset {
    fn reset(&self, core: u32, max_khz: u32);
}

/// Runs `<program> -c <core> -f <max_khz>`
#[derive(Clone, Debug)]
pub struct CpufreqSet {
    pub program: String,
}

impl CpufreqSet {
    pub fn new(program: Option<String>) -> Self {
        CpufreqSet {
            program: program.unwrap_or_else(|| RESET_COMMAND.to_string()),
        }
    }

    pub fn command_line(&self, core: u32, max_khz: u32) -> String {
        format!("{} {}", self.program, Self::args(core, max_khz).join(" "))
    }

    pub fn args(core: u32, max_khz: u32) -> Vec<String> {
        vec![
            "-c".to_string(),
            core.to_string(),
            "-f".to_string(),
            max_khz.to_string(),
        ]
    }
}

impl Default for CpufreqSet {
    fn default() -> Self {
        CpufreqSet::new(None)
    }
}

impl FrequencyReset for CpufreqSet {
    fn reset(&self, core: u32, max_khz: u32) {
        match Command::new(&self.program)
            .args(Self::args(core, max_khz))
            .status()
        {
            Ok(status) if status.success() => {
                debug!("CPU{}: reset to {} kHz", core, max_khz);
            }
            Ok(status) => warn!("CPU{}: {} exited with {}", core, self.program, status),
            Err(e) => warn!("CPU{}: failed to run {}: {}", core, self.program, e),
        }
    }
}

/// Logs the command the configured `CpufreqSet` would have run
#[derive(Clone, Debug, Default)]
pub struct DryRunReset {
    pub command: CpufreqSet,
}

impl DryRunReset {
    pub fn new(program: Option<String>) -> Self {
        DryRunReset {
            command: CpufreqSet::new(program),
        }
    }
}

impl FrequencyReset for DryRunReset {
    fn reset(&self, core: u32, max_khz: u32) {
        debug!("DRY-RUN: would run {}", self.command.command_line(core, max_khz));
    }
}

#[cfg(test)]
pub mod testing {
    use super::FrequencyReset;
    use std::sync::{Arc, Mutex};

    /// Records every reset request instead of running a command
    #[derive(Clone, Debug, Default)]
    pub struct RecordingReset {
        calls: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl RecordingReset {
        pub fn calls(&self) -> Vec<(u32, u32)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count_for(&self, core: u32) -> usize {
            self.calls().iter().filter(|(c, _)| *c == core).count()
        }
    }

    impl FrequencyReset for RecordingReset {
        fn reset(&self, core: u32, max_khz: u32) {
            self.calls.lock().unwrap().push((core, max_khz));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpufreq_set_args() {
        assert_eq!(
            CpufreqSet::args(2, 2_400_000),
            vec!["-c", "2", "-f", "2400000"]
        );
    }

    #[test]
    fn test_default_program() {
        assert_eq!(CpufreqSet::default().program, RESET_COMMAND);
        assert_eq!(CpufreqSet::new(Some("/bin/true".into())).program, "/bin/true");
    }

    #[test]
    fn test_dry_run_uses_configured_program() {
        let dry = DryRunReset::new(Some("/usr/local/bin/setfreq".to_string()));
        assert_eq!(
            dry.command.command_line(1, 1_800_000),
            "/usr/local/bin/setfreq -c 1 -f 1800000"
        );
        dry.reset(1, 1_800_000);

        let dry = DryRunReset::default();
        assert_eq!(
            dry.command.command_line(0, 5),
            format!("{} -c 0 -f 5", RESET_COMMAND)
        );
    }

    #[test]
    fn test_missing_program_is_not_fatal() {
        let reset = CpufreqSet::new(Some("/nonexistent/cpufreq-set".to_string()));
        reset.reset(0, 1_000_000);
    }

    #[test]
    fn test_recording_reset() {
        let rec = testing::RecordingReset::default();
        let clone = rec.clone();
        clone.reset(1, 10);
        clone.reset(1, 10);
        assert_eq!(rec.count_for(1), 2);
        assert_eq!(rec.count_for(0), 0);
    }
}
