//! Per-core frequency channels
//!
//! One write handle per core's `scaling_setspeed` attribute, opened once and
//! kept for the engine's lifetime. Low/high values are formatted once at open
//! so a phase transition is only a loop of positioned writes.

use crate::hardware::cpu::{self, CoreSet};
use crate::hardware::governor::FrequencyReset;
use log::{debug, trace, warn};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Outcome of writing one value to every core
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl WriteReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Lifetime totals across all phase transitions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteTally {
    pub transitions: u64,
    pub written: u64,
    pub failed: u64,
}

impl WriteTally {
    pub fn add(&mut self, report: &WriteReport) {
        self.transitions += 1;
        self.written += report.written as u64;
        self.failed += report.failed as u64;
    }
}

struct Channel {
    core: u32,
    max_khz: u32,
    path: PathBuf,
    file: Option<File>,
}

pub struct FrequencyChannelSet<R: FrequencyReset> {
    channels: Vec<Channel>,
    low: String,
    high: String,
    reset: R,
    dry_run: bool,
    tally: WriteTally,
}

impl<R: FrequencyReset> FrequencyChannelSet<R> {
    /// Open every core's channel and reset each core to its maximum.
    ///
    /// A core whose attribute cannot be opened is kept as a dead channel:
    /// its writes are reported as failed instead of aborting the engine.
    /// `max_khz` overrides the per-core `cpuinfo_max_freq` lookup; `high`
    /// is the last fallback.
    pub fn open(
        cores: &CoreSet,
        sysfs_root: &Path,
        low: u32,
        high: u32,
        max_khz: Option<u32>,
        reset: R,
        dry_run: bool,
    ) -> Self {
        let channels = cores
            .iter()
            .map(|core| {
                let path = cpu::setspeed_path(sysfs_root, core);
                let file = if dry_run {
                    None
                } else {
                    match OpenOptions::new().write(true).open(&path) {
                        Ok(f) => Some(f),
                        Err(e) => {
                            warn!("CPU{}: cannot open {}: {}", core, path.display(), e);
                            None
                        }
                    }
                };
                let max_khz = max_khz
                    .or_else(|| cpu::read_max_freq(sysfs_root, core))
                    .unwrap_or(high);
                Channel {
                    core,
                    max_khz,
                    path,
                    file,
                }
            })
            .collect();

        let set = FrequencyChannelSet {
            channels,
            low: low.to_string(),
            high: high.to_string(),
            reset,
            dry_run,
            tally: WriteTally::default(),
        };
        set.reset_all();
        set
    }

    pub fn set_low(&mut self) -> WriteReport {
        let report = write_all(&self.channels, self.low.as_bytes(), self.dry_run);
        self.tally.add(&report);
        report
    }

    pub fn set_high(&mut self) -> WriteReport {
        let report = write_all(&self.channels, self.high.as_bytes(), self.dry_run);
        self.tally.add(&report);
        report
    }

    pub fn set_frequency(&mut self, khz: u32) -> WriteReport {
        let value = khz.to_string();
        let report = write_all(&self.channels, value.as_bytes(), self.dry_run);
        self.tally.add(&report);
        report
    }

    /// Ask the governor to put every core back at its maximum
    pub fn reset_all(&self) {
        for ch in &self.channels {
            self.reset.reset(ch.core, ch.max_khz);
        }
    }

    /// Drop every handle. Safe to call any number of times.
    pub fn close(&mut self) {
        for ch in &mut self.channels {
            if ch.file.take().is_some() {
                trace!("CPU{}: closed {}", ch.core, ch.path.display());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn open_handles(&self) -> usize {
        self.channels.iter().filter(|c| c.file.is_some()).count()
    }

    pub fn tally(&self) -> WriteTally {
        self.tally
    }
}

fn write_all(channels: &[Channel], value: &[u8], dry_run: bool) -> WriteReport {
    let mut report = WriteReport::default();
    for ch in channels {
        if dry_run {
            trace!(
                "DRY-RUN: would write '{}' to {}",
                String::from_utf8_lossy(value),
                ch.path.display()
            );
            report.skipped += 1;
            continue;
        }
        match &ch.file {
            Some(f) => match f.write_at(value, 0) {
                Ok(n) if n == value.len() => report.written += 1,
                Ok(n) => {
                    debug!("CPU{}: short write ({} of {} bytes)", ch.core, n, value.len());
                    report.failed += 1;
                }
                Err(e) => {
                    debug!("CPU{}: write failed: {}", ch.core, e);
                    report.failed += 1;
                }
            },
            None => report.failed += 1,
        }
    }
    report
}
