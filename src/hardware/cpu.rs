//! CPU core enumeration and cpufreq sysfs paths under `hardware` namespace
use crate::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

pub const CPU_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Upper bound on cores driven at once (one open handle per core)
pub const MAX_CORES: usize = 256;

/// Ordered, non-empty set of core identifiers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreSet {
    cores: Vec<u32>,
}

impl CoreSet {
    pub fn new(cores: Vec<u32>) -> Result<Self, Error> {
        if cores.is_empty() {
            return Err(Error::CoreSet("no cores given".to_string()));
        }
        if cores.len() > MAX_CORES {
            return Err(Error::CoreSet(format!(
                "{} cores given, at most {} supported",
                cores.len(),
                MAX_CORES
            )));
        }
        for (i, c) in cores.iter().enumerate() {
            if cores[..i].contains(c) {
                return Err(Error::CoreSet(format!("core {} listed twice", c)));
            }
        }
        Ok(CoreSet { cores })
    }

    /// Parse a kernel cpu list such as `0-3,6`
    pub fn parse(list: &str) -> Result<Self, Error> {
        let mut cores = Vec::new();
        let too_many = || Error::CoreSet(format!("more than {} cores listed", MAX_CORES));
        for part in list.trim().split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let bad = || Error::CoreSet(format!("malformed cpu list entry '{}'", part));
            if let Some((lo, hi)) = part.split_once('-') {
                let lo = lo.trim().parse::<u32>().map_err(|_| bad())?;
                let hi = hi.trim().parse::<u32>().map_err(|_| bad())?;
                if hi < lo {
                    return Err(bad());
                }
                let span = u64::from(hi - lo) + 1;
                if span > (MAX_CORES - cores.len()) as u64 {
                    return Err(too_many());
                }
                cores.extend(lo..=hi);
            } else {
                if cores.len() >= MAX_CORES {
                    return Err(too_many());
                }
                cores.push(part.parse::<u32>().map_err(|_| bad())?);
            }
        }
        CoreSet::new(cores)
    }

    /// Cores reported by `<root>/online`
    pub fn online(root: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(root.join("online"))
            .map_err(|e| Error::Io(format!("Failed to read online cpus: {}", e)))?;
        CoreSet::parse(&content)
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.cores.iter().copied()
    }
}

pub fn cpufreq_dir(root: &Path, core: u32) -> PathBuf {
    root.join(format!("cpu{}", core)).join("cpufreq")
}

/// Frequency-control attribute written on every phase transition
pub fn setspeed_path(root: &Path, core: u32) -> PathBuf {
    cpufreq_dir(root, core).join("scaling_setspeed")
}

/// Hardware maximum of a core in kHz, if readable
pub fn read_max_freq(root: &Path, core: u32) -> Option<u32> {
    fs::read_to_string(cpufreq_dir(root, core).join("cpuinfo_max_freq"))
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
}
