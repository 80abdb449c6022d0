//! Simple config file parsing helpers
//!
//! Supports reading simple KEY=VALUE pairs from a config file (shell-style
//! comments with #). Loads environment variables first and then overlays the
//! values from a config file if present.

use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::EngineParams;
use crate::error::Error;
use crate::hardware::cpu::{self, CoreSet};

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub dry_run: bool,
    pub debug: bool,
    pub cores: Option<String>,
    pub pitch_us: Option<u64>,
    pub freq_low: Option<u32>,
    pub freq_high: Option<u32>,
    pub freq_max: Option<u32>,
    pub ratio: Option<f64>,
    pub cgroup_path: Option<PathBuf>,
    pub sysfs_root: Option<PathBuf>,
    pub reset_command: Option<String>,
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_value_map(content: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim().to_string();
            let val = line[eq + 1..].trim().to_string();
            map.insert(key, val);
        }
    }
    map
}

/// Parse `map[key]` into `slot`. A malformed value leaves the previous one in place.
fn parse_into<T: FromStr>(map: &HashMap<String, String>, key: &str, slot: &mut Option<T>) {
    if let Some(v) = map.get(key) {
        match v.parse() {
            Ok(parsed) => *slot = Some(parsed),
            Err(_) => warn!("Ignoring malformed {}={:?}", key, v),
        }
    }
}

impl Config {
    /// Load config by overlaying env variables with values from config file.
    /// If `path` is None, we try repo-local `./etc/cpu-dutycycle/config.default` first,
    /// then `/etc/cpu-dutycycle/config`.
    pub fn load(path: Option<PathBuf>) -> Self {
        let mut cfg = Config::default();

        let env: HashMap<String, String> = std::env::vars().collect();
        cfg.apply(&env);

        let cfg_path = if let Some(p) = path {
            p
        } else if PathBuf::from("./etc/cpu-dutycycle/config.default").exists() {
            PathBuf::from("./etc/cpu-dutycycle/config.default")
        } else {
            PathBuf::from("/etc/cpu-dutycycle/config")
        };

        if let Ok(content) = fs::read_to_string(&cfg_path) {
            cfg.apply(&parse_value_map(&content));
        }

        cfg
    }

    fn apply(&mut self, map: &HashMap<String, String>) {
        if let Some(v) = map.get("DRY_RUN") {
            self.dry_run = parse_bool(v);
        }
        if let Some(v) = map.get("DEBUG") {
            self.debug = parse_bool(v);
        }
        if let Some(v) = map.get("CORES") {
            self.cores = Some(v.clone());
        }
        parse_into(map, "PITCH_US", &mut self.pitch_us);
        parse_into(map, "FREQ_LOW", &mut self.freq_low);
        parse_into(map, "FREQ_HIGH", &mut self.freq_high);
        parse_into(map, "FREQ_MAX", &mut self.freq_max);
        parse_into(map, "RATIO", &mut self.ratio);
        if let Some(v) = map.get("CGROUP_PATH") {
            self.cgroup_path = Some(PathBuf::from(v));
        }
        if let Some(v) = map.get("CPU_SYSFS_ROOT") {
            self.sysfs_root = Some(PathBuf::from(v));
        }
        if let Some(v) = map.get("RESET_COMMAND") {
            self.reset_command = Some(v.clone());
        }
    }

    /// Validate and build the engine inputs. Without `CORES` the online
    /// cores under the sysfs root are used.
    pub fn engine_params(&self) -> Result<EngineParams, Error> {
        let sysfs_root = self
            .sysfs_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(cpu::CPU_SYSFS_ROOT));
        let cores = match &self.cores {
            Some(list) => CoreSet::parse(list)?,
            None => CoreSet::online(&sysfs_root)?,
        };
        let missing = |key: &str| Error::InvalidConfig(format!("{} is not set", key));
        Ok(EngineParams {
            cores,
            sysfs_root,
            pitch_us: self.pitch_us.ok_or_else(|| missing("PITCH_US"))?,
            freq_low: self.freq_low.ok_or_else(|| missing("FREQ_LOW"))?,
            freq_high: self.freq_high.ok_or_else(|| missing("FREQ_HIGH"))?,
            freq_max: self.freq_max,
            ratio: self.ratio.ok_or_else(|| missing("RATIO"))?,
            cgroup_path: self.cgroup_path.clone(),
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn tmp_dir(tag: &str) -> PathBuf {
        let tmp = env::temp_dir().join(format!(
            "dutycycle_cfg_{}_{}",
            tag,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let _ = fs::create_dir_all(&tmp);
        tmp
    }

    #[test]
    fn test_load_from_repo_default() {
        // `./etc/cpu-dutycycle/config.default` exists in repo and contains values
        let c = Config::load(None);
        assert_eq!(c.pitch_us, Some(100_000));
        assert_eq!(c.ratio, Some(0.5));
    }

    #[test]
    fn test_parse_value_map_skips_comments() {
        let map = parse_value_map("# comment\n\nRATIO = 0.3\nCORES=0-1\n");
        assert_eq!(map.get("RATIO").unwrap(), "0.3");
        assert_eq!(map.get("CORES").unwrap(), "0-1");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_file_builds_engine_params() {
        let tmp = tmp_dir("params");
        let cfg_file = tmp.join("cfg");
        fs::write(
            &cfg_file,
            "CORES=0,1\nPITCH_US=1000000\nFREQ_LOW=1200000\nFREQ_HIGH=2400000\n\
             RATIO=0.5\nCGROUP_PATH=/sys/fs/cgroup/g1\nDRY_RUN=yes\n",
        )
        .unwrap();
        let cfg = Config::load(Some(cfg_file));
        assert!(cfg.dry_run);

        let p = cfg.engine_params().unwrap();
        assert_eq!(p.cores.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(p.pitch_us, 1_000_000);
        assert_eq!(p.freq_low, 1_200_000);
        assert_eq!(p.freq_high, 2_400_000);
        assert_eq!(p.ratio, 0.5);
        assert_eq!(p.cgroup_path, Some(PathBuf::from("/sys/fs/cgroup/g1")));
        assert_eq!(p.sysfs_root, PathBuf::from(cpu::CPU_SYSFS_ROOT));
        assert!(p.dry_run);
    }

    #[test]
    fn test_malformed_file_value_keeps_earlier_one() {
        let mut cfg = Config::default();
        cfg.apply(&parse_value_map("RATIO=0.5\nPITCH_US=1000\n"));
        cfg.apply(&parse_value_map("RATIO=0,5\nPITCH_US=1ms\nFREQ_LOW=800000\n"));
        assert_eq!(cfg.ratio, Some(0.5));
        assert_eq!(cfg.pitch_us, Some(1000));
        assert_eq!(cfg.freq_low, Some(800_000));

        // nothing earlier to keep
        let mut cfg = Config::default();
        cfg.apply(&parse_value_map("FREQ_HIGH=fast\n"));
        assert_eq!(cfg.freq_high, None);
    }

    #[test]
    fn test_missing_values_are_reported() {
        let cfg = Config {
            cores: Some("0".to_string()),
            pitch_us: Some(1000),
            freq_low: Some(1),
            ..Default::default()
        };
        match cfg.engine_params() {
            Err(Error::InvalidConfig(msg)) => assert!(msg.contains("FREQ_HIGH")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cores_default_to_online() {
        let tmp = tmp_dir("online");
        fs::write(tmp.join("online"), "0-2\n").unwrap();
        let cfg = Config {
            sysfs_root: Some(tmp),
            pitch_us: Some(1000),
            freq_low: Some(1),
            freq_high: Some(2),
            ratio: Some(0.0),
            ..Default::default()
        };
        let p = cfg.engine_params().unwrap();
        assert_eq!(p.cores.len(), 3);
    }
}
