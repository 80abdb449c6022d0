use std::path::PathBuf;

use crate::config::Config;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CliArgs {
    pub dry_run: bool,
    pub verbosity: u8,
    pub config_path: Option<PathBuf>,
    pub cores: Option<String>,
    pub pitch_us: Option<u64>,
    pub freq_low: Option<u32>,
    pub freq_high: Option<u32>,
    pub freq_max: Option<u32>,
    pub ratio: Option<f64>,
    pub cgroup_path: Option<PathBuf>,
}

impl CliArgs {
    /// CLI values take precedence over config values
    pub fn overlay(&self, cfg: &mut Config) {
        cfg.dry_run |= self.dry_run;
        if self.cores.is_some() {
            cfg.cores = self.cores.clone();
        }
        if self.pitch_us.is_some() {
            cfg.pitch_us = self.pitch_us;
        }
        if self.freq_low.is_some() {
            cfg.freq_low = self.freq_low;
        }
        if self.freq_high.is_some() {
            cfg.freq_high = self.freq_high;
        }
        if self.freq_max.is_some() {
            cfg.freq_max = self.freq_max;
        }
        if self.ratio.is_some() {
            cfg.ratio = self.ratio;
        }
        if self.cgroup_path.is_some() {
            cfg.cgroup_path = self.cgroup_path.clone();
        }
    }
}

/// Split `--key=value` or take the next argument for `--key value`
fn flag_value<I: Iterator<Item = String>>(arg: &str, iter: &mut I) -> Option<String> {
    match arg.find('=') {
        Some(eq) => Some(arg[eq + 1..].to_string()).filter(|v| !v.is_empty()),
        None => iter.next(),
    }
}

fn parse_cli_args_from<I: IntoIterator<Item = String>>(args: I) -> CliArgs {
    let mut cli = CliArgs::default();
    let mut iter = args.into_iter();
    while let Some(a) = iter.next() {
        let name = a.split('=').next().unwrap_or_default();
        match name {
            "--dry-run" => cli.dry_run = true,
            s if s.starts_with("-v") && s.chars().skip(1).all(|c| c == 'v') => {
                let count = s.chars().skip(1).count();
                // bound verbosity at 3
                cli.verbosity = std::cmp::min(3, count as u8);
            }
            "--verbose" => cli.verbosity = std::cmp::max(cli.verbosity, 1),
            "--config" => cli.config_path = flag_value(&a, &mut iter).map(PathBuf::from),
            "--cores" => cli.cores = flag_value(&a, &mut iter),
            "--pitch" => cli.pitch_us = flag_value(&a, &mut iter).and_then(|v| v.parse().ok()),
            "--freq-low" => {
                cli.freq_low = flag_value(&a, &mut iter).and_then(|v| v.parse().ok())
            }
            "--freq-high" => {
                cli.freq_high = flag_value(&a, &mut iter).and_then(|v| v.parse().ok())
            }
            "--freq-max" => {
                cli.freq_max = flag_value(&a, &mut iter).and_then(|v| v.parse().ok())
            }
            "--ratio" => cli.ratio = flag_value(&a, &mut iter).and_then(|v| v.parse().ok()),
            "--cgroup" => cli.cgroup_path = flag_value(&a, &mut iter).map(PathBuf::from),
            _ => {}
        }
    }
    cli
}

pub fn parse_cli_args() -> CliArgs {
    parse_cli_args_from(std::env::args())
}
