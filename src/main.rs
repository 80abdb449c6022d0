//! CPU duty-cycle service
//! Alternates a set of cores between a low and a high frequency (or freezes
//! and thaws a cgroup) until SIGINT/SIGTERM, then restores maximum frequency.

use std::process;

use log::{debug, error, info};

use cpu_dutycycle::args::parse_cli_args;
use cpu_dutycycle::config::Config;
use cpu_dutycycle::engine::{self, EngineParams};
use cpu_dutycycle::hardware::governor::{CpufreqSet, DryRunReset};
use cpu_dutycycle::logger;
use cpu_dutycycle::signal::{self, ControlState};

fn log_params(cfg: &Config, params: &EngineParams) {
    debug!("cfg.dry_run={}", cfg.dry_run);
    debug!("cfg.debug={}", cfg.debug);
    debug!("cfg.reset_command={:?}", cfg.reset_command);
    debug!(
        "derived.cores={:?}",
        params.cores.iter().collect::<Vec<_>>()
    );
    debug!("derived.sysfs_root={}", params.sysfs_root.display());
    debug!("derived.pitch_us={}", params.pitch_us);
    debug!("derived.freq_low={}", params.freq_low);
    debug!("derived.freq_high={}", params.freq_high);
    debug!("derived.freq_max={:?}", params.freq_max);
    debug!("derived.ratio={}", params.ratio);
    debug!(
        "derived.cgroup_path={}",
        params
            .cgroup_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "None".to_string())
    );
}

fn main() {
    let cli = parse_cli_args();

    // Read configuration (env vars + config file), CLI flags on top
    let mut cfg = Config::load(cli.config_path.clone());
    cli.overlay(&mut cfg);

    logger::init(cli.verbosity, cfg.debug);
    info!("Starting cpu-dutycycle");

    let params = match cfg.engine_params() {
        Ok(p) => p,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };
    log_params(&cfg, &params);

    let control = ControlState::new();
    if let Err(e) = signal::install(&control) {
        error!("{}", e);
        process::exit(1);
    }

    let result = if params.dry_run {
        engine::run(
            &params,
            &control,
            DryRunReset::new(cfg.reset_command.clone()),
        )
    } else {
        engine::run(&params, &control, CpufreqSet::new(cfg.reset_command.clone()))
    };

    match result {
        Ok(summary) => info!(
            "Stopped after {} cycles ({} frequency writes, {} failed)",
            summary.cycles, summary.writes.written, summary.writes.failed
        ),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
