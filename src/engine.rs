//! Duty-cycle engine: mode selection, phase loop and shutdown

use crate::error::Error;
use crate::hardware::cpu::CoreSet;
use crate::hardware::freezer::CgroupFreezeChannel;
use crate::hardware::freq::{FrequencyChannelSet, WriteReport, WriteTally};
use crate::hardware::governor::FrequencyReset;
use crate::schedule::{self, DutyCycleSchedule};
use crate::signal::ControlState;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::thread;

/// Everything the engine needs from the outside world
#[derive(Clone, Debug)]
pub struct EngineParams {
    pub cores: CoreSet,
    pub sysfs_root: PathBuf,
    pub pitch_us: u64,
    pub freq_low: u32,
    pub freq_high: u32,
    pub freq_max: Option<u32>,
    pub ratio: f64,
    pub cgroup_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// What "low" means for this run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LowState {
    /// Write the low frequency to every core
    Throttle,
    /// Freeze the cgroup (low frequency given as 0)
    Freeze,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    AlwaysHigh,
    AlwaysLow(LowState),
    DutyCycle(LowState, DutyCycleSchedule),
}

impl Mode {
    pub fn select(params: &EngineParams) -> Result<Mode, Error> {
        schedule::check_ratio(params.ratio)?;
        if params.freq_high == 0 {
            return Err(Error::InvalidConfig("high frequency must be positive".to_string()));
        }
        let low_state = if params.freq_low == 0 {
            LowState::Freeze
        } else {
            LowState::Throttle
        };
        if params.ratio == 0.0 {
            return Ok(Mode::AlwaysHigh);
        }
        if low_state == LowState::Freeze && params.cgroup_path.is_none() {
            return Err(Error::InvalidConfig(
                "low frequency 0 needs a cgroup path to freeze".to_string(),
            ));
        }
        if params.ratio == 1.0 {
            return Ok(Mode::AlwaysLow(low_state));
        }
        let schedule = DutyCycleSchedule::new(params.pitch_us, params.ratio)?;
        Ok(Mode::DutyCycle(low_state, schedule))
    }
}

/// Returned to the caller once the engine has restored the hardware
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub writes: WriteTally,
}

/// Owns every handle the engine touches
pub struct EngineState<R: FrequencyReset> {
    freq: FrequencyChannelSet<R>,
    freezer: Option<CgroupFreezeChannel>,
    low_state: LowState,
    shut_down: bool,
    warned_failures: bool,
}

impl<R: FrequencyReset> EngineState<R> {
    pub fn new(freq: FrequencyChannelSet<R>, low_state: LowState) -> Self {
        EngineState {
            freq,
            freezer: None,
            low_state,
            shut_down: false,
            warned_failures: false,
        }
    }

    pub fn enter_low(&mut self) -> Result<(), Error> {
        match self.low_state {
            LowState::Throttle => {
                let report = self.freq.set_low();
                self.note(report);
                Ok(())
            }
            LowState::Freeze => self.freezer_mut()?.freeze(),
        }
    }

    pub fn enter_high(&mut self) -> Result<(), Error> {
        match self.low_state {
            LowState::Throttle => {
                let report = self.freq.set_high();
                self.note(report);
                Ok(())
            }
            LowState::Freeze => self.freezer_mut()?.thaw(),
        }
    }

    /// Drive every core to the high frequency regardless of low state
    pub fn drive_high(&mut self) {
        let report = self.freq.set_high();
        self.note(report);
    }

    /// Close all handles and put every core back at its maximum. Runs once;
    /// later calls are no-ops. A frozen group is thawed before its handle
    /// is closed; a failed thaw is still reported after the cores are reset.
    pub fn shutdown(&mut self, control: &ControlState) -> Result<(), Error> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let mut thaw_result = Ok(());
        if let Some(fz) = self.freezer.as_mut() {
            if fz.is_frozen() {
                thaw_result = fz.thaw();
            }
            fz.close();
        }
        self.freq.close();
        self.freq.reset_all();
        control.request_stop();

        let tally = self.freq.tally();
        info!(
            "Restored {} cores ({} writes, {} failed)",
            self.freq.len(),
            tally.written,
            tally.failed
        );
        thaw_result
    }

    #[cfg(test)]
    fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn freezer_mut(&mut self) -> Result<&mut CgroupFreezeChannel, Error> {
        self.freezer.as_mut().ok_or_else(|| {
            Error::InvalidConfig("freeze requested without an open cgroup".to_string())
        })
    }

    fn note(&mut self, report: WriteReport) {
        if report.is_clean() {
            return;
        }
        if !self.warned_failures {
            warn!(
                "{} of {} frequency writes failed; further failures logged at debug",
                report.failed,
                report.written + report.failed
            );
            self.warned_failures = true;
        } else {
            debug!("{} frequency writes failed", report.failed);
        }
    }
}

/// Alternate LOW and HIGH until a stop is requested.
///
/// The flag is checked only between full cycles, so a phase that has started
/// always runs to completion and shutdown latency is bounded by one pitch.
pub fn run_cycles<R: FrequencyReset>(
    state: &mut EngineState<R>,
    schedule: &DutyCycleSchedule,
    control: &ControlState,
) -> Result<u64, Error> {
    let low = schedule.low();
    let high = schedule.high();
    let mut cycles = 0u64;
    while !control.is_stopping() {
        state.enter_low()?;
        thread::sleep(low);
        state.enter_high()?;
        thread::sleep(high);
        cycles += 1;
    }
    debug!("stop observed after {} cycles", cycles);
    Ok(cycles)
}

/// Run the engine until `control` is stopped, then restore the hardware.
///
/// A cgroup freezer failure is returned immediately without restoration.
pub fn run<R: FrequencyReset>(
    params: &EngineParams,
    control: &ControlState,
    reset: R,
) -> Result<RunSummary, Error> {
    let mode = Mode::select(params)?;
    debug!("mode: {:?}", mode);

    let freq = FrequencyChannelSet::open(
        &params.cores,
        &params.sysfs_root,
        params.freq_low,
        params.freq_high,
        params.freq_max,
        reset,
        params.dry_run,
    );

    let mut cycles = 0;
    let mut state = match mode {
        Mode::AlwaysHigh => {
            let mut state = EngineState::new(freq, LowState::Throttle);
            info!("ratio 0: holding {} kHz", params.freq_high);
            state.drive_high();
            control.wait();
            state
        }
        Mode::AlwaysLow(low_state) => {
            let mut state = EngineState::new(freq, low_state);
            state.freezer = open_freezer(params, low_state)?;
            match low_state {
                LowState::Throttle => info!("ratio 1: holding {} kHz", params.freq_low),
                LowState::Freeze => info!("ratio 1: holding cgroup frozen"),
            }
            state.enter_low()?;
            control.wait();
            state
        }
        Mode::DutyCycle(low_state, schedule) => {
            let mut state = EngineState::new(freq, low_state);
            state.freezer = open_freezer(params, low_state)?;
            info!(
                "pitch: {}us, freqlow: {} kHz, freqhigh: {} kHz, timelow: {}us, timehigh: {}us",
                schedule.pitch_us,
                params.freq_low,
                params.freq_high,
                schedule.low_us,
                schedule.high_us
            );
            state.drive_high();
            cycles = run_cycles(&mut state, &schedule, control)?;
            state
        }
    };

    if let Err(e) = state.shutdown(control) {
        error!("{}", e);
        return Err(e);
    }
    Ok(RunSummary {
        cycles,
        writes: state.freq.tally(),
    })
}

fn open_freezer(
    params: &EngineParams,
    low_state: LowState,
) -> Result<Option<CgroupFreezeChannel>, Error> {
    match (low_state, &params.cgroup_path) {
        (LowState::Freeze, Some(path)) => {
            Ok(Some(CgroupFreezeChannel::open(path, params.dry_run)?))
        }
        _ => Ok(None),
    }
}
