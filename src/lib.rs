//! CPU duty-cycle emulation library
//! Alternates cores between a low and a high frequency, or freezes and thaws
//! a cgroup, so the time-averaged capacity matches a target fraction.

pub mod args;
pub mod config;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod logger;
pub mod schedule;
pub mod signal;

pub use config::Config;
pub use engine::{EngineParams, EngineState, LowState, Mode, RunSummary};
pub use error::{Error, FreezerOp};
pub use hardware::cpu::CoreSet;
pub use hardware::freezer::CgroupFreezeChannel;
pub use hardware::freq::{FrequencyChannelSet, WriteReport, WriteTally};
pub use hardware::governor::{CpufreqSet, DryRunReset, FrequencyReset};
pub use schedule::DutyCycleSchedule;
pub use signal::ControlState;
