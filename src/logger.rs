//! Logger setup on top of `env_logger`

use log::LevelFilter;

/// Map `-v` count to a level: 0 info, 1 debug, 2+ trace
pub fn level_for(verbosity: u8, debug: bool) -> LevelFilter {
    match verbosity {
        0 if debug => LevelFilter::Debug,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialise the global logger once. `RUST_LOG` still overrides the level.
pub fn init(verbosity: u8, debug: bool) {
    let _ = env_logger::Builder::new()
        .filter_level(level_for(verbosity, debug))
        .parse_default_env()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_for(0, false), LevelFilter::Info);
        assert_eq!(level_for(0, true), LevelFilter::Debug);
        assert_eq!(level_for(1, false), LevelFilter::Debug);
        assert_eq!(level_for(2, false), LevelFilter::Trace);
        assert_eq!(level_for(3, true), LevelFilter::Trace);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(0, false);
        init(2, true);
    }
}
