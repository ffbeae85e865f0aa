//! Logging setup.
//!
//! Everything logs through the `log` facade; the binary installs
//! `env_logger` once at startup. `RUST_LOG` overrides the level chosen here.

use log::LevelFilter;

pub fn level_for(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

pub fn init(debug: bool) {
    let default = level_for(debug).to_string().to_lowercase();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(Some(env_logger::TimestampPrecision::Seconds))
        .init();
}
