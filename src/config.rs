//! Process-level configuration: logging init and environment parsing.
//! Library code never initializes a logger itself; only
//! `src/bin/molcore-run.rs` calls [`init_logging`], in the style of a
//! single bare `env_logger::init()` call in `main`.

use std::env;

/// Initialize `env_logger`, seeding `RUST_LOG` from `level` when the
/// environment variable isn't already set so `--log-level` on the CLI
/// has an effect without shadowing an operator's own `RUST_LOG`.
pub fn init_logging(level: &str) {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", level);
    }
    let _ = env_logger::try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging("warn");
        init_logging("warn");
    }
}
