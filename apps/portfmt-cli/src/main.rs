//! `portfmt` - formatter, linter, and programmatic editor for port
//! Makefiles, as a standalone binary.
//!
//! A thin wrapper around [`portfmt_cli::run_cli`], handling error display
//! and exit codes. All command logic lives in the library so it stays
//! testable.

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = portfmt_cli::run_cli() {
        eprintln!("portfmt: {e}");
        std::process::exit(1);
    }
}
