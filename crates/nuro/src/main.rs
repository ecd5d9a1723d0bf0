//! nuro CLI application
//!
//! `nuro <command> [args...]` resolves `command` against the configured
//! sources, runs it and exits with its exit code.

use nuro::cli::{self, EXIT_NOT_FOUND, exit_code_for, render_error};

fn main() {
    // NOTE: tracing may be unusable during a panic, so the hook writes directly.
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = match cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            render_error(&err, false);
            std::process::exit(exit_code_for(&err));
        }
    };

    let exit_code = run_with_tokio(cli);
    std::process::exit(exit_code);
}

fn run_with_tokio(cli: cli::Cli) -> i32 {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            }
            return EXIT_NOT_FOUND;
        }
    };

    rt.block_on(nuro::run(cli))
}
