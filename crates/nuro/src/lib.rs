// Suppress false positive warnings from thiserror/miette derive macros
#![allow(unused_assignments)]

//! nuro - run commands by name from an ordered list of sources
//!
//! This crate is the command-line front end over [`nuro_core`]: it parses
//! global options, installs tracing, prints the root banner and maps
//! dispatch outcomes to process exit codes.

/// Root usage banner and command listing.
pub mod banner;
/// CLI argument parsing, error rendering and exit codes.
pub mod cli;
/// Tracing and logging configuration.
pub mod tracing;

use ::tracing::{Instrument, info_span};
use cli::{Action, CliError, EXIT_OK, exit_code_for, render_error};
use nuro_core::{Dispatcher, Settings};
use std::io::Write;

/// Run one parsed invocation to completion and return the exit code.
pub async fn run(cli: cli::Cli) -> i32 {
    let config = tracing::TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    };
    if let Err(e) = tracing::init_tracing(config) {
        let err = CliError::usage(e.to_string());
        render_error(&err, cli.json);
        return exit_code_for(&err);
    }

    let action = cli.action();
    if action == Action::Version {
        return print_stdout(&format!("nuro {}\n", env!("CARGO_PKG_VERSION")));
    }

    let dispatcher = match Settings::from_env().and_then(|mut settings| {
        settings.debug = cli.debug_enabled(settings.debug);
        Dispatcher::from_settings(settings)
    }) {
        Ok(dispatcher) => dispatcher,
        Err(e) => return fail(e.into(), cli.json),
    };

    match action {
        Action::Dispatch { name, args } => {
            let span = info_span!(
                "dispatch",
                command = %name,
                correlation_id = %tracing::correlation_id(),
            );
            dispatch(&dispatcher, &name, &args, cli.json)
                .instrument(span)
                .await
        }
        Action::Banner | Action::Version => {
            let commands = banner::known_commands(&dispatcher).await;
            print_stdout(&banner::render(env!("CARGO_PKG_VERSION"), &commands))
        }
    }
}

async fn dispatch(dispatcher: &Dispatcher, name: &str, args: &[String], json: bool) -> i32 {
    let mut stdout = std::io::stdout();
    tokio::select! {
        result = dispatcher.dispatch(name, args, &mut stdout) => {
            let _ = stdout.flush();
            match result {
                Ok(code) => code,
                Err(e) => fail(e.into(), json),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            ::tracing::info!("Interrupted, stopping {name}");
            let _ = stdout.flush();
            fail(nuro_core::Error::UserInterrupt.into(), json)
        }
    }
}

fn fail(err: CliError, json: bool) -> i32 {
    render_error(&err, json);
    exit_code_for(&err)
}

fn print_stdout(text: &str) -> i32 {
    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
        Ok(()) => EXIT_OK,
        Err(e) => fail(CliError::command(format!("failed to write output: {e}")), false),
    }
}
