//! Commands compiled into the binary, consulted after every source is exhausted.

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::io::Write;

use crate::cache::Cache;
use crate::listing;
use crate::usage::UsageExtractor;
use crate::{Error, Result};

/// What a built-in may use.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinContext<'a> {
    /// Artifact cache.
    pub cache: &'a Cache,
    /// Usage extraction for listings.
    pub usage: &'a UsageExtractor,
}

/// Signature of a built-in command.
pub type BuiltinFn = for<'a> fn(
    BuiltinContext<'a>,
    &'a [String],
    &'a mut (dyn Write + Send),
) -> LocalBoxFuture<'a, Result<i32>>;

/// One entry of the capability table.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    /// Command name.
    pub name: &'static str,
    /// One-line description.
    pub summary: &'static str,
    /// Implementation.
    pub run: BuiltinFn,
}

/// The capability table.
pub const BUILTINS: &[Builtin] = &[Builtin {
    name: "list",
    summary: "List cached commands with their source and usage",
    run: list,
}];

/// Find a built-in by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

fn list<'a>(
    ctx: BuiltinContext<'a>,
    _args: &'a [String],
    sink: &'a mut (dyn Write + Send),
) -> LocalBoxFuture<'a, Result<i32>> {
    async move {
        let commands = listing::cached_commands(ctx.cache, ctx.usage).await;
        if commands.is_empty() {
            emit(sink, "(no cached commands)")?;
            return Ok(0);
        }
        let width = commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for command in commands {
            let mut line = format!(
                "{:<width$}  {}/{}",
                command.name, command.source, command.kind
            );
            if !command.summary.is_empty() {
                line.push_str("  ");
                line.push_str(&command.summary);
            }
            emit(sink, &line)?;
        }
        Ok(0)
    }
    .boxed_local()
}

fn emit(sink: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(sink, "{line}").map_err(|e| Error::io(e, None, "write listing"))
}
