//! Root usage banner.

use nuro_core::Dispatcher;
use nuro_core::listing::{GITHUB_API, RemoteListing};
use std::fmt::Write as _;

/// Shown when neither the official listing nor the cache names any command.
pub const NO_COMMANDS: &str = "(no commands listed / offline)";

/// Render the banner for `version` followed by `commands`.
#[must_use]
pub fn render(version: &str, commands: &[String]) -> String {
    let mut out = format!(
        "nuro {version}\n\n\
         USAGE:\n  \
         nuro <command> [args...]\n  \
         nuro <command> -h|--help|/?\n\n\
         GLOBAL OPTIONS:\n  \
         --debug | -d        write the debug log for this invocation\n  \
         --no-debug          do not write the debug log\n  \
         --level | -L <lvl>  diagnostic level (trace, debug, info, warn, error)\n  \
         --json              report errors as JSON\n  \
         --version | -V      print the version\n\n"
    );
    if commands.is_empty() {
        out.push_str(NO_COMMANDS);
        out.push('\n');
    } else {
        out.push_str("COMMANDS (known):\n");
        for command in commands {
            let _ = writeln!(out, "  {command}");
        }
    }
    out
}

/// Commands offered by the official repository, or found in the cache.
pub async fn known_commands(dispatcher: &Dispatcher) -> Vec<String> {
    RemoteListing::new(GITHUB_API, dispatcher.settings().usage_timeout)
        .known_commands(dispatcher.registry(), dispatcher.fetcher(), dispatcher.cache())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_commands() {
        let text = render("1.2.3", &["hello".to_string(), "ping".to_string()]);
        assert!(text.starts_with("nuro 1.2.3\n"));
        assert!(text.contains("USAGE:\n  nuro <command> [args...]\n"));
        assert!(text.contains("--no-debug"));
        assert!(text.ends_with("COMMANDS (known):\n  hello\n  ping\n"));
        assert!(!text.contains(NO_COMMANDS));
    }

    #[test]
    fn test_render_offline() {
        let text = render("1.2.3", &[]);
        assert!(text.ends_with("(no commands listed / offline)\n"));
        assert!(!text.contains("COMMANDS (known)"));
    }
}
