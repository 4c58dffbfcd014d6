use anyhow::Error;
use log::error;

/// Log the whole context chain of `err` and hand it back to the caller.
pub fn handle_error(err: Error) -> Error {
    error!("{}", format_error_chain(&err));
    err
}

/// Render an error and its causes, outermost first, one per line.
pub fn format_error_chain(err: &Error) -> String {
    let mut lines = vec![err.to_string()];
    for (depth, cause) in err.chain().skip(1).enumerate() {
        lines.push(format!("{:>3}: {}", depth, cause));
    }
    lines.join("\n")
}
