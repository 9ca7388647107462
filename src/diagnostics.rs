use tracing::warn;

/// Receives human-readable diagnostic lines, e.g. the reason a received line was rejected by
///  the frame codec.
pub trait DiagnosticSink {
    fn log(&mut self, line: &str);
}

/// Forwards diagnostics to `tracing` at `warn` level
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&mut self, line: &str) {
        warn!("{}", line);
    }
}

impl DiagnosticSink for Vec<String> {
    fn log(&mut self, line: &str) {
        self.push(line.to_string());
    }
}
