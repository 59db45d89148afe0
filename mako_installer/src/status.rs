/// Line-oriented progress-text channel. Warnings and errors travel through
/// the same channel as normal status messages, tagged so a front end can
/// style them; they are also mirrored to the log stream.
pub trait StatusSink {
    fn line(&mut self, line: &str);

    fn info(&mut self, message: &str) {
        self.line(message);
    }

    fn warning(&mut self, message: &str) {
        eprintln!("[mako_installer] warning: {message}");
        self.line(&format!("[WARNING] {message}"));
    }

    fn error(&mut self, message: &str) {
        eprintln!("[mako_installer] error: {message}");
        self.line(&format!("[ERROR] {message}"));
    }
}

/// Default sink for the CLI: everything goes to stderr so stdout stays
/// free for the progress readout.
#[derive(Debug, Default)]
pub struct StderrSink;

impl StatusSink for StderrSink {
    fn line(&mut self, line: &str) {
        eprintln!("[mako_installer] {line}");
    }
}

/// Buffering sink for embedders and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl StatusSink for MemorySink {
    fn line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_and_errors_are_tagged() {
        let mut sink = MemorySink::default();
        sink.info("converting md1stin");
        sink.warning("gateway 3 points at a missing triangle");
        sink.error("map nrthmk skipped");
        assert_eq!(sink.lines[0], "converting md1stin");
        assert!(sink.lines[1].starts_with("[WARNING] "));
        assert!(sink.lines[2].starts_with("[ERROR] "));
    }
}
