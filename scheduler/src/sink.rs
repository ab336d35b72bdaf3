use std::collections::VecDeque;

use log::info;

const DEFAULT_MAX_LINES: usize = 256;

/// An append-only destination for user facing progress lines.
pub trait LogSink {
    fn write(&mut self, line: &str);
}

impl LogSink for Vec<String> {
    fn write(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn write(&mut self, line: &str) {
        (**self).write(line);
    }
}

/// A bounded console: only the last `max_lines` lines are kept.
#[derive(Debug, Clone)]
pub struct Console {
    lines: VecDeque<String>,
    max_lines: usize,
    echo: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl Console {
    /// Creates a new `Console` keeping at most `max_lines` lines, at least one.
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            echo: false,
        }
    }

    /// Also prints every line to stdout as it's written.
    pub fn echo(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Changes the capacity, dropping the oldest lines that no longer fit.
    pub fn set_max_lines(&mut self, max_lines: usize) {
        self.max_lines = max_lines.max(1);
        self.truncate();
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn truncate(&mut self) {
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }
}

impl LogSink for Console {
    fn write(&mut self, line: &str) {
        if self.echo {
            println!("{line}");
        }

        self.lines.push_back(line.to_string());
        self.truncate();
    }
}

/// Forwards every line to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogForward;

impl LogSink for LogForward {
    fn write(&mut self, line: &str) {
        info!(target: "console", "{line}");
    }
}
