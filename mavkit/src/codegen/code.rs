/// Line-oriented source buffer with indentation.
#[derive(Debug)]
pub(crate) struct Code {
    text: String,
    indent: usize,
    unit: &'static str,
}

impl Code {
    pub(crate) fn new(unit: &'static str) -> Self {
        Self {
            text: String::new(),
            indent: 0,
            unit,
        }
    }

    /// Appends an indented line.
    pub(crate) fn line(&mut self, line: impl AsRef<str>) -> &mut Self {
        let line = line.as_ref();
        if !line.is_empty() {
            for _ in 0..self.indent {
                self.text.push_str(self.unit);
            }
            self.text.push_str(line);
        }
        self.text.push('\n');
        self
    }

    /// Appends an empty line.
    pub(crate) fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    /// Appends a line and increases indentation.
    pub(crate) fn open(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.line(line);
        self.indent += 1;
        self
    }

    /// Decreases indentation and appends a line.
    pub(crate) fn close(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self.line(line)
    }

    /// Decreases indentation.
    pub(crate) fn dedent(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    /// Appends lines of a documentation block prefixed with `prefix`.
    pub(crate) fn doc(&mut self, prefix: &str, text: &str) -> &mut Self {
        for line in text.lines().map(str::trim) {
            if line.is_empty() {
                self.line(prefix.trim_end());
            } else {
                self.line(format!("{prefix}{line}"));
            }
        }
        self
    }

    pub(crate) fn into_string(self) -> String {
        self.text
    }
}
