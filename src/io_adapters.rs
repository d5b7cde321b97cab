use std::io::{self, Write};

/// Where the runner prints: listed paths, report headers and relayed script
/// output. Diagnostics go through `tracing` instead.
pub struct Console {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Console {
    pub fn new(out: impl Write + 'static, err: impl Write + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
        }
    }

    /// The process's own standard output and standard error.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    pub fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    pub fn err(&mut self) -> &mut dyn Write {
        self.err.as_mut()
    }
}
