//! Turning probe results into console lines and output files.

use crate::types::ProbeResult;
use console::Style;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which bracketed segments to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Display {
    pub ip: bool,
    pub status_code: bool,
    pub title: bool,
    pub location: bool,
    pub favicon: bool,
    /// Also report inactive domains.
    pub verbose: bool,
}

fn paint(text: String, style: &Style, styled: bool) -> String {
    if styled {
        style.apply_to(text).to_string()
    } else {
        text
    }
}

fn segments(result: &ProbeResult, display: &Display, styled: bool) -> Vec<String> {
    let mut parts = vec![result.domain.clone()];

    if !result.active {
        parts.push(paint("[Not Active]".into(), &Style::new().red(), styled));
        if display.status_code {
            if let Some(code) = result.status_code {
                parts.push(paint(format!("[Status Code:{}]", code), &Style::new().magenta(), styled));
            }
        }
        return parts;
    }

    parts.push(paint("[Active]".into(), &Style::new().green(), styled));
    if display.ip {
        let ip = result.ip.as_deref().unwrap_or_default();
        parts.push(paint(format!("[IP:{}]", ip), &Style::new().yellow(), styled));
    }
    if display.status_code {
        let code = result.status_code.map(|c| c.to_string()).unwrap_or_default();
        parts.push(paint(format!("[Status Code:{}]", code), &Style::new().magenta(), styled));
    }
    if display.title {
        let title = result.title.as_deref().unwrap_or_default();
        parts.push(paint(format!("[Title:{}]", title), &Style::new().green(), styled));
    }
    if display.location {
        let location = result.location.as_deref().unwrap_or_default();
        parts.push(paint(format!("[Location:{}]", location), &Style::new().blue(), styled));
    }
    if display.favicon {
        let hash = result.favicon_hash.as_deref().unwrap_or_default();
        parts.push(format!("[Favicon Hash:{}]", hash));
    }
    parts
}

/// Console line for `result`, or `None` when an inactive domain should stay
/// quiet.
pub fn console_line(result: &ProbeResult, display: &Display, styled: bool) -> Option<String> {
    if !result.active && !display.verbose {
        return None;
    }
    Some(segments(result, display, styled).join(" "))
}

/// Line for the domain status file. Same content as the console, never styled.
pub fn file_line(result: &ProbeResult, display: &Display) -> Option<String> {
    console_line(result, display, false)
}

pub fn ip_line(result: &ProbeResult, display: &Display) -> Option<String> {
    if result.active && display.ip {
        result.ip.clone()
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub write_failures: usize,
}

struct Sink {
    path: PathBuf,
    writer: Box<dyn Write + Send>,
}

impl Sink {
    fn create(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path).map_err(|source| ReportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Box::new(BufWriter::new(file)),
        })
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", line)
    }
}

/// Single consumer of probe results. Owning every sink in one place keeps
/// lines whole without any locking in the workers.
pub struct Reporter {
    display: Display,
    console: Option<Box<dyn Write + Send>>,
    styled: bool,
    output: Option<Sink>,
    ip_output: Option<Sink>,
    summary: Summary,
}

impl Reporter {
    pub fn new(display: Display) -> Self {
        Self {
            display,
            console: None,
            styled: false,
            output: None,
            ip_output: None,
            summary: Summary::default(),
        }
    }

    /// Opens (truncating) the optional output files. Failing here is fatal
    /// for the run.
    pub fn create(
        display: Display,
        output: Option<&Path>,
        ip_output: Option<&Path>,
    ) -> Result<Self, ReportError> {
        let mut reporter = Self::new(display);
        reporter.output = output.map(Sink::create).transpose()?;
        reporter.ip_output = ip_output.map(Sink::create).transpose()?;
        Ok(reporter)
    }

    pub fn with_console(mut self, console: impl Write + Send + 'static, styled: bool) -> Self {
        self.console = Some(Box::new(console));
        self.styled = styled;
        self
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_ref().map(|sink| sink.path.as_path())
    }

    pub fn ip_output_path(&self) -> Option<&Path> {
        self.ip_output.as_ref().map(|sink| sink.path.as_path())
    }

    pub fn report(&mut self, result: &ProbeResult) {
        self.summary.total += 1;
        if result.active {
            self.summary.active += 1;
        } else {
            self.summary.inactive += 1;
        }

        if let Some(console) = self.console.as_mut() {
            if let Some(line) = console_line(result, &self.display, self.styled) {
                if let Err(e) = writeln!(console, "{}", line) {
                    warn!(error = %e, "Failed to write to console");
                    self.summary.write_failures += 1;
                }
            }
        }

        if let Some(sink) = self.output.as_mut() {
            if let Some(line) = file_line(result, &self.display) {
                if let Err(e) = sink.write_line(&line) {
                    warn!(path = %sink.path.display(), error = %e, "Failed to write to output file");
                    self.summary.write_failures += 1;
                }
            }
        }

        if let Some(sink) = self.ip_output.as_mut() {
            if let Some(ip) = ip_line(result, &self.display) {
                if let Err(e) = sink.write_line(&ip) {
                    warn!(path = %sink.path.display(), error = %e, "Failed to write to IP output file");
                    self.summary.write_failures += 1;
                }
            }
        }
    }

    /// Flush every sink and return the run totals.
    pub fn finish(mut self) -> Summary {
        if let Some(console) = self.console.as_mut() {
            if let Err(e) = console.flush() {
                warn!(error = %e, "Failed to flush console");
                self.summary.write_failures += 1;
            }
        }
        for sink in [self.output.as_mut(), self.ip_output.as_mut()].into_iter().flatten() {
            if let Err(e) = sink.writer.flush() {
                warn!(path = %sink.path.display(), error = %e, "Failed to flush output file");
                self.summary.write_failures += 1;
            }
        }
        self.summary
    }
}
