use std::fmt;
use tracing::{error, info, trace, warn};

/// How prominently the host should surface a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Hidden,
    Information,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Hidden => "hidden",
            Severity::Information => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.pad(name)
    }
}

/// Receives reports from importers and encoders.
pub trait DiagnosticSink {
    fn report(&mut self, severity: Severity, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Collects reports for the caller to inspect.
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, severity: Severity, message: &str) {
        self.push(Diagnostic {
            severity,
            message: message.to_string(),
        });
    }
}

/// Forwards reports to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Hidden => trace!("{}", message),
            Severity::Information => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}
