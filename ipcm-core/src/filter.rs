//! Line-oriented classification of external tool output.
//!
//! Each tool family supplies a classifier that maps one raw output line to
//! a [`LogEntry`] (or a typed fatal error for known fatal signatures). The
//! simulation verdict itself is recognized by the [`ReportScanner`], a
//! small state machine that walks a fixed delimiter protocol bracketing
//! the final `RESULT = ...` line.

use crate::entity::SimulationResult;
use crate::error::SimulatorError;
use crate::logging::{LogEntry, Severity};

/// One classified line, or nothing when the tool filter swallows the line.
pub type Classified = Result<Option<LogEntry>, SimulatorError>;

/// A per-tool line classifier.
pub trait OutputClassifier {
    fn classify(&mut self, line: &str) -> Classified;
}

// ----------------------------------------------------------------------
// Report delimiter protocol
// ----------------------------------------------------------------------

/// The delimiter literals bracketing a testbench report.
#[derive(Debug, Clone)]
pub struct ReportProtocol {
    pub banner: &'static str,
    pub title: &'static str,
    pub result_prefix: &'static str,
}

impl Default for ReportProtocol {
    fn default() -> Self {
        Self {
            banner: "========================================",
            title: "POC TESTBENCH REPORT",
            result_prefix: "SIMULATION RESULT = ",
        }
    }
}

/// Scanner states, advanced one marker at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ScanState {
    SearchBanner,
    SearchTitle,
    SearchSeparator,
    SearchSeparator2,
    SearchResult,
    SearchFinalSeparator,
    Done,
}

/// Recognizes the testbench report inside an already classified entry
/// stream and extracts the terminal [`SimulationResult`].
///
/// Lines that are not the currently expected marker pass through
/// unchanged without advancing the state.
#[derive(Debug)]
pub struct ReportScanner {
    protocol: ReportProtocol,
    state: ScanState,
    result: SimulationResult,
}

impl ReportScanner {
    pub fn new(protocol: ReportProtocol) -> Self {
        Self {
            protocol,
            state: ScanState::SearchBanner,
            result: SimulationResult::Error,
        }
    }

    /// Feed one classified entry; every input yields exactly one output.
    pub fn feed(&mut self, entry: LogEntry) -> LogEntry {
        let message = entry.message();
        match self.state {
            ScanState::SearchBanner if message == self.protocol.banner => {
                self.state = ScanState::SearchTitle;
                entry
            }
            ScanState::SearchTitle if message == self.protocol.title => {
                self.state = ScanState::SearchSeparator;
                entry.retag(message.to_string())
            }
            ScanState::SearchSeparator if message == self.protocol.banner => {
                self.state = ScanState::SearchSeparator2;
                entry
            }
            ScanState::SearchSeparator2 if message == self.protocol.banner => {
                self.state = ScanState::SearchResult;
                entry
            }
            ScanState::SearchResult if message.starts_with(self.protocol.result_prefix) => {
                self.state = ScanState::SearchFinalSeparator;
                self.result = if message.ends_with("FAILED") {
                    SimulationResult::Failed
                } else if message.ends_with("NO ASSERTS") {
                    SimulationResult::NoAsserts
                } else if message.ends_with("PASSED") {
                    SimulationResult::Passed
                } else {
                    SimulationResult::Error
                };
                entry
            }
            ScanState::SearchFinalSeparator if message == self.protocol.banner => {
                self.state = ScanState::Done;
                entry
            }
            _ => entry,
        }
    }

    /// The terminal verdict; an error when the report never completed.
    pub fn finish(&self) -> Result<SimulationResult, SimulatorError> {
        if self.state == ScanState::Done {
            Ok(self.result)
        } else {
            Err(SimulatorError::ResultNotFound)
        }
    }
}

// ----------------------------------------------------------------------
// GHDL
// ----------------------------------------------------------------------

/// Classifier for `ghdl -a` / `ghdl -e` output.
///
/// Recognized shapes: `path:line:col:[warning:] message`; the literal
/// `ghdl: compilation error` and the `must be reanalysed` message are
/// fatal signatures.
#[derive(Debug, Default)]
pub struct GhdlAnalyzeFilter;

impl OutputClassifier for GhdlAnalyzeFilter {
    fn classify(&mut self, line: &str) -> Classified {
        if line.contains("ghdl: compilation error") {
            return Err(SimulatorError::CompilationError {
                tool: "ghdl".to_string(),
                message: line.to_string(),
            });
        }
        let Some(rest) = split_location(line) else {
            return Ok(Some(LogEntry::new(line, Severity::Normal)));
        };
        if rest.strip_prefix("warning: ").is_some() {
            return Ok(Some(LogEntry::new(line, Severity::Warning)));
        }
        if let Some(message) = rest.strip_prefix(' ') {
            if message.ends_with("has changed and must be reanalysed") {
                return Err(SimulatorError::Reanalyze(message.to_string()));
            }
            return Ok(Some(LogEntry::new(line, Severity::Error)));
        }
        Ok(Some(LogEntry::new(line, Severity::Normal)))
    }
}

/// Classifier for `ghdl -r` output.
///
/// Shapes: `path:line:col: message` (unknown severity, Error),
/// `path:line:col:severity: message` and
/// `path:line:col:@time:(report|assertion severity): message`, both mapped
/// through the VHDL severity table.
#[derive(Debug, Default)]
pub struct GhdlRunFilter {
    lineno: usize,
}

impl OutputClassifier for GhdlRunFilter {
    fn classify(&mut self, line: &str) -> Classified {
        if self.lineno < 2 {
            self.lineno += 1;
            if line.contains("Linking in memory") || line.contains("Starting simulation") {
                return Ok(Some(LogEntry::new(line, Severity::Verbose)));
            }
        }
        let severity = split_location(line)
            .and_then(run_line_severity)
            .unwrap_or(Severity::Normal);
        Ok(Some(LogEntry::new(line, severity)))
    }
}

/// Severity of the text following a `path:line:col:` prefix, or `None`
/// when the line does not follow the run-message grammar.
fn run_line_severity(rest: &str) -> Option<Severity> {
    // "<path>:<l>:<c>: message" carries no severity marker at all
    if rest.starts_with(' ') {
        return Some(Severity::Error);
    }
    if let Some(after_at) = rest.strip_prefix('@') {
        // "@<time>:(report <severity>): message"
        let idx = after_at.find(":(")?;
        let inner = &after_at[idx + 2..];
        let inner = inner
            .strip_prefix("report ")
            .or_else(|| inner.strip_prefix("assertion "))?;
        let end = inner.find(')')?;
        let tail = &inner[end + 1..];
        if !tail.starts_with(": ") {
            return None;
        }
        return Some(Severity::parse_vhdl(&inner[..end], Severity::Error));
    }
    let (severity, tail) = rest.split_once(':')?;
    if !tail.starts_with(' ')
        || severity.is_empty()
        || !severity.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    Some(Severity::parse_vhdl(severity, Severity::Error))
}

/// Find the first `:<digits>:<digits>:` location marker and return the
/// remainder of the line after it.
fn split_location(line: &str) -> Option<&str> {
    let mut search = 0;
    while let Some(rel) = line[search..].find(':') {
        let i = search + rel;
        if i == 0 {
            search = i + 1;
            continue;
        }
        if let Some((_, rest)) = take_digits(&line[i + 1..]) {
            if let Some(rest) = rest.strip_prefix(':') {
                if let Some((_, rest)) = take_digits(rest) {
                    if let Some(rest) = rest.strip_prefix(':') {
                        return Some(rest);
                    }
                }
            }
        }
        search = i + 1;
    }
    None
}

fn take_digits(s: &str) -> Option<(&str, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    (end > 0).then(|| s.split_at(end))
}

// ----------------------------------------------------------------------
// ModelSim / QuestaSim
// ----------------------------------------------------------------------

/// Classifier for `vlib` and `vcom` output (`** Warning: `, `** Error`,
/// `** Fatal: ` markers).
#[derive(Debug, Default)]
pub struct VcomFilter;

impl OutputClassifier for VcomFilter {
    fn classify(&mut self, line: &str) -> Classified {
        let severity = if line.starts_with("** Warning: ") {
            Severity::Warning
        } else if line.starts_with("** Error") || line.starts_with("** Fatal: ") {
            Severity::Error
        } else {
            Severity::Normal
        };
        Ok(Some(LogEntry::new(line, severity)))
    }
}

/// Classifier for `vsim` batch output.
///
/// Loader chatter is demoted to Debug, tool banners are dropped, and the
/// `# ` transcript prefix is stripped once the report banner was seen.
#[derive(Debug, Default)]
pub struct VsimFilter {
    report_seen: bool,
}

impl OutputClassifier for VsimFilter {
    fn classify(&mut self, line: &str) -> Classified {
        let entry = if line.starts_with("# Loading ") {
            Some(LogEntry::new(line, Severity::Debug))
        } else if let Some(banner) = line.strip_prefix("# //") {
            let banner = banner.trim_start();
            if banner.starts_with("Questa") || banner.starts_with("Version ") {
                Some(LogEntry::new(line, Severity::Debug))
            } else {
                None
            }
        } else if line.starts_with("# ========================================") {
            self.report_seen = true;
            Some(LogEntry::new(&line[2..], Severity::Normal))
        } else if line.starts_with("# ** Warning: ") {
            Some(LogEntry::new(line, Severity::Warning))
        } else if line.starts_with("# ** Error")
            || line.starts_with("# ** Fatal: ")
            || line.starts_with("** Fatal: ")
        {
            Some(LogEntry::new(line, Severity::Error))
        } else if line.starts_with("# %%") {
            // Testbench package summary lines keep their own result marker.
            let severity = if line.contains("ERROR") {
                Severity::Error
            } else {
                Severity::Normal
            };
            Some(LogEntry::new(&line[2..], severity))
        } else if let Some(rest) = line.strip_prefix("# ") {
            if self.report_seen {
                Some(LogEntry::new(rest, Severity::Normal))
            } else {
                Some(LogEntry::new(line, Severity::Verbose))
            }
        } else {
            Some(LogEntry::new(line, Severity::Normal))
        };
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_lines(result_line: Option<&str>) -> Vec<String> {
        let mut lines = vec![
            "some preamble".to_string(),
            "========================================".to_string(),
            "POC TESTBENCH REPORT".to_string(),
            "========================================".to_string(),
            "========================================".to_string(),
        ];
        if let Some(result) = result_line {
            lines.push(result.to_string());
        }
        lines.push("========================================".to_string());
        lines
    }

    fn scan(lines: &[String]) -> (Vec<LogEntry>, Result<SimulationResult, SimulatorError>) {
        let mut scanner = ReportScanner::new(ReportProtocol::default());
        let out: Vec<LogEntry> = lines
            .iter()
            .map(|line| scanner.feed(LogEntry::new(line.clone(), Severity::Normal)))
            .collect();
        let result = scanner.finish();
        (out, result)
    }

    #[test]
    fn well_formed_report_yields_passed() {
        let lines = report_lines(Some("SIMULATION RESULT = PASSED"));
        let (out, result) = scan(&lines);
        assert_eq!(out.len(), lines.len());
        assert_eq!(result.unwrap(), SimulationResult::Passed);
    }

    #[test]
    fn failed_and_no_assert_tokens_are_translated() {
        let (_, result) = scan(&report_lines(Some("SIMULATION RESULT = FAILED")));
        assert_eq!(result.unwrap(), SimulationResult::Failed);
        let (_, result) = scan(&report_lines(Some("SIMULATION RESULT = NO ASSERTS")));
        assert_eq!(result.unwrap(), SimulationResult::NoAsserts);
        let (_, result) = scan(&report_lines(Some("SIMULATION RESULT = GARBAGE")));
        assert_eq!(result.unwrap(), SimulationResult::Error);
    }

    #[test]
    fn missing_result_line_is_result_not_found() {
        let (out, result) = scan(&report_lines(None));
        assert_eq!(out.len(), 6);
        assert!(matches!(result, Err(SimulatorError::ResultNotFound)));
        assert!(result.unwrap_err().is_skippable());
    }

    #[test]
    fn stray_lines_do_not_advance_the_scanner() {
        let mut lines = report_lines(Some("SIMULATION RESULT = PASSED"));
        lines.insert(2, "noise between banner and title".to_string());
        let (out, result) = scan(&lines);
        assert_eq!(out.len(), lines.len());
        assert_eq!(result.unwrap(), SimulationResult::Passed);
    }

    #[test]
    fn ghdl_analyze_classification() {
        let mut filter = GhdlAnalyzeFilter;
        let entry = filter
            .classify("src/arith.vhdl:10:4: no declaration for \"foo\"")
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity(), Severity::Error);

        let entry = filter
            .classify("src/arith.vhdl:10:4:warning: unused signal")
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity(), Severity::Warning);

        let entry = filter.classify("analyzing arith_prng").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Normal);
    }

    #[test]
    fn ghdl_analyze_fatal_signatures() {
        let mut filter = GhdlAnalyzeFilter;
        assert!(matches!(
            filter.classify("ghdl: compilation error"),
            Err(SimulatorError::CompilationError { .. })
        ));
        let err = filter
            .classify("pkg.vhdl:3:1: file pkg.vhdl has changed and must be reanalysed")
            .unwrap_err();
        assert!(matches!(err, SimulatorError::Reanalyze(..)));
        assert!(err.is_skippable());
    }

    #[test]
    fn ghdl_run_severity_grammar() {
        let mut filter = GhdlRunFilter::default();
        // the first two lines may carry loader chatter
        let entry = filter.classify("Linking in memory").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Verbose);

        let entry = filter
            .classify("tb.vhdl:42:8:error: index out of range")
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity(), Severity::Error);

        let entry = filter
            .classify("tb.vhdl:42:8:warning: metavalue detected")
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity(), Severity::Warning);

        let entry = filter
            .classify("tb.vhdl:42:8:@25ns:(report note): starting phase 2")
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity(), Severity::Info);

        let entry = filter
            .classify("tb.vhdl:42:8:@90ns:(assertion failure): simulation stopped")
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity(), Severity::Fatal);

        // location prefix without a severity marker defaults to Error
        let entry = filter
            .classify("tb.vhdl:42:8: bound check failure")
            .unwrap()
            .unwrap();
        assert_eq!(entry.severity(), Severity::Error);

        let entry = filter.classify("plain progress output").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Normal);
    }

    #[test]
    fn vcom_markers() {
        let mut filter = VcomFilter;
        let entry = filter.classify("** Warning: odd width").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Warning);
        let entry = filter.classify("** Error: bad type").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Error);
        let entry = filter.classify("-- Compiling entity x").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Normal);
    }

    #[test]
    fn vsim_transcript_prefix_handling() {
        let mut filter = VsimFilter::default();
        // banner chatter is dropped entirely
        assert!(filter.classify("# // plain banner").unwrap().is_none());
        let entry = filter.classify("# Loading work.tb").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Debug);

        // before the report banner, transcript lines are verbose
        let entry = filter.classify("# run -all").unwrap().unwrap();
        assert_eq!(entry.severity(), Severity::Verbose);

        let entry = filter
            .classify("# ========================================")
            .unwrap()
            .unwrap();
        assert_eq!(entry.message(), "========================================");

        // afterwards the prefix is stripped and lines are normal
        let entry = filter.classify("# SIMULATION RESULT = PASSED").unwrap().unwrap();
        assert_eq!(entry.message(), "SIMULATION RESULT = PASSED");
        assert_eq!(entry.severity(), Severity::Normal);
    }

    #[test]
    fn vsim_summary_marker_lines() {
        let mut filter = VsimFilter::default();

        let entry = filter.classify("# %% 42 checks passed").unwrap().unwrap();
        assert_eq!(entry.message(), "%% 42 checks passed");
        assert_eq!(entry.severity(), Severity::Normal);

        let entry = filter.classify("# %% ERROR: check failed").unwrap().unwrap();
        assert_eq!(entry.message(), "%% ERROR: check failed");
        assert_eq!(entry.severity(), Severity::Error);
    }

    #[test]
    fn vsim_feeds_the_report_scanner() {
        // End-to-end: vsim transcript -> classifier -> scanner -> verdict.
        let transcript = [
            "# // Questa Sim",
            "# Loading work.arith_prng_tb",
            "# ========================================",
            "# POC TESTBENCH REPORT",
            "# ========================================",
            "# ========================================",
            "# SIMULATION RESULT = PASSED",
            "# ========================================",
        ];
        let mut filter = VsimFilter::default();
        let mut scanner = ReportScanner::new(ReportProtocol::default());
        for line in transcript {
            if let Some(entry) = filter.classify(line).unwrap() {
                scanner.feed(entry);
            }
        }
        assert_eq!(scanner.finish().unwrap(), SimulationResult::Passed);
    }
}
