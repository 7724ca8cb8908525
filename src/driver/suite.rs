//! Regression suite runner.
//!
//! A control file selects the numbered cases to run:
//!
//! ```text
//! first = 1
//! last = 40
//! silent = false
//! dir = test_case
//! ```
//!
//! Case `N` is the source `N.c` and its expected output `N.answer` in `dir`
//! (default: the directory of the control file). Output is compared line
//! by line. A case whose source is rejected with a user error produces that
//! error's message as its output, so expected-failure cases are written as
//! answer files too.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::{EitherOrBoth, Itertools};
use log::{debug, info};

use super::compiler::DriverError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteControl {
    pub first: u32,
    pub last: u32,
    pub silent: bool,
    pub dir: PathBuf,
}

impl SuiteControl {
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let text = fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base)
    }

    /// Parse `key = value` lines; blank lines and `#` comments are skipped.
    /// A relative `dir` is resolved against `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self, DriverError> {
        let mut first = None;
        let mut last = None;
        let mut silent = false;
        let mut dir = base.to_path_buf();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let entry = raw.split('#').next().unwrap_or_default().trim();
            if entry.is_empty() {
                continue;
            }
            let invalid = |message: String| DriverError::InvalidControl { line, message };
            let Some((key, value)) = entry.split_once('=') else {
                return Err(invalid(format!("expected `key = value`, found `{entry}`")));
            };
            let (key, value) = (key.trim(), value.trim());
            let number = || {
                value
                    .parse::<u32>()
                    .map_err(|_| invalid(format!("`{key}` must be a number, found `{value}`")))
            };
            match key {
                "first" => first = Some(number()?),
                "last" => last = Some(number()?),
                "silent" => {
                    silent = match value {
                        "true" | "1" | "yes" => true,
                        "false" | "0" | "no" => false,
                        _ => return Err(invalid(format!("`silent` must be true or false, found `{value}`"))),
                    }
                }
                "dir" => dir = base.join(value),
                _ => return Err(invalid(format!("unknown key `{key}`"))),
            }
        }

        let missing = |key: &str| DriverError::InvalidControl {
            line: 0,
            message: format!("missing `{key}`"),
        };
        let first = first.ok_or_else(|| missing("first"))?;
        let last = last.ok_or_else(|| missing("last"))?;
        if first > last {
            return Err(DriverError::InvalidControl {
                line: 0,
                message: format!("empty range {first}..={last}"),
            });
        }
        Ok(SuiteControl {
            first,
            last,
            silent,
            dir,
        })
    }

    pub fn source_path(&self, case: u32) -> PathBuf {
        self.dir.join(format!("{case}.c"))
    }

    pub fn answer_path(&self, case: u32) -> PathBuf {
        self.dir.join(format!("{case}.answer"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFailure {
    pub case: u32,
    /// 1-based line where expected and actual output first differ.
    pub line: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Default)]
pub struct SuiteReport {
    pub passed: Vec<u32>,
    pub failed: Vec<CaseFailure>,
}

impl SuiteReport {
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut text = format!("{} passed, {} failed", self.passed.len(), self.failed.len());
        if !self.failed.is_empty() {
            text.push_str(&format!(
                " ({})",
                self.failed.iter().map(|f| f.case).join(", ")
            ));
        }
        text
    }
}

/// First differing line of `expected` and `actual`, ignoring line-ending
/// style and trailing blank lines.
pub fn compare_output(expected: &str, actual: &str) -> Option<(usize, Option<String>, Option<String>)> {
    fn lines(text: &str) -> Vec<&str> {
        let mut lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }

    lines(expected)
        .into_iter()
        .zip_longest(lines(actual))
        .enumerate()
        .find_map(|(i, pair)| match pair {
            EitherOrBoth::Both(e, a) if e == a => None,
            EitherOrBoth::Both(e, a) => Some((i + 1, Some(e.to_string()), Some(a.to_string()))),
            EitherOrBoth::Left(e) => Some((i + 1, Some(e.to_string()), None)),
            EitherOrBoth::Right(a) => Some((i + 1, None, Some(a.to_string()))),
        })
}

/// Run every case of `control` through `run_case`, which compiles and runs
/// one source file and returns its standard output.
pub fn run_suite<F>(control: &SuiteControl, mut run_case: F) -> Result<SuiteReport, DriverError>
where
    F: FnMut(&Path) -> Result<String, DriverError>,
{
    let mut report = SuiteReport::default();
    for case in control.first..=control.last {
        let answer_path = control.answer_path(case);
        let expected = fs::read_to_string(&answer_path).map_err(|source| DriverError::Io {
            path: answer_path,
            source,
        })?;

        let actual = match run_case(&control.source_path(case)) {
            Ok(stdout) => stdout,
            Err(e) => match e.as_source_error() {
                Some(source_error) => source_error.message().to_string(),
                None => return Err(e),
            },
        };
        debug!("case {case}: {} bytes of output", actual.len());

        match compare_output(&expected, &actual) {
            None => {
                if !control.silent {
                    println!("case {case}: \x1b[38;5;2mok\x1b[0m");
                }
                report.passed.push(case);
            }
            Some((line, expected, actual)) => {
                if !control.silent {
                    println!(
                        "case {case}: \x1b[38;5;1mFAILED\x1b[0m at line {line}\n  expected: {}\n  actual:   {}",
                        expected.as_deref().unwrap_or("<end of output>"),
                        actual.as_deref().unwrap_or("<end of output>")
                    );
                }
                report.failed.push(CaseFailure {
                    case,
                    line,
                    expected,
                    actual,
                });
            }
        }
    }
    info!("suite finished: {}", report.summary());
    Ok(report)
}
