use serde::{Deserialize, Serialize};
use std::fmt;

/// One reconciliation unit: a branch, where Source A lists it, and the
/// option value that filters Source B down to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSpec {
    pub label: String,
    pub source_a_target: String,
    pub source_b_selector: String,
}

impl BranchSpec {
    pub fn new(
        label: impl Into<String>,
        source_a_target: impl Into<String>,
        source_b_selector: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            source_a_target: source_a_target.into(),
            source_b_selector: source_b_selector.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    A,
    B,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::A => write!(f, "source A"),
            Source::B => write!(f, "source B"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountReading {
    pub value: u64,
    pub source: Source,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Navigation,
    ElementMissing,
    Browser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadFailure {
    pub source: Source,
    pub label: String,
    pub kind: FailureKind,
    pub message: String,
}

/// What a reader hands back: always a reading, plus the failure that forced
/// it to zero when the read did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub reading: CountReading,
    pub failure: Option<ReadFailure>,
}

impl ReadOutcome {
    pub fn success(source: Source, label: &str, value: u64) -> Self {
        Self {
            reading: CountReading {
                value,
                source,
                label: label.to_string(),
            },
            failure: None,
        }
    }

    pub fn failed(source: Source, label: &str, kind: FailureKind, message: String) -> Self {
        Self {
            reading: CountReading {
                value: 0,
                source,
                label: label.to_string(),
            },
            failure: Some(ReadFailure {
                source,
                label: label.to_string(),
                kind,
                message,
            }),
        }
    }

    pub fn value(&self) -> u64 {
        self.reading.value
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub label: String,
    pub a: u64,
    pub b: u64,
    pub matched: bool,
    pub difference: u64,
    pub failures: Vec<ReadFailure>,
}

impl ComparisonResult {
    pub fn from_outcomes(label: &str, a: ReadOutcome, b: ReadOutcome) -> Self {
        let (a_value, b_value) = (a.value(), b.value());
        let failures = [a.failure, b.failure].into_iter().flatten().collect();

        Self {
            label: label.to_string(),
            a: a_value,
            b: b_value,
            matched: a_value == b_value,
            difference: a_value.abs_diff(b_value),
            failures,
        }
    }

    /// A comparison passes only when both counts agree and both reads succeeded.
    pub fn passed(&self) -> bool {
        self.matched && self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub entries: Vec<ComparisonResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ComparisonResult) {
        self.total += 1;
        if result.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push(result);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookTarget {
    pub url: String,
    pub validated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered { status: u16 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub url: String,
    pub result: DeliveryResult,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, DeliveryResult::Delivered { .. })
    }
}
