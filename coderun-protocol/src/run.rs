use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const MAX_DATA_LENGTH: u64 = 262144;

/// One submission against one test case.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct RunCodeRequest {
    #[validate(length(max = 65536))]
    pub code: String,

    #[serde(default)]
    #[validate(length(max = 262144))]
    pub input: String,

    #[serde(default)]
    #[validate(length(max = 262144))]
    pub expected_output: String,

    #[serde(rename = "languageId")]
    pub language_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestPolicy {
    #[serde(rename = "fuse")]
    Fuse,
    #[serde(rename = "all")]
    All,
}

impl Default for TestPolicy {
    fn default() -> Self {
        TestPolicy::All
    }
}

/// One submission against a list of test cases, compiled once.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct RunCasesRequest {
    #[validate(length(max = 65536))]
    pub code: String,

    #[serde(rename = "languageId")]
    pub language_id: u32,

    #[validate(length(min = 1, max = 64), custom = "validate_cases")]
    pub cases: Vec<TestCase>,

    #[serde(default)]
    pub policy: TestPolicy,
}

fn validate_cases(cases: &[TestCase]) -> Result<(), ValidationError> {
    let too_long = |s: &str| s.len() as u64 > MAX_DATA_LENGTH;
    for case in cases {
        if too_long(&case.input) || too_long(&case.expected_output) {
            return Err(ValidationError::new("case_too_long"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCasesOutput {
    pub verdicts: Vec<Verdict>,
    pub accepted: bool,
}

impl RunCasesOutput {
    pub fn new(verdicts: Vec<Verdict>, case_count: usize) -> Self {
        let accepted = verdicts.len() == case_count && verdicts.iter().all(Verdict::is_accepted);
        Self { verdicts, accepted }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError,
}

impl StatusKind {
    pub fn id(self) -> u32 {
        match self {
            StatusKind::Accepted => 3,
            StatusKind::WrongAnswer => 4,
            StatusKind::TimeLimitExceeded => 5,
            StatusKind::CompilationError => 6,
            StatusKind::RuntimeError => 11,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusKind::Accepted => "Accepted",
            StatusKind::WrongAnswer => "Wrong Answer",
            StatusKind::TimeLimitExceeded => "Time Limit Exceeded",
            StatusKind::CompilationError => "Compilation Error",
            StatusKind::RuntimeError => "Runtime Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: u32,
    pub description: String,
}

impl From<StatusKind> for Status {
    fn from(kind: StatusKind) -> Self {
        Self {
            id: kind.id(),
            description: kind.description().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub time: u64, // milliseconds
    pub status: Status,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.status.id == StatusKind::Accepted.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_language_id() {
        let json = r#"{
            "code": "print(input())",
            "input": "hi",
            "expected_output": "hi",
            "languageId": 71
        }"#;
        let req: RunCodeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.language_id, 71);
        assert_eq!(req.expected_output, "hi");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn oversized_code_is_rejected() {
        let req = RunCodeRequest {
            code: "x".repeat(65536 + 1),
            input: String::new(),
            expected_output: String::new(),
            language_id: 71,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn cases_request_bounds() {
        let mut req = RunCasesRequest {
            code: "print(1)".into(),
            language_id: 71,
            cases: Vec::new(),
            policy: TestPolicy::Fuse,
        };
        assert!(req.validate().is_err());

        req.cases.push(TestCase {
            input: String::new(),
            expected_output: "1".into(),
        });
        assert!(req.validate().is_ok());

        req.cases.push(TestCase {
            input: "x".repeat(MAX_DATA_LENGTH as usize + 1),
            expected_output: String::new(),
        });
        assert!(req.validate().is_err());
    }

    #[test]
    fn verdict_wire_format() {
        let verdict = Verdict {
            stdout: Some("15".into()),
            stderr: None,
            time: 12,
            status: StatusKind::Accepted.into(),
        };
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "stdout": "15",
                "stderr": null,
                "time": 12,
                "status": { "id": 3, "description": "Accepted" }
            })
        );
    }

    #[test]
    fn accepted_requires_every_case() {
        let ac = Verdict {
            stdout: Some("1".into()),
            stderr: None,
            time: 1,
            status: StatusKind::Accepted.into(),
        };
        assert!(RunCasesOutput::new(vec![ac.clone(), ac.clone()], 2).accepted);
        assert!(!RunCasesOutput::new(vec![ac], 2).accepted);
    }
}
