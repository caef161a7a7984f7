//! Built-in event types.
//!
//! A representative subset of the standard catalog, each type being a
//! content struct plus its [`EventContent`] identity. [`BuiltinEvent`]
//! resolves an incoming event to one of these, or keeps it untyped.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::{CDEvent, EventContent, RawEvent};
use crate::type_id::TypeIdentifier;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Reference to another subject (an environment, a repository, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineRunOutcome {
    Success,
    Error,
    Failure,
}

/// Outcome of a test case run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCaseRunOutcome {
    Pass,
    Fail,
    Cancel,
    Error,
}

// ============================================================================
// Pipeline Run
// ============================================================================

/// Content of `pipelinerun.queued` - a pipeline run was scheduled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunQueued {
    /// Name of the pipeline definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    /// Link to the run in the CI system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EventContent for PipelineRunQueued {
    const SUBJECT: &'static str = "pipelinerun";
    const PREDICATE: &'static str = "queued";
    const VERSION: &'static str = "0.2.0";
    const SUBJECT_TYPE: &'static str = "pipelineRun";
}

/// Content of `pipelinerun.started` - a pipeline run began executing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStarted {
    pub pipeline_name: String,
    pub url: String,
}

impl EventContent for PipelineRunStarted {
    const SUBJECT: &'static str = "pipelinerun";
    const PREDICATE: &'static str = "started";
    const VERSION: &'static str = "0.2.0";
    const SUBJECT_TYPE: &'static str = "pipelineRun";
}

/// Content of `pipelinerun.finished` - a pipeline run completed, with or
/// without success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunFinished {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PipelineRunOutcome>,
    /// Human-readable description of what went wrong.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

impl EventContent for PipelineRunFinished {
    const SUBJECT: &'static str = "pipelinerun";
    const PREDICATE: &'static str = "finished";
    const VERSION: &'static str = "0.2.0";
    const SUBJECT_TYPE: &'static str = "pipelineRun";
}

// ============================================================================
// Change
// ============================================================================

/// Content of `change.reviewed` - a change proposal was reviewed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeReviewed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Reference>,
}

impl EventContent for ChangeReviewed {
    const SUBJECT: &'static str = "change";
    const PREDICATE: &'static str = "reviewed";
    const VERSION: &'static str = "0.3.0";
    const SUBJECT_TYPE: &'static str = "change";
}

/// Content of `change.merged` - a change was merged into its target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeMerged {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Reference>,
}

impl EventContent for ChangeMerged {
    const SUBJECT: &'static str = "change";
    const PREDICATE: &'static str = "merged";
    const VERSION: &'static str = "0.3.0";
    const SUBJECT_TYPE: &'static str = "change";
}

// ============================================================================
// Test Case Run
// ============================================================================

/// Test case definition a run executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Kind of test (e.g. "unit", "integration", "e2e").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Content of `testcaserun.finished` - a test case run completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRunFinished {
    /// Environment the test ran in.
    #[serde(default)]
    pub environment: Reference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case: Option<TestCase>,
    /// Suite run this case belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_suite_run: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TestCaseRunOutcome>,
    /// Severity of a failure (e.g. "low", "critical").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EventContent for TestCaseRunFinished {
    const SUBJECT: &'static str = "testcaserun";
    const PREDICATE: &'static str = "finished";
    const VERSION: &'static str = "0.2.0";
    const SUBJECT_TYPE: &'static str = "testCaseRun";
}

// ============================================================================
// Event Dispatch
// ============================================================================

/// An incoming event resolved to a built-in type where one matches.
///
/// Custom-namespace events and standard types outside this catalog are
/// kept as [`RawEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BuiltinEvent {
    PipelineRunQueued(CDEvent<PipelineRunQueued>),
    PipelineRunStarted(CDEvent<PipelineRunStarted>),
    PipelineRunFinished(CDEvent<PipelineRunFinished>),
    ChangeReviewed(CDEvent<ChangeReviewed>),
    ChangeMerged(CDEvent<ChangeMerged>),
    TestCaseRunFinished(CDEvent<TestCaseRunFinished>),
    Custom(RawEvent),
}

impl BuiltinEvent {
    /// Parse any event and resolve its type.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_raw(RawEvent::parse(json)?)
    }

    /// Resolve `raw` by its `<subject>_<predicate>` key.
    ///
    /// A known subject and predicate with an incompatible version is an
    /// error, not a fallback to [`BuiltinEvent::Custom`].
    pub fn from_raw(raw: RawEvent) -> Result<Self> {
        if raw.event_type().is_custom() {
            return Ok(BuiltinEvent::Custom(raw));
        }

        let event = match raw.event_type().short_name().as_str() {
            "pipelinerun_queued" => BuiltinEvent::PipelineRunQueued(raw.into_typed()?),
            "pipelinerun_started" => BuiltinEvent::PipelineRunStarted(raw.into_typed()?),
            "pipelinerun_finished" => BuiltinEvent::PipelineRunFinished(raw.into_typed()?),
            "change_reviewed" => BuiltinEvent::ChangeReviewed(raw.into_typed()?),
            "change_merged" => BuiltinEvent::ChangeMerged(raw.into_typed()?),
            "testcaserun_finished" => BuiltinEvent::TestCaseRunFinished(raw.into_typed()?),
            _ => {
                tracing::debug!(event_type = %raw.event_type(), "no built-in type, keeping raw event");
                BuiltinEvent::Custom(raw)
            }
        };
        Ok(event)
    }

    /// `subject.type` declared by the built-in type matching `event_type`.
    pub fn subject_type_for(event_type: &TypeIdentifier) -> Option<&'static str> {
        if event_type.is_custom() {
            return None;
        }
        match event_type.short_name().as_str() {
            "pipelinerun_queued" => Some(PipelineRunQueued::SUBJECT_TYPE),
            "pipelinerun_started" => Some(PipelineRunStarted::SUBJECT_TYPE),
            "pipelinerun_finished" => Some(PipelineRunFinished::SUBJECT_TYPE),
            "change_reviewed" => Some(ChangeReviewed::SUBJECT_TYPE),
            "change_merged" => Some(ChangeMerged::SUBJECT_TYPE),
            "testcaserun_finished" => Some(TestCaseRunFinished::SUBJECT_TYPE),
            _ => None,
        }
    }

    pub fn event_type(&self) -> &TypeIdentifier {
        match self {
            BuiltinEvent::PipelineRunQueued(e) => e.event_type(),
            BuiltinEvent::PipelineRunStarted(e) => e.event_type(),
            BuiltinEvent::PipelineRunFinished(e) => e.event_type(),
            BuiltinEvent::ChangeReviewed(e) => e.event_type(),
            BuiltinEvent::ChangeMerged(e) => e.event_type(),
            BuiltinEvent::TestCaseRunFinished(e) => e.event_type(),
            BuiltinEvent::Custom(e) => e.event_type(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, BuiltinEvent::Custom(_))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
