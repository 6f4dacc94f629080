// Workflow definition validation, run before anything is persisted

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::error::{DefinitionIssue, WorkflowError};
use super::types::WorkflowDefinition;

/// No surrounding whitespace and no control characters anywhere
static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s\p{Cc}](?:[^\p{Cc}]*[^\s\p{Cc}])?$").expect("identifier pattern is valid")
});

/// Size limits applied to incoming definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_stages: usize,
    pub max_identifier_length: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_stages: 32,
            max_identifier_length: 128,
        }
    }
}

impl ValidationLimits {
    pub fn is_well_formed(&self, value: &str) -> bool {
        value.chars().count() <= self.max_identifier_length && IDENTIFIER_PATTERN.is_match(value)
    }
}

/// Check a definition and report every problem found, not just the first
pub fn validate_definition(
    definition: &WorkflowDefinition,
    limits: &ValidationLimits,
) -> Result<(), WorkflowError> {
    let mut issues: Vec<DefinitionIssue> = Vec::new();

    let check_identifier = |field: &'static str, value: &str, issues: &mut Vec<DefinitionIssue>| {
        if !limits.is_well_formed(value) {
            issues.push(DefinitionIssue::MalformedIdentifier {
                field,
                value: value.to_string(),
            });
        }
    };

    check_identifier("subject id", &definition.subject_id, &mut issues);
    check_identifier("initiator", &definition.initiated_by, &mut issues);

    // Display text, so any length and padding is fine
    if definition.name.trim().is_empty() {
        issues.push(DefinitionIssue::BlankWorkflowName);
    }

    if definition.stages.is_empty() {
        issues.push(DefinitionIssue::NoStages);
    } else if definition.stages.len() > limits.max_stages {
        issues.push(DefinitionIssue::TooManyStages {
            count: definition.stages.len(),
            max: limits.max_stages,
        });
    }

    let mut seen_stages = HashSet::new();
    for stage in &definition.stages {
        check_identifier("stage id", stage.id.as_str(), &mut issues);
        if !seen_stages.insert(&stage.id) {
            issues.push(DefinitionIssue::DuplicateStageId {
                stage_id: stage.id.clone(),
            });
        }

        if stage.name.trim().is_empty() {
            issues.push(DefinitionIssue::BlankStageName {
                stage_id: stage.id.clone(),
            });
        }

        if stage.approvers.is_empty() {
            issues.push(DefinitionIssue::NoApprovers {
                stage_id: stage.id.clone(),
            });
        }

        let mut seen_approvers = HashSet::new();
        for approver in &stage.approvers {
            check_identifier("approver id", approver.as_str(), &mut issues);
            if !seen_approvers.insert(approver) {
                issues.push(DefinitionIssue::DuplicateApprover {
                    stage_id: stage.id.clone(),
                    approver_id: approver.clone(),
                });
            }
        }

        // Quorum is measured against distinct approvers
        let distinct = seen_approvers.len();
        if stage.required_approvals < 1 || stage.required_approvals > distinct {
            issues.push(DefinitionIssue::QuorumOutOfBounds {
                stage_id: stage.id.clone(),
                required: stage.required_approvals,
                approvers: distinct,
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::InvalidDefinition { issues })
    }
}
