use crate::transport::CallParams;
use serde::{Deserialize, Serialize};

/// What a call session is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Produce new interview questions
    Generate,
    /// Run an existing question set and score the answers
    Evaluate,
}

/// Caller-supplied inputs for a call session, fixed for its lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(rename = "type")]
    pub kind: SessionKind,

    /// Participant display name
    #[serde(default)]
    pub user_name: String,

    /// Participant identity from the auth provider
    pub user_id: Option<String>,

    /// Interview the call belongs to
    pub interview_id: Option<String>,

    /// Existing feedback record to overwrite, if any
    pub feedback_id: Option<String>,

    /// Ordered question texts (evaluate sessions only)
    #[serde(default)]
    pub questions: Vec<String>,
}

impl SessionContext {
    pub fn generate(user_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            kind: SessionKind::Generate,
            user_name: user_name.into(),
            user_id: Some(user_id.into()),
            interview_id: None,
            feedback_id: None,
            questions: Vec::new(),
        }
    }

    pub fn evaluate(
        user_name: impl Into<String>,
        user_id: impl Into<String>,
        interview_id: impl Into<String>,
        questions: Vec<String>,
    ) -> Self {
        Self {
            kind: SessionKind::Evaluate,
            user_name: user_name.into(),
            user_id: Some(user_id.into()),
            interview_id: Some(interview_id.into()),
            feedback_id: None,
            questions,
        }
    }

    pub fn with_feedback_id(mut self, feedback_id: impl Into<String>) -> Self {
        self.feedback_id = Some(feedback_id.into());
        self
    }

    /// Transport target and variable values for this session kind
    pub fn call_request(&self, targets: &CallTargets) -> (String, CallParams) {
        let mut params = CallParams::default();

        match self.kind {
            SessionKind::Generate => {
                params.set("username", self.user_name.clone());
                params.set("userid", self.user_id.clone().unwrap_or_default());
                (targets.workflow_id.clone(), params)
            }
            SessionKind::Evaluate => {
                params.set("questions", format_questions(&self.questions));
                (targets.interviewer_id.clone(), params)
            }
        }
    }
}

/// Render questions as a dash list, one per line
pub fn format_questions(questions: &[String]) -> String {
    questions
        .iter()
        .map(|q| format!("- {}", q))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Voice gateway targets for each session kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTargets {
    /// Workflow that drives question generation calls
    pub workflow_id: String,

    /// Assistant that conducts evaluation interviews
    pub interviewer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> CallTargets {
        CallTargets {
            workflow_id: "wf-123".to_string(),
            interviewer_id: "interviewer".to_string(),
        }
    }

    #[test]
    fn test_generate_request_carries_identity() {
        let ctx = SessionContext::generate("Ada", "user-1");
        let (target, params) = ctx.call_request(&targets());

        assert_eq!(target, "wf-123");
        assert_eq!(params.get("username"), Some("Ada"));
        assert_eq!(params.get("userid"), Some("user-1"));
        assert_eq!(params.get("questions"), None);
    }

    #[test]
    fn test_evaluate_request_formats_questions() {
        let ctx = SessionContext::evaluate(
            "Ada",
            "user-1",
            "iv-9",
            vec!["Why Rust?".to_string(), "What is ownership?".to_string()],
        );
        let (target, params) = ctx.call_request(&targets());

        assert_eq!(target, "interviewer");
        assert_eq!(
            params.get("questions"),
            Some("- Why Rust?\n- What is ownership?")
        );
        assert_eq!(params.get("username"), None);
    }

    #[test]
    fn test_format_questions_empty() {
        assert_eq!(format_questions(&[]), "");
    }

    #[test]
    fn test_context_deserializes_from_front_end_shape() {
        let json = r#"{
            "type": "evaluate",
            "user_name": "Ada",
            "user_id": "user-1",
            "interview_id": "iv-9",
            "feedback_id": "fb-2",
            "questions": ["Q1"]
        }"#;

        let ctx: SessionContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.kind, SessionKind::Evaluate);
        assert_eq!(ctx.feedback_id.as_deref(), Some("fb-2"));
        assert_eq!(ctx.questions, vec!["Q1".to_string()]);
    }
}
