#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

/// Gate in front of tools that change booking data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteGuardrail {
    pub require_policy_lookup: bool,
}

impl Default for WriteGuardrail {
    fn default() -> Self {
        Self { require_policy_lookup: true }
    }
}

impl WriteGuardrail {
    pub fn relaxed() -> Self {
        Self { require_policy_lookup: false }
    }

    pub fn evaluate(&self, tool_name: &str, is_write: bool, policy_consulted: bool) -> GuardrailDecision {
        if !is_write || !self.require_policy_lookup || policy_consulted {
            return GuardrailDecision::Allow;
        }
        GuardrailDecision::Deny {
            reason_code: "policy_not_consulted",
            user_message: format!(
                "`{tool_name}` changes a booking; check the company policy with `lookup_policy` first."
            ),
            fallback_path: "lookup_policy",
        }
    }
}
