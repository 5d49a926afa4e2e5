use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use wayfare_core::retrieval::render_passages;
use wayfare_core::{
    ApplicationError, CallerContext, FlightId, PolicyLookup, PolicyLookupError, RebookError,
    RebookingService, TicketNumber,
};

use crate::guardrails::{GuardrailDecision, WriteGuardrail};

pub const LOOKUP_POLICY: &str = "lookup_policy";
pub const UPDATE_TICKET_TO_NEW_FLIGHT: &str = "update_ticket_to_new_flight";

/// Per-session state handed to every tool call.
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    pub passenger_id: Option<String>,
    pub session_id: Option<String>,
    pub policy_consulted: bool,
}

impl ToolContext {
    pub fn for_passenger(passenger_id: impl Into<String>) -> Self {
        Self { passenger_id: Some(passenger_id.into()), ..Self::default() }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Correlation id reported with failures; the session id when one is known.
    pub fn correlation_id(&self) -> &str {
        self.session_id.as_deref().unwrap_or("unassigned")
    }

    pub fn caller(&self) -> CallerContext {
        match &self.passenger_id {
            Some(passenger_id) => CallerContext::for_passenger(passenger_id.clone()),
            None => CallerContext::anonymous(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the tool changes booking data.
    fn is_write(&self) -> bool {
        false
    }

    /// Whether a successful call counts as consulting company policy.
    fn consults_policy(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> Result<Value>;
}

pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    guardrail: WriteGuardrail,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(WriteGuardrail::default())
    }
}

impl ToolRegistry {
    pub fn new(guardrail: WriteGuardrail) -> Self {
        Self { tools: HashMap::new(), guardrail }
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs `name` after the write guardrail has approved it.
    ///
    /// A guardrail denial is returned as a `denied` payload rather than an error so the
    /// assistant can follow the fallback path.
    pub async fn execute(&self, ctx: &mut ToolContext, name: &str, input: Value) -> Result<Value> {
        let tool = self.tools.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;

        if let GuardrailDecision::Deny { reason_code, user_message, fallback_path } =
            self.guardrail.evaluate(name, tool.is_write(), ctx.policy_consulted)
        {
            warn!(event_name = "tools.guardrail_denied", tool = name, reason_code, "tool call denied");
            return Ok(json!({
                "status": "denied",
                "reason_code": reason_code,
                "message": user_message,
                "fallback_path": fallback_path,
            }));
        }

        let output = tool.execute(ctx, input).await?;
        if tool.consults_policy() && output.get("status").and_then(Value::as_str) == Some("ok") {
            ctx.policy_consulted = true;
        }
        Ok(output)
    }
}

/// Builds the registry exposed to the travel assistant.
pub fn travel_tools(
    rebooking: Arc<RebookingService>,
    lookup: Arc<dyn PolicyLookup>,
    k: usize,
    guardrail: WriteGuardrail,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new(guardrail);
    registry.register(LookupPolicyTool { lookup, k });
    registry.register(UpdateTicketToNewFlightTool { rebooking });
    registry
}

pub struct LookupPolicyTool {
    pub lookup: Arc<dyn PolicyLookup>,
    pub k: usize,
}

#[derive(Debug, Deserialize)]
struct LookupPolicyInput {
    query: String,
}

#[async_trait]
impl Tool for LookupPolicyTool {
    fn name(&self) -> &'static str {
        LOOKUP_POLICY
    }

    fn consults_policy(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> Result<Value> {
        let input: LookupPolicyInput =
            serde_json::from_value(input).context("lookup_policy expects {\"query\": string}")?;

        match self.lookup.lookup(&input.query, self.k).await {
            Ok(passages) => Ok(json!({
                "status": "ok",
                "passages": render_passages(&passages),
                "count": passages.len(),
            })),
            Err(error) => {
                let (error_class, retryable) = match &error {
                    PolicyLookupError::EmptyQuery => ("empty_query", false),
                    PolicyLookupError::Embedding(_) => ("embedding_failure", true),
                    PolicyLookupError::Store(_) => ("policy_store_failure", true),
                };
                Ok(error_payload(error_class, retryable, ApplicationError::from(error), ctx))
            }
        }
    }
}

pub struct UpdateTicketToNewFlightTool {
    pub rebooking: Arc<RebookingService>,
}

#[derive(Debug, Deserialize)]
struct UpdateTicketInput {
    ticket_no: String,
    new_flight_id: i64,
}

#[async_trait]
impl Tool for UpdateTicketToNewFlightTool {
    fn name(&self) -> &'static str {
        UPDATE_TICKET_TO_NEW_FLIGHT
    }

    fn is_write(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, input: Value) -> Result<Value> {
        let input: UpdateTicketInput = serde_json::from_value(input).context(
            "update_ticket_to_new_flight expects {\"ticket_no\": string, \"new_flight_id\": integer}",
        )?;
        let ticket_no = TicketNumber::new(input.ticket_no);

        match self
            .rebooking
            .rebook_ticket(&ticket_no, FlightId(input.new_flight_id), &ctx.caller())
            .await
        {
            Ok(outcome) => {
                info!(
                    event_name = "tools.ticket_updated",
                    ticket_no = %outcome.ticket_no,
                    new_flight_id = outcome.new_flight_id.0,
                    "assistant rebooked ticket"
                );
                Ok(json!({
                    "status": "ok",
                    "ticket_no": outcome.ticket_no.as_str(),
                    "previous_flight_id": outcome.previous_flight_id.0,
                    "new_flight_id": outcome.new_flight_id.0,
                    "minutes_until_departure": outcome.time_until_departure.num_minutes(),
                    "message": outcome.message(),
                }))
            }
            Err(error) => Ok(rebook_error_payload(error, ctx)),
        }
    }
}

pub fn rebook_error_payload(error: RebookError, ctx: &ToolContext) -> Value {
    let (error_class, retryable) = (error.error_class(), error.is_retryable());
    error_payload(error_class, retryable, ApplicationError::from(error), ctx)
}

/// `message` keeps the detailed cause for the assistant; `user_message` is safe to show
/// the passenger verbatim.
fn error_payload(
    error_class: &str,
    retryable: bool,
    error: ApplicationError,
    ctx: &ToolContext,
) -> Value {
    let message = error.to_string();
    let interface = error.into_interface(ctx.correlation_id());
    json!({
        "status": "error",
        "error_class": error_class,
        "message": message,
        "retryable": retryable,
        "user_message": interface.user_message(),
        "correlation_id": ctx.correlation_id(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;
    use wayfare_core::RebookingService;
    use wayfare_db::repositories::SqlRebookingStore;
    use wayfare_db::{connect_with_settings, migrations, TravelSeedDataset};

    use super::{travel_tools, ToolContext, ToolRegistry, LOOKUP_POLICY, UPDATE_TICKET_TO_NEW_FLIGHT};
    use crate::guardrails::WriteGuardrail;
    use crate::lookup::tests::seeded_lookup;

    async fn registry(guardrail: WriteGuardrail) -> ToolRegistry {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        TravelSeedDataset::load(&pool, Utc::now()).await.expect("seed");

        let rebooking = Arc::new(RebookingService::new(Arc::new(SqlRebookingStore::new(pool))));
        travel_tools(rebooking, Arc::new(seeded_lookup().await), 2, guardrail)
    }

    #[tokio::test]
    async fn registry_exposes_both_travel_tools() {
        let registry = registry(WriteGuardrail::default()).await;
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec![LOOKUP_POLICY, UPDATE_TICKET_TO_NEW_FLIGHT]);
    }

    #[tokio::test]
    async fn write_is_denied_until_policy_is_consulted() {
        let registry = registry(WriteGuardrail::default()).await;
        let mut ctx = ToolContext::for_passenger("3442 587242");
        let request = json!({"ticket_no": "N3J2LG", "new_flight_id": 19251});

        let denied = registry
            .execute(&mut ctx, UPDATE_TICKET_TO_NEW_FLIGHT, request.clone())
            .await
            .expect("denied payload");
        assert_eq!(denied["status"], "denied");
        assert_eq!(denied["reason_code"], "policy_not_consulted");

        let policy = registry
            .execute(&mut ctx, LOOKUP_POLICY, json!({"query": "rebook a ticket"}))
            .await
            .expect("lookup");
        assert_eq!(policy["status"], "ok");
        assert!(policy["passages"].as_str().expect("passages").contains("Ticket rebooking"));
        assert!(ctx.policy_consulted);

        let updated = registry
            .execute(&mut ctx, UPDATE_TICKET_TO_NEW_FLIGHT, request)
            .await
            .expect("update");
        assert_eq!(updated["status"], "ok");
        assert_eq!(updated["previous_flight_id"], 19250);
        assert_eq!(updated["new_flight_id"], 19251);
        assert_eq!(updated["message"], "Ticket successfully updated to new flight.");
    }

    #[tokio::test]
    async fn rebooking_errors_become_structured_payloads() {
        let registry = registry(WriteGuardrail::relaxed()).await;
        let mut ctx = ToolContext::for_passenger("8149 604011").with_session_id("session-42");

        let payload = registry
            .execute(
                &mut ctx,
                UPDATE_TICKET_TO_NEW_FLIGHT,
                json!({"ticket_no": "N3J2LG", "new_flight_id": 19251}),
            )
            .await
            .expect("error payload");

        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_owner");
        assert_eq!(payload["retryable"], false);
        assert!(payload["message"].as_str().expect("message").contains("not the owner"));
        assert_eq!(payload["correlation_id"], "session-42");
        assert_eq!(
            payload["user_message"],
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[tokio::test]
    async fn missing_passenger_is_reported_to_the_assistant() {
        let registry = registry(WriteGuardrail::relaxed()).await;
        let mut ctx = ToolContext::default();

        let payload = registry
            .execute(
                &mut ctx,
                UPDATE_TICKET_TO_NEW_FLIGHT,
                json!({"ticket_no": "N3J2LG", "new_flight_id": 19251}),
            )
            .await
            .expect("error payload");

        assert_eq!(payload["error_class"], "missing_caller_context");
        assert_eq!(payload["correlation_id"], "unassigned");
        assert_eq!(payload["user_message"], "An unexpected internal error occurred.");
    }

    #[tokio::test]
    async fn empty_policy_query_does_not_satisfy_guardrail() {
        let registry = registry(WriteGuardrail::default()).await;
        let mut ctx = ToolContext::for_passenger("3442 587242");

        let payload =
            registry.execute(&mut ctx, LOOKUP_POLICY, json!({"query": ""})).await.expect("payload");

        assert_eq!(payload["error_class"], "empty_query");
        assert_eq!(payload["retryable"], false);
        assert_eq!(
            payload["user_message"],
            "The request could not be processed. Check inputs and try again."
        );
        assert!(!ctx.policy_consulted);
    }

    #[tokio::test]
    async fn malformed_input_and_unknown_tools_are_errors() {
        let registry = registry(WriteGuardrail::relaxed()).await;
        let mut ctx = ToolContext::for_passenger("3442 587242");

        assert!(registry
            .execute(&mut ctx, UPDATE_TICKET_TO_NEW_FLIGHT, json!({"ticket_no": "N3J2LG"}))
            .await
            .is_err());
        assert!(registry.execute(&mut ctx, "cancel_ticket", json!({})).await.is_err());
    }
}
