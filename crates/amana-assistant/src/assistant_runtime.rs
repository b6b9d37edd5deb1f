use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use amana_context::{ContextAggregator, UserContext};
use amana_core::{current_unix_timestamp_ms, format_naira};
use amana_invoice::{
    AddExpenseOutcome, ExpenseListing, InvoiceIntelligence, InvoiceLookup, NewExpense,
    StatusReport,
};
use amana_memory::{EntityRef, MemoryPatch, MemoryStore, MemoryTurn, TurnRole};
use amana_store::StoreError;

use crate::assistant_classifier::{Classification, Classifier, CLASSIFIER_HISTORY_TURNS};
use crate::assistant_responder::{Responder, RESPONDER_HISTORY_TURNS};
use crate::assistant_router::{route_task, TaskAction};
use crate::ConversationKind;

const GENERIC_FAULT_REPLY: &str =
    "Sorry o, something went wrong on my end. Abeg try again in a moment.";

const MISSING_INVOICE_REPLY: &str =
    "Which invoice do you mean? Give me the number, e.g. INV-001.";

const MISSING_AMOUNT_REPLY: &str =
    "How much was the expense? Try something like: add ₦5,000 expense for fuel.";

const UNMATCHED_TASK_REPLY: &str = "I no fit find that action yet. I can check an invoice's \
status or balance, log and list expenses, or show your business numbers.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One inbound unit of work, delivered by the external webhook handler
/// after transport-level authentication.
pub struct InboundMessage {
    pub phone_number: String,
    pub organization_id: String,
    pub text: String,
    /// When present (voice note), replaces `text` before classification.
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// The completed turn: reply text plus what the pipeline decided.
pub struct AssistantReply {
    pub text: String,
    pub kind: ConversationKind,
    #[serde(default)]
    pub intent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Reply from an externally handled business action.
pub struct ExternalActionReply {
    pub text: String,
    pub intent: String,
    #[serde(default)]
    pub entity: Option<EntityRef>,
}

#[async_trait]
/// Seam for the business actions outside this core (invoice creation,
/// client management). Returning `None` means the handler did not
/// recognize the request either.
pub trait BusinessActionHandler: Send + Sync {
    async fn handle(
        &self,
        message: &str,
        context: &UserContext,
    ) -> Option<ExternalActionReply>;
}

struct ActionResult {
    text: String,
    intent: Option<String>,
    entity: Option<EntityRef>,
}

/// The dispatcher: sequences context aggregation, classification, task
/// routing, reply generation, and memory persistence for one message.
#[derive(Clone)]
pub struct Assistant {
    aggregator: ContextAggregator,
    classifier: Classifier,
    responder: Responder,
    invoices: InvoiceIntelligence,
    memory: Arc<dyn MemoryStore>,
    external: Option<Arc<dyn BusinessActionHandler>>,
}

impl Assistant {
    pub fn new(
        aggregator: ContextAggregator,
        classifier: Classifier,
        responder: Responder,
        invoices: InvoiceIntelligence,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        Self {
            aggregator,
            classifier,
            responder,
            invoices,
            memory,
            external: None,
        }
    }

    pub fn with_action_handler(mut self, handler: Arc<dyn BusinessActionHandler>) -> Self {
        self.external = Some(handler);
        self
    }

    /// Handles one inbound message end to end. Always produces non-empty
    /// reply text; store faults degrade to a generic conversational reply.
    pub async fn handle_message(&self, inbound: InboundMessage) -> AssistantReply {
        let body = inbound
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(inbound.text.as_str())
            .to_string();

        let context = self
            .aggregator
            .user_context(&inbound.phone_number, &inbound.organization_id)
            .await;
        let history = self.read_history(&inbound.phone_number).await;

        let classification = self
            .classifier
            .classify(&body, &history[..history.len().min(CLASSIFIER_HISTORY_TURNS)])
            .await;
        tracing::debug!(
            phone_number = %inbound.phone_number,
            kind = classification.kind.as_str(),
            needs_business_action = classification.needs_business_action,
            "message classified"
        );

        let (text, intent, entity) = if classification.needs_business_action {
            let result = self.run_business_action(&body, &context).await;
            (result.text, result.intent, result.entity)
        } else {
            let text = self
                .social_reply(&body, &history, &context, &classification)
                .await;
            (text, Some(classification.kind.as_str().to_string()), None)
        };

        self.persist_turn(&inbound.phone_number, &body, &text, &classification, intent.as_deref(), entity)
            .await;

        AssistantReply {
            text,
            kind: classification.kind,
            intent,
        }
    }

    async fn social_reply(
        &self,
        body: &str,
        history: &[MemoryTurn],
        context: &UserContext,
        classification: &Classification,
    ) -> String {
        if let Some(suggested) = classification
            .suggested_response
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            return suggested.to_string();
        }
        self.responder
            .generate(
                body,
                &history[..history.len().min(RESPONDER_HISTORY_TURNS)],
                Some(&context.business_metrics),
            )
            .await
    }

    async fn run_business_action(&self, body: &str, context: &UserContext) -> ActionResult {
        let action = route_task(body, &context.conversation_memory);
        let intent = action.intent_label().map(str::to_string);

        let outcome = match action {
            TaskAction::CheckStatus { invoice_number } => {
                self.check_status(context, invoice_number).await
            }
            TaskAction::AddExpense {
                invoice_number,
                amount,
                description,
            } => {
                self.add_expense(context, invoice_number, amount, description)
                    .await
            }
            TaskAction::GetBalance { invoice_number } => {
                self.get_balance(context, invoice_number).await
            }
            TaskAction::ListExpenses { invoice_number } => {
                self.list_expenses(context, invoice_number).await
            }
            TaskAction::Unrouted => return self.unrouted(body, context).await,
        };

        match outcome {
            Ok(mut result) => {
                result.intent = result.intent.or(intent);
                result
            }
            Err(error) => {
                tracing::error!(error = %error, "business action hit an unexpected store fault");
                ActionResult {
                    text: GENERIC_FAULT_REPLY.to_string(),
                    intent,
                    entity: None,
                }
            }
        }
    }

    async fn unrouted(&self, body: &str, context: &UserContext) -> ActionResult {
        if let Some(handler) = &self.external {
            if let Some(reply) = handler.handle(body, context).await {
                return ActionResult {
                    text: reply.text,
                    intent: Some(reply.intent),
                    entity: reply.entity,
                };
            }
        }
        ActionResult {
            text: UNMATCHED_TASK_REPLY.to_string(),
            intent: None,
            entity: None,
        }
    }

    async fn check_status(
        &self,
        context: &UserContext,
        invoice_number: Option<String>,
    ) -> Result<ActionResult, StoreError> {
        let Some(number) = invoice_number else {
            return Ok(missing_invoice());
        };
        let lookup = self
            .invoices
            .check_status(&context.organization_id, &number)
            .await?;
        Ok(match lookup {
            InvoiceLookup::Found(report) => {
                let entity = Some(EntityRef::Invoice {
                    number: report.invoice.invoice_number.clone(),
                });
                ActionResult {
                    text: render_status_report(&report),
                    intent: None,
                    entity,
                }
            }
            InvoiceLookup::NotFound { message, .. } => ActionResult {
                text: message,
                intent: None,
                entity: None,
            },
        })
    }

    async fn add_expense(
        &self,
        context: &UserContext,
        invoice_number: Option<String>,
        amount: Option<f64>,
        description: String,
    ) -> Result<ActionResult, StoreError> {
        let Some(number) = invoice_number else {
            return Ok(missing_invoice());
        };
        let Some(amount) = amount else {
            return Ok(ActionResult {
                text: MISSING_AMOUNT_REPLY.to_string(),
                intent: None,
                entity: None,
            });
        };

        let outcome = self
            .invoices
            .add_expense(
                &context.organization_id,
                &number,
                NewExpense {
                    description,
                    amount,
                    category: None,
                    created_by: context.phone_number.clone(),
                },
            )
            .await?;

        Ok(match outcome {
            AddExpenseOutcome::Added { expense, report } => {
                let entity = Some(EntityRef::Expense {
                    invoice_number: report.invoice.invoice_number.clone(),
                });
                let mut text = format!(
                    "Logged {} ({}) against {}.\n",
                    format_naira(expense.amount),
                    expense.description,
                    report.invoice.invoice_number
                );
                text.push_str(&render_status_report(&report));
                ActionResult {
                    text,
                    intent: None,
                    entity,
                }
            }
            AddExpenseOutcome::InvoiceNotFound { message, .. } => ActionResult {
                text: message,
                intent: None,
                entity: None,
            },
            AddExpenseOutcome::Rejected { message } => ActionResult {
                text: message,
                intent: None,
                entity: None,
            },
        })
    }

    async fn get_balance(
        &self,
        context: &UserContext,
        invoice_number: Option<String>,
    ) -> Result<ActionResult, StoreError> {
        let Some(number) = invoice_number else {
            return Ok(missing_invoice());
        };
        let lookup = self
            .invoices
            .get_balance(&context.organization_id, &number)
            .await?;
        Ok(match lookup {
            InvoiceLookup::Found(balance) => ActionResult {
                entity: Some(EntityRef::Invoice {
                    number: balance.invoice_number.clone(),
                }),
                text: balance.message,
                intent: None,
            },
            InvoiceLookup::NotFound { message, .. } => ActionResult {
                text: message,
                intent: None,
                entity: None,
            },
        })
    }

    async fn list_expenses(
        &self,
        context: &UserContext,
        invoice_number: Option<String>,
    ) -> Result<ActionResult, StoreError> {
        let Some(number) = invoice_number else {
            return Ok(missing_invoice());
        };
        let lookup = self
            .invoices
            .list_expenses(&context.organization_id, &number)
            .await?;
        Ok(match lookup {
            InvoiceLookup::Found(listing) => ActionResult {
                entity: Some(EntityRef::Invoice {
                    number: listing.invoice_number.clone(),
                }),
                text: render_expense_listing(&listing),
                intent: None,
            },
            InvoiceLookup::NotFound { message, .. } => ActionResult {
                text: message,
                intent: None,
                entity: None,
            },
        })
    }

    async fn read_history(&self, phone_number: &str) -> Vec<MemoryTurn> {
        match self.memory.read(phone_number).await {
            Ok(Some(memory)) => memory.recent_turns(RESPONDER_HISTORY_TURNS),
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!(error = %error, "history read degraded to empty");
                Vec::new()
            }
        }
    }

    /// Bookkeeping after the reply is decided: append both turns and
    /// refresh the last-referenced pointer when an action resolved an
    /// entity. Failures are logged, never surfaced.
    async fn persist_turn(
        &self,
        phone_number: &str,
        body: &str,
        reply: &str,
        classification: &Classification,
        intent: Option<&str>,
        entity: Option<EntityRef>,
    ) {
        let now = current_unix_timestamp_ms();
        let user_turn = MemoryTurn {
            role: TurnRole::User,
            text: body.to_string(),
            intent: Some(
                intent
                    .unwrap_or(classification.kind.as_str())
                    .to_string(),
            ),
            entity: entity.clone(),
            timestamp_unix_ms: now,
        };
        if let Err(error) = self.memory.append_history(phone_number, user_turn).await {
            tracing::warn!(error = %error, "failed to append user turn");
        }

        let assistant_turn = MemoryTurn {
            role: TurnRole::Assistant,
            text: reply.to_string(),
            intent: None,
            entity: None,
            timestamp_unix_ms: now,
        };
        if let Err(error) = self
            .memory
            .append_history(phone_number, assistant_turn)
            .await
        {
            tracing::warn!(error = %error, "failed to append assistant turn");
        }

        if let Some(entity) = entity {
            let patch = MemoryPatch::for_entity(&entity);
            if !patch.is_empty() {
                if let Err(error) = self.memory.merge_update(phone_number, patch).await {
                    tracing::warn!(error = %error, "failed to merge memory pointers");
                }
            }
        }
    }
}

fn missing_invoice() -> ActionResult {
    ActionResult {
        text: MISSING_INVOICE_REPLY.to_string(),
        intent: None,
        entity: None,
    }
}

fn render_status_report(report: &StatusReport) -> String {
    let view = &report.invoice;
    let mut text = format!(
        "{} — {} ({}) for {}.",
        view.invoice_number,
        format_naira(view.total),
        view.status.as_str(),
        view.client_name
    );
    for insight in &report.insights {
        text.push('\n');
        text.push_str(insight);
    }
    text
}

fn render_expense_listing(listing: &ExpenseListing) -> String {
    if listing.entries.is_empty() {
        return format!("No expenses logged against {} yet.", listing.invoice_number);
    }
    let mut text = format!(
        "{} expense(s) on {}, total {}:",
        listing.entries.len(),
        listing.invoice_number,
        format_naira(listing.total_expenses)
    );
    for entry in &listing.entries {
        text.push_str(&format!(
            "\n- {} ({}, {})",
            format_naira(entry.amount),
            entry.description,
            entry.category
        ));
    }
    text
}
