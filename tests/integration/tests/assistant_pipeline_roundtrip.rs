use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use amana_ai::{AiError, ChatRequest, ChatResponse, ChatUsage, LlmClient};
use amana_assistant::{Assistant, Classifier, ConversationKind, InboundMessage, Responder};
use amana_context::{ContextAggregator, ContextSources};
use amana_invoice::InvoiceIntelligence;
use amana_memory::{InMemoryMemoryStore, MemoryStore};
use amana_store::{
    InMemoryStores, InvoiceRecord, InvoiceStatus, OrganizationRecord, UserProfileRecord,
};

const PHONE: &str = "+234800000001";
const ORG: &str = "org-1";

struct ScriptedClient {
    responses: AsyncMutex<VecDeque<Result<String, AiError>>>,
    requests: AsyncMutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<String, AiError>>) -> Self {
        Self {
            responses: AsyncMutex::new(VecDeque::from(responses)),
            requests: AsyncMutex::new(Vec::new()),
        }
    }

    async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AiError> {
        self.requests.lock().await.push(request);
        let next = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AiError::InvalidResponse("scripted queue exhausted".into())));
        next.map(|text| ChatResponse {
            text,
            finish_reason: Some("stop".to_string()),
            usage: ChatUsage::default(),
        })
    }
}

fn greeting_verdict(suggested: &str) -> String {
    format!(
        r#"{{"type": "greeting", "isGreeting": true, "isSmallTalk": false,
           "isCompliment": false, "isQuestion": false,
           "needsBusinessAction": false, "suggestedResponse": "{suggested}"}}"#
    )
}

fn task_verdict() -> String {
    r#"{"type": "task", "isGreeting": false, "isSmallTalk": false,
        "isCompliment": false, "isQuestion": false,
        "needsBusinessAction": true}"#
        .to_string()
}

fn seeded_stores() -> Arc<InMemoryStores> {
    let stores = Arc::new(InMemoryStores::new());
    stores.seed_organization(OrganizationRecord {
        organization_id: ORG.to_string(),
        name: "Kano Haulage".to_string(),
        wallet_balance: 75_000.0,
    });
    stores.seed_profile(UserProfileRecord {
        phone_number: PHONE.to_string(),
        organization_id: ORG.to_string(),
        name: "Ngozi".to_string(),
        language: Some("en".to_string()),
        timezone: Some("Africa/Lagos".to_string()),
    });
    stores.seed_invoice(InvoiceRecord {
        invoice_id: "id-1".to_string(),
        invoice_number: "INV-001".to_string(),
        organization_id: ORG.to_string(),
        client_name: "Acme Distribution".to_string(),
        total: 250_000.0,
        status: InvoiceStatus::Sent,
        due_unix_ms: None,
        created_unix_ms: 10,
    });
    stores.seed_invoice(InvoiceRecord {
        invoice_id: "id-2".to_string(),
        invoice_number: "INV-002".to_string(),
        organization_id: ORG.to_string(),
        client_name: "Dangote Depot".to_string(),
        total: 100_000.0,
        status: InvoiceStatus::Paid,
        due_unix_ms: None,
        created_unix_ms: 20,
    });
    stores
}

struct Pipeline {
    stores: Arc<InMemoryStores>,
    memory: Arc<InMemoryMemoryStore>,
    classifier_client: Arc<ScriptedClient>,
    responder_client: Arc<ScriptedClient>,
    assistant: Assistant,
}

fn pipeline(
    classifier_replies: Vec<Result<String, AiError>>,
    responder_replies: Vec<Result<String, AiError>>,
) -> Pipeline {
    let stores = seeded_stores();
    let memory = Arc::new(InMemoryMemoryStore::new());
    let classifier_client = Arc::new(ScriptedClient::new(classifier_replies));
    let responder_client = Arc::new(ScriptedClient::new(responder_replies));

    let aggregator = ContextAggregator::new(ContextSources {
        invoices: stores.clone(),
        organizations: stores.clone(),
        routes: stores.clone(),
        drivers: stores.clone(),
        profiles: stores.clone(),
        memory: memory.clone(),
    });
    let classifier = Classifier::new(classifier_client.clone(), "gpt-4o-mini", 1_000);
    let responder = Responder::new(responder_client.clone(), "gpt-4o-mini", 1_000);
    let invoices = InvoiceIntelligence::new(stores.clone(), stores.clone());
    let assistant = Assistant::new(aggregator, classifier, responder, invoices, memory.clone());

    Pipeline {
        stores,
        memory,
        classifier_client,
        responder_client,
        assistant,
    }
}

fn inbound(text: &str) -> InboundMessage {
    InboundMessage {
        phone_number: PHONE.to_string(),
        organization_id: ORG.to_string(),
        text: text.to_string(),
        transcript: None,
    }
}

#[tokio::test]
async fn social_turn_answers_without_touching_the_responder() {
    let pipeline = pipeline(
        vec![Ok(greeting_verdict("How far Ngozi! Business dey move?"))],
        Vec::new(),
    );

    let reply = pipeline.assistant.handle_message(inbound("how far")).await;
    assert_eq!(reply.kind, ConversationKind::Greeting);
    assert_eq!(reply.text, "How far Ngozi! Business dey move?");
    // The classifier already supplied a reply, so no second model call.
    assert_eq!(pipeline.responder_client.request_count().await, 0);

    let document = pipeline
        .memory
        .read(PHONE)
        .await
        .expect("read")
        .expect("document");
    assert_eq!(document.conversation_history.len(), 2);
}

#[tokio::test]
async fn social_turn_without_a_suggestion_uses_the_responder_with_context() {
    // An empty suggestion is discarded at parse time, so the responder runs.
    let pipeline = pipeline(
        vec![Ok(greeting_verdict(""))],
        vec![Ok("We dey kampe! One invoice still dey wait payment sha.".to_string())],
    );

    let reply = pipeline
        .assistant
        .handle_message(inbound("how we dey?"))
        .await;
    assert_eq!(
        reply.text,
        "We dey kampe! One invoice still dey wait payment sha."
    );
    assert_eq!(pipeline.responder_client.request_count().await, 1);

    // The responder's system prompt carried the business snapshot: one
    // unpaid invoice and the seeded wallet balance.
    let requests = pipeline.responder_client.requests.lock().await;
    let system = &requests[0].messages[0].content;
    assert!(system.contains("1 unpaid invoice(s)"));
    assert!(system.contains("₦75,000"));
}

#[tokio::test]
async fn expense_lifecycle_spans_turns_through_memory() {
    let pipeline = pipeline(
        vec![
            Ok(task_verdict()),
            Ok(task_verdict()),
            Ok(task_verdict()),
        ],
        Vec::new(),
    );

    let added = pipeline
        .assistant
        .handle_message(inbound("add ₦80,000 expense for diesel on INV-001"))
        .await;
    assert_eq!(added.intent.as_deref(), Some("add_expense"));
    assert!(added.text.contains("₦80,000"));
    assert_eq!(pipeline.stores.expense_count(), 1);

    // "that invoice" resolves through the pointer the first turn set.
    let listed = pipeline
        .assistant
        .handle_message(inbound("show all expenses on that invoice"))
        .await;
    assert_eq!(listed.intent.as_deref(), Some("list_expenses"));
    assert!(listed.text.contains("INV-001"));
    assert!(listed.text.contains("diesel"));

    let balance = pipeline
        .assistant
        .handle_message(inbound("how much remaining on that invoice?"))
        .await;
    assert_eq!(balance.intent.as_deref(), Some("get_balance"));
    assert!(balance.text.contains("₦170,000"));

    let document = pipeline
        .memory
        .read(PHONE)
        .await
        .expect("read")
        .expect("document");
    // Three user turns plus three assistant turns, never truncated.
    assert_eq!(document.conversation_history.len(), 6);
    assert_eq!(document.last_invoice_number.as_deref(), Some("INV-001"));
}

#[tokio::test]
async fn full_model_outage_still_executes_business_tasks() {
    let pipeline = pipeline(Vec::new(), Vec::new());

    let reply = pipeline
        .assistant
        .handle_message(inbound("status of INV-001"))
        .await;
    assert_eq!(reply.kind, ConversationKind::Unknown);
    assert_eq!(reply.intent.as_deref(), Some("check_invoice_status"));
    assert!(reply.text.contains("INV-001"));
    assert!(reply.text.contains("₦250,000"));
    assert!(reply.text.contains("awaiting payment"));
    // The keyword fallback classified; exactly one (failed) model call.
    assert_eq!(pipeline.classifier_client.request_count().await, 1);
}

#[tokio::test]
async fn unknown_invoice_suggests_recent_numbers() {
    let pipeline = pipeline(vec![Ok(task_verdict())], Vec::new());

    let reply = pipeline
        .assistant
        .handle_message(inbound("status of INV-404"))
        .await;
    assert!(reply.text.contains("couldn't find"));
    assert!(reply.text.contains("INV-001"));
}

#[tokio::test]
async fn voice_transcript_drives_the_turn() {
    let pipeline = pipeline(Vec::new(), Vec::new());

    let reply = pipeline
        .assistant
        .handle_message(InboundMessage {
            phone_number: PHONE.to_string(),
            organization_id: ORG.to_string(),
            text: "[voice note]".to_string(),
            transcript: Some("what is the status of INV-002?".to_string()),
        })
        .await;
    assert!(reply.text.contains("INV-002"));
    assert!(reply.text.contains("has been paid"));

    let document = pipeline
        .memory
        .read(PHONE)
        .await
        .expect("read")
        .expect("document");
    // The transcript, not the placeholder, is what memory records.
    assert_eq!(
        document.conversation_history[0].text,
        "what is the status of INV-002?"
    );
}
