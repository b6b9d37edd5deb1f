use std::sync::{Arc, OnceLock};
use std::time::Duration;

use jsonschema::{validator_for, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use amana_ai::{ChatRequest, LlmClient, Message};
use amana_memory::{MemoryTurn, TurnRole};

pub const CLASSIFIER_HISTORY_TURNS: usize = 5;

const CLASSIFIER_MAX_TOKENS: u32 = 256;

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are the intent classifier for Amana, \
a WhatsApp assistant for Nigerian logistics businesses. Classify the customer's \
latest message into exactly one type: greeting, small_talk, compliment, question, \
or task.\n\
- greeting: salutations. Examples: \"hello\", \"good morning\", \"how far\", \
\"how una dey\".\n\
- small_talk: chit-chat with no business request. Examples: \"how's business\", \
\"this Lagos traffic no be joke\".\n\
- compliment: gratitude or praise. Examples: \"thank you\", \"well done o\", \
\"nice one, you too much\".\n\
- question: asks about the assistant or general matters, not a business record. \
Examples: \"wetin you fit do?\", \"do you work weekends?\".\n\
- task: asks to act on or report business data. Examples: \"status of INV-004\", \
\"add 5k fuel expense to that invoice\", \"how much we don make this month?\".\n\
Respond with a single JSON object only, no prose, with keys: type, isGreeting, \
isSmallTalk, isCompliment, isQuestion, needsBusinessAction, and optionally \
suggestedResponse (a short friendly reply, for non-task messages only). \
needsBusinessAction is true only for type \"task\".";

const GREETING_TOKENS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "how far",
    "how you dey",
    "how una dey",
    "wetin dey",
    "salut",
];

const COMPLIMENT_TOKENS: &[&str] = &[
    "thank",
    "thanks",
    "well done",
    "nice one",
    "god bless",
    "appreciate",
    "you too much",
    "great job",
    "awesome",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ConversationKind` values.
pub enum ConversationKind {
    Greeting,
    SmallTalk,
    Compliment,
    Question,
    Task,
    Unknown,
}

impl ConversationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::SmallTalk => "small_talk",
            Self::Compliment => "compliment",
            Self::Question => "question",
            Self::Task => "task",
            Self::Unknown => "unknown",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "greeting" => Some(Self::Greeting),
            "small_talk" => Some(Self::SmallTalk),
            "compliment" => Some(Self::Compliment),
            "question" => Some(Self::Question),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Classifier verdict for one inbound message.
pub struct Classification {
    pub kind: ConversationKind,
    pub is_greeting: bool,
    pub is_small_talk: bool,
    pub is_compliment: bool,
    pub is_question: bool,
    pub needs_business_action: bool,
    #[serde(default)]
    pub suggested_response: Option<String>,
}

impl Classification {
    fn social(kind: ConversationKind) -> Self {
        Self {
            kind,
            is_greeting: kind == ConversationKind::Greeting,
            is_small_talk: kind == ConversationKind::SmallTalk,
            is_compliment: kind == ConversationKind::Compliment,
            is_question: kind == ConversationKind::Question,
            needs_business_action: false,
            suggested_response: None,
        }
    }
}

/// Shape of the structured object the model must return.
#[derive(Debug, Deserialize)]
struct WireClassification {
    #[serde(rename = "type")]
    label: String,
    #[serde(rename = "isGreeting")]
    is_greeting: bool,
    #[serde(rename = "isSmallTalk")]
    is_small_talk: bool,
    #[serde(rename = "isCompliment")]
    is_compliment: bool,
    #[serde(rename = "isQuestion")]
    is_question: bool,
    #[serde(rename = "needsBusinessAction")]
    needs_business_action: bool,
    #[serde(rename = "suggestedResponse", default)]
    suggested_response: Option<String>,
}

fn classification_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "type",
            "isGreeting",
            "isSmallTalk",
            "isCompliment",
            "isQuestion",
            "needsBusinessAction"
        ],
        "properties": {
            "type": {
                "type": "string",
                "enum": ["greeting", "small_talk", "compliment", "question", "task"]
            },
            "isGreeting": { "type": "boolean" },
            "isSmallTalk": { "type": "boolean" },
            "isCompliment": { "type": "boolean" },
            "isQuestion": { "type": "boolean" },
            "needsBusinessAction": { "type": "boolean" },
            "suggestedResponse": { "type": "string" }
        }
    })
}

fn classification_validator() -> Option<&'static Validator> {
    static VALIDATOR: OnceLock<Option<Validator>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| validator_for(&classification_schema()).ok())
        .as_ref()
}

/// Model-backed conversation classifier with a deterministic offline
/// fallback. `classify` never returns an error.
#[derive(Clone)]
pub struct Classifier {
    client: Arc<dyn LlmClient>,
    model: String,
    timeout_ms: u64,
}

impl Classifier {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            client,
            model: model.into(),
            timeout_ms,
        }
    }

    pub async fn classify(&self, message: &str, history: &[MemoryTurn]) -> Classification {
        let request = self.build_request(message, history);
        let completion = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            self.client.complete(request),
        )
        .await;

        let text = match completion {
            Ok(Ok(response)) => response.text,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "classifier model call failed, using fallback");
                return fallback_classify(message);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout_ms,
                    "classifier model call timed out, using fallback"
                );
                return fallback_classify(message);
            }
        };

        match parse_classification(&text) {
            Ok(classification) => classification,
            Err(reason) => {
                tracing::warn!(reason, "classifier output rejected, using fallback");
                fallback_classify(message)
            }
        }
    }

    fn build_request(&self, message: &str, history: &[MemoryTurn]) -> ChatRequest {
        let mut messages = vec![Message::system(CLASSIFIER_SYSTEM_PROMPT)];
        let mut recent: Vec<&MemoryTurn> =
            history.iter().take(CLASSIFIER_HISTORY_TURNS).collect();
        recent.reverse();
        for turn in recent {
            messages.push(match turn.role {
                TurnRole::User => Message::user(turn.text.clone()),
                TurnRole::Assistant => Message::assistant(turn.text.clone()),
            });
        }
        messages.push(Message::user(message));

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(CLASSIFIER_MAX_TOKENS),
            temperature: Some(0.0),
            json_mode: true,
        }
    }
}

/// Parses and schema-validates the model's structured verdict. Any
/// non-conforming output is a rejection, handled exactly like a network
/// failure by the caller.
fn parse_classification(text: &str) -> Result<Classification, &'static str> {
    let payload: Value =
        serde_json::from_str(extract_json_object(text).ok_or("no JSON object in output")?)
            .map_err(|_| "output is not valid JSON")?;

    let validator = classification_validator().ok_or("classification schema failed to compile")?;
    if !validator.is_valid(&payload) {
        return Err("output does not match the classification schema");
    }

    let wire: WireClassification =
        serde_json::from_value(payload).map_err(|_| "output shape mismatch")?;
    let kind = ConversationKind::from_label(&wire.label).ok_or("unknown type label")?;

    Ok(Classification {
        kind,
        is_greeting: wire.is_greeting,
        is_small_talk: wire.is_small_talk,
        is_compliment: wire.is_compliment,
        is_question: wire.is_question,
        needs_business_action: wire.needs_business_action,
        suggested_response: wire
            .suggested_response
            .filter(|text| !text.trim().is_empty()),
    })
}

/// Tolerates code fences and surrounding prose around the JSON object.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Deterministic keyword fallback used when the model path fails. Anything
/// that is not clearly a greeting or a compliment is assumed to be a task
/// worth attempting: a wrong task guess is recoverable, a silently dropped
/// business request is not.
pub fn fallback_classify(message: &str) -> Classification {
    let normalized = message.to_lowercase();
    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    if matches_any(&normalized, &words, GREETING_TOKENS) {
        return Classification::social(ConversationKind::Greeting);
    }
    if matches_any(&normalized, &words, COMPLIMENT_TOKENS) {
        return Classification::social(ConversationKind::Compliment);
    }

    Classification {
        kind: ConversationKind::Unknown,
        is_greeting: false,
        is_small_talk: false,
        is_compliment: false,
        is_question: false,
        needs_business_action: true,
        suggested_response: None,
    }
}

fn matches_any(normalized: &str, words: &[&str], tokens: &[&str]) -> bool {
    tokens.iter().any(|token| {
        if token.contains(' ') {
            normalized.contains(token)
        } else {
            words.contains(token)
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use amana_ai::{AiError, ChatRequest, ChatResponse, ChatUsage, LlmClient};

    use super::{fallback_classify, Classifier, ConversationKind};

    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, AiError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, AiError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AiError> {
            self.requests.lock().expect("requests lock").push(request);
            let next = self
                .replies
                .lock()
                .expect("replies lock")
                .pop()
                .unwrap_or(Err(AiError::InvalidResponse("script empty".to_string())));
            next.map(|text| ChatResponse {
                text,
                finish_reason: Some("stop".to_string()),
                usage: ChatUsage::default(),
            })
        }
    }

    #[test]
    fn fallback_matches_the_fixed_examples() {
        let greeting = fallback_classify("how far");
        assert_eq!(greeting.kind, ConversationKind::Greeting);
        assert!(!greeting.needs_business_action);

        let compliment = fallback_classify("thank you");
        assert_eq!(compliment.kind, ConversationKind::Compliment);

        let unknown = fallback_classify("move 12 bags to Kano depot");
        assert_eq!(unknown.kind, ConversationKind::Unknown);
        assert!(unknown.needs_business_action);
    }

    #[test]
    fn fallback_does_not_match_inside_words() {
        // "history" contains "hi" but is not a greeting word.
        let result = fallback_classify("show history");
        assert_eq!(result.kind, ConversationKind::Unknown);
    }

    #[tokio::test]
    async fn conforming_model_output_is_honored() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(r#"{
            "type": "task",
            "isGreeting": false,
            "isSmallTalk": false,
            "isCompliment": false,
            "isQuestion": false,
            "needsBusinessAction": true
        }"#
        .to_string())]));
        let classifier = Classifier::new(client, "gpt-4o-mini", 1_000);

        let verdict = classifier.classify("status of INV-001", &[]).await;
        assert_eq!(verdict.kind, ConversationKind::Task);
        assert!(verdict.needs_business_action);
    }

    #[tokio::test]
    async fn fenced_output_is_tolerated() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(
            "```json\n{\"type\": \"greeting\", \"isGreeting\": true, \"isSmallTalk\": false, \
             \"isCompliment\": false, \"isQuestion\": false, \"needsBusinessAction\": false, \
             \"suggestedResponse\": \"How far! Wetin I fit do for you today?\"}\n```"
                .to_string(),
        )]));
        let classifier = Classifier::new(client, "gpt-4o-mini", 1_000);

        let verdict = classifier.classify("how far", &[]).await;
        assert_eq!(verdict.kind, ConversationKind::Greeting);
        assert!(verdict.suggested_response.is_some());
    }

    #[tokio::test]
    async fn schema_invalid_output_falls_back() {
        // Missing the required boolean flags.
        let client = Arc::new(ScriptedClient::new(vec![Ok(
            r#"{"type": "task"}"#.to_string()
        )]));
        let classifier = Classifier::new(client, "gpt-4o-mini", 1_000);

        let verdict = classifier.classify("how far", &[]).await;
        assert_eq!(verdict.kind, ConversationKind::Greeting);
    }

    #[tokio::test]
    async fn model_error_falls_back_without_propagating() {
        let client = Arc::new(ScriptedClient::new(vec![Err(AiError::HttpStatus {
            status: 503,
            body: "unavailable".to_string(),
        })]));
        let classifier = Classifier::new(client, "gpt-4o-mini", 1_000);

        let verdict = classifier.classify("add expense to INV-001", &[]).await;
        assert_eq!(verdict.kind, ConversationKind::Unknown);
        assert!(verdict.needs_business_action);
    }

    #[tokio::test]
    async fn history_is_capped_at_five_turns() {
        use amana_memory::{MemoryTurn, TurnRole};

        let client = Arc::new(ScriptedClient::new(vec![Err(AiError::InvalidResponse(
            "n/a".to_string(),
        ))]));
        let classifier = Classifier::new(client.clone(), "gpt-4o-mini", 1_000);

        let history: Vec<MemoryTurn> = (0..9)
            .map(|index| MemoryTurn {
                role: TurnRole::User,
                text: format!("turn-{index}"),
                intent: None,
                entity: None,
                timestamp_unix_ms: index,
            })
            .collect();
        classifier.classify("how far", &history).await;

        let requests = client.requests.lock().expect("requests lock");
        // system + 5 history turns + current message
        assert_eq!(requests[0].messages.len(), 7);
    }
}
