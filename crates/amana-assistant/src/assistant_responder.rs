use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use amana_ai::{ChatRequest, LlmClient, Message};
use amana_context::BusinessMetrics;
use amana_core::format_naira;
use amana_memory::{MemoryTurn, TurnRole};

pub const RESPONDER_HISTORY_TURNS: usize = 6;

const RESPONDER_MAX_TOKENS: u32 = 220;

const RESPONDER_PERSONA_PROMPT: &str = "You are Amana, the WhatsApp assistant for a \
Nigerian logistics business. You are warm, practical, and brief: reply in 2-3 short \
sentences, mirror the customer's language (English or Pidgin), and use at most one \
emoji. Never invent figures; only mention business numbers you were given below.";

/// Generic acknowledgements used when the model path fails. Short and
/// persona-consistent; never empty.
pub const FALLBACK_REPLIES: &[&str] = &[
    "I dey here for you! How I fit help with your business today? 😊",
    "Got it! Tell me wetin you need — invoices, expenses, or your balance.",
    "Thanks for reaching out! I fit check invoices, log expenses, or show your numbers.",
    "No wahala, I'm with you. What would you like to look at — an invoice or your wallet?",
    "I'm here o! Ask me about any invoice, expense, or today's business numbers.",
];

/// Injectable pick strategy so tests can pin the fallback reply.
pub trait FallbackSelector: Send + Sync {
    fn pick(&self, pool_len: usize) -> usize;
}

/// Default selector: a counter mixed through a 64-bit hash so consecutive
/// fallbacks spread across the pool without an RNG dependency.
#[derive(Debug, Default)]
pub struct CounterSelector {
    counter: AtomicU64,
}

impl FallbackSelector for CounterSelector {
    fn pick(&self, pool_len: usize) -> usize {
        if pool_len == 0 {
            return 0;
        }
        let seed = self.counter.fetch_add(1, Ordering::Relaxed);
        let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17);
        (mixed % pool_len as u64) as usize
    }
}

/// Test selector that always picks one index.
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl FallbackSelector for FixedSelector {
    fn pick(&self, pool_len: usize) -> usize {
        if pool_len == 0 {
            0
        } else {
            self.0 % pool_len
        }
    }
}

/// Model-backed reply generator with a fixed fallback pool. `generate`
/// always returns non-empty text.
#[derive(Clone)]
pub struct Responder {
    client: Arc<dyn LlmClient>,
    model: String,
    timeout_ms: u64,
    selector: Arc<dyn FallbackSelector>,
}

impl Responder {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, timeout_ms: u64) -> Self {
        Self::with_selector(client, model, timeout_ms, Arc::new(CounterSelector::default()))
    }

    pub fn with_selector(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        timeout_ms: u64,
        selector: Arc<dyn FallbackSelector>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            timeout_ms,
            selector,
        }
    }

    pub async fn generate(
        &self,
        message: &str,
        history: &[MemoryTurn],
        business_context: Option<&BusinessMetrics>,
    ) -> String {
        let request = self.build_request(message, history, business_context);
        let completion = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            self.client.complete(request),
        )
        .await;

        match completion {
            Ok(Ok(response)) => {
                let text = response.text.trim().to_string();
                if text.is_empty() {
                    tracing::warn!("responder model returned empty text, using fallback pool");
                    self.fallback()
                } else {
                    text
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "responder model call failed, using fallback pool");
                self.fallback()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout_ms,
                    "responder model call timed out, using fallback pool"
                );
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> String {
        let index = self.selector.pick(FALLBACK_REPLIES.len());
        FALLBACK_REPLIES[index.min(FALLBACK_REPLIES.len() - 1)].to_string()
    }

    fn build_request(
        &self,
        message: &str,
        history: &[MemoryTurn],
        business_context: Option<&BusinessMetrics>,
    ) -> ChatRequest {
        let mut system = RESPONDER_PERSONA_PROMPT.to_string();
        if let Some(metrics) = business_context {
            let lines = context_lines(metrics);
            if !lines.is_empty() {
                system.push_str("\n\nCurrent business snapshot:\n");
                system.push_str(&lines.join("\n"));
            }
        }

        let mut messages = vec![Message::system(system)];
        let mut recent: Vec<&MemoryTurn> =
            history.iter().take(RESPONDER_HISTORY_TURNS).collect();
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
            max_tokens: Some(RESPONDER_MAX_TOKENS),
            temperature: Some(0.7),
            json_mode: false,
        }
    }
}

/// Bullet lines for the non-zero metric fields only. Zero values are
/// omitted, not rendered as "0", so the model cannot manufacture alerts
/// out of quiet accounts.
fn context_lines(metrics: &BusinessMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    if metrics.unpaid_invoices > 0 {
        lines.push(format!("- {} unpaid invoice(s)", metrics.unpaid_invoices));
    }
    if metrics.overdue_invoices > 0 {
        lines.push(format!("- {} overdue invoice(s)", metrics.overdue_invoices));
    }
    if metrics.wallet_balance > 0.0 {
        lines.push(format!(
            "- wallet balance {}",
            format_naira(metrics.wallet_balance)
        ));
    }
    if metrics.active_routes > 0 {
        lines.push(format!("- {} active route(s)", metrics.active_routes));
    }
    lines
}
