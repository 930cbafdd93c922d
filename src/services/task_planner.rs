//! Five-tier request classification.
//!
//! Maps the final user message (plus conversation length) to a
//! [`TaskPlan`]: which model chain to use, whether to retrieve, and how
//! strictly to gate the response. Classification is pure and offline; an
//! ambiguous request always lands on a safe default plan.
//!
//! Precedence, first match wins:
//! 1. L0 greeting/acknowledgement
//! 2. L4 expert keyword, or escalating domain plus a complex keyword
//! 3. L3 two complex keywords, long message, or long conversation
//! 4. L2 confidently detected domain
//! 5. L1 quick keyword or short message
//! 6. general fallback

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use regex::RegexSet;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    conversation_chars, last_user_text, ChatMessage, Domain, ModelTier, ModelsConfig,
    OutputFormat, PlannerConfig, TaskLevel, TaskPlan,
};
use crate::domain::text::count_hits;
use crate::services::domain_detector::{DomainDetector, DomainMatch};
use crate::services::task_log::TaskLog;

static GREETING_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^(hi|hello|hey|hiya|yo|good (morning|afternoon|evening))[\s!！。.~～,，]*$",
        r"^(thanks|thank you|thx|ty|ok|okay|got it|sure|cool|great|bye|goodbye)[\s!！。.~～,，]*$",
        r"^(你好|您好|嗨|哈囉|哈啰|早安|午安|晚安|早|安安|大家好)[\s!！。.~～,，呀啊]*$",
        r"^(謝謝|谢谢|感謝|感谢|好的|好|收到|了解|明白|沒問題|没问题|掰掰|再見|再见)[\s!！。.~～,，啦喔哦]*$",
    ])
    .unwrap()
});

/// Signals an expert-level request on their own.
pub const EXPERT_KEYWORDS: &[&str] = &[
    "法律意見", "訴訟策略", "結構計算", "結構安全", "耐震評估", "鑑定", "盡職調查",
    "legal opinion", "litigation strategy", "structural calculation", "expert review",
    "due diligence", "forensic",
];

/// Signals multi-step work.
pub const COMPLEX_KEYWORDS: &[&str] = &[
    "分析", "報告", "比較", "評估", "規劃", "設計", "策略", "優化",
    "analyze", "analysis", "report", "compare", "evaluate", "design", "strategy", "optimize",
];

/// Signals a short lookup.
pub const QUICK_KEYWORDS: &[&str] = &[
    "翻譯", "翻译", "是什麼", "是什么", "幾點", "定義", "換算",
    "translate", "define", "what is", "what time", "convert", "how many",
];

const GREETING_PROMPT: &str =
    "You are a friendly assistant. Reply briefly and warmly in the user's language.";
const QUICK_PROMPT: &str =
    "You are a concise assistant. Answer directly in one or two sentences.";
const EXPERT_SUFFIX: &str = "This is an expert-level request. Be rigorous, state every assumption, \
    and say explicitly when the available information is insufficient.";
const COMPLEX_SUFFIX: &str =
    "Break the problem into steps and address each one before concluding.";

/// Lowercased text features used by the level rules.
struct Signals {
    lowercase: String,
    chars: usize,
    conversation_chars: usize,
    expert_hits: usize,
    complex_hits: usize,
    quick_hits: usize,
    domain: DomainMatch,
}

impl Signals {
    fn collect(text: &str, messages: &[ChatMessage], detector: &DomainDetector) -> Self {
        let lowercase = text.to_lowercase();
        Self {
            chars: text.chars().count(),
            conversation_chars: conversation_chars(messages),
            expert_hits: count_hits(&lowercase, EXPERT_KEYWORDS),
            complex_hits: count_hits(&lowercase, COMPLEX_KEYWORDS),
            quick_hits: count_hits(&lowercase, QUICK_KEYWORDS),
            domain: detector.detect(text),
            lowercase,
        }
    }
}

/// Builds one immutable [`TaskPlan`] per request.
pub struct TaskPlanner {
    models: ModelsConfig,
    thresholds: PlannerConfig,
    detector: DomainDetector,
    task_log: Option<Arc<TaskLog>>,
}

impl TaskPlanner {
    pub fn new(models: ModelsConfig, thresholds: PlannerConfig) -> Self {
        Self {
            models,
            thresholds,
            detector: DomainDetector::new(),
            task_log: None,
        }
    }

    #[must_use]
    pub fn with_task_log(mut self, task_log: Arc<TaskLog>) -> Self {
        self.task_log = Some(task_log);
        self
    }

    pub const fn detector(&self) -> &DomainDetector {
        &self.detector
    }

    /// Classify the conversation and build its plan.
    pub fn plan(&self, messages: &[ChatMessage]) -> TaskPlan {
        let text = last_user_text(messages).trim();
        let signals = Signals::collect(text, messages, &self.detector);
        let t = &self.thresholds;

        let plan = if GREETING_PATTERNS.is_match(&signals.lowercase) {
            self.greeting_plan(&signals)
        } else if signals.expert_hits >= 1
            || (signals.domain.domain.definition().needs_escalation && signals.complex_hits >= 1)
        {
            self.expert_plan(text, &signals)
        } else if signals.complex_hits >= 2
            || signals.chars > t.long_message_chars
            || signals.conversation_chars > t.long_conversation_chars
        {
            self.complex_plan(text, &signals)
        } else if !signals.domain.domain.is_general()
            && signals.domain.confidence >= t.domain_confidence
        {
            self.domain_plan(text, &signals)
        } else if signals.quick_hits >= 1 || signals.chars < t.short_message_chars {
            self.quick_plan(&signals)
        } else {
            self.general_plan(text, &signals)
        };

        tracing::info!(
            level = %plan.level(),
            label = plan.label(),
            domain = %plan.domain(),
            confidence = signals.domain.confidence,
            model = plan.primary_model(),
            "planned request"
        );
        plan
    }

    /// Report a completed request. Only plans marked for training are
    /// written; returns whether an entry was recorded.
    pub async fn log_task(
        &self,
        plan: &TaskPlan,
        query: &str,
        response: &str,
        model_used: &str,
        duration_ms: u64,
    ) -> DomainResult<bool> {
        match &self.task_log {
            Some(log) => log.record(plan, query, response, model_used, duration_ms).await,
            None => Ok(false),
        }
    }

    fn greeting_plan(&self, signals: &Signals) -> TaskPlan {
        TaskPlan {
            level: TaskLevel::Greeting,
            label: "greeting".to_string(),
            model_chain: self.models.chain(&[ModelTier::Light]),
            system_prompt: GREETING_PROMPT.to_string(),
            rag_query: String::new(),
            rag_collections: BTreeSet::new(),
            output_format: None,
            quality_gate: false,
            quality_min_score: 0.0,
            escalation: false,
            max_retries: 0,
            temperature: 0.8,
            domain: signals.domain.domain,
            thinking: false,
            log_for_training: false,
        }
    }

    fn expert_plan(&self, text: &str, signals: &Signals) -> TaskPlan {
        let domain = signals.domain.domain;
        TaskPlan {
            level: TaskLevel::Expert,
            label: format!("expert:{domain}"),
            model_chain: self.models.chain(&[ModelTier::Expert, ModelTier::Heavy]),
            system_prompt: format!("{}\n\n{EXPERT_SUFFIX}", domain.definition().system_prompt),
            rag_query: text.to_string(),
            rag_collections: collections(domain),
            output_format: Some(
                OutputFormat::requested_in(&signals.lowercase).unwrap_or(OutputFormat::Markdown),
            ),
            quality_gate: true,
            quality_min_score: self.thresholds.expert_min_score,
            escalation: true,
            max_retries: 1,
            temperature: 0.1,
            domain,
            thinking: true,
            log_for_training: true,
        }
    }

    fn complex_plan(&self, text: &str, signals: &Signals) -> TaskPlan {
        let domain = signals.domain.domain;
        TaskPlan {
            level: TaskLevel::Complex,
            label: format!("complex:{domain}"),
            model_chain: self.models.chain(&[
                ModelTier::Heavy,
                ModelTier::Standard,
                ModelTier::Light,
            ]),
            system_prompt: format!("{}\n\n{COMPLEX_SUFFIX}", domain.definition().system_prompt),
            rag_query: text.to_string(),
            rag_collections: collections(domain),
            output_format: OutputFormat::requested_in(&signals.lowercase),
            quality_gate: true,
            quality_min_score: self.thresholds.complex_min_score,
            escalation: false,
            max_retries: 1,
            temperature: 0.2,
            domain,
            thinking: true,
            log_for_training: true,
        }
    }

    fn domain_plan(&self, text: &str, signals: &Signals) -> TaskPlan {
        let domain = signals.domain.domain;
        let definition = domain.definition();
        TaskPlan {
            level: TaskLevel::Domain,
            label: format!("domain:{domain}"),
            model_chain: self.models.chain(&[
                definition.model,
                ModelTier::Standard,
                ModelTier::Light,
            ]),
            system_prompt: definition.system_prompt.to_string(),
            rag_query: text.to_string(),
            rag_collections: collections(domain),
            output_format: OutputFormat::requested_in(&signals.lowercase),
            quality_gate: false,
            quality_min_score: 0.0,
            escalation: false,
            max_retries: 0,
            temperature: 0.3,
            domain,
            thinking: true,
            log_for_training: true,
        }
    }

    fn quick_plan(&self, signals: &Signals) -> TaskPlan {
        TaskPlan {
            level: TaskLevel::Quick,
            label: "quick".to_string(),
            model_chain: self.models.chain(&[ModelTier::Light, ModelTier::Standard]),
            system_prompt: QUICK_PROMPT.to_string(),
            rag_query: String::new(),
            rag_collections: BTreeSet::new(),
            output_format: OutputFormat::requested_in(&signals.lowercase),
            quality_gate: false,
            quality_min_score: 0.0,
            escalation: false,
            max_retries: 0,
            temperature: 0.5,
            domain: signals.domain.domain,
            thinking: false,
            log_for_training: false,
        }
    }

    fn general_plan(&self, text: &str, signals: &Signals) -> TaskPlan {
        TaskPlan {
            level: TaskLevel::Domain,
            label: "general".to_string(),
            model_chain: self.models.chain(&[ModelTier::Standard, ModelTier::Light]),
            system_prompt: Domain::General.definition().system_prompt.to_string(),
            rag_query: text.to_string(),
            rag_collections: collections(Domain::General),
            output_format: OutputFormat::requested_in(&signals.lowercase),
            quality_gate: false,
            quality_min_score: 0.0,
            escalation: false,
            max_retries: 0,
            temperature: 0.3,
            domain: Domain::General,
            thinking: true,
            log_for_training: true,
        }
    }
}

fn collections(domain: Domain) -> BTreeSet<String> {
    domain
        .definition()
        .rag_collections
        .iter()
        .map(ToString::to_string)
        .collect()
}
