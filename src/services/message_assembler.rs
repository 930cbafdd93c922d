//! Deterministic prompt assembly.
//!
//! Turns a [`TaskPlan`] plus retrieved context into the message list handed
//! to the model-chain executor. Never mutates the caller's messages, and
//! re-running on its own output is a no-op.

use crate::domain::models::{ChatMessage, Domain, Role, TaskLevel, TaskPlan};

/// Present in every reasoning-scaffold message.
pub const SCAFFOLD_MARKER: &str = "[reasoning-scaffold]";

/// Present in the retrieved-context system message.
pub const CONTEXT_MARKER: &str = "[retrieved-context]";

const CONTEXT_INSTRUCTIONS: &str = "The following reference material was retrieved for this \
request. Prioritise it over your general knowledge when they conflict, and make clear which \
statements come from the material and which are your own inference.";

const BRIEF_SCAFFOLD: &str = "Before answering, think through the request step by step: \
identify what is being asked, recall the relevant facts, then answer concisely.";

const DETAILED_SCAFFOLD: &str = "Before answering, work through the problem explicitly:\n\
1. Restate the question and list the constraints.\n\
2. Identify the facts, figures and sources that apply.\n\
3. Reason through each step, checking intermediate results.\n\
4. Consider alternatives and risks.\n\
5. Give the final answer, clearly separated from the reasoning.";

/// Builds final prompt messages from a plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageAssembler;

impl MessageAssembler {
    pub const fn new() -> Self {
        Self
    }

    /// Apply, in order: system prompt merge, retrieved context, output-format
    /// hint, reasoning scaffold.
    pub fn prepare_messages(
        &self,
        plan: &TaskPlan,
        original_messages: &[ChatMessage],
        rag_context: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = original_messages.to_vec();

        inject_system_prompt(&mut messages, plan.system_prompt());

        if !rag_context.trim().is_empty() {
            inject_context(&mut messages, rag_context.trim());
        }

        if let Some(format) = plan.output_format() {
            append_format_hint(&mut messages, format.hint());
        }

        if plan.thinking() {
            inject_scaffold(&mut messages, plan);
        }

        messages
    }
}

fn inject_system_prompt(messages: &mut Vec<ChatMessage>, prompt: &str) {
    if prompt.is_empty() {
        return;
    }
    match messages.iter_mut().find(|m| m.role == Role::System) {
        Some(system) if system.content.contains(prompt) => {}
        Some(system) => {
            system.content.push_str("\n\n");
            system.content.push_str(prompt);
        }
        None => messages.insert(0, ChatMessage::system(prompt)),
    }
}

fn inject_context(messages: &mut Vec<ChatMessage>, context: &str) {
    let content = format!("{CONTEXT_MARKER}\n{CONTEXT_INSTRUCTIONS}\n\n{context}");

    if let Some(existing) = messages
        .iter_mut()
        .find(|m| m.role == Role::System && m.content.starts_with(CONTEXT_MARKER))
    {
        existing.content = content;
        return;
    }

    let position = messages
        .iter()
        .position(|m| m.role == Role::System)
        .map_or(0, |first| first + 1);
    messages.insert(position, ChatMessage::system(content));
}

fn append_format_hint(messages: &mut [ChatMessage], hint: &str) {
    if let Some(last_user) = messages.iter_mut().rev().find(|m| m.role == Role::User) {
        if !last_user.content.contains(hint) {
            last_user.content.push_str("\n\n");
            last_user.content.push_str(hint);
        }
    }
}

fn inject_scaffold(messages: &mut Vec<ChatMessage>, plan: &TaskPlan) {
    if messages.iter().any(|m| m.content.contains(SCAFFOLD_MARKER)) {
        return;
    }

    let body = match plan.level() {
        TaskLevel::Complex | TaskLevel::Expert => DETAILED_SCAFFOLD,
        _ => BRIEF_SCAFFOLD,
    };
    let mut content = format!("{SCAFFOLD_MARKER}\n{body}");
    if let Some(check) = domain_check(plan.domain()) {
        content.push('\n');
        content.push_str(check);
    }

    // After the leading system block, before the conversation.
    let position = messages
        .iter()
        .position(|m| m.role != Role::System)
        .unwrap_or(messages.len());
    messages.insert(position, ChatMessage::system(content));
}

const fn domain_check(domain: Domain) -> Option<&'static str> {
    match domain {
        Domain::Construction => Some(
            "Check quantities and units, and cite the code or specification clause that applies.",
        ),
        Domain::Finance => Some("Re-check every calculation and keep currencies explicit."),
        Domain::Legal => Some(
            "Separate the governing text, its interpretation, and the facts of this case.",
        ),
        Domain::Software => Some("Consider edge cases, failure modes and complexity."),
        Domain::General => None,
    }
}
