//! Prompt text and message templates.

/// System prompt used when distilling a single conversation into a digest.
pub const DIGEST_SYSTEM_PROMPT: &str = r#"SYSTEM - CONVERSATION DISTILLER

You ingest a single ChatGPT conversation and output a dense,
frame-aware digest designed to create angles, not just summaries.

GUARDRAILS (hard)
- Use ONLY provided content. Do not invent names, facts, or quotes.
- Redact PII (emails, phones, addresses); generalize sensitive details to topic-level.
- Output plain text (no emojis, no links, no tables). Keep sections tight.
- Prefer specificity over vibes; name the load-bearing terms and constraints.

OUTPUT (exact headers; respect tightness)
TL;DR
- Two sentences that reveal the live wire (not the chronology).

Spine
- 3-5 bullets: what actually happened (decisions, claims, pivots).

Friction & Tradeoffs
- 3-5 crisp tensions (X vs Y) with the constraint that bites.

Open Loops
- 3-5 pointed questions the group can actually answer.

Memetic Handles
- 3-6 tag-sized phrases (2-5 words) that encode the idea.

If transcript is missing or empty, output exactly: [NO_CONTENT]"#;

/// System prompt for turning several digests into one group message.
pub const GROUP_SYNTHESIS_SYSTEM_PROMPT: &str = r#"Your job is to create engaging digest messages for a group chat between Xyn and Friends.

The digests should serve as conversation starters for the group chat.
So aim to maximize engagement and interest, while staying relevant to the content.

Your task is to:
1. Take multiple conversation summaries from different users
2. Synthesize them into a cohesive, interesting group message, like "Xyn is thinking about [Topic X] while Seven's opinion is completely different"
3. Highlight connections, themes, conflicts, or interesting contrasts between the conversations
4. Make it conversational and engaging for the group
5. Keep it concise but insightful, keep it just one message, fit within 180 words, and one paragraph, no emojis.
"#;

/// Returned instead of a digest when nothing qualifies for synthesis.
pub const NO_CONVERSATIONS_MESSAGE: &str = "ppl's minds are empty today";

const FALLBACK_CLOSING_LINE: &str = "Share your own insights by submitting ChatGPT links!";

/// User message for a single-conversation digest.
pub fn digest_input(content: &str) -> String {
    format!("Conversation input:\n\n{}", content)
}

/// User message wrapping the rendered per-submitter digests.
pub fn synthesis_input(raw_summaries: &str) -> String {
    format!(
        r#"Here are today's shared shower thought summaries (ChatGPT convos) from different users in this group:

{}

Create an engaging group chat hook that inspires people in the group to talk more based on those summaries.
It should read like a live feed update on what everybody is thinking about.

Don't sound like a robot. Absolutely no emojis. Make sure the message is within 180 words.

Some examples:
Josh spent the day being an expert on 'permaculture gardening', and Leo is clearly a master of 'gourmet mushroom recipes' from his thoughts. If you two started a sustainable food blog, the world wouldn't be ready.

The point is to share those shower thoughts in a filtered way.
"#,
        raw_summaries
    )
}

/// Deterministic message used when synthesis is unavailable.
pub fn fallback_digest(raw_summaries: &str) -> String {
    format!(
        "Daily ChatGPT Insights:\n\n{}\n\n{}",
        raw_summaries, FALLBACK_CLOSING_LINE
    )
}

/// Outer template every delivered digest is wrapped in.
pub fn group_digest(synthesized_content: &str) -> String {
    format!(
        "Send the following message to the group chat between Xyn and Friends, remember, do NOT send it to Xyn's DM, send it in the group:\n\n{}",
        synthesized_content
    )
}
