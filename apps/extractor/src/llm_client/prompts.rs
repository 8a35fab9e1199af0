// System prompts and fragments shared by the extractor and the assistant.
// Task-specific prompt text lives in a prompts.rs next to its caller.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for free-text answers.
pub const ASSISTANT_SYSTEM: &str = "You are a helpful assistant";

/// Closing instruction appended to every structured-extraction prompt.
pub const STRICT_JSON_INSTRUCTION: &str = "Return ONLY valid JSON. \
    No delimiter errors, no markdown.";
