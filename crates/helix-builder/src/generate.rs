//! Generate stage: assembles the code-generation prompt (class template +
//! refined task + credentials + schema + memory context) and calls the
//! LLM. Grounded on `original_source/builder/generator.py`.

use crate::classify::Classification;
use crate::schemas::output_schema;
use helix_core::env_keys;
use helix_llm::ModelRouter;
use std::time::Duration;

const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);
const HTTP_CLIENT_TIMEOUT_SECS: u64 = 120;

/// Builds the full generation prompt. Broken out from `generate` so tests
/// can assert on prompt contents without an LLM call.
pub fn build_prompt(refined_task: &str, classification: &Classification, memory_context: &str) -> String {
    let schema = output_schema(classification.class);
    let fields = schema
        .fields
        .iter()
        .map(|(name, desc)| format!("  - \"{}\": {}", name, desc))
        .collect::<Vec<_>>()
        .join("\n");

    let credentials = if classification.required_credentials.is_empty() {
        "none".to_string()
    } else {
        classification.required_credentials.join(", ")
    };

    let mut prompt = String::new();
    prompt.push_str(&format!(
        "You are an expert Golang developer specializing in high-performance, \
         dependency-free CLIs for TinyGo.\n\n\
         Task class: {}\n\
         Task: {}\n\n",
        classification.class, refined_task
    ));

    if !memory_context.is_empty() {
        prompt.push_str(memory_context);
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Requirements:\n\
         1. Write a complete, standalone Go program (`package main`).\n\
         2. Use only the standard library. No external modules.\n\
         3. The program MUST read exactly one positional command-line \
            argument (the task text) via os.Args[1].\n\
         4. Read credentials only from named environment variables: {} \
            (required for this class: {}).\n\
         5. Emit exactly one JSON object to standard output, matching this \
            schema:\n{}\n{}\n\
         6. On any internal error, emit a JSON object with an \"error\" \
            field instead of the schema above.\n\
         7. If the program makes HTTP calls, the client timeout MUST be \
            {}s.\n\
         8. Code MUST be TinyGo-compatible (avoid heavy reflection).\n\n\
         Output ONLY the raw Go code. No markdown formatting, no \
         explanation.",
        format!("{}, {}, {}", env_keys::LLM_API_KEY, env_keys::WEB_SEARCH_KEY, env_keys::WEB_SEARCH_CX),
        credentials,
        schema.description,
        fields,
        HTTP_CLIENT_TIMEOUT_SECS,
    ));

    prompt
}

/// Calls the router with the assembled prompt and cleans any remaining
/// markdown fences from the response (the HTTP provider already strips
/// them, but this stays defensive against other providers).
pub async fn generate(router: &ModelRouter, refined_task: &str, classification: &Classification, memory_context: &str) -> Result<String, helix_llm::LlmError> {
    let prompt = build_prompt(refined_task, classification, memory_context);
    let text = router.complete(&prompt, GENERATE_TIMEOUT).await?;
    Ok(strip_code_fence(&text))
}

fn strip_code_fence(text: &str) -> String {
    text.replace("```go", "").replace("```", "").trim().to_string()
}
