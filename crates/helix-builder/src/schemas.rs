//! Per-class output schemas and required credentials. Grounded on
//! `original_source/builder/schemas.py::AGENT_SCHEMAS`.

use helix_core::AgentClass;

/// Describes the JSON object a generated agent of this class must emit on
/// stdout, spelled out for the generation prompt.
pub struct OutputSchema {
    pub description: &'static str,
    pub fields: &'static [(&'static str, &'static str)],
}

pub fn output_schema(class: AgentClass) -> OutputSchema {
    match class {
        AgentClass::Research => OutputSchema {
            description: "Output schema for research tasks requiring web search and synthesis.",
            fields: &[
                ("sources", "list of URLs cited"),
                ("raw_data", "list of extracted text snippets from sources"),
                ("summary", "synthesized answer to the query"),
                ("confidence", "float 0-1 indicating confidence in result"),
            ],
        },
        AgentClass::Compute => OutputSchema {
            description: "Output schema for mathematical or logical computations.",
            fields: &[
                ("expression", "the mathematical expression evaluated"),
                ("result", "the numeric or boolean result"),
                ("steps", "step-by-step calculation logic"),
            ],
        },
        AgentClass::Data => OutputSchema {
            description: "Output schema for data fetching and transformation tasks.",
            fields: &[
                ("data", "list of data records"),
                ("format", "format of the data (json, csv, etc.)"),
                ("count", "number of records fetched"),
                ("source", "origin of the data"),
            ],
        },
        AgentClass::Code => OutputSchema {
            description: "Output schema for code generation and execution.",
            fields: &[
                ("code", "the generated code snippet"),
                ("language", "programming language (go, python, etc.)"),
                ("output", "standard output from execution, if run"),
                ("error", "standard error, if any"),
            ],
        },
        AgentClass::Synthesis => OutputSchema {
            description: "Output schema for pure LLM reasoning and synthesis.",
            fields: &[
                ("analysis", "detailed analysis or creative content"),
                ("confidence", "float 0-1"),
                ("reasoning", "chain of thought used"),
            ],
        },
    }
}

/// Credentials a class implies it needs, per spec.md §4.1's classifier
/// table. Environment variable names are `helix_core::env_keys`.
pub fn required_credentials(class: AgentClass) -> Vec<String> {
    match class {
        AgentClass::Research => vec!["web-search key".to_string()],
        AgentClass::Synthesis => vec!["LLM key".to_string()],
        AgentClass::Compute | AgentClass::Data | AgentClass::Code => Vec::new(),
    }
}
