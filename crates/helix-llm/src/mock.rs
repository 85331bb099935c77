//! Deterministic stand-in provider used when no API key is configured, and
//! in tests. Mirrors the original generator's offline fallback so the
//! pipeline stays exercisable without network access.

use crate::provider::{LlmProvider, LlmResult};
use std::time::Duration;

pub struct MockProvider {
    models: Vec<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            models: vec!["mock-1".to_string()],
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn models(&self) -> Vec<&str> {
        self.models.iter().map(String::as_str).collect()
    }

    async fn complete(&self, prompt: &str, _model: &str, _timeout: Duration) -> LlmResult<String> {
        let _ = &self.models;
        Ok(mock_response(prompt))
    }
}

fn mock_response(prompt: &str) -> String {
    if prompt.to_lowercase().contains("fibonacci") {
        r#"package main

import (
	"fmt"
	"os"
	"strconv"
)

func fib(n int) int {
	if n <= 1 {
		return n
	}
	return fib(n-1) + fib(n-2)
}

func main() {
	if len(os.Args) < 2 {
		fmt.Println(`{"error": "provide a number"}`)
		return
	}
	n, _ := strconv.Atoi(os.Args[1])
	res := fib(n)
	fmt.Printf(`{"input": %d, "result": %d}`, n, res)
}
"#
        .to_string()
    } else {
        r#"package main; import "fmt"; func main() { fmt.Println("Hello, Agent!") }"#.to_string()
    }
}
