//! WASM compile path: compiles the same generated Go source to a WASI
//! module and registers it. Grounded on
//! `original_source/builder/wasm_builder.py::WASMBuilder`.

use crate::compile::CompileSandbox;
use crate::error::{BuilderError, BuilderResult};
use chrono::Utc;
use helix_registry::{is_valid_wasm, WasmManifest, WasmRegistry};
use tokio::process::Command;

/// Compiles Go source with `GOOS=wasip1 GOARCH=wasm`, mirroring
/// `WASMBuilder.compile`'s Dockerized `golang:alpine` build.
pub struct DockerWasmSandbox {
    image: String,
}

impl DockerWasmSandbox {
    pub fn new() -> Self {
        Self { image: "golang:1.22-alpine".to_string() }
    }
}

impl Default for DockerWasmSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CompileSandbox for DockerWasmSandbox {
    async fn compile(&self, source: &str) -> BuilderResult<Vec<u8>> {
        let temp_dir = tempfile::tempdir()?;
        let src_path = temp_dir.path().join("main.go");
        let output_name = "agent.wasm";
        let wasm_path = temp_dir.path().join(output_name);

        tokio::fs::write(&src_path, source).await?;

        let mount = format!("{}:/app", temp_dir.path().display());

        let output = Command::new("docker")
            .args([
                "run",
                "--rm",
                "-v",
                &mount,
                "-w",
                "/app",
                "-e",
                "GOOS=wasip1",
                "-e",
                "GOARCH=wasm",
                "-e",
                "CGO_ENABLED=0",
                &self.image,
                "go",
                "build",
                "-ldflags=-s -w",
                "-o",
                output_name,
                "main.go",
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(BuilderError::CompileFailed(String::from_utf8_lossy(&output.stderr).to_string()));
        }
        if !wasm_path.exists() {
            return Err(BuilderError::CompileFailed("WASM binary not found after compilation".to_string()));
        }

        let binary = tokio::fs::read(&wasm_path).await?;
        if !is_valid_wasm(&binary) {
            return Err(BuilderError::CompileFailed("compiled output is not a valid WASM module".to_string()));
        }
        Ok(binary)
    }
}

/// Compiles and registers a WASM agent in one step, matching
/// `WASMBuilder.build_and_register`.
pub async fn build_and_register(
    sandbox: &dyn CompileSandbox,
    registry: &WasmRegistry,
    source_code: &str,
    agent_name: &str,
    task_description: &str,
    capabilities: Vec<String>,
) -> BuilderResult<String> {
    let binary = sandbox.compile(source_code).await?;
    let manifest = WasmManifest {
        name: agent_name.to_string(),
        task: task_description.to_string(),
        runtime: "wasm".to_string(),
        capabilities,
        created: Utc::now().to_rfc3339(),
        wasm_file: "agent.wasm".to_string(),
        embedding: None,
    };
    let path = registry.store(agent_name, &binary, &manifest)?;
    Ok(path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct FakeSandbox;

    #[async_trait]
    impl CompileSandbox for FakeSandbox {
        async fn compile(&self, _source: &str) -> BuilderResult<Vec<u8>> {
            Ok(b"\0asm\x01\x00\x00\x00".to_vec())
        }
    }

    #[tokio::test]
    async fn build_and_register_stores_valid_wasm() {
        let dir = tempdir().unwrap();
        let registry = WasmRegistry::new(dir.path()).unwrap();
        let sandbox = FakeSandbox;

        let path = build_and_register(&sandbox, &registry, "package main", "helix-compute-1", "calculate a sum", vec!["compute".to_string()]).await.unwrap();
        assert!(!path.is_empty());
        assert!(registry.list_agents().contains(&"helix-compute-1".to_string()));
    }
}
