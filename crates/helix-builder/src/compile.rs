//! Compile stage: drives an external sandboxed toolchain to turn
//! generated Go source into a statically linked binary. Grounded on
//! `original_source/builder/compiler.py::Compiler.compile_in_docker`.

use crate::error::{BuilderError, BuilderResult};
use tokio::process::Command;

const TINYGO_IMAGE: &str = "tinygo/tinygo";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostArch {
    Amd64,
    Arm64,
}

impl HostArch {
    pub fn goarch(&self) -> &'static str {
        match self {
            HostArch::Amd64 => "amd64",
            HostArch::Arm64 => "arm64",
        }
    }
}

/// Detects the host architecture the way `compiler.py` does (inspecting
/// `platform.machine()`), mapped onto Rust's own `std::env::consts::ARCH`.
pub fn detect_host_arch() -> HostArch {
    match std::env::consts::ARCH {
        "aarch64" | "arm" => HostArch::Arm64,
        _ => HostArch::Amd64,
    }
}

/// A sandboxed compiler: source text in, binary bytes out. Abstracted as
/// a trait (mirroring `helix_llm::LlmProvider`) so the retry-loop logic
/// in `pipeline.rs` can be exercised against a fake sandbox in tests.
#[async_trait::async_trait]
pub trait CompileSandbox: Send + Sync {
    async fn compile(&self, source: &str) -> BuilderResult<Vec<u8>>;
}

/// Invokes a Dockerized TinyGo toolchain, statically linked for the
/// detected host architecture.
pub struct DockerTinyGoSandbox {
    builder_image: String,
    arch: HostArch,
}

impl DockerTinyGoSandbox {
    pub fn new() -> Self {
        Self { builder_image: TINYGO_IMAGE.to_string(), arch: detect_host_arch() }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.builder_image = image.into();
        self
    }
}

impl Default for DockerTinyGoSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CompileSandbox for DockerTinyGoSandbox {
    async fn compile(&self, source: &str) -> BuilderResult<Vec<u8>> {
        let temp_dir = tempfile::tempdir()?;
        let src_path = temp_dir.path().join("main.go");
        let bin_name = "agent";
        let bin_path = temp_dir.path().join(bin_name);

        tokio::fs::write(&src_path, source).await?;

        let mount = format!("{}:/app", temp_dir.path().display());
        let goarch_flag = format!("GOARCH={}", self.arch.goarch());

        let output = Command::new("docker")
            .args([
                "run",
                "--rm",
                "-v",
                &mount,
                "-w",
                "/app",
                "-e",
                "CGO_ENABLED=0",
                "-e",
                "GOOS=linux",
                "-e",
                &goarch_flag,
                &self.builder_image,
                "tinygo",
                "build",
                "-o",
                bin_name,
                "-no-debug",
                "-ldflags=-extldflags=-static",
                "main.go",
            ])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(BuilderError::CompileFailed(stderr));
        }

        if !bin_path.exists() {
            return Err(BuilderError::CompileFailed("binary created but not found on host".to_string()));
        }

        Ok(tokio::fs::read(&bin_path).await?)
    }
}
