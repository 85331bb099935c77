//! Package stage: builds and pushes a minimal single-layer container
//! image. Grounded on `original_source/builder/dockerizer.py::Dockerizer`.

use crate::error::{BuilderError, BuilderResult};
use helix_registry::AgentLabels;
use std::os::unix::fs::PermissionsExt;
use tokio::process::Command;

/// Packages a compiled binary as a container image and pushes it.
/// Abstracted as a trait so `pipeline.rs`'s package+verify retry loop can
/// be exercised against a fake packager in tests.
#[async_trait::async_trait]
pub trait Packager: Send + Sync {
    async fn package(&self, binary: &[u8], image_name: &str, labels: &AgentLabels) -> BuilderResult<String>;
}

pub struct DockerPackager {
    registry_url: String,
}

impl DockerPackager {
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self { registry_url: registry_url.into() }
    }
}

#[async_trait::async_trait]
impl Packager for DockerPackager {
    async fn package(&self, binary: &[u8], image_name: &str, labels: &AgentLabels) -> BuilderResult<String> {
        let temp_dir = tempfile::tempdir()?;
        let agent_path = temp_dir.path().join("agent");
        tokio::fs::write(&agent_path, binary).await?;
        tokio::fs::set_permissions(&agent_path, std::fs::Permissions::from_mode(0o755)).await?;

        let dockerfile = render_dockerfile(labels);
        tokio::fs::write(temp_dir.path().join("Dockerfile"), dockerfile).await?;

        let full_tag = format!("{}/{}:latest", self.registry_url.trim_end_matches('/'), image_name);

        let build = Command::new("docker")
            .args(["build", "-t", &full_tag, &temp_dir.path().display().to_string()])
            .output()
            .await?;
        if !build.status.success() {
            return Err(BuilderError::PackageFailed(String::from_utf8_lossy(&build.stderr).to_string()));
        }

        let push = Command::new("docker").args(["push", &full_tag]).output().await?;
        if !push.status.success() {
            return Err(BuilderError::PackageFailed(String::from_utf8_lossy(&push.stderr).to_string()));
        }

        Ok(full_tag)
    }
}

fn render_dockerfile(labels: &AgentLabels) -> String {
    format!(
        "FROM gcr.io/distroless/static:nonroot\n\
         WORKDIR /\n\
         COPY agent /agent\n\
         LABEL helix.task=\"{}\"\n\
         LABEL helix.capabilities=\"{}\"\n\
         LABEL helix.type=\"{}\"\n\
         LABEL helix.created=\"{}\"\n\
         LABEL helix.author=\"{}\"\n\
         ENTRYPOINT [\"/agent\"]\n",
        escape(&labels.task),
        escape(&labels.capabilities),
        escape(&labels.agent_type),
        escape(&labels.created),
        escape(&labels.author),
    )
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `helix-<class>-<unix-seconds>`, matching spec.md §6 "Image labels".
pub fn agent_name(class: helix_core::AgentClass, unix_seconds: i64) -> String {
    format!("helix-{}-{}", class, unix_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_name_matches_naming_convention() {
        let name = agent_name(helix_core::AgentClass::Compute, 1_700_000_000);
        assert_eq!(name, "helix-compute-1700000000");
    }

    #[test]
    fn dockerfile_carries_all_five_labels() {
        let labels = AgentLabels {
            task: "sum two numbers".to_string(),
            capabilities: "compute".to_string(),
            agent_type: "compute".to_string(),
            created: "2026-01-01T00:00:00Z".to_string(),
            author: "helix".to_string(),
        };
        let dockerfile = render_dockerfile(&labels);
        for label in ["helix.task", "helix.capabilities", "helix.type", "helix.created", "helix.author"] {
            assert!(dockerfile.contains(label), "missing label {}", label);
        }
        assert!(dockerfile.contains("ENTRYPOINT"));
    }

    #[test]
    fn dockerfile_escapes_quotes_in_task_text() {
        let labels = AgentLabels {
            task: "say \"hello\"".to_string(),
            capabilities: String::new(),
            agent_type: String::new(),
            created: String::new(),
            author: String::new(),
        };
        let dockerfile = render_dockerfile(&labels);
        assert!(dockerfile.contains("say \\\"hello\\\""));
    }
}
