//! helix — autonomous agent factory and dispatcher.
//!
//! Usage:
//!   helix run <task>              → resolve or build an agent and execute it
//!   helix search <task>           → query the unified registry, no build
//!   helix build <task>            → force a fresh build, skipping cache/search
//!   helix memory stats            → episodic/semantic counts, encryption status
//!   helix memory lifecycle        → force a lifecycle sweep
//!   helix memory cleanup          → run the 30-day retention sweep

use clap::{Parser, Subcommand};
use helix::config::Config;
use helix::orchestrator::Orchestrator;
use helix_builder::compile::DockerTinyGoSandbox;
use helix_builder::package::DockerPackager;
use helix_builder::verify::DockerVerifier;
use helix_builder::wasm_build::DockerWasmSandbox;
use helix_builder::BuildPipeline;
use helix_executor::Executor;
use helix_llm::{HttpProvider, LlmProvider, ModelRouter};
use helix_memory::MemoryManager;
use helix_registry::{ContainerRegistry, WasmRegistry};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "helix", about = "Autonomous agent factory and dispatcher", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve or build an agent for a task, then run it
    Run { task: Vec<String> },
    /// Query the unified registry only, without building
    Search { task: Vec<String> },
    /// Force a fresh build, skipping the registry and memory cache
    Build { task: Vec<String> },
    /// Memory tier introspection and maintenance
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Episodic/semantic counts and encryption status
    Stats,
    /// Force a lifecycle sweep now, bypassing the 5-minute interval
    Lifecycle,
    /// Run the 30-day retention cleanup
    Cleanup,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "helix=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env();

    let memory = Arc::new(MemoryManager::open_with_buffer_minutes(config.memory_db_path.clone(), "helix-cli", config.memory_buffer_minutes)?);
    let registry = Arc::new(build_registry(&config));

    match cli.command {
        Commands::Run { task } => {
            let task_text = task.join(" ");
            let pipeline = Arc::new(build_pipeline(&config, Some(memory.clone())));
            let executor = Arc::new(Executor::new());
            let orchestrator = Orchestrator::new(registry, memory, pipeline, executor, config.max_concurrent_builds);
            let outcome = orchestrator.run(&config, &task_text).await;

            if !outcome.stdout.is_empty() {
                println!("{}", outcome.stdout);
            }
            if !outcome.stderr.is_empty() {
                eprintln!("{}", outcome.stderr);
            }
            if outcome.exit_code != 0 {
                std::process::exit(1);
            }
        }
        Commands::Search { task } => {
            let task_text = task.join(" ");
            match registry.search(&task_text).await {
                Some(candidate) => {
                    println!("{} ({:?}) score={:.2} reference={}", candidate.name, candidate.runtime, candidate.score, candidate.reference);
                }
                None => println!("no match found for: {}", task_text),
            }
        }
        Commands::Build { task } => {
            let task_text = task.join(" ");
            let pipeline = build_pipeline(&config, Some(memory.clone()));
            match pipeline.create(&task_text).await {
                Ok(outcome) => println!("built {} ({:?}) class={}", outcome.reference, outcome.runtime, outcome.class),
                Err(e) => {
                    eprintln!("build failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Memory { action } => match action {
            MemoryAction::Stats => {
                let stats = memory.get_stats()?;
                println!("episodic={} semantic={} encrypted={}", stats.episodic_count, stats.semantic_count, stats.encrypted);
            }
            MemoryAction::Lifecycle => match memory.run_lifecycle()? {
                Some(stats) => println!(
                    "evaluated={} promoted={} demoted={} archived={} deleted={}",
                    stats.evaluated, stats.promoted, stats.demoted, stats.archived, stats.deleted
                ),
                None => println!("lifecycle interval not yet elapsed"),
            },
            MemoryAction::Cleanup => {
                let stats = memory.run_cleanup()?;
                println!("{:?}", stats);
            }
        },
    }

    Ok(())
}

fn build_registry(config: &Config) -> helix_registry::UnifiedRegistry {
    let container = ContainerRegistry::new(&config.registry_url);
    let wasm = WasmRegistry::new(config.wasm_registry_root.clone()).expect("failed to initialize wasm registry root");
    helix_registry::UnifiedRegistry::new(container, wasm)
}

fn build_pipeline(config: &Config, memory: Option<Arc<MemoryManager>>) -> BuildPipeline {
    let provider: Arc<dyn LlmProvider> = match &config.llm_api_key {
        Some(key) => Arc::new(HttpProvider::new(key.clone(), config.llm_endpoint.clone(), config.llm_models.split(',').map(|m| m.trim().to_string()).collect())),
        None => Arc::new(helix_llm::MockProvider::new()),
    };
    let router = Arc::new(ModelRouter::from_preference_list(provider, &config.llm_models));

    let wasm_registry = Arc::new(WasmRegistry::new(config.wasm_registry_root.clone()).expect("failed to initialize wasm registry root"));

    let pipeline = BuildPipeline::new(router, Arc::new(DockerTinyGoSandbox::new()), Arc::new(DockerPackager::new(config.registry_url.clone())), Arc::new(DockerVerifier))
        .with_wasm_backend(Arc::new(DockerWasmSandbox::new()), wasm_registry);

    match memory {
        Some(memory) => pipeline.with_memory(memory),
        None => pipeline,
    }
}
