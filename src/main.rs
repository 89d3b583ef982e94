use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use loadout::cache::{HttpTransport, IntegrityCache};
use loadout::config::Config;
use loadout::error::{LoadoutError, Result};
use loadout::manifest::load_manifest;
use loadout::probe::EnvironmentProbe;
use loadout::select::select_variant;
use loadout::{hub, manifest::Manifest};

#[derive(Parser)]
#[command(name = "loadout")]
#[command(about = "Capability-aware model variant selection and caching", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected capability profile
    Probe,
    /// Fetch a manifest and list its bases and variants
    Manifest {
        /// Manifest URL (falls back to config)
        url: Option<String>,
    },
    /// Resolve a base to its best-fit variant and fetch it through the cache
    Fetch {
        /// Base id from the manifest
        base: String,
        /// Pin a specific variant id instead of selecting one
        #[arg(long)]
        variant: Option<String>,
        /// Manifest URL (falls back to config)
        #[arg(long)]
        manifest: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Probe => run_probe(&config),
        Commands::Manifest { url } => run_manifest(&config, url).await,
        Commands::Fetch {
            base,
            variant,
            manifest,
        } => run_fetch(&config, &base, variant.as_deref(), manifest).await,
    }
}

fn run_probe(config: &Config) -> Result<()> {
    let profile = EnvironmentProbe::new(config.probe.clone()).detect();

    println!("Accelerator:      {}", profile.has_accelerator);
    println!("Portable runtime: {}", profile.has_portable_runtime);
    println!("SIMD:             {}", profile.simd_supported);
    println!("Threads:          {}", profile.thread_count);
    if profile.approx_memory_budget_mb > 0 {
        println!("Memory budget:    ~{} MB (heuristic)", profile.approx_memory_budget_mb);
    } else {
        println!("Memory budget:    unknown");
    }
    Ok(())
}

fn manifest_url(config: &Config, arg: Option<String>) -> Result<String> {
    arg.or_else(|| config.manifest.url.clone()).ok_or_else(|| {
        LoadoutError::Config(
            "No manifest URL given and none set under [manifest] in config".to_string(),
        )
    })
}

async fn fetch_manifest(config: &Config, arg: Option<String>) -> Result<Manifest> {
    let url = manifest_url(config, arg)?;
    let transport = HttpTransport::new();
    load_manifest(&transport, &url).await
}

async fn run_manifest(config: &Config, url: Option<String>) -> Result<()> {
    let manifest = fetch_manifest(config, url).await?;

    println!("Manifest version {}", manifest.version);
    for base in &manifest.bases {
        println!("  {} (tokenizer: {})", base.id, base.tokenizer.repo);
        for v in &base.variants {
            let providers: Vec<String> = v
                .providers
                .iter()
                .map(|p| format!("{p:?}").to_lowercase())
                .collect();
            println!(
                "    {} [{:?}, {}]{}",
                v.id,
                v.precision,
                providers.join("+"),
                v.sha256.as_deref().map(|_| " ✓sha256").unwrap_or("")
            );
        }
    }
    Ok(())
}

async fn run_fetch(
    config: &Config,
    base_id: &str,
    variant_id: Option<&str>,
    manifest_arg: Option<String>,
) -> Result<()> {
    let manifest = fetch_manifest(config, manifest_arg).await?;
    let base = manifest
        .find_base(base_id)
        .ok_or_else(|| LoadoutError::NotFound(format!("Unknown base '{base_id}' in manifest")))?;

    let profile = EnvironmentProbe::new(config.probe.clone()).detect();
    let variant = match variant_id {
        Some(id) => base
            .variants
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| {
                LoadoutError::NotFound(format!("Variant '{id}' not found in base '{base_id}'"))
            })?,
        None => select_variant(&profile, &base.variants)?,
    };

    println!("Selected variant '{}' ({:?})", variant.id, variant.precision);

    let cache = IntegrityCache::new(
        &config.cache_dir()?,
        &config.cache.bucket,
        HttpTransport::new(),
    )?;

    let url = hub::variant_url(&config.hub.root, variant);
    let token = config.hub_token();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .map_err(|e| LoadoutError::Config(format!("Invalid progress template: {e}")))?,
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(format!("Fetching {}", variant.path));

    let bytes = cache
        .fetch(&url, token.as_deref(), variant.sha256.as_deref())
        .await?;

    pb.finish_with_message(format!("Fetched {}", variant.path));
    println!("✓ {} bytes verified and cached", bytes.len());
    Ok(())
}
