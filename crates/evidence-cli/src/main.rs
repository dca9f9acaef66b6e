//! GuardSpine webhook evidence CLI
//!
//! ## Commands
//!
//! - `bundle`: build and seal an evidence bundle from a normalized event file
//! - `ingest`: dispatch a raw webhook delivery, then build and seal
//! - `verify`: check a sealed bundle's hashes and chain
//! - `submit`: send a sealed bundle to the import endpoint

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chain_sealer::{verify_import_bundle, HashChainSealer};
use clap::{Parser, Subcommand};
use evidence_core::metrics::METRICS;
use evidence_core::{
    EvidencePipeline, ImportBundle, NormalizedEvent, PipelineConfig, SchemaVersion,
    TracingReporter, WebhookRequest,
};
use import_client::{ImportClient, ImportClientConfig};
use redaction_engines::RegexSanitizer;
use serde::Serialize;
use tracing::{info, Level};
use webhook_providers::{default_handler, ProviderSecrets};

#[derive(Parser)]
#[command(name = "guardspine-webhook")]
#[command(author = "GuardSpine Engineering")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn source-control webhooks into sealed evidence bundles", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that build and seal bundles.
#[derive(clap::Args, Debug, Clone)]
struct SealOptions {
    /// Pipeline config (JSON: riskLabels, riskPaths, defaultRiskTier, saltFingerprint)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Redact secrets and PII with the built-in regex engine before sealing
    #[arg(long)]
    sanitize: bool,

    /// Salt for redaction tokens
    #[arg(long, env = "GUARDSPINE_SANITIZER_SALT", hide_env_values = true)]
    salt: Option<String>,

    /// Model an authority that only accepts schema 0.2.0
    #[arg(long)]
    legacy_authority: bool,

    /// Write the sealed bundle here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and seal a bundle from a normalized event (JSON)
    Bundle {
        /// Path to the event file
        #[arg(short, long)]
        event: PathBuf,

        #[command(flatten)]
        seal: SealOptions,
    },

    /// Dispatch a raw webhook delivery, then build and seal
    Ingest {
        /// Path to the raw request body
        #[arg(short, long)]
        body: PathBuf,

        /// Request header as 'Name: value' (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// GitHub webhook secret
        #[arg(long, env = "GUARDSPINE_GITHUB_SECRET", hide_env_values = true)]
        github_secret: Option<String>,

        /// GitLab webhook token
        #[arg(long, env = "GUARDSPINE_GITLAB_TOKEN", hide_env_values = true)]
        gitlab_token: Option<String>,

        /// Bearer token required by the generic provider
        #[arg(long, env = "GUARDSPINE_GENERIC_TOKEN", hide_env_values = true)]
        generic_token: Option<String>,

        #[command(flatten)]
        seal: SealOptions,
    },

    /// Verify a sealed bundle's item hashes, chain and root hash
    Verify {
        /// Path to the sealed bundle
        #[arg(short, long)]
        bundle: PathBuf,
    },

    /// Submit a sealed bundle to the import endpoint
    Submit {
        /// Path to the sealed bundle
        #[arg(short, long)]
        bundle: PathBuf,

        /// API base URL (default: GUARDSPINE_API_URL)
        #[arg(long)]
        url: Option<String>,

        /// API token (default: GUARDSPINE_API_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Request timeout in milliseconds (default: GUARDSPINE_TIMEOUT_MS or 10000)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    evidence_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Bundle { event, seal } => cmd_bundle(&event, &seal).await,
        Commands::Ingest {
            body,
            headers,
            github_secret,
            gitlab_token,
            generic_token,
            seal,
        } => {
            let secrets = ProviderSecrets {
                github_secret,
                gitlab_token,
                generic_token,
            };
            cmd_ingest(&body, &headers, &secrets, &seal).await
        }
        Commands::Verify { bundle } => cmd_verify(&bundle, cli.json),
        Commands::Submit {
            bundle,
            url,
            token,
            timeout_ms,
        } => cmd_submit(&bundle, url, token, timeout_ms).await,
    };

    METRICS.flush();
    result
}

async fn cmd_bundle(event_path: &Path, opts: &SealOptions) -> Result<()> {
    let event: NormalizedEvent = read_json_file(event_path)?;
    let sealed = build_pipeline(opts)?.process(&event).await?;
    write_bundle(&sealed.import, opts.output.as_deref())
}

async fn cmd_ingest(
    body_path: &Path,
    headers: &[String],
    secrets: &ProviderSecrets,
    opts: &SealOptions,
) -> Result<()> {
    let body = std::fs::read(body_path)
        .with_context(|| format!("Failed to read request body: {}", body_path.display()))?;
    let mut request = WebhookRequest::new(body);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }

    let handler = default_handler(secrets, Arc::new(TracingReporter));
    let event = handler.handle(&request)?;
    info!(provider = %event.provider, event_type = %event.event_type, repo = %event.repo, "webhook accepted");

    let sealed = build_pipeline(opts)?.process(&event).await?;
    write_bundle(&sealed.import, opts.output.as_deref())
}

fn cmd_verify(bundle_path: &Path, json: bool) -> Result<()> {
    let bundle: ImportBundle = read_json_file(bundle_path)?;
    let report = verify_import_bundle(&bundle)
        .with_context(|| format!("Verification failed for {}", bundle_path.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("✓ Bundle {} verified", report.bundle_id);
        println!("  Version:   {}", report.version);
        println!("  Items:     {}", report.items);
        println!("  Root hash: {}", report.root_hash);
    }
    Ok(())
}

async fn cmd_submit(
    bundle_path: &Path,
    url: Option<String>,
    token: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let bundle: ImportBundle = read_json_file(bundle_path)?;

    let mut config = ImportClientConfig::from_env();
    if let Some(url) = url {
        config.base_url = url;
    }
    if let Some(token) = token {
        config.token = Some(token);
    }
    if let Some(ms) = timeout_ms {
        config.timeout_ms = ms;
    }

    let client = ImportClient::new(config).context("Failed to build HTTP client")?;
    let response = client.submit(&bundle).await;
    print_json(&response)?;
    if !response.ok {
        bail!(
            "Import rejected (status {}): {}",
            response.status,
            response.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn build_pipeline(opts: &SealOptions) -> Result<EvidencePipeline> {
    let config = match &opts.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?
            .with_env_overrides(),
        None => PipelineConfig::from_env(),
    };

    let authority = if opts.legacy_authority {
        HashChainSealer::supporting([SchemaVersion::V0_2_0])
    } else {
        HashChainSealer::new()
    };
    let mut pipeline = EvidencePipeline::new(config).with_sealing_authority(Arc::new(authority));

    if opts.sanitize {
        let salt = opts
            .salt
            .as_deref()
            .context("--sanitize needs --salt or GUARDSPINE_SANITIZER_SALT")?;
        let engine = RegexSanitizer::with_default_rules(salt)
            .context("Failed to compile redaction rules")?;
        pipeline = pipeline.with_sanitizer(Arc::new(engine));
    }
    Ok(pipeline)
}

/// Split `Name: value`.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header must look like 'Name: value': {raw}"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Header name is empty: {raw}");
    }
    Ok((name, value.trim()))
}

fn write_bundle(bundle: &ImportBundle, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(bundle)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write bundle: {}", path.display()))?;
            info!(bundle_id = %bundle.bundle_id, path = %path.display(), "sealed bundle written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-GitHub-Event: push").unwrap(),
            ("X-GitHub-Event", "push")
        );
        assert_eq!(
            parse_header("Authorization:Bearer a:b").unwrap(),
            ("Authorization", "Bearer a:b")
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[tokio::test]
    async fn test_bundle_then_verify_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let event_path = dir.path().join("event.json");
        let bundle_path = dir.path().join("bundle.json");
        let mut f = std::fs::File::create(&event_path).unwrap();
        write!(
            f,
            r#"{{"provider":"generic","event_type":"push","repo":"acme/api","pr_number":null,
                "sha":"deadbeef12345678","diff_url":null,"author":"dev","labels":[],
                "changed_files":[],"action":null,"timestamp":"2026-01-01T00:00:00Z",
                "raw_payload":null}}"#
        )
        .unwrap();

        let opts = SealOptions {
            config: None,
            sanitize: false,
            salt: None,
            legacy_authority: true,
            output: Some(bundle_path.clone()),
        };
        cmd_bundle(&event_path, &opts).await.unwrap();

        let bundle: ImportBundle = read_json_file(&bundle_path).unwrap();
        assert_eq!(bundle.version, SchemaVersion::V0_2_0);
        assert_eq!(bundle.items.len(), 1);
        cmd_verify(&bundle_path, true).unwrap();
    }
}
