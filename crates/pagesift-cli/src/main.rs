use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pagesift_client::{ProviderAnalyzer, ReqwestFetcher};
use pagesift_core::config::{AiConfig, ExtractConfig, FetchConfig, SecurityConfig};
use pagesift_core::guard;
use pagesift_core::service::{AnalysisService, SourceSpec};

#[derive(Parser)]
#[command(name = "pagesift", version, about = "AI-scored findings from arbitrary web pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page, extract items, and score them against a query
    Analyze {
        /// Target URL to analyze
        #[arg(short, long)]
        url: String,

        /// Natural-language query to score items against (repeatable)
        #[arg(short, long, required = true)]
        prompt: Vec<String>,

        /// CSS selector targeting item nodes
        #[arg(short, long)]
        selector: Option<String>,

        /// AI provider: openai or gemini
        #[arg(long, env = "PAGESIFT_AI_PROVIDER", default_value = "openai")]
        provider: String,

        /// Model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
        #[arg(short, long, env = "PAGESIFT_AI_MODEL")]
        model: String,

        /// Provider API key
        #[arg(short, long, env = "PAGESIFT_AI_API_KEY")]
        api_key: String,

        /// Override the provider API base URL
        #[arg(long, env = "PAGESIFT_AI_BASE_URL")]
        base_url: Option<String>,

        /// Allow plain http URLs
        #[arg(long, default_value_t = false)]
        allow_http: bool,
    },

    /// Run only the URL guard and report the decision
    CheckUrl {
        /// URL to evaluate
        #[arg(short, long)]
        url: String,

        /// Allow plain http URLs
        #[arg(long, default_value_t = false)]
        allow_http: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagesift=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            url,
            prompt,
            selector,
            provider,
            model,
            api_key,
            base_url,
            allow_http,
        } => {
            cmd_analyze(
                &url, &prompt, selector, &provider, &model, &api_key, base_url, allow_http,
            )
            .await?;
        }
        Commands::CheckUrl { url, allow_http } => {
            cmd_check_url(&url, allow_http)?;
        }
    }

    Ok(())
}

fn security_config(allow_http: bool) -> Result<SecurityConfig> {
    let mut security = SecurityConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    if allow_http {
        security.enforce_https = false;
    }
    Ok(security)
}

#[allow(clippy::too_many_arguments)]
async fn cmd_analyze(
    url: &str,
    prompts: &[String],
    selector: Option<String>,
    provider: &str,
    model: &str,
    api_key: &str,
    base_url: Option<String>,
    allow_http: bool,
) -> Result<()> {
    let ai_config = AiConfig {
        provider: provider.to_lowercase(),
        model: model.to_string(),
        api_key: api_key.to_string(),
        base_url,
        ..AiConfig::default()
    };

    let fetcher = ReqwestFetcher::new(FetchConfig::from_env().map_err(|e| anyhow::anyhow!(e))?)
        .context("Failed to create HTTP client")?;
    let analyzer =
        ProviderAnalyzer::from_config(&ai_config).context("Failed to create AI analyzer")?;
    let service = AnalysisService::new(
        fetcher,
        analyzer,
        security_config(allow_http)?,
        ExtractConfig::from_env().map_err(|e| anyhow::anyhow!(e))?,
    );

    let source = SourceSpec {
        url: url.to_string(),
        selector,
        ..SourceSpec::default()
    };

    tracing::info!("Analyzing {} against {} prompt(s)", url, prompts.len());

    let parsed = service
        .parse_page(&source)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Extracted {} item(s)", parsed.items.len());

    let outcomes = service.analyze_all(&parsed.items, prompts).await;

    let mut rendered = Vec::with_capacity(outcomes.len());
    for (prompt, outcome) in prompts.iter().zip(outcomes) {
        let analysis = outcome.map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("'{}': {} match(es)", prompt, analysis.matches.len());
        rendered.push(serde_json::json!({
            "prompt": prompt,
            "matches": analysis.matches,
            "metadata": analysis.metadata,
        }));
    }

    let output = serde_json::json!({
        "results": rendered,
        "source_info": parsed.source_info,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_check_url(url: &str, allow_http: bool) -> Result<()> {
    match guard::evaluate(url, &security_config(allow_http)?) {
        Ok(decision) => {
            println!(
                "{}",
                serde_json::json!({
                    "allowed": true,
                    "origin": decision.origin,
                    "host": decision.host,
                    "scheme": decision.scheme,
                    "href": decision.href,
                })
            );
            Ok(())
        }
        Err(err) => {
            println!(
                "{}",
                serde_json::json!({ "allowed": false, "reason": err.to_string() })
            );
            std::process::exit(1);
        }
    }
}
