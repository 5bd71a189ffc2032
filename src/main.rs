//! CLI entrypoint (SPEC_FULL.md §4.11, §6): argument parsing, single-URL and
//! batch (line-file) driving, obfuscated-URL normalization, and stdout
//! progress reporting through the `[TAG]` taxonomy in §6.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gatecapture::{
    all_gates, BaseProfileCatalog, BrowserEngine, CountryGeoTable, DynamicResolver, Orchestrator,
    SessionOptions, SessionRunner, TemplateLoader, UaCatalog, ZoneTable,
};

/// Fingerprint-coherent browser capture engine.
#[derive(Parser, Debug)]
#[command(name = "gatecapture", version, about)]
struct Cli {
    /// Target URL, or a path to a newline-delimited file of URLs.
    target: String,

    /// ISO 3166-1 alpha-2 country code driving geolocation/timezone selection.
    #[arg(long)]
    country: Option<String>,

    /// BCP 47-ish primary language tag, e.g. `en-US`.
    #[arg(long)]
    lang: Option<String>,

    /// UA catalog selector, `"<OS>;;<Browser>"` (mutually exclusive with `--ua-full`).
    #[arg(long)]
    ua: Option<String>,

    /// Verbatim `User-Agent` header, bypassing catalog selection.
    #[arg(long)]
    ua_full: Option<String>,

    /// `socks5://host:port` or `http://host:port`.
    #[arg(long, env = "GATECAPTURE_PROXY")]
    proxy: Option<String>,

    /// `referer` header to send on every request.
    #[arg(long)]
    referrer: Option<String>,

    /// `auto` (heuristic from UA) or `chromium` (forced); non-Chromium engine
    /// tags are accepted for gate-contract compatibility and resolve to the
    /// engine-neutral capture path.
    #[arg(long, default_value = "auto")]
    engine: String,

    /// Hard outer deadline for the whole session. Defaults to 24h in
    /// interactive mode, 30s otherwise.
    #[arg(long, env = "GATECAPTURE_TIMEOUT")]
    timeout_sec: Option<u64>,

    /// Launch with a visible window instead of headless.
    #[arg(long)]
    headful: bool,

    /// Keep the page open and dwell until it is closed, instead of capturing
    /// once and exiting.
    #[arg(long)]
    interactive: bool,

    /// Root directory captures are written under.
    #[arg(long, env = "GATECAPTURE_OUTPUT_DIR", default_value = "captures")]
    output_dir: PathBuf,

    #[arg(long, env = "GATECAPTURE_VERBOSE")]
    verbose: bool,

    /// Emit a narrower one-line-per-completion summary instead of the full
    /// `[TAG]` event stream.
    #[arg(long)]
    plain_progress: bool,

    /// Override the bundled static-data directory (`country_geo.csv`,
    /// `user-agents.json`, `zone.tab`, `base_profiles.json`).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the bundled JS patch template directory.
    #[arg(long)]
    js_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets").join("data")
}

fn default_js_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets").join("js")
}

fn parse_engine(raw: &str) -> anyhow::Result<BrowserEngine> {
    match raw {
        "auto" => Ok(BrowserEngine::Auto),
        "chromium" | "standard" => Ok(BrowserEngine::Standard),
        "stealth-a" | "patchright" => Ok(BrowserEngine::StealthA),
        "stealth-b" | "camoufox" => Ok(BrowserEngine::StealthB),
        other => anyhow::bail!("unknown --engine value: {other}"),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "gatecapture=debug,info" } else { "gatecapture=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = parse_engine(&cli.engine)?;

    let targets: Vec<String> = {
        let as_path = PathBuf::from(&cli.target);
        if as_path.is_file() {
            let contents = tokio::fs::read_to_string(&as_path)
                .await
                .with_context(|| format!("reading url list {}", as_path.display()))?;
            gatecapture::urlnorm::read_url_list(&contents)
        } else {
            vec![gatecapture::urlnorm::normalize(&cli.target)]
        }
    };
    if targets.is_empty() {
        anyhow::bail!("no target URLs given");
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let js_dir = cli.js_dir.clone().unwrap_or_else(default_js_dir);

    let ua_catalog = UaCatalog::load(&data_dir.join("user-agents.json"))
        .with_context(|| "loading user-agents.json")?;
    let country_geo =
        CountryGeoTable::load(&data_dir.join("country_geo.csv")).with_context(|| "loading country_geo.csv")?;
    let zone_table = ZoneTable::load(&data_dir.join("zone.tab")).with_context(|| "loading zone.tab")?;
    let base_profiles =
        BaseProfileCatalog::load(&data_dir.join("base_profiles.json")).with_context(|| "loading base_profiles.json")?;
    let templates = Arc::new(TemplateLoader::new(js_dir)?);

    let mut exit_code = 0;
    for url in targets {
        let timeout_sec = cli
            .timeout_sec
            .unwrap_or(if cli.interactive { 24 * 3600 } else { 30 });

        let options = SessionOptions {
            url,
            country: cli.country.clone(),
            lang: cli.lang.clone(),
            ua_selector: cli.ua.clone(),
            ua_full: cli.ua_full.clone(),
            proxy: cli.proxy.clone().map(|uri| gatecapture::plan::ProxyConfig { uri }),
            engine,
            timeout_sec,
            headless: !cli.headful,
            output_dir: cli.output_dir.clone(),
            verbose: cli.verbose,
            plain_progress: cli.plain_progress,
            referrer: cli.referrer.clone(),
        };

        if let Err(e) = options.validate() {
            tracing::error!(error = %e, "[ERROR] invalid configuration, skipping url");
            exit_code = 1;
            continue;
        }

        let resolver = DynamicResolver {
            ua_catalog: &ua_catalog,
            country_geo: &country_geo,
            zone_table: &zone_table,
            base_profiles: &base_profiles,
        };
        let orchestrator = Orchestrator::new(all_gates(), templates.clone());
        let runner = SessionRunner { resolver, orchestrator, http_client: reqwest::Client::new() };

        tracing::info!(url = %options.url, "[INFO] starting capture");
        match runner.run(&options, cli.interactive).await {
            Ok(()) => {
                if cli.plain_progress {
                    println!("done {}", options.url);
                } else {
                    tracing::info!(url = %options.url, "[INFO] capture finished");
                }
            }
            Err(e) => {
                tracing::error!(url = %options.url, error = %e, "[ERROR] session failed");
                exit_code = 1;
            }
        }
    }

    std::process::exit(exit_code);
}
