mod config;
mod logging;

use clap::{CommandFactory, Parser, ValueEnum};
use config::{apply_config_to_tlds, config_path, get_default_config_toml, load_config, Config};
use futures::StreamExt;
use libtld_sweep::{
    create_list_client, expand_tlds, fetch_iana_tlds, read_tlds, Display, Enrichment, FaviconHashMode, PoolConfig,
    ProbeConfig, ProbeResult, Prober, RedirectPolicy, Reporter, WorkerPool,
};
use serde::Serialize;
use std::{
    io::{self, IsTerminal, Write},
    path::PathBuf,
    time::Duration,
};
use tracing::{info, warn};

const DEFAULT_THREADS: usize = 50;
const DEFAULT_RATE_LIMIT: usize = 150;
const DEFAULT_MAX_REDIRECTS: usize = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FaviconMode {
    /// Hash the fetched favicon bytes
    Content,
    /// Hash the literal "/favicon.ico" path, as older tooling does
    Path,
}

impl From<FaviconMode> for FaviconHashMode {
    fn from(mode: FaviconMode) -> Self {
        match mode {
            FaviconMode::Content => FaviconHashMode::Content,
            FaviconMode::Path => FaviconHashMode::PathLiteral,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tlds")]
#[command(about = "Probe a name across many TLDs over HTTP", long_about = None)]
struct Args {
    /// Base domain name
    #[arg(short = 'd', long = "domain", help_heading = "INPUT")]
    domain: Option<String>,

    /// File containing TLDs, one per line
    #[arg(short = 'F', long = "tld-file", help_heading = "INPUT", conflicts_with_all = ["tlds", "iana"])]
    tld_file: Option<PathBuf>,

    /// Comma-separated list of TLDs to probe (e.g., com,net,org)
    #[arg(long, value_delimiter = ',', help_heading = "INPUT", conflicts_with = "iana")]
    tlds: Option<Vec<String>>,

    /// Fetch the TLD list from IANA
    #[arg(long, help_heading = "INPUT")]
    iana: bool,

    /// Display IP address of active domains
    #[arg(long, help_heading = "PROBES")]
    ip: bool,

    /// Display status code of domains
    #[arg(long = "status-code", visible_alias = "sc", help_heading = "PROBES")]
    status_code: bool,

    /// Display title of webpages
    #[arg(long, visible_alias = "tl", help_heading = "PROBES")]
    title: bool,

    /// Display hash of the '/favicon.ico' file
    #[arg(long, help_heading = "PROBES")]
    favicon: bool,

    /// What the favicon hash is computed over
    #[arg(long, value_enum, default_value_t = FaviconMode::Path, help_heading = "PROBES")]
    favicon_mode: FaviconMode,

    /// Display response redirect location
    #[arg(long, help_heading = "PROBES")]
    location: bool,

    /// Follow HTTP redirects
    #[arg(long = "follow-redirects", visible_alias = "fr", help_heading = "PROBES")]
    follow_redirects: bool,

    /// Let followed redirects leave the original host
    #[arg(long = "follow-host-redirects", visible_alias = "fhr", help_heading = "PROBES")]
    follow_host_redirects: bool,

    /// Maximum number of redirects to follow per host [default: 10]
    #[arg(long = "max-redirects", visible_alias = "maxr", help_heading = "PROBES")]
    max_redirects: Option<usize>,

    /// Per-probe timeout in seconds [default: 5]
    #[arg(long, help_heading = "PROBES")]
    timeout: Option<u64>,

    /// Output file to store domain status
    #[arg(short = 'o', long, help_heading = "OUTPUT")]
    output: Option<PathBuf>,

    /// Output file to save IP addresses
    #[arg(long = "ip-output", visible_alias = "ipo", help_heading = "OUTPUT")]
    ip_output: Option<PathBuf>,

    /// Output results as NDJSON stream (one JSON object per line)
    #[arg(long, short = 'j', help_heading = "OUTPUT")]
    ndjson: bool,

    /// Maximum number of probes in flight at once [default: 150]
    #[arg(long = "rate-limit", visible_alias = "rl", help_heading = "RATE-LIMIT")]
    rate_limit: Option<usize>,

    /// Number of workers to use [default: 50]
    #[arg(short = 't', long = "threads", help_heading = "RATE-LIMIT")]
    threads: Option<usize>,

    /// Hard ceiling on HTTP requests per second
    #[arg(long = "max-rps", help_heading = "RATE-LIMIT")]
    max_rps: Option<u32>,

    /// Verbose mode to display all domains
    #[arg(short = 'v', long, help_heading = "DEBUG")]
    verbose: bool,

    /// Log probe internals to stderr
    #[arg(long, help_heading = "DEBUG")]
    debug: bool,

    /// Print the default config to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Write the default config to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

impl Args {
    fn has_tld_source(&self) -> bool {
        self.tld_file.is_some() || self.tlds.is_some() || self.iana
    }

    fn display(&self) -> Display {
        Display {
            ip: self.ip,
            status_code: self.status_code,
            title: self.title,
            location: self.location,
            favicon: self.favicon,
            verbose: self.verbose,
        }
    }

    fn timeout(&self, config: &Config) -> Duration {
        let secs = self
            .timeout
            .or(config.probe.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    fn probe_config(&self, config: &Config) -> ProbeConfig {
        ProbeConfig {
            timeout: self.timeout(config),
            redirect: RedirectPolicy {
                follow: self.follow_redirects,
                max_redirects: self
                    .max_redirects
                    .or(config.probe.max_redirects)
                    .unwrap_or(DEFAULT_MAX_REDIRECTS),
                cross_host: self.follow_host_redirects,
            },
            enrichment: Enrichment {
                ip: self.ip,
                title: self.title,
                location: self.location,
                favicon: self.favicon,
            },
            favicon_mode: self.favicon_mode.into(),
            max_requests_per_second: self.max_rps.or(config.probe.max_requests_per_second),
            user_agent: config.probe.user_agent.clone(),
        }
    }

    fn pool_config(&self, config: &Config) -> PoolConfig {
        let workers = self.threads.or(config.probe.threads).unwrap_or(DEFAULT_THREADS);
        let max_in_flight = self
            .rate_limit
            .or(config.probe.rate_limit)
            .unwrap_or(DEFAULT_RATE_LIMIT);
        if workers == 0 || max_in_flight == 0 {
            warn!(workers, max_in_flight, "Zero workers or rate limit; using 1");
        }
        PoolConfig {
            workers,
            max_in_flight,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProbeRecord<'a> {
    domain: &'a str,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    favicon_hash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_hops: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    duration_ms: u128,
}

impl<'a> From<&'a ProbeResult> for ProbeRecord<'a> {
    fn from(result: &'a ProbeResult) -> Self {
        Self {
            domain: &result.domain,
            active: result.active,
            status_code: result.status_code,
            ip: result.ip.as_deref(),
            title: result.title.as_deref(),
            location: result.location.as_deref(),
            favicon_hash: result.favicon_hash.as_deref(),
            redirect: result.redirect.as_ref().map(|r| r.label()),
            redirect_hops: result.redirect.as_ref().map(|r| r.hops()),
            error: result.failure.as_deref(),
            duration_ms: result.duration.as_millis(),
        }
    }
}

async fn load_tlds(args: &Args, config: &Config) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let tlds = if let Some(path) = &args.tld_file {
        read_tlds(path)?
    } else if let Some(list) = &args.tlds {
        list.iter()
            .map(|tld| tld.trim().to_string())
            .filter(|tld| !tld.is_empty())
            .collect()
    } else {
        let client = create_list_client(args.timeout(config), config.probe.user_agent.as_deref())?;
        fetch_iana_tlds(&client).await?
    };
    Ok(apply_config_to_tlds(tlds, config))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(args.debug);

    if args.print_default_config {
        println!("{}", get_default_config_toml());
        return Ok(());
    }

    if args.write_default_config {
        if let Some(path) = config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, get_default_config_toml())?;
            println!("Default config written to: {}", path.display());
        } else {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
        return Ok(());
    }

    let Some(domain) = args.domain.clone() else {
        Args::command().print_help()?;
        return Ok(());
    };
    if !args.has_tld_source() {
        Args::command().print_help()?;
        return Ok(());
    }

    let config = load_config();

    let rt = tokio::runtime::Runtime::new()?;
    if let Err(e) = rt.block_on(run(args, domain, config)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args, domain: String, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let tlds = load_tlds(&args, &config).await?;

    // Everything that can fail fatally happens before the first probe.
    let reporter = Reporter::create(args.display(), args.output.as_deref(), args.ip_output.as_deref())?;
    let mut reporter = if args.ndjson {
        reporter
    } else {
        let styled = io::stdout().is_terminal();
        reporter.with_console(io::stdout(), styled)
    };
    let prober = Prober::with_config(args.probe_config(&config))?;
    let pool = WorkerPool::new(prober, args.pool_config(&config));

    let candidates: Vec<String> = expand_tlds(&domain, &tlds).collect();
    info!(domain = %domain, candidates = candidates.len(), "Starting probe run");

    let mut stream = Box::pin(pool.probe_stream(candidates));
    let mut stdout = io::stdout();
    while let Some(result) = stream.next().await {
        if args.ndjson {
            if let Ok(json) = serde_json::to_string(&ProbeRecord::from(&result)) {
                writeln!(stdout, "{}", json)?;
                stdout.flush()?;
            }
        }
        reporter.report(&result);
    }

    let summary = reporter.finish();
    info!(peak_in_flight = pool.gate().peak(), "Probe run finished");

    if !args.ndjson {
        let mut line = format!(
            "{} probed, {} active, {} inactive",
            summary.total, summary.active, summary.inactive
        );
        if summary.write_failures > 0 {
            line.push_str(&format!(", {} write failures", summary.write_failures));
        }
        eprintln!("{}", line);
    }
    if let Some(path) = &args.output {
        eprintln!("Domains status written to {}", path.display());
    }
    if let Some(path) = &args.ip_output {
        eprintln!("IP addresses saved to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::parse_from(["tlds", "-d", "example", "--tlds", "com"]);
        let config = Config::default();

        let pool = args.pool_config(&config);
        assert_eq!(pool.workers, 50);
        assert_eq!(pool.max_in_flight, 150);

        let probe = args.probe_config(&config);
        assert_eq!(probe.timeout, Duration::from_secs(5));
        assert_eq!(probe.redirect.max_redirects, 10);
        assert!(!probe.redirect.follow);
        assert!(!probe.redirect.cross_host);
        assert_eq!(probe.enrichment, Enrichment::none());
        assert_eq!(probe.favicon_mode, FaviconHashMode::PathLiteral);
    }

    #[test]
    fn short_aliases_are_accepted() {
        let args = Args::parse_from([
            "tlds", "-d", "example", "-F", "tlds.txt", "--sc", "--tl", "--fr", "--fhr", "--maxr", "3",
            "--rl", "7", "-t", "2", "--ipo", "ips.txt", "--favicon-mode", "content",
        ]);
        assert!(args.status_code);
        assert!(args.title);
        assert!(args.follow_redirects);
        assert!(args.follow_host_redirects);
        assert_eq!(args.max_redirects, Some(3));
        assert_eq!(args.rate_limit, Some(7));
        assert_eq!(args.threads, Some(2));
        assert_eq!(args.ip_output, Some(PathBuf::from("ips.txt")));
        assert_eq!(args.favicon_mode, FaviconMode::Content);
    }

    #[test]
    fn command_line_overrides_config_file() {
        let config = config::parse_config("[probe]\nthreads = 8\nrate_limit = 4\nmax_redirects = 2\n").unwrap();

        let args = Args::parse_from(["tlds", "-d", "x", "--iana", "-t", "16"]);
        let pool = args.pool_config(&config);
        assert_eq!(pool.workers, 16);
        assert_eq!(pool.max_in_flight, 4);
        assert_eq!(args.probe_config(&config).redirect.max_redirects, 2);
    }

    #[test]
    fn timeout_comes_from_command_line_then_config() {
        let config = config::parse_config("[probe]\ntimeout_secs = 9\n").unwrap();

        let args = Args::parse_from(["tlds", "-d", "x", "--iana"]);
        assert_eq!(args.timeout(&config), Duration::from_secs(9));
        assert_eq!(args.timeout(&Config::default()), Duration::from_secs(5));

        let args = Args::parse_from(["tlds", "-d", "x", "--iana", "--timeout", "2"]);
        assert_eq!(args.timeout(&config), Duration::from_secs(2));
        assert_eq!(args.probe_config(&config).timeout, Duration::from_secs(2));
    }

    #[test]
    fn tld_sources_conflict() {
        assert!(Args::try_parse_from(["tlds", "-d", "x", "-F", "a.txt", "--iana"]).is_err());
    }

    #[test]
    fn record_skips_absent_fields() {
        let result = ProbeResult::unreachable("example.com", "Timeout", Duration::from_millis(3));
        let json = serde_json::to_string(&ProbeRecord::from(&result)).unwrap();
        assert_eq!(
            json,
            r#"{"domain":"example.com","active":false,"error":"Timeout","duration_ms":3}"#
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
