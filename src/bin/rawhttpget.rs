use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter, Log, Metadata, Record};

use rawhttpget::channel::DEFAULT_POLL_INTERVAL;
use rawhttpget::config::DEFAULT_SYN_RETRIES;
use rawhttpget::{
    build_get_request, local_ipv4_for, output_file_name, split_response, HttpGetTransfer,
    HttpTarget, PnetChannel, RngSource, TransferConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "rawhttpget",
    about = "Download one HTTP resource over a user-space TCP stack on a raw socket"
)]
struct Args {
    /// http:// URL to fetch
    url: String,

    /// Output file (default: last path segment of the URL, or index.html)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Seconds without a segment before the transfer is abandoned
    #[arg(long, value_name = "SECS", default_value_t = 180)]
    timeout: u64,

    /// SYN retransmissions before giving up on the handshake
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SYN_RETRIES)]
    syn_retries: u32,

    /// Drop inbound segments with a bad TCP checksum
    #[arg(long, action = clap::ArgAction::SetTrue)]
    verify_checksums: bool,

    /// Only acknowledge the handshake and the FIN, not each data segment
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_ack_data: bool,

    /// Write whatever arrived if the transfer stops early
    #[arg(long, action = clap::ArgAction::SetTrue)]
    keep_partial: bool,

    /// Write the full response, headers included
    #[arg(long, action = clap::ArgAction::SetTrue)]
    raw: bool,

    /// More output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[rawhttpget] {} {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    log::set_logger(&LOGGER).map_err(|e| anyhow!("cannot install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}

fn resolve_ipv4(host: &str, port: u16) -> Result<Ipv4Addr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve {}", host))?
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| anyhow!("{} has no IPv4 address", host))
}

fn write_response(path: &Path, response: &[u8], raw: bool) -> Result<()> {
    let data = if raw {
        response
    } else {
        let parsed = split_response(response).context("Malformed HTTP response")?;
        if parsed.status != 200 {
            bail!("Server answered with status {}", parsed.status);
        }
        parsed.body
    };

    fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("saved {} bytes to {}", data.len(), path.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let target = HttpTarget::parse(&args.url)?;
    let remote_ip = resolve_ipv4(&target.host, target.port)?;
    let local_ip = local_ipv4_for(remote_ip)
        .with_context(|| format!("No route to {}", remote_ip))?;

    let cfg = TransferConfig {
        idle_timeout: Duration::from_secs(args.timeout),
        syn_retries: args.syn_retries,
        ack_data: !args.no_ack_data,
        verify_checksums: args.verify_checksums,
        ..TransferConfig::default()
    };

    let channel = PnetChannel::open(cfg.recv_buffer_len, DEFAULT_POLL_INTERVAL)
        .context("Failed to open raw socket (root or CAP_NET_RAW required)")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(output_file_name(&target.path)));
    let request = build_get_request(&target);

    let mut transfer = HttpGetTransfer::new(
        channel,
        RngSource::from_entropy(),
        cfg,
        local_ip,
        SocketAddrV4::new(remote_ip, target.port),
    );

    match transfer.run(&request) {
        Ok(response) => write_response(&output, &response, args.raw),
        Err(e) => {
            if args.keep_partial {
                if let Some(partial) = e.partial_response() {
                    fs::write(&output, partial)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    warn!(
                        "saved {} partial bytes to {}",
                        partial.len(),
                        output.display()
                    );
                }
            }
            Err(e).with_context(|| format!("GET {} failed", args.url))
        }
    }
}
