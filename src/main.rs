use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use qcdm_lib::collector::{DmCollector, ReceiveOptions, generate_diag_cfg};
use qcdm_lib::hdlc::encode_frame;
use qcdm_lib::port::DiagPort;
use qcdm_lib::{VERSION, catalog};

/// Offline tooling for Qualcomm DIAG (QCDM) log streams.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Optional path to a file to write logs to, in addition to stderr.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every log type name with its type ids.
    Types,
    /// Write a Diag.cfg file enabling the given log types.
    ExportCfg {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the HDLC frame for a hex-encoded payload.
    Frame { hex: String },
    /// Decode a raw capture of the diagnostic port into JSON lines.
    Decode {
        input: PathBuf,
        /// Keep payloads as hex instead of running decoders.
        #[arg(long)]
        skip_decoding: bool,
        /// Attach the host time each packet was retrieved.
        #[arg(long)]
        timestamps: bool,
        #[arg(long, default_value_t = 4096)]
        chunk_size: usize,
    },
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    // stdout carries command output
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file, &cli.verbose)?;
    debug!(version = VERSION, "qcdm-lib");

    match cli.command {
        Command::Types => list_types(),
        Command::ExportCfg { output, names } => export_cfg(output, &names),
        Command::Frame { hex } => print_frame(&hex),
        Command::Decode {
            input,
            skip_decoding,
            timestamps,
            chunk_size,
        } => decode_capture(
            input,
            ReceiveOptions {
                skip_decoding,
                include_timestamp: timestamps,
            },
            chunk_size,
        ),
    }
}

fn list_types() -> Result<()> {
    let mut out = io::stdout().lock();
    for name in catalog().names() {
        let ids = catalog().find_ids(name)?;
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        writeln!(out, "{:<48} {}", name, ids.join(" "))?;
    }
    Ok(())
}

fn export_cfg(output: PathBuf, names: &[String]) -> Result<()> {
    // Build the whole image in memory so an unknown name leaves no file behind
    let mut image = Vec::new();
    generate_diag_cfg(&mut image, names).context("Failed to build log config")?;

    let mut file = BufWriter::new(File::create(&output).with_context(|| format!("Failed to create {:?}", output))?);
    file.write_all(&image)?;
    file.flush()?;
    info!("Wrote {} bytes to {:?}", image.len(), output);
    Ok(())
}

fn print_frame(payload_hex: &str) -> Result<()> {
    let payload = hex::decode(payload_hex.trim()).context("Payload is not valid hex")?;
    println!("{}", hex::encode(encode_frame(&payload)));
    Ok(())
}

fn decode_capture(input: PathBuf, options: ReceiveOptions, chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }
    let file = File::open(&input).with_context(|| format!("Failed to open capture {:?}", input))?;
    let mut port = DiagPort::read_only(file);
    let mut collector = DmCollector::new();
    let mut out = io::stdout().lock();
    let mut buf = vec![0u8; chunk_size];

    loop {
        let n = port
            .read_bytes(&mut buf)
            .with_context(|| format!("Failed to read capture {:?}", input))?;
        if n == 0 {
            break;
        }
        collector.feed_binary(&buf[..n]);
        while let Some(packet) = collector.receive_log_packet(options) {
            serde_json::to_writer(&mut out, &packet)?;
            writeln!(out)?;
        }
    }

    let stats = collector.stats();
    info!(
        frames = stats.frames,
        log_packets = stats.log_packets,
        debug_packets = stats.debug_packets,
        crc_failures = stats.crc_failures,
        unrecognized = stats.unrecognized,
        dropped = stats.dropped,
        "Capture decoded"
    );
    if collector.pending_bytes() > 0 {
        warn!("{} trailing bytes without a closing flag", collector.pending_bytes());
    }
    Ok(())
}
