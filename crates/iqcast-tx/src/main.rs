//! iqcast-tx — stream raw float IQ captures into an SDR transmit pipeline
//!
//! Reads interleaved little-endian `f32` I/Q pairs from a file or stdin,
//! applies soft gain and optional AGC, converts to the SC16 Q11 device
//! format through a bounded ring buffer, and feeds a transmit backend:
//! a bladeRF (with the `bladerf` feature) or a raw file sink (`--output`).
//!
//! Ctrl-C requests a stop; the pipeline drains its threads and joins them
//! before exit.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use iqcast_core::device::{FileSink, TxBackend};
use iqcast_core::pipeline::{Phase, Pipeline, TxFeeder};
use iqcast_core::source;

use config::ToolConfig;

#[derive(Parser, Debug)]
#[command(name = "iqcast-tx", version, about = "Stream raw float IQ captures into an SDR transmit pipeline")]
struct Args {
    /// Raw IQ capture (interleaved little-endian f32 pairs); stdin when
    /// omitted or "-"
    input: Option<PathBuf>,

    /// Write device-format samples to a file ("-" = stdout) instead of
    /// transmitting
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Device identifier (empty = first device found)
    #[arg(short = 'd', long)]
    device: Option<String>,

    /// TX center frequency in Hz
    #[arg(short = 'f', long)]
    frequency: Option<u64>,

    /// TX sample rate in samples per second
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,

    /// TX LPF bandwidth in Hz (0 = 3/4 of the sample rate)
    #[arg(short = 'b', long)]
    bandwidth: Option<u32>,

    /// TXVGA1 gain in dB
    #[arg(short = 'g', long, allow_negative_numbers = true)]
    txvga1: Option<i32>,

    /// TXVGA2 gain in dB
    #[arg(short = 'G', long, allow_negative_numbers = true)]
    txvga2: Option<i32>,

    /// Initial soft gain (linear)
    #[arg(short = 'm', long)]
    gain: Option<f32>,

    /// AGC magnitude ceiling (0 disables AGC)
    #[arg(short = 'a', long)]
    agc_ceiling: Option<f32>,

    /// Ring capacity in blocks (power of two)
    #[arg(short = 'p', long)]
    ring_blocks: Option<usize>,

    /// IQ sample pairs per block
    #[arg(short = 's', long)]
    block_samples: Option<usize>,

    /// Number of device-side sample buffers
    #[arg(short = 'n', long)]
    device_buffers: Option<u32>,

    /// Maximum in-flight transfers (0 = half the device buffers)
    #[arg(short = 't', long)]
    transfers: Option<u32>,

    /// Chunk size in bytes for input read calls
    #[arg(short = 'R', long)]
    read_chunk: Option<usize>,

    /// Alternate config file path
    #[arg(long)]
    config: Option<PathBuf>,
}

/// CLI flags override whatever the config file provided
fn apply_overrides(config: &mut ToolConfig, args: &Args) {
    if let Some(v) = &args.device {
        config.device.device_id = v.clone();
    }
    if let Some(v) = args.frequency {
        config.device.frequency_hz = v;
    }
    if let Some(v) = args.sample_rate {
        config.device.sample_rate = v;
    }
    if let Some(v) = args.bandwidth {
        config.device.bandwidth_hz = v;
    }
    if let Some(v) = args.txvga1 {
        config.device.txvga1_db = v;
    }
    if let Some(v) = args.txvga2 {
        config.device.txvga2_db = v;
    }
    if let Some(v) = args.gain {
        config.pipeline.gain = v;
    }
    if let Some(v) = args.agc_ceiling {
        config.pipeline.agc_ceiling = v;
    }
    if let Some(v) = args.ring_blocks {
        config.pipeline.ring_blocks = v;
    }
    if let Some(v) = args.block_samples {
        config.pipeline.samples_per_block = v;
    }
    if let Some(v) = args.device_buffers {
        config.device.num_buffers = v;
    }
    if let Some(v) = args.transfers {
        config.device.num_transfers = v;
    }
    if let Some(v) = args.read_chunk {
        config.pipeline.read_chunk_bytes = v;
    }
}

fn run_backend(cfg: &ToolConfig, args: &Args, feeder: &mut TxFeeder) -> Result<u64> {
    if let Some(path) = &args.output {
        let mut sink = if path == Path::new("-") {
            FileSink::stdout()
        } else {
            FileSink::create(path)
                .with_context(|| format!("failed to create output {}", path.display()))?
        };
        return Ok(sink.stream(feeder)?);
    }

    #[cfg(feature = "bladerf")]
    {
        let mut tx = iqcast_core::device::BladerfTx::open(
            &cfg.device,
            cfg.pipeline.samples_per_block,
        )
        .context("failed to bring up bladeRF transmit path")?;
        Ok(tx.stream(feeder)?)
    }

    #[cfg(not(feature = "bladerf"))]
    {
        let _ = cfg;
        bail!("built without the bladerf feature; pass --output FILE to use the file sink");
    }
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let mut cfg = config::load_config(&config_path);
    apply_overrides(&mut cfg, &args);

    let input = match args.input.as_deref() {
        Some(p) if p != Path::new("-") => Some(p),
        _ => None,
    };
    let source = source::open_source(input, cfg.pipeline.read_chunk_bytes).with_context(|| {
        match input {
            Some(p) => format!("failed to open input {}", p.display()),
            None => "failed to open stdin".to_string(),
        }
    })?;
    match input {
        Some(p) => log::info!("reading IQ samples from {}", p.display()),
        None => log::info!("reading IQ samples from stdin"),
    }

    let (pipeline, mut feeder) = Pipeline::start(&cfg.pipeline, source)?;

    // Ctrl-C raises the shutdown flag and nothing more; teardown happens
    // on the main thread after the backend returns.
    let stop = pipeline.stop_handle();
    ctrlc::set_handler(move || stop.request_stop())
        .context("failed to install Ctrl-C handler")?;

    log::info!("waiting for initial buffer fill");
    pipeline.wait_until_primed();

    if pipeline.phase() == Phase::StopRequested {
        pipeline.shutdown();
        return Ok(());
    }

    let streamed = run_backend(&cfg, &args, &mut feeder);
    pipeline.shutdown();

    let blocks = streamed?;
    log::info!("done: {} blocks transmitted", blocks);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "iqcast-tx",
            "-f",
            "433920000",
            "-m",
            "0.5",
            "-g",
            "-20",
            "-p",
            "64",
            "capture.cf32",
        ]);

        let mut cfg = ToolConfig::default();
        apply_overrides(&mut cfg, &args);

        assert_eq!(cfg.device.frequency_hz, 433_920_000);
        assert_eq!(cfg.pipeline.gain, 0.5);
        assert_eq!(cfg.device.txvga1_db, -20);
        assert_eq!(cfg.pipeline.ring_blocks, 64);
        assert_eq!(args.input.as_deref(), Some(Path::new("capture.cf32")));
    }

    #[test]
    fn test_unset_flags_keep_config_values() {
        let args = Args::parse_from(["iqcast-tx"]);
        let mut cfg = ToolConfig::default();
        cfg.device.frequency_hz = 915_000_000;
        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg.device.frequency_hz, 915_000_000);
        assert_eq!(cfg.device.sample_rate, 1_000_000);
    }
}
