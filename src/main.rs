use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};
use pcap::Activated;

use wiretrail::core::capture::{self, PcapSource};
use wiretrail::core::error::ReportError;
use wiretrail::core::report::{self, DEFAULT_REPORT_FILE};
use wiretrail::core::shutdown::Shutdown;
use wiretrail::core::sniffer::{Finished, Sniffer, StopReason};

#[derive(Parser, Debug)]
#[command(name = "wiretrail")]
#[command(version)]
#[command(about = "Rebuilds an HTTP/DNS browsing history from sniffed traffic")]
struct Args {
    /// Capture device (defaults to the first one libpcap offers)
    #[arg(short, long, env = "WIRETRAIL_INTERFACE")]
    interface: Option<String>,

    /// Replay a pcap file instead of capturing live
    #[arg(short, long, value_name = "PCAP", conflicts_with = "interface")]
    read: Option<PathBuf>,

    /// HTML report written on shutdown
    #[arg(short, long, env = "WIRETRAIL_OUTPUT", default_value = DEFAULT_REPORT_FILE)]
    output: PathBuf,

    /// Also export the history as JSON Lines
    #[arg(long, value_name = "PATH", env = "WIRETRAIL_JSONL")]
    jsonl: Option<PathBuf>,

    /// Print capture devices and exit
    #[arg(long)]
    list_interfaces: bool,
}

fn capture_until_stopped<T: Activated + ?Sized>(
    source: PcapSource<T>,
) -> Result<Finished, std::io::Error> {
    let shutdown = Shutdown::install()?;
    info!("capturing from {}", source.label());
    println!("Sniffer started. Press Ctrl+C to stop.");
    Ok(Sniffer::new(source).run(&shutdown))
}

fn flush(args: &Args, finished: &Finished) -> Result<(), ReportError> {
    report::write_html(&args.output, &finished.history)?;
    println!("History saved to {}", args.output.display());

    if let Some(path) = &args.jsonl {
        report::write_jsonl(path, &finished.history)?;
        println!("JSON history saved to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_target(false)
        .init();

    let args = Args::parse();

    if args.list_interfaces {
        for (i, dev) in wiretrail::devices().iter().enumerate() {
            println!("  {i:>2} -> {dev}");
        }
        return Ok(());
    }

    // Opening the capture is the only fatal failure.
    let finished = match &args.read {
        Some(path) => capture_until_stopped(capture::open_offline(path)?)?,
        None => capture_until_stopped(capture::open_live(args.interface.as_deref())?)?,
    };

    if let StopReason::ReadFailed(e) = &finished.reason {
        warn!("capture ended early: {e}");
    }
    info!("{} artifacts collected", finished.history.len());

    flush(&args, &finished)?;
    Ok(())
}
