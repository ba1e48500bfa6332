use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context};
use log::warn;
use mpegts_analyzer::{scan_file, CancelToken, ScanOptions};

fn usage() -> ! {
    eprintln!("usage: ts-report <file.ts> [--timeout SECS] [--max-packets N]");
    std::process::exit(2);
}

struct Args {
    path: String,
    timeout: Option<Duration>,
    max_packets: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut path = None;
    let mut timeout = None;
    let mut max_packets = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--timeout" => {
                let secs: u64 = args
                    .next()
                    .context("--timeout needs a value")?
                    .parse()
                    .context("--timeout takes whole seconds")?;
                timeout = Some(Duration::from_secs(secs));
            }
            "--max-packets" => {
                let n: u64 = args
                    .next()
                    .context("--max-packets needs a value")?
                    .parse()
                    .context("--max-packets takes a packet count")?;
                max_packets = Some(n);
            }
            "--help" | "-h" => usage(),
            _ if path.is_none() => path = Some(arg),
            _ => bail!("unexpected argument: {arg}"),
        }
    }

    let Some(path) = path else { usage() };
    Ok(Args {
        path,
        timeout,
        max_packets,
    })
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = parse_args()?;

    let cancel = CancelToken::new();
    let options = ScanOptions {
        max_packets: args.max_packets,
        cancel: cancel.clone(),
    };

    let analysis = match args.timeout {
        None => scan_file(&args.path, options)?,
        Some(timeout) => {
            // The scan checks the token once per packet, so cancelling
            // from here stops it promptly and still yields a partial
            // result for everything read so far.
            let path = args.path.clone();
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(scan_file(&path, options));
            });
            match rx.recv_timeout(timeout) {
                Ok(result) => result?,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    warn!("timeout after {timeout:?}, cancelling scan");
                    cancel.cancel();
                    rx.recv().map_err(|_| mpegts_analyzer::Error::WorkerLost)??
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    bail!(mpegts_analyzer::Error::WorkerLost)
                }
            }
        }
    };

    for line in &analysis.report {
        println!("{line}");
    }

    if !analysis.completed {
        warn!("analysis incomplete, report covers only a prefix of the stream");
        return Ok(ExitCode::from(3));
    }
    Ok(ExitCode::SUCCESS)
}
