//! Chat Stream Headless Runner
//!
//! Decodes a captured chat response stream and prints the assistant text
//! as it arrives, or encodes plain text into stream frames.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chat_stream::app::StreamConfig;
use chat_stream::parser::{encode_content, encode_done, is_done_token, DONE_TOKEN};
use chat_stream::stream::{ReaderSource, StreamSession, StreamStats};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments
#[derive(Default)]
struct Args {
    /// Input file (stdin if not specified)
    input: Option<PathBuf>,
    /// Config file (default location if not specified)
    config: Option<PathBuf>,
    /// Print a JSON report instead of streaming text
    json: bool,
    /// Encode plain text into frames
    encode: bool,
    /// Cancel after this many fragments
    max_fragments: Option<usize>,
    max_pending: Option<usize>,
    chunk_size: Option<usize>,
    /// Show help
    help: bool,
}

/// JSON output of a decode run
#[derive(Serialize)]
struct JsonReport {
    fragments: Vec<String>,
    outcome: String,
    stats: StreamStats,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args::default();

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "-f" | "--file" => {
                i += 1;
                if i < argv.len() {
                    args.input = Some(PathBuf::from(&argv[i]));
                }
            },
            "--config" => {
                i += 1;
                if i < argv.len() {
                    args.config = Some(PathBuf::from(&argv[i]));
                }
            },
            "-n" | "--max-fragments" => {
                i += 1;
                if i < argv.len() {
                    args.max_fragments = argv[i].parse().ok();
                }
            },
            "--max-pending" => {
                i += 1;
                if i < argv.len() {
                    args.max_pending = argv[i].parse().ok();
                }
            },
            "--chunk-size" => {
                i += 1;
                if i < argv.len() {
                    args.chunk_size = argv[i].parse().ok();
                }
            },
            "-j" | "--json" => {
                args.json = true;
            },
            "-e" | "--encode" => {
                args.encode = true;
            },
            "-h" | "--help" => {
                args.help = true;
            },
            other => {
                // Treat as input file if no flag
                if args.input.is_none() && !other.starts_with('-') {
                    args.input = Some(PathBuf::from(other));
                }
            },
        }
        i += 1;
    }

    args
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = parse_args();

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let config = match &args.config {
        Some(path) => match StreamConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => StreamConfig::load_or_default(),
    };
    let config = StreamConfig {
        max_pending_bytes: args.max_pending.unwrap_or(config.max_pending_bytes),
        read_chunk_size: args.chunk_size.unwrap_or(config.read_chunk_size),
    };

    let input: Box<dyn Read> = match &args.input {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => Box::new(io::stdin()),
    };

    let mut stdout = io::stdout().lock();
    let result = if args.encode {
        encode(input, &mut stdout)
    } else {
        decode(input, &args, &config, &mut stdout)
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}

/// Turn each input line into a content frame, then close the stream
fn encode<R: Read, W: Write>(input: R, out: &mut W) -> io::Result<ExitCode> {
    let mut reader = BufReader::new(input);
    let mut line = String::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;
        if is_done_token(&line) {
            tracing::warn!(
                "Line {} is the reserved token {}; decoding will stop there",
                line_no,
                DONE_TOKEN
            );
        }
        out.write_all(encode_content(&line).as_bytes())?;
    }
    out.write_all(encode_done().as_bytes())?;
    out.flush()?;

    Ok(ExitCode::SUCCESS)
}

/// Decode a stream, printing fragments as they arrive
fn decode<R: Read, W: Write>(
    input: R,
    args: &Args,
    config: &StreamConfig,
    out: &mut W,
) -> io::Result<ExitCode> {
    let source = ReaderSource::with_chunk_size(input, config.read_chunk_size);
    let session = StreamSession::with_config(source, config);
    let token = session.cancel_token();
    if args.max_fragments == Some(0) {
        token.cancel();
    }

    let mut fragments = Vec::new();
    let mut write_error: Option<io::Error> = None;
    let mut count = 0usize;

    let report = session.run(|fragment| {
        count += 1;
        if args.json {
            fragments.push(fragment.to_string());
        } else if let Err(e) = out.write_all(fragment.as_bytes()).and_then(|()| out.flush()) {
            // Nobody is reading anymore
            write_error = Some(e);
            token.cancel();
        }
        if args.max_fragments.is_some_and(|max| count >= max) {
            token.cancel();
        }
    });

    if let Some(e) = write_error {
        return Err(e);
    }

    if args.json {
        let json = JsonReport {
            fragments,
            outcome: report.outcome.to_string(),
            stats: report.stats,
        };
        let text = serde_json::to_string_pretty(&json).map_err(io::Error::other)?;
        writeln!(out, "{}", text)?;
    } else {
        writeln!(out)?;
    }

    if report.outcome.is_failed() {
        eprintln!("Stream {}", report.outcome);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_help() {
    println!("Chat Stream Headless Runner");
    println!();
    println!("Usage: chat-stream [OPTIONS] [INPUT_FILE]");
    println!();
    println!("Options:");
    println!("  -f, --file <PATH>          Read input from file");
    println!("  -j, --json                 Print a JSON report instead of streaming text");
    println!("  -e, --encode               Encode each input line as a content frame");
    println!("                             (a line reading [DONE] ends the decoded stream)");
    println!("  -n, --max-fragments <N>    Cancel the stream after N fragments");
    println!("      --config <PATH>        Load configuration from PATH");
    println!("      --max-pending <BYTES>  Line buffer limit (0 = unlimited)");
    println!("      --chunk-size <BYTES>   Read size per chunk");
    println!("  -h, --help                 Show this help message");
    println!();
    println!("If no input file is specified, reads from stdin.");
    println!();
    println!("Examples:");
    println!("  curl -sN -X POST https://host/api/chat -d @msg.json | chat-stream");
    println!("  printf 'Hello\\nWorld\\n' | chat-stream --encode | chat-stream --json");
}
