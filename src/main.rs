//! deflate-lens - see every bit of a zlib stream
//!
//! Decodes zlib or raw DEFLATE input and lists each block and element with
//! the exact bits it was read from.

use std::fs;
use std::io::{self, Read};
use std::process;

use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use deflate_lens::cli::{LensArgs, ENV_OPTIONS};
use deflate_lens::error::{LensError, LensResult};
use deflate_lens::render::{self, Inspection};

const VERSION: &str = concat!("deflate-lens ", env!("CARGO_PKG_VERSION"));

/// Name shown for `--text` input
const TEXT_INPUT: &str = "<text>";

fn main() {
    let result = run();

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("deflate-lens: {}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "off",
        1 => "error",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -q/-v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> LensResult<i32> {
    let args = LensArgs::parse()?;

    if args.version {
        println!("{}", VERSION);
        return Ok(0);
    }

    if args.help {
        print_help();
        return Ok(0);
    }

    init_logging(args.verbosity);

    let inputs: Vec<String> = if args.text.is_some() {
        vec![TEXT_INPUT.to_string()]
    } else if args.files.is_empty() {
        vec!["-".to_string()]
    } else {
        args.files.clone()
    };

    // Inputs are independent; trace them in parallel, report in order
    let results: Vec<LensResult<Inspection>> = inputs
        .par_iter()
        .map(|name| {
            let data = load_input(name, &args)?;
            render::inspect(name, data, &args)
        })
        .collect();

    let mut exit_code = 0;

    for (name, result) in inputs.iter().zip(results) {
        match result.and_then(|inspection| print_inspection(&inspection, &args)) {
            Ok(true) => {}
            Ok(false) => exit_code = 1,
            Err(e) => {
                eprintln!("deflate-lens: {}: {}", name, e);
                exit_code = 1;
            }
        }
    }

    Ok(exit_code)
}

/// Print one result. Returns false when decoding stopped on an error.
fn print_inspection(inspection: &Inspection, args: &LensArgs) -> LensResult<bool> {
    if args.json {
        println!("{}", render::render_json(inspection)?);
    } else if !args.quiet {
        print!("{}", render::render_text(inspection, args)?);
    }

    match &inspection.report.error {
        Some(error) => {
            eprintln!("deflate-lens: {}: {}", inspection.name, error);
            Ok(false)
        }
        None => Ok(true),
    }
}

fn load_input(name: &str, args: &LensArgs) -> LensResult<Vec<u8>> {
    if let Some(text) = &args.text {
        return Ok(text.as_bytes().to_vec());
    }

    if name == "-" {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        return Ok(data);
    }

    fs::read(name).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LensError::FileNotFound(name.to_string()),
        _ => LensError::Io(e),
    })
}

fn print_help() {
    println!("Usage: deflate-lens [OPTION]... [FILE]...");
    println!();
    println!("Decode zlib or raw DEFLATE FILEs and show where every element lives.");
    println!();
    println!("Options:");
    println!("  -c, --compress     Treat inputs as plain data and compress them first");
    println!("  -0..-9             Compression level for --compress (default 6)");
    println!("  --level=N          Same as -N");
    println!("  --text=STRING      Compress and trace STRING instead of reading files");
    println!("  -r, --raw          Inputs are raw DEFLATE (default for .deflate files)");
    println!("  -z, --zlib         Inputs are zlib streams");
    println!("  -i, --items        List every decoded item");
    println!("  -x, --hex          Hex dump of the compressed input");
    println!("  -s, --select=B:I   Highlight item I of block B in the hex dump");
    println!("  -j, --json         Print the full trace as JSON");
    println!("  -q, --quiet        Only report errors");
    println!("  -v, --verbose      More logging (repeat for more)");
    println!("  -h, --help         Show this help");
    println!("  -V, --version      Show version");
    println!();
    println!("With no FILE, or when FILE is -, read standard input.");
    println!("Default options are read from the {} environment variable;", ENV_OPTIONS);
    println!("RUST_LOG overrides the log level chosen by -q/-v.");
    println!();
    println!("Examples:");
    println!("  deflate-lens -i data.zz          List every item of data.zz");
    println!("  deflate-lens --text=hello -x     Compress \"hello\" and dump it");
    println!("  deflate-lens -c -9 -j file.txt   Compress file.txt, print JSON");
}
