use clap::{Arg, ArgMatches, Command};
use fsnail::source::has_source_extension;
use fsnail::{Vm, VmConfig, VmError};
use std::process::exit;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn args() -> ArgMatches {
    let command = Command::new("fsnail")
        .about("an interpreter for the fsnail stack language")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("file")
                .takes_value(true)
                .multiple_values(true)
                .required(false)
                .help("fsnail source file to interpret (.fsn)"),
        )
        .arg(
            Arg::new("ir")
                .short('i')
                .long("ir")
                .takes_value(false)
                .required(false)
                .help("prints the decoded program instead of running it"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .takes_value(false)
                .required(false)
                .help("traces every executed instruction with the stack contents"),
        )
        .arg(
            Arg::new("timing")
                .short('t')
                .long("timing")
                .takes_value(false)
                .required(false)
                .help("reports how long loading and running took"),
        );

    match command.try_get_matches() {
        Ok(matches) => matches,
        Err(err) => match err.kind() {
            clap::ErrorKind::DisplayHelp | clap::ErrorKind::DisplayVersion => err.exit(),
            _ => {
                eprintln!("{}", err);
                exit(VmError::invalid_invocation(0).code());
            }
        },
    }
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "trace" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn interpret(args: &ArgMatches) -> Result<(), VmError> {
    let files: Vec<&str> = args.values_of("file").into_iter().flatten().collect();
    let file_name = match files.as_slice() {
        [file_name] => *file_name,
        _ => return Err(VmError::invalid_invocation(files.len())),
    };
    if !has_source_extension(file_name) {
        return Err(VmError::invalid_source_name(file_name));
    }
    let debug = args.is_present("debug");
    let timing = args.is_present("timing");

    let start = Instant::now();
    let config = if debug {
        VmConfig::debug_file(file_name)
    } else {
        VmConfig::default_file(file_name)
    };
    let mut vm = Vm::new(config)?;
    let loaded = start.elapsed();
    if timing {
        info!(ms = loaded.as_millis() as u64, "loaded {}", file_name);
        eprintln!("loaded in {} ms ({} ns)", loaded.as_millis(), loaded.as_nanos());
    }

    if args.is_present("ir") {
        print!("{}", vm.program());
        return Ok(());
    }

    let start = Instant::now();
    vm.run()?;
    let ran = start.elapsed();
    if timing {
        info!(ms = ran.as_millis() as u64, "finished {}", file_name);
        eprintln!("\nran in {} ms ({} ns)", ran.as_millis(), ran.as_nanos());
    }

    Ok(())
}

fn main() {
    let args = args();
    init_tracing(args.is_present("debug"));
    if let Err(err) = interpret(&args) {
        eprintln!("\n{}", err);
        exit(err.code());
    }
}
