use clap::{App, Arg, ArgMatches, ErrorKind};
use monty::{Vm, VmConfig};
use std::process;

fn args() -> Result<ArgMatches, clap::Error> {
    App::new("monty")
        .about("a line-oriented bytecode interpreter for the monty language")
        .version("0.1.0")
        .arg(
            Arg::new("file")
                .takes_value(true)
                .required(true)
                .help("monty bytecode file to execute"),
        )
        .try_get_matches()
}

// Runs inside a function so the Vm (and with it the stack and the source
// mapping) is dropped before the process exits, on every path.
fn run() -> i32 {
    let args = match args() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            eprintln!("USAGE: monty file");
            return 1;
        }
    };
    let file_name = match args.value_of("file") {
        Some(file_name) => file_name,
        None => {
            eprintln!("USAGE: monty file");
            return 1;
        }
    };

    let mut vm = match Vm::new(VmConfig::new(file_name)) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("{}", err);
            return 1;
        }
    };
    if let Err(err) = vm.run() {
        eprintln!("{}", err);
        return 1;
    }

    0
}

fn main() {
    process::exit(run());
}
