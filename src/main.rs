use std::{env, fs, path::Path, process};

use octane::frontend::token_dumper::TokenDumper;
use octane::{Error, Lexer, Outcome, VM, VMConfig};

const DEFAULT_SOURCE_FILE: &str = "main.octane";

const EXAMPLE_SOURCE: &str = "\
############
# Octane example source
############

exit

 data + 1 1

 data + 100 11000

 data lambda ( + + 1 1 + 1 1)

 data - swap 5 10

 data myf call , myf func (- 5 10) ,

 data ptr ptrval ptrplus , ptrval 'h' ptrset

 data if ( false ) ( + 1 1 ) ( + 2 2 )

 data ifstk , or norem 5 2 norem 5 2 , 1 0

 data x loop [ 1 2 3 4 5 ] , x func ( ifstk , or norem ptrval 3 norem ptrval 5 , ptrval 0 , ptrsetstk )

 data sumstk , x loop range 10, x func ( ifstk , or norem ptrval 3 norem ptrval 5 , ptrval 0 , ptrsetstk )
";

struct Options {
    tokens_only: bool,
    no_color: bool,
    pretty: bool,
    config: VMConfig,
    filename: Option<String>,
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage();
            process::exit(2);
        }
    };

    init_tracing();

    let filename = match options.filename.clone() {
        Some(filename) => filename,
        None => default_source_file(),
    };

    let source = match fs::read_to_string(&filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            process::exit(1);
        }
    };

    if options.tokens_only {
        dump_tokens(&source, options.no_color, options.pretty);
    } else {
        run_program(&source, options.config);
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        tokens_only: false,
        no_color: false,
        pretty: false,
        config: VMConfig::default(),
        filename: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--tokens" => options.tokens_only = true,
            "--no-color" => options.no_color = true,
            "--pretty" => options.pretty = true,
            "--verbose" | "-v" => options.config.verbose = true,
            "--strict" => options.config.strict_bounds = true,
            "--cells" => options.config.memory_cells = flag_value(arg, iter.next())?,
            "--max-steps" => options.config.max_steps = Some(flag_value(arg, iter.next())?),
            flag if flag.starts_with('-') => return Err(format!("unknown flag {}", flag)),
            // first non-flag argument is the filename
            filename => {
                if options.filename.is_some() {
                    return Err(format!("unexpected argument {}", filename));
                }
                options.filename = Some(filename.to_string());
            }
        }
    }

    Ok(options)
}

fn flag_value(flag: &str, value: Option<&String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got {}", flag, value))
}

/// `main.octane` in the working directory, written from the built-in
/// example when missing.
fn default_source_file() -> String {
    let path = Path::new(DEFAULT_SOURCE_FILE);
    if !path.exists() {
        println!("Writing example source file - {}", DEFAULT_SOURCE_FILE);
        if let Err(e) = fs::write(path, EXAMPLE_SOURCE) {
            eprintln!("Failed to write '{}': {}", DEFAULT_SOURCE_FILE, e);
            process::exit(1);
        }
    }
    DEFAULT_SOURCE_FILE.to_string()
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    // RUST_LOG wins; otherwise show the language's own verbose diagnostics.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("octane=info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

fn print_usage() {
    println!("OCTANE - right-to-left stack language");
    println!();
    println!("Usage:");
    println!("  octane                    Run ./{} (created if missing)", DEFAULT_SOURCE_FILE);
    println!("  octane <file>             Run a program");
    println!("  octane --tokens <file>    Show tokens only (--no-color, --pretty)");
    println!("  octane --verbose          Start with verbose diagnostics on");
    println!("  octane --strict           Fail on out-of-range memory access");
    println!("  octane --cells N          Number of memory cells (default 3000)");
    println!("  octane --max-steps N      Stop after N dispatched tokens");
    println!("  octane --help, -h         Show this help");
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) {
    let mut lexer = Lexer::new(source);

    match lexer.tokenize() {
        Ok(tokens) => {
            let mut dumper = TokenDumper::new();

            if no_color {
                dumper = dumper.no_color();
            }
            if pretty {
                dumper = dumper.pretty();
            }

            if let Err(e) = dumper.dump(&tokens) {
                eprintln!("Output error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            process::exit(1);
        }
    }
}

fn run_program(source: &str, config: VMConfig) {
    let mut vm = VM::with_config(config);

    match vm.eval(source) {
        Ok(Outcome::Completed) => println!("{}", vm.stack_to_string()),
        Ok(Outcome::Halted) => {}
        Err(Error::Lex(e)) => {
            eprintln!("Lexer error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e);
            // Diagnostics only; the run already failed.
            let _ = vm.dump_data_stack();
            let _ = vm.dump_code_stack();
            process::exit(1);
        }
    }
}
