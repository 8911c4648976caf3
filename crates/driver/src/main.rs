//! gaspp CLI
//!
//! Invoked in place of the assembler: `gaspp [options] -- <assembler>
//! [assembler-args]`. The wrapped command is used both to obtain the
//! preprocessed assembly and to consume the translated stream.

use clap::Parser as ClapParser;
use std::process;

mod invoke;

#[derive(ClapParser)]
#[command(name = "gaspp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translate gas-syntax assembly for legacy and Microsoft assemblers", long_about = None)]
struct Cli {
    /// Force the target architecture (arm, aarch64/arm64, powerpc/ppc)
    #[arg(long, value_name = "NAME")]
    arch: Option<String>,

    /// Output dialect: gas, apple-gas, clang, apple-clang, llvm_gcc, armasm
    #[arg(long, value_name = "TYPE", default_value = "apple-gas")]
    as_type: String,

    /// Emit each .unreq twice, lower- and uppercased (default on Darwin)
    #[arg(long, overrides_with = "no_fix_unreq")]
    fix_unreq: bool,

    /// Disable the dual-case .unreq emission
    #[arg(long, overrides_with = "fix_unreq")]
    no_fix_unreq: bool,

    /// Force thumb encoding mode from the first line
    #[arg(long)]
    force_thumb: bool,

    /// Log child-process command lines
    #[arg(long)]
    verbose: bool,

    /// Assembler command line, after `--`
    #[arg(last = true, required = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() {
    let args = canonicalize_args(std::env::args().collect());
    let cli = Cli::parse_from(args);

    let default_level = if cli.verbose {
        "gaspp_driver=info"
    } else {
        "gaspp_driver=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = invoke::DriverOptions {
        arch: cli.arch,
        as_type: cli.as_type,
        fix_unreq: resolve_fix_unreq(cli.fix_unreq, cli.no_fix_unreq),
        force_thumb: cli.force_thumb,
    };

    match invoke::run(&options, &cli.command) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("gaspp: {}", e);
            process::exit(1);
        }
    }
}

/// The documented surface uses gcc-style single-dash long options; rewrite
/// the known ones to `--` form before handing argv to clap. Everything
/// after `--` belongs to the wrapped command and is left untouched.
fn canonicalize_args(args: Vec<String>) -> Vec<String> {
    const LONG_OPTS: &[&str] = &[
        "-arch",
        "-as-type",
        "-fix-unreq",
        "-no-fix-unreq",
        "-force-thumb",
        "-verbose",
        "-help",
    ];
    let mut out = Vec::with_capacity(args.len());
    let mut passthrough = false;
    for arg in args {
        if arg == "--" {
            passthrough = true;
        }
        if !passthrough && LONG_OPTS.contains(&arg.as_str()) {
            out.push(format!("-{}", arg));
        } else {
            out.push(arg);
        }
    }
    out
}

/// `-fix-unreq`/`-no-fix-unreq` override the platform default (on for
/// Darwin hosts, whose system gas needs it).
fn resolve_fix_unreq(fix: bool, no_fix: bool) -> bool {
    if fix {
        true
    } else if no_fix {
        false
    } else {
        cfg!(target_os = "macos")
    }
}
