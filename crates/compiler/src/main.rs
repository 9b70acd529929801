//! `fbc`: the FasterBASIC command-line driver (spec §6.4).
//!
//! Every flag controls how far the pipeline runs and what gets printed;
//! the actual assembler/linker invocation that turns QBE IL into a
//! binary is out of scope here - `--run` only exists to smoke-test the
//! pipeline, and shells out to whatever toolchain the host provides.

use std::fs;
use std::path::PathBuf;
use std::process::{self, Command};

use clap::Parser as ClapParser;

#[derive(ClapParser, Debug)]
#[command(name = "fbc", about = "FasterBASIC ahead-of-time compiler")]
struct Cli {
    /// Source file to compile.
    input: PathBuf,

    /// Print the parsed AST and stop.
    #[arg(long)]
    ast: bool,

    /// Print each routine's control-flow graph and stop.
    #[arg(long)]
    cfg: bool,

    /// Print the generated QBE IL and stop (the default when no other
    /// output flag is given).
    #[arg(long)]
    emit_qbe: bool,

    /// Run the bundled QBE ARM64 backend and print assembly.
    #[arg(long)]
    emit_asm: bool,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Assemble, link, and execute the result.
    #[arg(long)]
    run: bool,
}

fn main() {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("fbc: cannot read {}: {err}", cli.input.display());
            process::exit(1);
        }
    };

    if cli.ast {
        run_ast(&source, &cli.input);
        return;
    }

    if cli.cfg {
        run_cfg(&source, &cli.input);
        return;
    }

    let Some(output) = fbasicc::compile(&source, cli.input.clone()) else {
        eprintln!("fbc: {} failed to parse", cli.input.display());
        process::exit(1);
    };

    for diag in output.diagnostics.iter() {
        eprintln!("{diag}");
    }
    if output.diagnostics.has_errors() {
        process::exit(1);
    }

    let text = if cli.emit_asm {
        fbasic_qbe_backend::compile_to_arm64(&output.qbe_il)
    } else {
        output.qbe_il
    };

    if cli.run {
        run_pipeline(&text, cli.emit_asm);
        return;
    }

    write_output(&text, cli.output.as_deref());
}

fn run_ast(source: &str, input: &std::path::Path) {
    let mut sink = fbasic_core::DiagnosticSink::new();
    let mut parser = fbasicc::parser::Parser::new(source, input.to_path_buf(), &mut sink);
    match parser.parse_program() {
        Ok(program) => println!("{program:#?}"),
        Err(err) => {
            eprintln!("fbc: parse error: {err}");
            process::exit(1);
        }
    }
    for diag in sink.iter() {
        eprintln!("{diag}");
    }
}

fn run_cfg(source: &str, input: &std::path::Path) {
    let mut sink = fbasic_core::DiagnosticSink::new();
    let mut parser = fbasicc::parser::Parser::new(source, input.to_path_buf(), &mut sink);
    match parser.parse_program() {
        Ok(program) => {
            let cfg = fbasicc::cfg::build(&program);
            for block in &cfg.blocks {
                println!("{:?} (reachable={}):", block.id, cfg.is_reachable(block.id));
                for stmt in &block.statements {
                    println!("  {stmt:?}");
                }
                println!("  -> {:?}", block.terminator);
            }
        }
        Err(err) => {
            eprintln!("fbc: parse error: {err}");
            process::exit(1);
        }
    }
}

fn write_output(text: &str, output: Option<&std::path::Path>) {
    match output {
        Some(path) => {
            if let Err(err) = fs::write(path, text) {
                eprintln!("fbc: cannot write {}: {err}", path.display());
                process::exit(1);
            }
        }
        None => println!("{text}"),
    }
}

/// `--run`: writes the final text to a temp file and hands it to the
/// host's assembler/linker, which is not this crate's concern (spec
/// §1 Non-goals) - `cc` is simply the most common entry point for that
/// on a developer machine.
fn run_pipeline(text: &str, is_asm: bool) {
    let dir = tempfile::tempdir().expect("creating a temp dir should not fail");
    let ext = if is_asm { "s" } else { "qbe" };
    let src_path = dir.path().join(format!("out.{ext}"));
    fs::write(&src_path, text).expect("writing to a fresh temp file should not fail");

    let bin_path = dir.path().join("a.out");
    let status = Command::new("cc")
        .arg(&src_path)
        .arg("-o")
        .arg(&bin_path)
        .status();

    match status {
        Ok(status) if status.success() => {
            let _ = Command::new(&bin_path).status();
        }
        Ok(status) => {
            eprintln!("fbc: assembling/linking failed with {status}");
            process::exit(1);
        }
        Err(err) => {
            eprintln!("fbc: could not invoke the system assembler/linker: {err}");
            process::exit(1);
        }
    }
}
