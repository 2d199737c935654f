use std::io::BufRead;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use oc8_rs::{assemble, Cpu};

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble and run an OC8 program")]
struct Opts {
    /// Assembly source file.
    #[arg(value_name = "ASMFILE")]
    input: String,
    /// Write the assembled image to this file instead of running it.
    #[arg(short, long, value_name = "BINFILE")]
    emit: Option<String>,
    /// Print the final CPU state as JSON after the program halts.
    #[arg(long)]
    dump_state: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let source = std::fs::read_to_string(&opts.input)?;
    let output = assemble(&source, &opts.input);

    for diag in &output.diagnostics {
        eprintln!("{diag}");
    }
    if output.has_errors() {
        bail!("assembly failed");
    }

    if let Some(path) = opts.emit {
        std::fs::write(&path, &output.executable.bytes)?;
        return Ok(());
    }

    let mut cpu = Cpu::new();
    cpu.load_program(&output.executable.bytes);

    // While the trap flag is set, show the machine and wait for Enter
    // after every step.
    let stdin = std::io::stdin();
    cpu.run_with(|cpu| {
        eprintln!(
            "pc={:#06x} acc={:#04x} r0={:#04x} r1={:#04x} hl={:#06x} sp={:#04x} bp={:#04x} flags={:?}",
            cpu.pc, cpu.acc, cpu.r0, cpu.r1, cpu.hl(), cpu.sp, cpu.bp, cpu.flags
        );
        let _ = stdin.lock().read_line(&mut String::new());
    });

    if opts.dump_state {
        println!("{}", serde_json::to_string_pretty(&cpu)?);
    }

    Ok(())
}
