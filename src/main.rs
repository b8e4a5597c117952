//! MU1 Simulator - CLI Entry Point
//!
//! Commands:
//! - `mu1 run <program>` - Run an ASM file or memory image
//! - `mu1 demo` - Run the built-in summing loop with a trace
//! - `mu1 debug <program>` - Interactive debugger
//! - `mu1 asm <source>` - Assemble to a memory image
//! - `mu1 disasm <image>` - Disassemble a memory image

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mu1")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A micro-step simulator of the MU1 16-bit accumulator machine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the ASM file or memory image to execute
        program: String,
        /// Maximum number of micro-steps to run
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Trace execute phases
        #[arg(short, long)]
        trace: bool,
        /// Also trace FETCH_0 and FETCH_1
        #[arg(long)]
        trace_fetch: bool,
        /// Also trace DECODE
        #[arg(long)]
        trace_decode: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the built-in summing loop with a trace
    Demo {
        /// Also trace fetch and decode phases
        #[arg(short, long)]
        verbose: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the ASM file or memory image to debug
        program: String,
    },
    /// Assemble source to a memory image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a memory image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, max_steps, trace, trace_fetch, trace_decode, json }) => {
            let options = mu1::TraceOptions { fetch: trace_fetch, decode: trace_decode };
            let traced = trace || trace_fetch || trace_decode;
            run_program(&program, max_steps, traced.then_some(options), json);
        }
        Some(Commands::Demo { verbose }) => {
            run_demo(verbose);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("MU1 Simulator v0.1.0");
            println!("A micro-step simulator of a 16-bit accumulator machine");
            println!();
            println!("Use --help for available commands");
        }
    }
}

/// Load either assembly source (`.asm`) or a memory image.
fn load_program_file(path: &str) -> mu1::MemoryImage {
    use mu1::{assemble, load_image};

    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(image) => {
                println!("Assembled {} cells", image.len());
                image
            }
            Err(e) => {
                eprintln!("Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_image(path) {
            Ok(image) => {
                println!("Loaded {} cells", image.len());
                image
            }
            Err(e) => {
                eprintln!("Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Step until halt or the step limit, printing traced phases.
fn execute(cpu: &mut mu1::Cpu, max_steps: u64, trace: Option<mu1::TraceOptions>) -> u64 {
    use mu1::Tracer;

    let mut tracer = trace.map(Tracer::new);
    let mut executed = 0u64;

    while cpu.is_running() && executed < max_steps {
        let pc = cpu.regs.pc;
        let result = match tracer.as_mut() {
            Some(tracer) => tracer.step(cpu).map(|block| {
                if let Some(block) = block {
                    println!("{}", block);
                    println!();
                }
            }),
            None => cpu.step().map(|_| ()),
        };

        if let Err(e) = result {
            eprintln!("CPU error at PC={:04X}: {}", pc, e);
            std::process::exit(1);
        }
        executed += 1;
    }

    if let Some(tracer) = tracer {
        if tracer.skipped() > 0 {
            println!("({} micro-steps skipped)", tracer.skipped());
        }
    }

    executed
}

fn run_program(path: &str, max_steps: u64, trace: Option<mu1::TraceOptions>, json: bool) {
    use mu1::Cpu;
    use mu1::trace::format_state;

    println!("Running: {}", path);
    let image = load_program_file(path);

    if image.is_empty() {
        eprintln!("No cells to load");
        std::process::exit(1);
    }

    let mut cpu = Cpu::new();
    if let Err(e) = image.load_into(&mut cpu.mem) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("--- Execution ---");
    let executed = execute(&mut cpu, max_steps, trace);

    println!();
    println!("--- Result ---");
    println!("Micro-steps:  {}", executed);
    println!("Instructions: {}", cpu.instructions);
    println!("State:        {:?}", cpu.state);
    println!("{}", format_state(&cpu));
    println!("Flags:        {}", cpu.regs.flags.to_letters());

    if json {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to serialize state: {}", e),
        }
    }

    if executed >= max_steps && cpu.is_running() {
        println!();
        println!("Reached max steps limit ({}). Use --max-steps to increase.", max_steps);
    }
}

fn run_demo(verbose: bool) {
    use mu1::{Cpu, TraceOptions};
    use mu1::programs::{sum_loop, TOTAL};
    use mu1::trace::format_word;

    let mut cpu = Cpu::new();
    if let Err(e) = sum_loop().load_into(&mut cpu.mem) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }

    let options = if verbose { TraceOptions::all() } else { TraceOptions::default() };
    let executed = execute(&mut cpu, 10_000, Some(options));

    println!();
    println!("Micro-steps: {}", executed);
    match cpu.mem.read(TOTAL) {
        Ok(total) => println!("Result in memory[TOTAL]: {}", format_word(total)),
        Err(e) => eprintln!("{}", e),
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    use mu1::tui::run_debugger;

    println!("Loading: {}", path);
    let image = load_program_file(path);

    if image.is_empty() {
        eprintln!("No cells to load");
        std::process::exit(1);
    }

    println!("Launching debugger...");
    println!();

    if let Err(e) = run_debugger(image) {
        eprintln!("Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    eprintln!("The debugger requires the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use mu1::{assemble, save_image};

    let out_path = match output_path(Path::new(source_path), output.as_deref()) {
        Some(path) => path,
        None => {
            eprintln!("Refusing to overwrite the source file {}", source_path);
            std::process::exit(1);
        }
    };

    println!("Assembling: {} -> {}", source_path, out_path.display());

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let image = match assemble(&source) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Assembled {} cells", image.len());

    if let Err(e) = save_image(&out_path, &image) {
        eprintln!("Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("Saved to {}", out_path.display());
}

/// Default image path for a source file: same stem, `.mu1` extension.
fn image_path_for(source: &Path) -> PathBuf {
    source.with_extension("mu1")
}

/// Where `asm` writes its image. `None` when that would be the source itself.
fn output_path(source: &Path, output: Option<&str>) -> Option<PathBuf> {
    let path = output.map(PathBuf::from).unwrap_or_else(|| image_path_for(source));
    (path != source).then_some(path)
}

fn disassemble_file(image_path: &str) {
    use mu1::{disassemble, load_image};

    println!("Disassembling: {}", image_path);
    println!();

    let image = match load_image(image_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(&image));
}

fn run_self_test() {
    use mu1::{Cpu, Registers};
    use mu1::cpu::{alu, encode, decode_address, Opcode};
    use mu1::programs::{sum_loop, TOTAL};

    println!("--- MU1 Simulator Self-Test ---");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ok", name);
            passed += 1;
        } else {
            println!("{}... FAILED", name);
            failed += 1;
        }
    };

    let mut regs = Registers::new();
    regs.acc = 0x7FFF;
    alu::add(&mut regs, 1);
    check(
        "Signed overflow 0x7FFF + 1",
        regs.acc == 0x8000 && regs.flags.v && regs.flags.n && !regs.flags.z && !regs.flags.c,
    );

    let roundtrip = (0..=0x0FFF).all(|addr| decode_address(encode(Opcode::Lda, addr)) == addr);
    check("Address encode/decode roundtrip", roundtrip);

    let mut cpu = Cpu::new();
    let sp = cpu.regs.sp;
    cpu.push(0xBEEF);
    check("Stack push/pop roundtrip", cpu.pop() == 0xBEEF && cpu.regs.sp == sp);

    let mut cpu = Cpu::new();
    let summed = sum_loop().load_into(&mut cpu.mem).is_ok()
        && cpu.run_limited(10_000).is_ok()
        && cpu.mem.read(TOTAL) == Ok(65);
    check("Summing loop leaves 65 in TOTAL", summed);

    let mut cpu = Cpu::new();
    check("Out-of-range lookup is rejected", cpu.address_lookup(0x1000).is_err() && cpu.regs.din == 0);

    println!();
    println!("------------------------------");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("All tests passed!");
    } else {
        std::process::exit(1);
    }
}
