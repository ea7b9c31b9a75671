use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use motzkin_lang::{CompiledSystem, Compiler, Item};
use motzkin_solver::{EliminationError, Eliminator, Solution, SolutionStatus, System};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "motzkin")]
#[command(about = "Fourier-Motzkin elimination over exact rationals", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

#[derive(Args)]
struct SolveOptions {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
    format: Format,
    /// Report the interval of every variable instead of only the first
    #[arg(long)]
    all_bounds: bool,
    /// Fail when one elimination round produces more rows than this
    #[arg(long)]
    max_rows: Option<usize>,
    /// Give up when elimination runs longer than this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an inequality file and output the AST
    Parse {
        /// The file to parse
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
    /// Decide feasibility of an inequality file and report variable bounds
    Solve {
        /// The file containing the constraints
        file: PathBuf,
        #[command(flatten)]
        options: SolveOptions,
    },
    /// Solve `A x <= c` read from a coefficient file and a constants file
    Matrix {
        /// Coefficient file, starting with `nEqn nVar`
        a: PathBuf,
        /// Constants file, starting with a count
        c: PathBuf,
        #[command(flatten)]
        options: SolveOptions,
    },
    /// Eliminate trailing variables and print the projected system
    Project {
        /// The file containing the constraints
        file: PathBuf,
        /// Number of leading variables to keep
        #[arg(short, long)]
        keep: usize,
    },
    /// Check an inequality file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Solve repeatedly until a deadline and report how many runs completed
    Bench {
        /// Inequality file, or coefficient file when --constants is given
        file: PathBuf,
        /// Constants file; reads `file` in the matrix format
        #[arg(long)]
        constants: Option<PathBuf>,
        /// Time budget; 0 solves once
        #[arg(short, long, default_value_t = 1)]
        seconds: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Parse { file, format } => {
            let source = read_source(&file);
            match motzkin_lang::Parser::parse(&source) {
                Ok(program) => {
                    if format == Format::Json {
                        match serde_json::to_string_pretty(&program) {
                            Ok(json) => println!("{}", json),
                            Err(e) => exit_with(format!("Serialization error: {}", e)),
                        }
                    } else {
                        println!("{:#?}", program);
                    }
                }
                Err(e) => exit_with(format!("Parse error: {}", e)),
            }
        }
        Commands::Solve { file, options } => {
            let compiled = compile_file(&file);
            solve(&compiled.variables, compiled.system, &options);
        }
        Commands::Matrix { a, c, options } => {
            let system = match motzkin_lang::load_matrix(&a, &c) {
                Ok(system) => system,
                Err(e) => exit_with(format!("Matrix error: {}", e)),
            };
            let variables = column_names(system.n_vars());
            solve(&variables, system, &options);
        }
        Commands::Project { file, keep } => {
            let compiled = compile_file(&file);
            if keep > compiled.variables.len() {
                exit_with(format!(
                    "Cannot keep {} variables of {}",
                    keep,
                    compiled.variables.len()
                ));
            }
            match Eliminator::new().project(compiled.system, keep) {
                Ok(projected) => {
                    println!("Variables: {}", compiled.variables[..keep].join(", "));
                    println!("Rows: {}", projected.len());
                    println!();
                    print!("{}", projected.display_with(&compiled.variables[..keep]));
                }
                Err(e) => exit_with(format!("Elimination error: {}", e)),
            }
        }
        Commands::Check { file } => {
            let source = read_source(&file);
            let program = match motzkin_lang::Parser::parse(&source) {
                Ok(program) => program,
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    exit_with(format!("  {}", e));
                }
            };

            let mut compiler = Compiler::new();
            let compiled = match compiler.load(&program).and_then(|_| compiler.compile()) {
                Ok(compiled) => compiled,
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    exit_with(format!("  {}", e));
                }
            };

            let declarations = program
                .items
                .iter()
                .filter(|item| matches!(item, Item::Vars(_)))
                .count();

            println!("✓ {} is valid", file.display());
            println!("  {} declarations", declarations);
            println!("  {} constraints", program.items.len() - declarations);
            println!("  {} variables", compiled.variables.len());
            println!("  {} rows", compiled.system.len());
        }
        Commands::Bench {
            file,
            constants,
            seconds,
        } => {
            let system = match constants {
                Some(c) => match motzkin_lang::load_matrix(&file, &c) {
                    Ok(system) => system,
                    Err(e) => exit_with(format!("Matrix error: {}", e)),
                },
                None => compile_file(&file).system,
            };
            bench(&system, seconds);
        }
    }
}

fn init_logging(verbose: u8) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1)
}

fn read_source(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => exit_with(format!("Error reading file: {}", e)),
    }
}

fn compile_file(file: &Path) -> CompiledSystem {
    let mut compiler = Compiler::new();
    if let Err(e) = compiler.load_file(file) {
        exit_with(format!("Compile error: {}", e));
    }
    match compiler.compile() {
        Ok(compiled) => compiled,
        Err(e) => exit_with(format!("Compile error: {}", e)),
    }
}

/// `x0`, `x1`, ... for inputs without variable names
fn column_names(n_vars: usize) -> Vec<String> {
    (0..n_vars).map(|i| format!("x{}", i)).collect()
}

fn eliminator(options: &SolveOptions) -> Eliminator {
    let mut eliminator = Eliminator::new();
    if let Some(max) = options.max_rows {
        eliminator = eliminator.with_max_rows(max);
    }
    if let Some(ms) = options.timeout_ms {
        eliminator = eliminator.with_deadline(Instant::now() + Duration::from_millis(ms));
    }
    eliminator
}

fn solve(variables: &[String], system: System, options: &SolveOptions) {
    let eliminator = eliminator(options);

    let bounds = if options.all_bounds && system.n_vars() > 1 {
        match eliminator.all_bounds(&system) {
            Ok(bounds) => bounds,
            Err(e) => exit_with(format!("Elimination error: {}", e)),
        }
    } else {
        match eliminator.solve(system.clone()) {
            Ok(solution) => vec![solution],
            Err(e) => exit_with(format!("Elimination error: {}", e)),
        }
    };
    let Some(solution) = bounds.first() else {
        exit_with("Elimination error: no solution produced");
    };

    match options.format {
        Format::Json => {
            let named: Vec<_> = bounds
                .iter()
                .zip(variables)
                .map(|(s, name)| serde_json::json!({ "variable": name, "interval": s.interval }))
                .collect();
            let report = serde_json::json!({
                "variables": variables,
                "rows": system.len(),
                "solution": solution,
                "bounds": named,
            });
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => exit_with(format!("Serialization error: {}", e)),
            }
        }
        Format::Pretty => print_pretty(variables, &system, solution, &bounds),
    }

    if !solution.is_feasible() {
        std::process::exit(1);
    }
}

fn print_pretty(variables: &[String], system: &System, solution: &Solution, bounds: &[Solution]) {
    println!("Variables: {}", variables.join(", "));
    println!("Rows: {}", system.len());
    println!();

    match solution.status {
        SolutionStatus::Feasible => {
            println!("Status: FEASIBLE");
            for (s, name) in bounds.iter().zip(variables) {
                if let Some(interval) = s.interval {
                    println!("  {:20} in {}", name, interval);
                }
            }
        }
        SolutionStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No assignment satisfies all constraints.");
            for conflict in &solution.conflicts {
                println!("  - {}", conflict.description);
            }
        }
    }

    println!();
    println!("Stopped: {:?}", solution.termination);
    if !solution.rounds.is_empty() {
        println!("Rounds:");
        for round in &solution.rounds {
            println!(
                "  {:8} {:>6} lower x {:>6} upper, {:>6} passed through -> {:>8} rows",
                variables.get(round.column).map(String::as_str).unwrap_or("?"),
                round.lower,
                round.upper,
                round.passthrough,
                round.rows_out
            );
        }
    }
}

fn bench(system: &System, seconds: u64) {
    let start = Instant::now();
    let deadline = start + Duration::from_secs(seconds);
    let eliminator = if seconds == 0 {
        Eliminator::new()
    } else {
        Eliminator::new().with_deadline(deadline)
    };

    let mut runs = 0u64;
    let mut last = None;
    loop {
        match eliminator.solve(system.clone()) {
            Ok(solution) => {
                runs += 1;
                last = Some(solution.status);
            }
            // a run cut off by the deadline does not count
            Err(EliminationError::Interrupted { .. }) => break,
            Err(e) => exit_with(format!("Elimination error: {}", e)),
        }
        if seconds == 0 || Instant::now() >= deadline {
            break;
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!("Rows: {}", system.len());
    println!("Variables: {}", system.n_vars());
    println!("Runs: {}", runs);
    println!("Elapsed: {:.3}s", elapsed);
    if runs > 0 {
        println!("Mean: {:.3}ms", elapsed * 1000.0 / runs as f64);
    }
    match last {
        Some(SolutionStatus::Feasible) => println!("Status: FEASIBLE"),
        Some(SolutionStatus::Infeasible) => println!("Status: INFEASIBLE"),
        None => println!("Status: no run completed"),
    }
}
