//! Command-line driver for the loom dataflow runtime.
//!
//! Loom wires are authored in-process today — there is no front-end syntax
//! to parse — so this binary's job is to expose the runtime's own demo
//! scenarios, list what the shard registry knows about, and surface the SON
//! diagnostic encoding on demand.

mod scenarios;

use clap::{CommandFactory, Parser as ClapParser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use loom_core::{type_to_son, value_to_son, SonConfig};
use loom_runtime::config::RuntimeConfig;
use loom_runtime::registry::Registry;
use loom_runtime::shard::Shard;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "loom")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run and inspect the loom dataflow runtime", long_about = None)]
struct Cli {
    /// TOML file layered under LOOM_* environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, ValueEnum)]
enum Scenario {
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    All,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one of the built-in scenario wires
    Run {
        /// Which scenario to run
        scenario: Scenario,

        /// Encode the resulting value as SON instead of Rust debug output
        #[arg(long)]
        dump: bool,

        /// Use compact (single-line) SON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// List every shard registered with the standard library
    Shards,

    /// Print the effective runtime configuration (env + --config TOML)
    Config,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn load_config(path: Option<&PathBuf>) -> RuntimeConfig {
    let base = RuntimeConfig::from_env();
    let Some(path) = path else {
        return base;
    };
    match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str::<loom_runtime::config::PartialRuntimeConfig>(&text) {
            Ok(partial) => base.merge(partial),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config file, using env-only config");
                base
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config file, using env-only config");
            base
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "loom", &mut io::stdout());
}

fn print_report(report: scenarios::ScenarioReport, dump: bool, compact: bool) {
    println!("--- {} ---", report.name);
    println!("{}", report.narrative);
    if dump {
        let config = if compact { SonConfig::compact() } else { SonConfig::pretty() };
        println!("{}", value_to_son(&report.output, &config));
    } else {
        println!("{:?}", report.output);
    }
}

fn run_scenario(scenario: Scenario, dump: bool, compact: bool) -> ExitCode {
    match scenario {
        Scenario::S1 => print_report(scenarios::s1_arithmetic_pipeline(), dump, compact),
        Scenario::S2 => print_report(scenarios::s2_variable_roundtrip(), dump, compact),
        Scenario::S3 => print_report(scenarios::s3_flow_stop(), dump, compact),
        Scenario::S4 => print_report(scenarios::s4_restart_loop(), dump, compact),
        Scenario::S6 => print_report(scenarios::s6_cross_wire_scheduling(), dump, compact),
        Scenario::S5 => match scenarios::s5_type_mismatch() {
            Ok(()) => {
                eprintln!("s5-type-mismatch: expected a compose failure, but composing succeeded");
                return ExitCode::FAILURE;
            }
            Err(message) => println!("--- s5-type-mismatch ---\nrejected at compose time: {message}"),
        },
        Scenario::All => {
            print_report(scenarios::s1_arithmetic_pipeline(), dump, compact);
            print_report(scenarios::s2_variable_roundtrip(), dump, compact);
            print_report(scenarios::s3_flow_stop(), dump, compact);
            print_report(scenarios::s4_restart_loop(), dump, compact);
            print_report(scenarios::s6_cross_wire_scheduling(), dump, compact);
            return run_scenario(Scenario::S5, dump, compact);
        }
    }
    ExitCode::SUCCESS
}

fn print_shards() {
    loom_runtime::shards::register_all();
    let registry = Registry::global();
    let mut names = registry.shard_names();
    names.sort();
    for name in names {
        if let Some(shard) = registry.construct_shard(&name) {
            let inputs: Vec<String> = shard.input_types().iter().map(type_to_son).collect();
            let outputs: Vec<String> = shard.output_types().iter().map(type_to_son).collect();
            println!("{name}: {} -> {}", inputs.join("|"), outputs.join("|"));
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { scenario, dump, compact } => run_scenario(scenario, dump, compact),
        Commands::Shards => {
            print_shards();
            ExitCode::SUCCESS
        }
        Commands::Config => {
            let config = load_config(cli.config.as_ref());
            println!("{config:#?}");
            ExitCode::SUCCESS
        }
        Commands::Completions { shell } => {
            run_completions(shell);
            ExitCode::SUCCESS
        }
    }
}
