//! CLI entry point for the OSOROM simulator binary.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use osorom_core::{Decoder, InstructionFuzzer, SimConfig};
use osorom_sim::programs::BUILTIN_PROGRAMS;
use osorom_sim::rom::{load_rom, parse_literal};
use osorom_sim::runner::{run_program, ProgramResult, RunSummary};
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing as _;
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: osorom-sim [--verbose] [ARG]

Arguments:
  (none)                          Run the built-in reference programs
  random [--count N] [--seed S]   Disassemble random instruction words
  --rom <file>                    Run a ROM text file (hex words, # comments)
  <value>                         Disassemble one word (0x hex, 0 octal, decimal)

Options:
  -v, --verbose  Log packet execution to stderr
  -h, --help     Show this help message

Examples:
  osorom-sim
  osorom-sim 0xD1183C00
  osorom-sim random --count 8 --seed 42
  osorom-sim --rom program.rom
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    RunBuiltins,
    Random { count: Option<u64>, seed: u64 },
    RunRom(PathBuf),
    Disassemble(u32),
}

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    command: Command,
    verbose: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(CliArgs),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut verbose = false;
    let mut command: Option<Command> = None;

    while let Some(arg) = args.next() {
        let text = arg.to_string_lossy().into_owned();
        match text.as_str() {
            "-h" | "--help" => return Ok(ParseResult::Help),
            "-v" | "--verbose" => verbose = true,
            "--rom" => {
                let path = args
                    .next()
                    .ok_or_else(|| "missing value for --rom".to_string())?;
                set_command(&mut command, Command::RunRom(PathBuf::from(path)))?;
            }
            "random" => set_command(
                &mut command,
                Command::Random {
                    count: None,
                    seed: 0,
                },
            )?,
            "--count" | "--seed" => {
                let value = next_number(&mut args, &text)?;
                let Some(Command::Random { count, seed }) = command.as_mut() else {
                    return Err(format!("{text} is only valid after `random`"));
                };
                if text == "--count" {
                    *count = Some(value);
                } else {
                    *seed = value;
                }
            }
            other if other.starts_with('-') => return Err(format!("unknown option: {other}")),
            other => {
                let word = parse_literal(other).map_err(|error| error.to_string())?;
                set_command(&mut command, Command::Disassemble(word))?;
            }
        }
    }

    Ok(ParseResult::Command(CliArgs {
        command: command.unwrap_or(Command::RunBuiltins),
        verbose,
    }))
}

fn set_command(slot: &mut Option<Command>, command: Command) -> Result<(), String> {
    if slot.is_some() {
        return Err("multiple commands provided".to_string());
    }
    *slot = Some(command);
    Ok(())
}

fn next_number(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<u64, String> {
    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {flag}"))?;
    let text = value.to_string_lossy();
    text.parse()
        .map_err(|_| format!("invalid value for {flag}: {text}"))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn disassemble(word: u32) {
    println!("Disassembling single instruction {word:x} ({word}):");
    println!("{}", Decoder::decode(word));
}

fn run_random(count: Option<u64>, seed: u64) {
    println!("Random instruction mode (seed {seed})");
    let mut fuzzer = InstructionFuzzer::new(seed);
    for _ in 0..count.unwrap_or(u64::MAX) {
        disassemble(fuzzer.next_word());
        println!();
    }
}

fn print_result(result: &ProgramResult) {
    println!("{result}");
    println!("  {}", result.register_dump());
    println!("  {}", result.diag);
}

fn run_builtins(config: &SimConfig) -> Result<(), i32> {
    println!("OSOROM simulator starting");
    let results: Vec<ProgramResult> = BUILTIN_PROGRAMS
        .iter()
        .enumerate()
        .map(|(index, program)| {
            println!(
                "Running test program #{index}: {} ({})",
                program.name, program.description
            );
            let result = run_program(program.name, program.words, config);
            print_result(&result);
            result
        })
        .collect();

    let summary = RunSummary::of(&results);
    println!();
    println!("Summary: {summary} (total: {})", summary.total());
    println!("OSOROM simulator terminating");

    if summary.failed == 0 {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_rom(path: &Path, config: &SimConfig) -> Result<(), i32> {
    let rom = load_rom(path).map_err(|error| {
        eprintln!("error: {error}");
        1
    })?;
    let result = run_program(&path.display().to_string(), &rom, config);
    print_result(&result);
    if result.passed() {
        Ok(())
    } else {
        Err(1)
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(args)) => {
            init_logging(args.verbose);
            let config = SimConfig::default();
            let result = match args.command {
                Command::RunBuiltins => run_builtins(&config),
                Command::Random { count, seed } => {
                    run_random(count, seed);
                    Ok(())
                }
                Command::RunRom(path) => run_rom(&path, &config),
                Command::Disassemble(word) => {
                    disassemble(word);
                    Ok(())
                }
            };
            result.err().unwrap_or(0)
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ParseResult, String> {
        parse_args(args.iter().map(OsString::from))
    }

    fn command(args: &[&str]) -> CliArgs {
        match parse(args).expect("valid arguments") {
            ParseResult::Command(args) => args,
            ParseResult::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn no_arguments_runs_builtins() {
        assert_eq!(
            command(&[]),
            CliArgs {
                command: Command::RunBuiltins,
                verbose: false,
            }
        );
    }

    #[test]
    fn literal_selects_disassembly() {
        assert_eq!(
            command(&["0xD1183C00"]).command,
            Command::Disassemble(0xD118_3C00)
        );
        assert_eq!(command(&["-v", "010"]).command, Command::Disassemble(8));
        assert!(command(&["--verbose", "5"]).verbose);
    }

    #[test]
    fn random_accepts_count_and_seed() {
        assert_eq!(
            command(&["random", "--seed", "7", "--count", "3"]).command,
            Command::Random {
                count: Some(3),
                seed: 7,
            }
        );
        assert_eq!(
            command(&["random"]).command,
            Command::Random {
                count: None,
                seed: 0,
            }
        );
    }

    #[test]
    fn rom_takes_a_path() {
        assert_eq!(
            command(&["--rom", "prog.rom"]).command,
            Command::RunRom(PathBuf::from("prog.rom"))
        );
        let error = parse(&["--rom"]).expect_err("missing path");
        assert!(error.contains("missing value"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&["--count", "3"])
            .expect_err("count without random")
            .contains("only valid after"));
        assert!(parse(&["1", "2"])
            .expect_err("two literals")
            .contains("multiple commands"));
        assert!(parse(&["--bogus"])
            .expect_err("unknown flag")
            .contains("unknown option"));
        assert!(parse(&["0xZZ"])
            .expect_err("bad literal")
            .contains("invalid integer literal"));
        assert!(parse(&["random", "--count", "many"]).is_err());
    }

    #[test]
    fn help_short_circuits() {
        assert!(matches!(
            parse(&["random", "--help"]),
            Ok(ParseResult::Help)
        ));
    }
}
