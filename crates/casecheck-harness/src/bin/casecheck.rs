//! CLI entrypoint for casecheck.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use casecheck_core::render::{self, DumpParams, RenderOptions};
use casecheck_core::split_command;
use casecheck_harness::check::{self, CheckError, FileCheck};
use casecheck_harness::config::HarnessConfig;
use casecheck_harness::store;
use casecheck_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, default_run_id};
use clap::{Parser, Subcommand};

/// Upper bound on lines read by `write --read-stdin`.
const STDIN_LINE_CAP: usize = 10_000;

/// Record, check and update golden cases for command-line programs.
#[derive(Debug, Parser)]
#[command(name = "casecheck")]
#[command(about = "Record, check and update golden cases for command-line programs")]
struct Cli {
    /// Suppress progress lines.
    #[arg(long, short = 's', global = true)]
    silent: bool,
    /// Escape control and non-ASCII characters when printing text.
    #[arg(long, global = true)]
    not_raw: bool,
    /// Kill a child that runs longer than this many milliseconds (0 disables).
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Ignore bytes after the last field of a case file.
    #[arg(long, global = true)]
    lenient: bool,
    /// Append structured JSONL events to this file.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a single case file.
    Check { file: PathBuf },
    /// Check every case file in a directory.
    CheckFolder {
        dir: PathBuf,
        /// Print the names of failed cases as a list at the end.
        #[arg(long)]
        as_list: bool,
    },
    /// Print a case in human-readable form.
    Dump {
        file: PathBuf,
        #[arg(long)]
        no_stdout: bool,
        #[arg(long)]
        no_stderr: bool,
        #[arg(long)]
        no_stdin: bool,
        /// Shorthand for --no-stdout --no-stderr --no-stdin.
        #[arg(long)]
        no_std: bool,
        /// Also print the byte length of every text field.
        #[arg(long)]
        byte_length: bool,
    },
    /// Run a command and record the result as a new case.
    Write {
        /// Output case path (defaults to the next conventional name in the current directory).
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Use this file's content as the command's stdin.
        #[arg(long, conflicts_with = "read_stdin")]
        stdin_file: Option<PathBuf>,
        /// Read the command's stdin interactively.
        #[arg(long)]
        read_stdin: bool,
        /// Read the command line from this file instead of the trailing arguments.
        #[arg(long)]
        command_file: Option<PathBuf>,
        /// Command and its arguments.
        #[arg(last = true)]
        argv: Vec<String>,
    },
    /// Re-run a case and overwrite its expectations.
    Update { file: PathBuf },
    /// Print the next case name the directory's convention would produce.
    NextName {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

struct Session {
    config: HarnessConfig,
    silent: bool,
    log: Option<LogEmitter>,
}

impl Session {
    fn progress(&self, message: &str) {
        if !self.silent {
            eprintln!("{message}");
        }
    }

    fn emit(&mut self, entry: LogEntry) -> std::io::Result<()> {
        match self.log.as_mut() {
            Some(emitter) => emitter.emit_entry(entry),
            None => Ok(()),
        }
    }

    fn next_entry(&mut self, level: LogLevel, event: &str) -> LogEntry {
        let trace_id = self
            .log
            .as_mut()
            .map(LogEmitter::trace_id)
            .unwrap_or_default();
        LogEntry::new(trace_id, level, event)
    }

    fn render(&self) -> RenderOptions {
        self.config.render
    }

    fn log_check(
        &mut self,
        path: &Path,
        result: &Result<FileCheck, CheckError>,
    ) -> std::io::Result<()> {
        if self.log.is_none() {
            return Ok(());
        }
        let entry = match result {
            Ok(checked) => {
                let (level, outcome) = if checked.verdict.passed {
                    (LogLevel::Info, Outcome::Pass)
                } else {
                    (LogLevel::Error, Outcome::Fail)
                };
                let mut entry = self
                    .next_entry(level, "case_check")
                    .with_case_path(path)
                    .with_outcome(outcome)
                    .with_duration_ms(duration_ms(checked.elapsed))
                    .with_digest(&checked.digest);
                if !checked.verdict.passed {
                    entry = entry.with_mismatches(&checked.verdict.mismatched_fields());
                }
                entry
            }
            Err(err) => {
                let outcome = if err.is_timeout() {
                    Outcome::Timeout
                } else {
                    Outcome::Error
                };
                self.next_entry(LogLevel::Error, "case_check")
                    .with_case_path(path)
                    .with_outcome(outcome)
                    .with_details(serde_json::json!({ "error": err.to_string() }))
            }
        };
        self.emit(entry)
    }
}

fn duration_ms(elapsed: std::time::Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn quoted(path: &Path) -> String {
    render::quote_name(&path.display().to_string())
}

/// Read stdin lines until EOF, a terminator line (`exit`, `quit`, `^Q`, or
/// an empty line) or [`STDIN_LINE_CAP`] lines. Each kept line ends with `\n`.
fn read_interactive(reader: impl BufRead) -> std::io::Result<String> {
    let mut collected = String::new();
    for line in reader.lines().take(STDIN_LINE_CAP) {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if matches!(line, "exit" | "quit" | "^Q" | "") {
            break;
        }
        collected.push_str(line);
        collected.push('\n');
    }
    Ok(collected)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = HarnessConfig::from_env().with_overrides(cli.lenient, cli.timeout_ms, cli.not_raw);
    let log = match &cli.log {
        Some(path) => Some(LogEmitter::to_file(path, &default_run_id())?),
        None => None,
    };
    let mut session = Session {
        config,
        silent: cli.silent,
        log,
    };

    let result = run(cli.command, &mut session);
    if let Some(emitter) = session.log.as_mut() {
        emitter.flush()?;
    }
    result
}

fn run(command: Command, session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let run_options = session.config.run_options();
    let policy = session.config.decode;

    match command {
        Command::Check { file } => {
            let result = check::check_file(&file, policy, &run_options);
            session.log_check(&file, &result)?;
            let checked = result?;
            if !checked.verdict.passed {
                eprint!(
                    "{}",
                    render::render_verdict(&checked.verdict, session.render())
                );
                return Err(format!("Test {} failed", quoted(&file)).into());
            }
            session.progress(&format!("Test {} passed successfully!", quoted(&file)));
        }
        Command::CheckFolder { dir, as_list } => {
            let render_options = session.render();
            let mut log_error = None;
            let report = check::check_folder(&dir, policy, &run_options, |path, result| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match result {
                    Ok(checked) if checked.verdict.passed => {
                        if !session.silent {
                            println!("Test {} passed successfully!", render::quote_name(&name));
                        }
                    }
                    Ok(checked) => {
                        eprint!(
                            "{}",
                            render::render_verdict(&checked.verdict, render_options)
                        );
                        println!("Test {} failed!", render::quote_name(&name));
                    }
                    Err(err) => {
                        eprintln!("[ERROR] {err}");
                        println!("Test {} failed!", render::quote_name(&name));
                    }
                }
                if let Err(err) = session.log_check(path, result) {
                    log_error.get_or_insert(err);
                }
            })?;
            if let Some(err) = log_error {
                return Err(err.into());
            }

            if as_list {
                let failed = report.failed_names();
                if failed.is_empty() {
                    println!("[EMPTY LIST]");
                } else {
                    println!("{failed:?}");
                }
            }
            let summary = session
                .next_entry(
                    if report.all_passed() {
                        LogLevel::Info
                    } else {
                        LogLevel::Error
                    },
                    "folder_summary",
                )
                .with_outcome(if report.all_passed() {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                })
                .with_details(serde_json::to_value(&report)?);
            session.emit(summary)?;
            session.progress(&format!(
                "{} of {} case(s) passed",
                report.passed.len(),
                report.total()
            ));
            if !report.all_passed() {
                return Err(format!("{} case(s) failed", report.failure_count()).into());
            }
        }
        Command::Dump {
            file,
            no_stdout,
            no_stderr,
            no_stdin,
            no_std,
            byte_length,
        } => {
            let case = store::read_case_file(&file, policy)?;
            let params = DumpParams {
                command: true,
                stdin: !(no_stdin || no_std),
                stdout: !(no_stdout || no_std),
                stderr: !(no_stderr || no_std),
                byte_lengths: byte_length,
            };
            print!("{}", render::render_case(&case, params, session.render()));
        }
        Command::Write {
            output,
            stdin_file,
            read_stdin,
            command_file,
            argv,
        } => {
            let tokens = match &command_file {
                Some(path) => split_command(&std::fs::read_to_string(path)?)?,
                None => argv,
            };
            if tokens.is_empty() {
                return Err("no command given: pass it after `--` or with --command-file".into());
            }

            let stdin = if let Some(path) = &stdin_file {
                std::fs::read_to_string(path)?
            } else if read_stdin {
                if !session.silent {
                    println!("Provide stdin (to finish enter `exit`, `quit` or an empty line):");
                    std::io::stdout().flush()?;
                }
                read_interactive(std::io::stdin().lock())?
            } else {
                String::new()
            };

            let output = match output {
                Some(path) => path,
                None => store::next_case_path(Path::new("."))?,
            };

            session.progress(&format!("[CMD] {}", tokens.join(" ")));
            let case = check::record_case(&tokens, &stdin, &run_options)?;
            let bytes = store::write_case_file(&output, &case)?;
            let entry = session
                .next_entry(LogLevel::Info, "case_write")
                .with_case_path(&output)
                .with_outcome(Outcome::Pass)
                .with_exit_code(case.expected_exit_code())
                .with_digest(&store::case_digest(&bytes));
            session.emit(entry)?;
            session.progress(&format!(
                "Successfully wrote test case to file {}!",
                quoted(&output)
            ));
        }
        Command::Update { file } => {
            let refreshed = check::update_case_file(&file, policy, &run_options)?;
            let bytes = store::read_case_bytes(&file)?;
            let entry = session
                .next_entry(LogLevel::Info, "case_update")
                .with_case_path(&file)
                .with_outcome(Outcome::Pass)
                .with_exit_code(refreshed.expected_exit_code())
                .with_digest(&store::case_digest(&bytes));
            session.emit(entry)?;
            session.progress(&format!("Updated test case {}", quoted(&file)));
        }
        Command::NextName { dir } => {
            let path = store::next_case_path(&dir)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("{name}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_stdin_stops_at_terminators() {
        for terminator in ["exit", "quit", "^Q", ""] {
            let input = format!("one\ntwo\n{terminator}\nthree\n");
            assert_eq!(
                read_interactive(input.as_bytes()).unwrap(),
                "one\ntwo\n",
                "{terminator:?}"
            );
        }
    }

    #[test]
    fn interactive_stdin_stops_at_eof() {
        assert_eq!(read_interactive("a\r\nb".as_bytes()).unwrap(), "a\nb\n");
    }

    #[test]
    fn interactive_stdin_is_capped() {
        let input = "x\n".repeat(STDIN_LINE_CAP + 5);
        assert_eq!(
            read_interactive(input.as_bytes()).unwrap().len(),
            STDIN_LINE_CAP * 2
        );
    }

    #[test]
    fn cli_parses_trailing_command() {
        let cli = Cli::try_parse_from([
            "casecheck", "--silent", "write", "-o", "a.case", "--", "echo", "-n", "hi",
        ])
        .unwrap();
        assert!(cli.silent);
        match cli.command {
            Command::Write { output, argv, .. } => {
                assert_eq!(output, Some(PathBuf::from("a.case")));
                assert_eq!(argv, ["echo", "-n", "hi"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
