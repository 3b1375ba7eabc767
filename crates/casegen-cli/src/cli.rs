//! Command-line definition

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Build the `casegen` command
#[must_use]
pub fn command() -> Command {
    Command::new("casegen")
        .version(crate::VERSION)
        .about("Generate test points and test cases from a requirement document")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML settings file with [llm] and [pipeline] sections"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("run")
                .about("Run the full pipeline and stream events as JSON lines")
                .arg(input_arg())
                .arg(focus_arg())
                .arg(
                    Arg::new("requirement")
                        .long("requirement")
                        .help("Additional free-form user requirement"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write normalized test cases to this JSONL file"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Print the planner output for a plain-text requirement (no network)")
                .arg(input_arg())
                .arg(focus_arg()),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate settings; exits non-zero on missing credentials"),
        )
}

fn input_arg() -> Arg {
    Arg::new("input")
        .long("input")
        .short('i')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Requirement document as plain text")
}

fn focus_arg() -> Arg {
    Arg::new("focus")
        .long("focus")
        .short('f')
        .help("Mandatory focus topics, separated by commas, semicolons or newlines")
}

/// Read a global flag from wherever it was given
#[must_use]
pub fn global_flag(matches: &ArgMatches, id: &str) -> bool {
    matches.get_flag(id)
        || matches
            .subcommand()
            .is_some_and(|(_, sub)| sub.get_flag(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn run_arguments() {
        let matches = command()
            .try_get_matches_from([
                "casegen", "run", "-i", "spec.txt", "--focus", "refund, chargeback", "--log-json",
            ])
            .unwrap();
        assert!(global_flag(&matches, "log-json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(
            args.get_one::<PathBuf>("input"),
            Some(&PathBuf::from("spec.txt"))
        );
        assert_eq!(
            args.get_one::<String>("focus").map(String::as_str),
            Some("refund, chargeback")
        );
    }

    #[test]
    fn input_is_required() {
        assert!(command().try_get_matches_from(["casegen", "plan"]).is_err());
    }
}
