//! Command-line definition

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgGroup, Command};
use epm_store::RecordId;
use serde_json::Value;

/// Parse a `key=value` override; the value is read as JSON, falling back
/// to a plain string
///
/// # Errors
/// Missing `=` or an empty key.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected key=value, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn schemas_arg() -> Arg {
    Arg::new("schemas")
        .long("schemas")
        .short('s')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("YAML file declaring parameter classes")
}

fn class_arg() -> Arg {
    Arg::new("class")
        .long("class")
        .short('c')
        .required(true)
        .help("Parameter class (collection) to operate on")
}

fn target_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("id")
            .long("id")
            .value_parser(value_parser!(RecordId))
            .help("Record identifier"),
    )
    .arg(Arg::new("usertag").long("usertag").help("Record usertag"))
    .group(
        ArgGroup::new("target")
            .args(["id", "usertag"])
            .required(true),
    )
}

/// The `epm` command tree
#[must_use]
pub fn build() -> Command {
    Command::new("epm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Experiment parameter records: content-deduplicated, schema-reconciled")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Config file (default: platform config dir)"),
        )
        .arg(
            Arg::new("yes")
                .long("yes")
                .short('y')
                .action(ArgAction::SetTrue)
                .help("Confirm every schema change and deletion without asking"),
        )
        .subcommand(Command::new("init-config").about("Write a default config file if none exists"))
        .subcommand(
            Command::new("hash")
                .about("Print the record id for a set of parameters, storing it on first use")
                .arg(schemas_arg())
                .arg(class_arg())
                .arg(
                    Arg::new("set")
                        .long("set")
                        .action(ArgAction::Append)
                        .value_parser(parse_assignment)
                        .help("Override a default, key=value (JSON or plain string)"),
                )
                .arg(Arg::new("usertag").long("usertag").help("Label for this record")),
        )
        .subcommand(
            Command::new("ids")
                .about("List every record id of a class")
                .arg(schemas_arg())
                .arg(class_arg()),
        )
        .subcommand(target_args(
            Command::new("show")
                .about("Print one stored record")
                .arg(schemas_arg())
                .arg(class_arg()),
        ))
        .subcommand(target_args(
            Command::new("delete")
                .about("Delete one stored record after confirmation")
                .arg(schemas_arg())
                .arg(class_arg()),
        ))
        .subcommand(
            Command::new("dedup")
                .about("Find, and optionally remove, records with identical fields")
                .arg(schemas_arg())
                .arg(class_arg())
                .arg(
                    Arg::new("remove")
                        .long("remove")
                        .action(ArgAction::SetTrue)
                        .help("Delete duplicates instead of listing them"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_tree_is_consistent() {
        build().debug_assert();
    }

    #[test]
    fn assignment_values_are_json_when_possible() {
        assert_eq!(parse_assignment("a=3").unwrap(), ("a".into(), json!(3)));
        assert_eq!(parse_assignment("flag=true").unwrap(), ("flag".into(), json!(true)));
        assert_eq!(parse_assignment("lr=[0.1, 0.2]").unwrap(), ("lr".into(), json!([0.1, 0.2])));
        assert_eq!(parse_assignment("b=zz").unwrap(), ("b".into(), json!("zz")));
        assert_eq!(parse_assignment("b=").unwrap(), ("b".into(), json!("")));
        assert_eq!(parse_assignment("eq=x=y").unwrap(), ("eq".into(), json!("x=y")));
    }

    #[test]
    fn malformed_assignments_rejected() {
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn show_requires_a_target() {
        let result = build().try_get_matches_from(["epm", "show", "-s", "s.yml", "-c", "C"]);
        assert!(result.is_err());
    }
}
