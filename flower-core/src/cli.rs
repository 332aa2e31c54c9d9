//! Command-line surface generated from the option registry.
//!
//! Every registered option becomes a `--name=value` argument. Boolean options
//! may be given bare (`--debug`) and multiple-valued options take a
//! comma-separated list. Dashed spellings (`--max-tasks`) are aliases.

use clap::builder::BoolishValueParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::config::PartialConfig;
use crate::error::{Error, Result};
use crate::registry::{OptionKind, OptionRegistry, OptionSpec, OptionValue};

pub fn command(registry: &OptionRegistry) -> Command {
    let command = Command::new("flower")
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true);

    registry.iter().fold(command, |command, spec| command.arg(arg(spec)))
}

fn arg(spec: &OptionSpec) -> Arg {
    let name = spec.name().to_string();
    let mut help = spec.help().to_string();
    if let Some(default) = spec.default_value() {
        help.push_str(&format!(" (default {})", default));
    }

    let mut arg = Arg::new(name.clone())
        .long(name.clone())
        .help(help)
        .require_equals(true)
        .action(ArgAction::Set);

    if name.contains('_') {
        arg = arg.alias(name.replace('_', "-"));
    }

    arg = match spec.kind() {
        OptionKind::Int => arg.value_parser(value_parser!(i64)),
        OptionKind::Float => arg.value_parser(value_parser!(f64)),
        OptionKind::Bool => arg
            .value_parser(BoolishValueParser::new())
            .num_args(0..=1)
            .default_missing_value("true"),
        OptionKind::Str => arg.value_parser(value_parser!(String)),
    };

    if spec.is_multiple() {
        arg = arg.value_delimiter(',');
    }
    arg
}

/// Parses filtered tokens into a layer of typed values.
///
/// Tokens written with a single dash (`-debug`) are accepted like their
/// double-dash form. Only options present on the command line end up in the
/// returned layer.
pub fn parse<S: AsRef<str>>(registry: &OptionRegistry, tokens: &[S]) -> Result<PartialConfig> {
    let tokens = tokens.iter().map(|token| {
        let token = token.as_ref();
        if token.starts_with('-') {
            format!("--{}", token.trim_start_matches('-'))
        } else {
            token.to_string()
        }
    });

    let matches = command(registry)
        .try_get_matches_from(tokens)
        .map_err(cli_error)?;

    let mut partial = PartialConfig::new("command line");
    for spec in registry.iter() {
        if let Some(value) = matched_value(&matches, spec) {
            partial.insert(spec.name(), value);
        }
    }
    Ok(partial)
}

fn matched_value(matches: &ArgMatches, spec: &OptionSpec) -> Option<OptionValue> {
    let name = spec.name();
    if matches.value_source(name) != Some(ValueSource::CommandLine) {
        return None;
    }

    let values: Vec<OptionValue> = match spec.kind() {
        OptionKind::Int => matches
            .get_many::<i64>(name)?
            .map(|v| OptionValue::Int(*v))
            .collect(),
        OptionKind::Float => matches
            .get_many::<f64>(name)?
            .map(|v| OptionValue::Float(*v))
            .collect(),
        OptionKind::Bool => matches
            .get_many::<bool>(name)?
            .map(|v| OptionValue::Bool(*v))
            .collect(),
        OptionKind::Str => matches
            .get_many::<String>(name)?
            .map(|v| OptionValue::Str(v.clone()))
            .collect(),
    };

    if spec.is_multiple() {
        Some(OptionValue::List(values))
    } else {
        values.into_iter().last()
    }
}

fn cli_error(err: clap::Error) -> Error {
    let arg = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg.clone(),
        _ => String::new(),
    };

    if err.kind() == ErrorKind::UnknownArgument {
        return Error::unknown_option(arg);
    }

    let name = arg
        .trim_start_matches('-')
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default()
        .to_string();
    let reason = err
        .to_string()
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string();
    Error::invalid_option(name, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OptionRegistry {
        OptionRegistry::flower().unwrap()
    }

    #[test]
    fn command_is_well_formed() {
        command(&registry()).debug_assert();
    }

    #[test]
    fn parses_values_by_kind() {
        let partial = parse(
            &registry(),
            &["--port=8000", "--inspect_timeout=2.5", "--db=tasks", "--persistent=yes"],
        )
        .unwrap();
        assert_eq!(partial.get("port"), Some(&OptionValue::Int(8000)));
        assert_eq!(partial.get("inspect_timeout"), Some(&OptionValue::Float(2.5)));
        assert_eq!(partial.get("db"), Some(&OptionValue::Str("tasks".into())));
        assert_eq!(partial.get("persistent"), Some(&OptionValue::Bool(true)));
        assert_eq!(partial.len(), 4);
    }

    #[test]
    fn bare_boolean_flag_means_true() {
        let partial = parse(&registry(), &["--debug", "-xheaders", "--auto_refresh=off"]).unwrap();
        assert_eq!(partial.get("debug"), Some(&OptionValue::Bool(true)));
        assert_eq!(partial.get("xheaders"), Some(&OptionValue::Bool(true)));
        assert_eq!(partial.get("auto_refresh"), Some(&OptionValue::Bool(false)));
    }

    #[test]
    fn rejects_malformed_values() {
        for tokens in [["--port=eighty"], ["--debug=maybe"], ["--port"], ["--inspect_timeout=x"]] {
            let err = parse(&registry(), &tokens).unwrap_err();
            assert!(matches!(err, Error::InvalidOption { .. }), "{:?}: {}", tokens, err);
        }
    }

    #[test]
    fn invalid_value_names_the_option() {
        match parse(&registry(), &["--max-tasks=lots"]).unwrap_err() {
            Error::InvalidOption { name, .. } => assert_eq!(name, "max_tasks"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn dashed_aliases_resolve_to_option() {
        let partial = parse(&registry(), &["--max-tasks=50", "--inspect-timeout=10"]).unwrap();
        assert_eq!(partial.get("max_tasks"), Some(&OptionValue::Int(50)));
        assert_eq!(partial.get("inspect_timeout"), Some(&OptionValue::Float(10.0)));
    }

    #[test]
    fn multiple_options_split_on_commas() {
        let partial = parse(&registry(), &["--basic_auth=alice:pw,bob:pw"]).unwrap();
        assert_eq!(
            partial.get("basic_auth"),
            Some(&OptionValue::List(vec![
                OptionValue::Str("alice:pw".into()),
                OptionValue::Str("bob:pw".into()),
            ]))
        );
    }

    #[test]
    fn absent_options_stay_out_of_the_layer() {
        let no_args: [&str; 0] = [];
        assert!(parse(&registry(), &no_args).unwrap().is_empty());
    }

    #[test]
    fn help_lists_options_and_defaults() {
        let help = command(&registry()).render_help().to_string();
        assert!(help.contains("--port"));
        assert!(help.contains("(default 5555)"));
        assert!(help.contains("--basic_auth"));
    }
}
