//! Pre-filtering of raw invocation tokens.
//!
//! The process may be started by an outer command dispatcher that shares the
//! same argument vector and has flags of its own. Only tokens naming an
//! option known to the registry are handed on to the config resolver.

use crate::registry::OptionRegistry;

/// Base option name of a token: leading dashes stripped, any `=value`
/// suffix dropped, and `-` normalized to `_`.
pub fn option_name(token: &str) -> String {
    let stripped = token.trim_start_matches('-');
    let name = stripped.split_once('=').map_or(stripped, |(name, _)| name);
    name.replace('-', "_")
}

/// Keeps the tokens whose base name is registered, preserving their order.
pub fn filter_args<S: AsRef<str>>(registry: &OptionRegistry, tokens: &[S]) -> Vec<String> {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .filter(|token| registry.contains(&option_name(token)))
        .map(str::to_string)
        .collect()
}
