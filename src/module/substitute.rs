//! Variable substitution
//!
//! Operation strings are split on single spaces. A token starting with `$`
//! names a variable; it is replaced by the host value, else the module
//! value, else left exactly as written. Empty values count as unset. Replacement is a single pass: a
//! substituted value is never scanned again.

use super::env::{Environment, HostEnv};

const SIGIL: char = '$';

/// Substitute `$NAME` tokens in `input`
pub fn substitute(input: &str, env: &Environment) -> String {
    if !input.contains(SIGIL) {
        return input.to_string();
    }

    input
        .split(' ')
        .map(|token| match token.strip_prefix(SIGIL) {
            Some(name) if !name.is_empty() => {
                env.get(name, None)
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| token.to_string())
            }
            _ => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Substitute `${NAME}` references in an artifact URL against the host
/// environment only. Unset names are kept literally.
pub fn substitute_braced(input: &str, host: &HostEnv) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match host.var(name) {
                    Some(value) => result.push_str(&value),
                    None => result.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}
