//! Script introspection
//!
//! A line-oriented heuristic over shell source, not a shell parser. The
//! grammar, applied to each line in order:
//!
//! 1. a line starting with `#` appends the rest of the line (and a newline)
//!    to the pending comment
//! 2. a line containing `function` defines a function named by the token
//!    after the keyword, with `()` and `{` stripped; it takes a copy of the
//!    pending comment as documentation and becomes the current function.
//!    The pending comment is kept.
//! 3. a line containing a positional reference (`$1`, `$2`, ...) while a
//!    function is current records a parameter: the last word before the
//!    first `=` maps to the reference
//! 4. any other line clears the pending comment
//!
//! Documentation therefore only sticks when the comment block directly
//! precedes the definition. Redefining a function replaces the earlier one.

use std::collections::BTreeMap;

const COMMENT: char = '#';
const KEYWORD: &str = "function";

/// A function found in a script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub doc: String,
    /// Parameter name to positional reference, e.g. `port` -> `$1`
    pub params: BTreeMap<String, String>,
}

impl FunctionDescriptor {
    /// Parameter names ordered by their positional index
    pub fn ordered_params(&self) -> Vec<(&str, usize)> {
        let mut params: Vec<(&str, usize)> = self
            .params
            .iter()
            .filter_map(|(name, token)| Some((name.as_str(), positional_index(token)?)))
            .collect();
        params.sort_by_key(|&(name, index)| (index, name));
        params
    }
}

/// Parse script source into its function table
pub fn introspect(source: &str) -> BTreeMap<String, FunctionDescriptor> {
    let mut functions: BTreeMap<String, FunctionDescriptor> = BTreeMap::new();
    let mut comment = String::new();
    let mut current: Option<String> = None;

    for line in source.lines() {
        if let Some(rest) = line.strip_prefix(COMMENT) {
            comment.push_str(rest);
            comment.push('\n');
            continue;
        }

        if line.contains(KEYWORD)
            && let Some(name) = function_name(line)
        {
            functions.insert(
                name.clone(),
                FunctionDescriptor {
                    name: name.clone(),
                    doc: comment.clone(),
                    params: BTreeMap::new(),
                },
            );
            current = Some(name);
            continue;
        }

        if let Some(token) = find_positional(line)
            && let Some(func) = current.as_ref().and_then(|n| functions.get_mut(n))
            && let Some(param) = assignment_target(line)
        {
            func.params.insert(param.to_string(), token.to_string());
            continue;
        }

        comment.clear();
    }

    functions
}

/// Name following the `function` keyword
fn function_name(line: &str) -> Option<String> {
    let mut words = line.split_whitespace();
    words.find(|w| *w == KEYWORD)?;
    let raw = words.next()?;
    let name = raw.trim_end_matches('{').trim_end_matches("()");
    (!name.is_empty()).then(|| name.to_string())
}

/// First `$<digits>` token in the line
fn find_positional(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'$' {
            continue;
        }
        let digits = bytes[i + 1..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits > 0 {
            return Some(&line[i..i + 1 + digits]);
        }
    }
    None
}

/// Last whitespace-separated word before the first `=`
fn assignment_target(line: &str) -> Option<&str> {
    let (lhs, _) = line.split_once('=')?;
    lhs.split_whitespace().last()
}

/// `$3` -> 3
pub fn positional_index(token: &str) -> Option<usize> {
    token.strip_prefix('$')?.parse().ok()
}
