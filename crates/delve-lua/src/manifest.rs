//! Handler manifest parsing for Lua scripts.
//!
//! A script declares its event subscriptions in a comment header at the top
//! of the file:
//!
//! ```lua
//! -- subscribe: entity_died, item_picked_up
//! -- handler: on_death, on_pickup
//!
//! function on_death(event, game)
//!     game.emit_message("something died")
//! end
//!
//! function on_pickup(event, game)
//! end
//! ```
//!
//! `subscribe:` and `handler:` lists are paired positionally: the first
//! event type goes with the first handler name, and so on. Both directives
//! may repeat and may split their lists across lines; the header ends at
//! the first non-comment line.

use std::collections::HashSet;

use regex::Regex;

use crate::error::{LuaResult, LuaRuntimeError};

/// One positional pairing from a script's manifest header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerPair {
    pub event_type: String,
    pub entry_point: String,
}

/// Parses manifest headers and function declarations from Lua source.
pub struct ManifestParser {
    /// Matches `function name(`, `function M.name(`, `local function name(`
    function_re: Regex,
}

impl Default for ManifestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestParser {
    pub fn new() -> Self {
        Self {
            function_re: Regex::new(r"(?m)^[ \t]*(?:local\s+)?function\s+(?:\w+\.)?(\w+)\s*\(")
                .unwrap(),
        }
    }

    /// Parse the leading comment header into positional pairs.
    ///
    /// Returns an empty vec for scripts with no manifest; errors when the
    /// `subscribe:` and `handler:` lists disagree in length.
    pub fn parse(&self, source: &str) -> LuaResult<Vec<HandlerPair>> {
        let mut event_types = Vec::new();
        let mut entry_points = Vec::new();

        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.starts_with("--") {
                break;
            }
            let body = trimmed.trim_start_matches('-').trim();
            if let Some(list) = body.strip_prefix("subscribe:") {
                event_types.extend(split_list(list));
            } else if let Some(list) = body.strip_prefix("handler:") {
                entry_points.extend(split_list(list));
            }
        }

        if event_types.len() != entry_points.len() {
            return Err(LuaRuntimeError::Manifest(format!(
                "{} subscribe entries but {} handler entries",
                event_types.len(),
                entry_points.len()
            )));
        }

        Ok(event_types
            .into_iter()
            .zip(entry_points)
            .map(|(event_type, entry_point)| HandlerPair { event_type, entry_point })
            .collect())
    }

    /// All function names declared anywhere in the source.
    pub fn declared_functions(&self, source: &str) -> HashSet<String> {
        self.function_re
            .captures_iter(source)
            .map(|c| c[1].to_string())
            .collect()
    }
}

fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_positional() {
        let parser = ManifestParser::new();
        let pairs = parser
            .parse(
                "-- subscribe: entity_died, item_picked_up\n\
                 -- handler: on_death, on_pickup\n\
                 function on_death(event, game) end\n\
                 function on_pickup(event, game) end\n",
            )
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                HandlerPair {
                    event_type: "entity_died".into(),
                    entry_point: "on_death".into()
                },
                HandlerPair {
                    event_type: "item_picked_up".into(),
                    entry_point: "on_pickup".into()
                },
            ]
        );
    }

    #[test]
    fn directives_may_split_across_lines() {
        let parser = ManifestParser::new();
        let pairs = parser
            .parse(
                "-- subscribe: entity_died\n\
                 -- subscribe: gather_completed\n\
                 -- handler: on_death\n\
                 -- handler: on_gather\n\
                 function on_death() end\n\
                 function on_gather() end\n",
            )
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].event_type, "gather_completed");
        assert_eq!(pairs[1].entry_point, "on_gather");
    }

    #[test]
    fn header_ends_at_first_code_line() {
        let parser = ManifestParser::new();
        let pairs = parser
            .parse(
                "-- subscribe: entity_died\n\
                 -- handler: on_death\n\
                 local x = 1\n\
                 -- subscribe: ignored\n\
                 -- handler: also_ignored\n\
                 function on_death() end\n",
            )
            .unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn mismatched_lists_error() {
        let parser = ManifestParser::new();
        let err = parser
            .parse("-- subscribe: a, b\n-- handler: only_one\n")
            .unwrap_err();
        assert!(matches!(err, LuaRuntimeError::Manifest(_)));
    }

    #[test]
    fn no_manifest_means_no_pairs() {
        let parser = ManifestParser::new();
        assert!(parser.parse("function tick() end\n").unwrap().is_empty());
    }

    #[test]
    fn declared_functions_include_local_and_dotted() {
        let parser = ManifestParser::new();
        let fns = parser.declared_functions(
            "function a() end\nlocal function b() end\nfunction M.c() end\n",
        );
        assert!(fns.contains("a") && fns.contains("b") && fns.contains("c"));
    }
}
