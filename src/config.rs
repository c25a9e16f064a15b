//! Report policy loaded from the environment
//!
//! The tool passes its whole command line to the C front end, so its own
//! switches live in the environment instead: `CIDENT_<class>` toggles one
//! class of the report and `CIDENT_all_files` disables per-file origin
//! filtering.

use crate::class::IdentClass;
use tracing::debug;

/// Prefix shared by every setting.
pub const ENV_PREFIX: &str = "CIDENT";

/// Environment variable used for the log filter.
pub const LOG_ENV: &str = "CIDENT_LOG";

/// Immutable reporting policy, built once before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    enabled: [bool; IdentClass::COUNT],
    all_files: bool,
}

impl Default for Policy {
    fn default() -> Self {
        let mut enabled = [true; IdentClass::COUNT];
        for class in IdentClass::all() {
            enabled[class.index()] = class.default_enabled();
        }
        Policy {
            enabled,
            all_files: false,
        }
    }
}

impl Policy {
    /// Build the policy from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| {
            std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
        })
    }

    /// Build the policy from an arbitrary key lookup.
    ///
    /// Keys missing from the lookup keep their compiled-in default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Policy::default();

        for class in IdentClass::all() {
            let key = setting_key(class.name());
            if let Some(value) = lookup(&key) {
                let enabled = parse_bool(&value);
                debug!(%key, enabled, "class setting");
                policy.enabled[class.index()] = enabled;
            }
        }

        let key = setting_key("all_files");
        if let Some(value) = lookup(&key) {
            policy.all_files = parse_bool(&value);
            debug!(%key, all_files = policy.all_files, "cross-file setting");
        }

        policy
    }

    pub fn with_class(mut self, class: IdentClass, enabled: bool) -> Self {
        self.enabled[class.index()] = enabled;
        self
    }

    pub fn with_all_files(mut self, all_files: bool) -> Self {
        self.all_files = all_files;
        self
    }

    pub fn is_enabled(&self, class: IdentClass) -> bool {
        self.enabled[class.index()]
    }

    /// Whether per-file passes evaluate symbols from every origin.
    pub fn all_files(&self) -> bool {
        self.all_files
    }
}

/// `CIDENT_<name>`
pub fn setting_key(name: &str) -> String {
    format!("{ENV_PREFIX}_{name}")
}

/// Empty, `0` and `n`/`N` are false; anything else is true.
pub fn parse_bool(value: &str) -> bool {
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn policy_from(pairs: &[(&str, &str)]) -> Policy {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Policy::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_bool_grammar() {
        assert!(!parse_bool(""));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("n"));
        assert!(!parse_bool("N"));
        assert!(parse_bool("1"));
        assert!(parse_bool("y"));
        assert!(parse_bool("no"));
        assert!(parse_bool("false"));
        assert!(parse_bool("00"));
    }

    #[test]
    fn test_defaults_without_settings() {
        let policy = policy_from(&[]);
        assert_eq!(policy, Policy::default());
        assert!(!policy.all_files());
        assert!(!policy.is_enabled(IdentClass::StructDecl));
        assert!(!policy.is_enabled(IdentClass::UnionDecl));
        assert!(!policy.is_enabled(IdentClass::EnumDecl));
        assert!(policy.is_enabled(IdentClass::ObjMacro));
        assert!(policy.is_enabled(IdentClass::Other));
    }

    #[test]
    fn test_enabling_struct_decl_touches_nothing_else() {
        let policy = policy_from(&[("CIDENT_struct_decl", "1")]);
        for class in IdentClass::all() {
            let expected = class == IdentClass::StructDecl || class.default_enabled();
            assert_eq!(policy.is_enabled(class), expected, "{class}");
        }
    }

    #[test]
    fn test_empty_value_disables() {
        let policy = policy_from(&[("CIDENT_obj_macro", ""), ("CIDENT_other", "N")]);
        assert!(!policy.is_enabled(IdentClass::ObjMacro));
        assert!(!policy.is_enabled(IdentClass::Other));
        assert!(policy.is_enabled(IdentClass::FunMacro));
    }

    #[test]
    fn test_all_files_toggle() {
        assert!(policy_from(&[("CIDENT_all_files", "yes")]).all_files());
        assert!(!policy_from(&[("CIDENT_all_files", "0")]).all_files());
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let policy = policy_from(&[("CIDENT_LOG", "debug"), ("CIDENT_macro", "0")]);
        assert_eq!(policy, Policy::default());
    }
}
