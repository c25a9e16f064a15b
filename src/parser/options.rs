//! Compiler-style command line handling
//!
//! The arguments are the ones a C compiler would get. Options the front end
//! understands are kept, options taking a value are consumed with it, and
//! anything else starting with `-` is ignored.

use std::path::PathBuf;
use tracing::debug;

/// Options that take a separate value and mean nothing to us.
const VALUE_FLAGS: &[&str] = &[
    "-o",
    "-include",
    "-imacros",
    "-isystem",
    "-idirafter",
    "-iquote",
    "-iprefix",
    "-x",
    "-MF",
    "-MT",
    "-MQ",
    "-arch",
    "-target",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontendOptions {
    pub include_dirs: Vec<PathBuf>,
    /// `-D` definitions as `name` or `name=value`, in order.
    pub defines: Vec<String>,
    pub undefs: Vec<String>,
}

impl FrontendOptions {
    /// Split `args` into front-end options and the input files.
    pub fn from_args(args: &[String]) -> (Self, Vec<String>) {
        let mut options = Self::default();
        let mut files = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            if arg == "-" || !arg.starts_with('-') {
                files.push(arg.clone());
                continue;
            }

            if let Some(value) = flag_value(arg, "-I", &mut iter) {
                options.include_dirs.push(PathBuf::from(value));
            } else if let Some(value) = flag_value(arg, "-D", &mut iter) {
                options.defines.push(value);
            } else if let Some(value) = flag_value(arg, "-U", &mut iter) {
                options.undefs.push(value);
            } else if VALUE_FLAGS.contains(&arg.as_str()) {
                let value = iter.next();
                debug!(flag = %arg, ?value, "ignoring option");
            } else {
                debug!(flag = %arg, "ignoring option");
            }
        }

        (options, files)
    }

    /// Predefined macro names after `-U`, with values stripped.
    pub fn macro_names(&self) -> Vec<&str> {
        self.defines
            .iter()
            .map(|define| define.split_once('=').map_or(define.as_str(), |(name, _)| name))
            .filter(|name| {
                !name.is_empty() && !self.undefs.iter().any(|undef| undef.as_str() == *name)
            })
            .collect()
    }
}

/// Value of `-Xvalue` or `-X value`; `None` when `arg` is not `flag`.
fn flag_value<'a>(
    arg: &str,
    flag: &str,
    rest: &mut impl Iterator<Item = &'a String>,
) -> Option<String> {
    let attached = arg.strip_prefix(flag)?;
    if !attached.is_empty() {
        return Some(attached.to_string());
    }
    rest.next().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_files_and_include_dirs() {
        let (options, files) = FrontendOptions::from_args(&args(&[
            "-Iinclude",
            "a.c",
            "-I",
            "/usr/local/include",
            "-",
            "b.c",
        ]));

        assert_eq!(files, ["a.c", "-", "b.c"]);
        assert_eq!(
            options.include_dirs,
            [PathBuf::from("include"), PathBuf::from("/usr/local/include")]
        );
    }

    #[test]
    fn test_defines_and_undefs() {
        let (options, files) = FrontendOptions::from_args(&args(&[
            "-DDEBUG",
            "-D",
            "LEVEL=3",
            "-DGONE",
            "-UGONE",
            "x.c",
        ]));

        assert_eq!(files, ["x.c"]);
        assert_eq!(options.defines, ["DEBUG", "LEVEL=3", "GONE"]);
        assert_eq!(options.macro_names(), ["DEBUG", "LEVEL"]);
    }

    #[test]
    fn test_unknown_and_value_flags_are_skipped() {
        let (options, files) = FrontendOptions::from_args(&args(&[
            "-Wall",
            "-O2",
            "-o",
            "out.o",
            "-include",
            "config.h",
            "-std=gnu11",
            "main.c",
        ]));

        assert_eq!(options, FrontendOptions::default());
        assert_eq!(files, ["main.c"]);
    }

    #[test]
    fn test_trailing_flag_without_value() {
        let (options, files) = FrontendOptions::from_args(&args(&["m.c", "-I"]));
        assert!(options.include_dirs.is_empty());
        assert_eq!(files, ["m.c"]);
    }
}
