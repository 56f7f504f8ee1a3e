use clap::{ArgAction, ArgGroup, Parser};
use anyhow::{Context, Result};
use rxrename::Options;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};

/// Command line arguments parser
#[derive(Parser, Debug)]
#[command(author, version, about = "Rename files or directories using regular expressions")]
#[command(long_about = "Rename files or directories using regular expressions.\n\
Does nothing without the --force option.\n\n\
example:\n    rxrename '(.*)\\.py' '\\g<1>_renamed.py'")]
#[command(name = "rxrename")]
#[command(group(ArgGroup::new("kind").args(["dirs", "both"])))]
pub struct Args {
    /// Expression: pattern, matched at the start of each name
    pub pattern: String,

    /// Expression: replace (a transform over `x` with --func)
    pub replace: String,

    /// Expression: skip names that also match this
    #[arg(long = "nomatch", value_name = "REGEX")]
    pub nomatch: Option<String>,

    /// List of names to exclude
    #[arg(long = "exclude", value_name = "NAME", num_args = 0.., action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Top level directory
    #[arg(short = 't', long = "top", value_name = "DIR")]
    pub top: Option<PathBuf>,

    /// Search recursively
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Match directories
    #[arg(short = 'd', long = "dirs")]
    pub dirs: bool,

    /// Match directories and files
    #[arg(short = 'b', long = "both")]
    pub both: bool,

    /// Rename files
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Use git mv
    #[arg(short = 'g', long = "git")]
    pub git: bool,

    /// Ignore case
    #[arg(short = 'i', long = "ignorecase")]
    pub ignorecase: bool,

    /// Only log errors
    #[arg(short = 's', long = "silent", conflicts_with = "verbose")]
    pub silent: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Replace is the body of a transform over the name `x`, e.g. "x.upper()"
    #[arg(short = 'x', long = "func")]
    pub func: bool,
}

impl Args {
    /// Minimum log level selected by --silent / --verbose
    pub fn level(&self) -> Level {
        if self.silent {
            Level::ERROR
        } else if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Resolve the arguments into options for the rename pipeline
    ///
    /// # Returns
    /// * `Result<Options>` - Options with the entry kinds and top directory resolved
    pub fn to_options(&self) -> Result<Options> {
        let top = match &self.top {
            Some(top) => top.clone(),
            None => env::current_dir().context("Failed to read the current directory")?,
        };
        // A missing top is reported by the pipeline with the path as given
        let top = fs::canonicalize(&top).unwrap_or(top);

        let (dirs, files) = if self.both {
            (true, true)
        } else if self.dirs {
            (true, false)
        } else {
            (false, true)
        };

        Ok(Options {
            pattern: self.pattern.clone(),
            replace: self.replace.clone(),
            nomatch: self.nomatch.clone(),
            exclude: self.exclude.clone(),
            top,
            recursive: self.recursive,
            dirs,
            files,
            force: self.force,
            git: self.git,
            ignore_case: self.ignorecase,
            func: self.func,
        })
    }

    /// Log every option as given, with the resolved top directory
    ///
    /// # Arguments
    /// * `options` - Options resolved from these arguments
    pub fn log_options(&self, options: &Options) {
        for line in self.option_lines(options) {
            info!("{}", line);
        }
    }

    fn option_lines(&self, options: &Options) -> Vec<String> {
        fn line(name: &str, value: impl std::fmt::Display) -> String {
            format!("{:<10} = {}", name, value)
        }

        let mut lines = vec![
            line("pattern", &self.pattern),
            line("replace", &self.replace),
            line("nomatch", self.nomatch.as_deref().unwrap_or("None")),
        ];
        for (i, item) in self.exclude.iter().enumerate() {
            lines.push(line(&format!("exclude[{}]", i), item));
        }
        lines.extend([
            line("top", options.top.display()),
            line("recursive", self.recursive),
            line("dirs", self.dirs),
            line("both", self.both),
            line("force", self.force),
            line("git", self.git),
            line("ignorecase", self.ignorecase),
            line("silent", self.silent),
            line("func", self.func),
        ]);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rxrename").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_to_files_in_current_directory() {
        let options = parse(&["(.*)", r"\1"]).to_options().unwrap();
        assert!(options.files);
        assert!(!options.dirs);
        assert!(!options.force);
        assert_eq!(options.top, fs::canonicalize(env::current_dir().unwrap()).unwrap());
    }

    #[test]
    fn test_dirs_and_both() {
        let options = parse(&["a", "b", "-d"]).to_options().unwrap();
        assert!(options.dirs && !options.files);

        let options = parse(&["a", "b", "--both"]).to_options().unwrap();
        assert!(options.dirs && options.files);
    }

    #[test]
    fn test_dirs_conflicts_with_both() {
        let result = Args::try_parse_from(["rxrename", "a", "b", "-d", "-b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "(.*)", "x.upper()", "--nomatch", "keep", "--exclude", "one", "two", "-t", "/", "-r",
            "-f", "-g", "-i", "-x",
        ]);
        assert_eq!(args.level(), Level::INFO);
        let options = args.to_options().unwrap();
        assert_eq!(options.nomatch.as_deref(), Some("keep"));
        assert_eq!(options.exclude, vec!["one", "two"]);
        assert_eq!(options.top, PathBuf::from("/"));
        assert!(options.recursive && options.force && options.git && options.ignore_case && options.func);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["a", "b", "-s"]).level(), Level::ERROR);
        assert_eq!(parse(&["a", "b", "-v"]).level(), Level::DEBUG);
        assert!(Args::try_parse_from(["rxrename", "a", "b", "-s", "-v"]).is_err());
    }

    #[test]
    fn test_option_lines_show_the_flags_as_given() {
        let args = parse(&["a", "b", "--both", "-s", "--exclude", "one", "-t", "/"]);
        let options = args.to_options().unwrap();
        let lines = args.option_lines(&options);

        assert!(lines.contains(&"pattern    = a".to_string()));
        assert!(lines.contains(&"exclude[0] = one".to_string()));
        assert!(lines.contains(&"top        = /".to_string()));
        assert!(lines.contains(&"dirs       = false".to_string()));
        assert!(lines.contains(&"both       = true".to_string()));
        assert!(lines.contains(&"silent     = true".to_string()));
        assert!(!lines.iter().any(|line| line.starts_with("files")));
    }

    #[test]
    fn test_missing_top_is_kept_verbatim() {
        let options = parse(&["a", "b", "--top", "/no/such/dir"]).to_options().unwrap();
        assert_eq!(options.top, PathBuf::from("/no/such/dir"));
    }
}
