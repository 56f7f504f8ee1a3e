use crate::error::{RenameError, SubstitutionError};
use crate::plan::RenameRecord;
use crate::scanner::WalkEntry;
use crate::transform::NameTransform;
use regex::{Captures, Regex, RegexBuilder, Replacer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{error, info};

/// How a new name is computed from an old one
pub enum Rewriter {
    /// Substitution template with `\1` / `\g<name>` backreferences
    Template(String),

    /// Name transform applied to the whole old name
    Function(Box<dyn NameTransform>),
}

impl fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rewriter::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Rewriter::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Everything the matcher needs for one planning pass
#[derive(Debug)]
pub struct MatchOptions {
    /// Primary pattern, matched as a prefix
    pub pattern: Regex,

    /// Names that also match this pattern are skipped
    pub nomatch: Option<Regex>,

    /// Names skipped verbatim, always compared case-sensitively
    pub exclude: BTreeSet<String>,

    /// New name computation
    pub rewriter: Rewriter,
}

impl MatchOptions {
    /// Compile the patterns for a planning pass
    ///
    /// # Arguments
    /// * `pattern` - Primary regular expression
    /// * `nomatch` - Optional exclusion expression
    /// * `ignore_case` - Compile both expressions case-insensitively
    /// * `exclude` - Literal names to skip
    /// * `rewriter` - New name computation
    ///
    /// # Returns
    /// * `Result<MatchOptions, RenameError>` - Options, or the expression that failed to compile
    pub fn new(
        pattern: &str,
        nomatch: Option<&str>,
        ignore_case: bool,
        exclude: impl IntoIterator<Item = String>,
        rewriter: Rewriter,
    ) -> Result<Self, RenameError> {
        let pattern = compile("pattern", pattern, ignore_case)?;
        let nomatch = nomatch
            .map(|expr| compile("nomatch", expr, ignore_case))
            .transpose()?;

        Ok(Self {
            pattern,
            nomatch,
            exclude: exclude.into_iter().collect(),
            rewriter,
        })
    }
}

fn compile(which: &'static str, expression: &str, ignore_case: bool) -> Result<Regex, RenameError> {
    RegexBuilder::new(expression)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|source| RenameError::Pattern {
            which,
            expression: expression.to_string(),
            source,
        })
}

/// True when `regex` matches at the very start of `name`
///
/// Leftmost-first search reports a match starting at 0 whenever one exists.
pub fn prefix_match(regex: &Regex, name: &str) -> bool {
    regex.find(name).is_some_and(|m| m.start() == 0)
}

/// A planned rename, plus the substitution failure that produced it, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub record: RenameRecord,
    pub error: Option<SubstitutionError>,
}

/// Decide whether an entry is renamed and compute its new name
///
/// # Arguments
/// * `entry` - Candidate from the scanner
/// * `options` - Patterns, exclusions and rewriter
///
/// # Returns
/// * `Option<Rewrite>` - The rename, or `None` when the entry is skipped
pub fn try_match(entry: &WalkEntry, options: &MatchOptions) -> Option<Rewrite> {
    let name = entry.name.as_str();
    if !prefix_match(&options.pattern, name) {
        return None;
    }

    let old_path = entry.parent.join(name);

    // Exclude list
    if options.exclude.contains(name) {
        info!(path = %old_path.display(), "path excluded");
        return None;
    }

    // Exclude nomatch
    if let Some(nomatch) = &options.nomatch {
        if prefix_match(nomatch, name) {
            info!(path = %old_path.display(), "path excluded");
            return None;
        }
    }

    let (new_name, failure) = match &options.rewriter {
        Rewriter::Template(template) => match substitute(&options.pattern, template, name) {
            Ok(new_name) => (new_name, None),
            Err(reason) => {
                error!(path = %old_path.display(), %reason, "regex error");
                let failure = SubstitutionError {
                    path: old_path.clone(),
                    reason,
                };
                (name.to_string(), Some(failure))
            }
        },
        Rewriter::Function(transform) => (transform.transform(name), None),
    };

    let record = RenameRecord::new(&entry.parent, name, &new_name);
    info!(
        old = %record.old_path.display(),
        old_exists = exists(&record.old_path),
        new = %record.new_path.display(),
        new_exists = exists(&record.new_path),
        "found a match"
    );

    Some(Rewrite {
        record,
        error: failure,
    })
}

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Replace every match of `regex` in `name` using a substitution template
///
/// # Arguments
/// * `regex` - Pattern whose groups the template refers to
/// * `template` - Replacement text
/// * `name` - Name to rewrite
///
/// # Returns
/// * `Result<String, String>` - The new name, or why the template is invalid
pub fn substitute(regex: &Regex, template: &str, name: &str) -> Result<String, String> {
    let template = Template::compile(template, regex)?;
    Ok(regex.replace_all(name, &template).into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
}

/// A substitution template checked against the groups of one regex
///
/// Syntax: `\1`..`\99` and `\g<1>` / `\g<name>` refer to groups; `\\`, `\n`,
/// `\t`, `\r`, `\a`, `\b`, `\f`, `\v` and octal `\0`, `\NNN` are escapes.
/// Any other escaped ASCII letter is rejected, other escaped characters are
/// kept with their backslash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    pub fn compile(source: &str, regex: &Regex) -> Result<Self, String> {
        let chars: Vec<char> = source.chars().collect();
        let groups = regex.captures_len();
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c != '\\' {
                literal.push(c);
                i += 1;
                continue;
            }

            let Some(&next) = chars.get(i + 1) else {
                return Err("bad escape (end of pattern)".to_string());
            };
            i += 2;

            match next {
                'g' => {
                    if chars.get(i) != Some(&'<') {
                        return Err("missing < after \\g".to_string());
                    }
                    let start = i + 1;
                    let Some(len) = chars[start..].iter().position(|&c| c == '>') else {
                        return Err("missing >, unterminated name".to_string());
                    };
                    let reference: String = chars[start..start + len].iter().collect();
                    i = start + len + 1;

                    let index = if reference.is_empty() {
                        return Err("missing group name".to_string());
                    } else if reference.chars().all(|c| c.is_ascii_digit()) {
                        let index: usize = reference
                            .parse()
                            .map_err(|_| format!("invalid group reference {}", reference))?;
                        if index >= groups {
                            return Err(format!("invalid group reference {}", index));
                        }
                        index
                    } else {
                        regex
                            .capture_names()
                            .position(|n| n == Some(reference.as_str()))
                            .ok_or_else(|| format!("unknown group name '{}'", reference))?
                    };
                    push_group(&mut pieces, &mut literal, index);
                }
                '0' => {
                    let mut value = 0u32;
                    let mut digits = 0;
                    while digits < 2 && chars.get(i).is_some_and(|c| c.is_digit(8)) {
                        value = value * 8 + chars[i].to_digit(8).unwrap_or(0);
                        i += 1;
                        digits += 1;
                    }
                    literal.push(char::from_u32(value).unwrap_or('\0'));
                }
                '1'..='9' => {
                    let octal = next.is_digit(8)
                        && chars.get(i).is_some_and(|c| c.is_digit(8))
                        && chars.get(i + 1).is_some_and(|c| c.is_digit(8));
                    if octal {
                        let digits: String = [next, chars[i], chars[i + 1]].iter().collect();
                        let value = u32::from_str_radix(&digits, 8).unwrap_or(0);
                        if value > 0o377 {
                            return Err(format!("octal escape value \\{} outside of range 0-0o377", digits));
                        }
                        literal.push(char::from_u32(value).unwrap_or('\0'));
                        i += 2;
                        continue;
                    }

                    let mut index = next.to_digit(10).unwrap_or(0) as usize;
                    if let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                        index = index * 10 + d as usize;
                        i += 1;
                    }
                    if index >= groups {
                        return Err(format!("invalid group reference {}", index));
                    }
                    push_group(&mut pieces, &mut literal, index);
                }
                '\\' => literal.push('\\'),
                'n' => literal.push('\n'),
                't' => literal.push('\t'),
                'r' => literal.push('\r'),
                'a' => literal.push('\x07'),
                'b' => literal.push('\x08'),
                'f' => literal.push('\x0c'),
                'v' => literal.push('\x0b'),
                c if c.is_ascii_alphabetic() => {
                    return Err(format!("bad escape \\{}", c));
                }
                c => {
                    literal.push('\\');
                    literal.push(c);
                }
            }
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(Self { pieces })
    }
}

fn push_group(pieces: &mut Vec<Piece>, literal: &mut String, index: usize) {
    if !literal.is_empty() {
        pieces.push(Piece::Literal(std::mem::take(literal)));
    }
    pieces.push(Piece::Group(index));
}

impl Replacer for &Template {
    fn replace_append(&mut self, caps: &Captures<'_>, dst: &mut String) {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => dst.push_str(text),
                // Groups that did not participate expand to nothing
                Piece::Group(index) => {
                    if let Some(m) = caps.get(*index) {
                        dst.push_str(m.as_str());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str) -> WalkEntry {
        WalkEntry {
            parent: PathBuf::from("/top"),
            name: name.to_string(),
        }
    }

    fn template_options(pattern: &str, replace: &str) -> MatchOptions {
        MatchOptions::new(pattern, None, false, Vec::new(), Rewriter::Template(replace.to_string()))
            .unwrap()
    }

    fn new_name(options: &MatchOptions, name: &str) -> Option<String> {
        try_match(&entry(name), options).map(|r| r.record.new_name)
    }

    #[test]
    fn test_numbered_backreference() {
        let options = template_options(r"(.*)\.txt", r"\1.bak");
        let rewrite = try_match(&entry("a.txt"), &options).unwrap();
        assert_eq!(rewrite.record.old_path, PathBuf::from("/top/a.txt"));
        assert_eq!(rewrite.record.new_path, PathBuf::from("/top/a.bak"));
        assert_eq!(rewrite.error, None);
    }

    #[test]
    fn test_named_backreferences() {
        let options = template_options(r"(?P<stem>\w+)-(?P<num>\d+)", r"\g<num>_\g<stem>");
        assert_eq!(new_name(&options, "photo-12.jpg").unwrap(), "12_photo.jpg");

        let options = template_options(r"(\w+)-(\d+)", r"\g<2>\g<1>");
        assert_eq!(new_name(&options, "photo-12").unwrap(), "12photo");
    }

    #[test]
    fn test_prefix_match_only() {
        let options = template_options(r"txt", "TXT");
        assert_eq!(new_name(&options, "a.txt"), None);
        assert_eq!(new_name(&options, "txt.txt").unwrap(), "TXT.TXT");
    }

    #[test]
    fn test_substitution_replaces_every_match() {
        let options = template_options(r"a", "b");
        assert_eq!(new_name(&options, "banana"), None);
        assert_eq!(new_name(&options, "aardvark").unwrap(), "bbrdvbrk");
    }

    #[test]
    fn test_exclude_is_exact() {
        let options = MatchOptions::new(
            r".*\.txt",
            None,
            true,
            vec!["foo.txt".to_string()],
            Rewriter::Template("x".to_string()),
        )
        .unwrap();
        assert_eq!(new_name(&options, "foo.txt"), None);
        assert!(new_name(&options, "FOO.txt").is_some());
    }

    #[test]
    fn test_nomatch_excludes() {
        let options = MatchOptions::new(
            r"(.*)\.txt",
            Some("keep"),
            false,
            Vec::new(),
            Rewriter::Template(r"\1.md".to_string()),
        )
        .unwrap();
        assert_eq!(new_name(&options, "keep_me.txt"), None);
        assert_eq!(new_name(&options, "a_keep.txt").unwrap(), "a_keep.md");
    }

    #[test]
    fn test_ignore_case_applies_to_both_patterns() {
        let options = MatchOptions::new(
            r"(.*)\.TXT",
            Some("SKIP"),
            true,
            Vec::new(),
            Rewriter::Template(r"\1.md".to_string()),
        )
        .unwrap();
        assert_eq!(new_name(&options, "a.txt").unwrap(), "a.md");
        assert_eq!(new_name(&options, "skip.txt"), None);

        let options = template_options(r"(.*)\.TXT", r"\1.md");
        assert_eq!(new_name(&options, "a.txt"), None);
    }

    #[test]
    fn test_function_mode_ignores_backreferences() {
        let options = MatchOptions::new(
            r"(.*)",
            None,
            false,
            Vec::new(),
            Rewriter::Function(Box::new(|name: &str| format!(r"\1{}", name.to_uppercase()))),
        )
        .unwrap();
        assert_eq!(new_name(&options, "a.txt").unwrap(), r"\1A.TXT");
    }

    #[test]
    fn test_bad_template_is_recorded() {
        let options = template_options(r"(.*)\.txt", r"\2.bak");
        let rewrite = try_match(&entry("a.txt"), &options).unwrap();
        assert_eq!(rewrite.record.new_name, "a.txt");
        let error = rewrite.error.unwrap();
        assert_eq!(error.path, PathBuf::from("/top/a.txt"));
        assert!(error.reason.contains("invalid group reference 2"));
    }

    #[test]
    fn test_invalid_patterns() {
        let err = MatchOptions::new("(", None, false, Vec::new(), Rewriter::Template(String::new()))
            .unwrap_err();
        assert!(matches!(err, RenameError::Pattern { which: "pattern", .. }));

        let err = MatchOptions::new(".*", Some("["), false, Vec::new(), Rewriter::Template(String::new()))
            .unwrap_err();
        assert!(matches!(err, RenameError::Pattern { which: "nomatch", .. }));
    }

    #[test]
    fn test_template_escapes() {
        let regex = Regex::new(r"(a)").unwrap();
        assert_eq!(substitute(&regex, r"[\\]", "a").unwrap(), r"[\]");
        assert_eq!(substitute(&regex, r"\t", "a").unwrap(), "\t");
        assert_eq!(substitute(&regex, r"\.", "a").unwrap(), r"\.");
        assert_eq!(substitute(&regex, r"\101", "a").unwrap(), "A");
        assert_eq!(substitute(&regex, r"\0", "a").unwrap(), "\0");
        assert_eq!(substitute(&regex, r"$1", "a").unwrap(), "$1");
        assert_eq!(substitute(&regex, r"\10", "a").unwrap_err(), "invalid group reference 10");
        assert_eq!(substitute(&regex, r"\q", "a").unwrap_err(), r"bad escape \q");
        assert_eq!(substitute(&regex, "\\", "a").unwrap_err(), "bad escape (end of pattern)");
        assert!(substitute(&regex, r"\g<nope>", "a").unwrap_err().contains("unknown group name"));
        assert!(substitute(&regex, r"\g<1", "a").unwrap_err().contains("missing >"));
        assert!(substitute(&regex, r"\g<>", "a").unwrap_err().contains("missing group name"));
        assert!(substitute(&regex, r"\g1", "a").unwrap_err().contains("missing <"));
    }

    #[test]
    fn test_unmatched_group_is_empty() {
        let regex = Regex::new(r"(a)|(b)").unwrap();
        assert_eq!(substitute(&regex, r"[\1\2]", "b").unwrap(), "[b]");
    }

    #[test]
    fn test_substitution_is_not_an_involution() {
        let options = template_options(r"(.*)\.txt", r"\1.txt.txt");
        let once = new_name(&options, "a.txt").unwrap();
        assert_eq!(once, "a.txt.txt");
        let twice = new_name(&options, &once).unwrap();
        assert_ne!(twice, "a.txt");
    }
}
