use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories that never hold this crate's own sources.
const SKIPPED_DIRS: [&str; 2] = ["./target", "./examples"];

/// One source rule: a line pattern plus an optional refinement of each match.
struct Rule {
    name: &'static str,
    pattern: &'static str,
    advice: &'static str,
    accept: fn(&str) -> bool,
}

// Collects the lines of one file that break a rule.
struct RuleCollector<'a> {
    rule: &'a Rule,
    file_path: PathBuf,
    violations: Vec<String>,
}

impl<'a> RuleCollector<'a> {
    fn new(rule: &'a Rule, file_path: &Path) -> Self {
        Self {
            rule,
            file_path: file_path.to_path_buf(),
            violations: Vec::new(),
        }
    }

    fn check_and_get_error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let file_name = self.file_path.to_str().unwrap_or("?");
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            self.rule.name,
            file_name
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        error_msg.push_str(&format!("\n⚠️ {}\n", self.rule.advice));
        Some(error_msg)
    }
}

impl Sink for RuleCollector<'_> {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if (self.rule.accept)(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

// Underscore-prefixed bindings hide unused values; skip comments and strings.
fn is_underscore_binding(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") || trimmed.starts_with("/*") {
        return false;
    }
    let in_string = line
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'));
    !in_string
}

fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("///") {
        return Some(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("//!") {
        return Some(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim());
    }
    None
}

fn is_shouting_comment(line: &str) -> bool {
    let Some(text) = comment_text(line) else {
        return false;
    };
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| c.is_uppercase())
}

fn always(_: &str) -> bool {
    true
}

fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "underscore-prefixed variables",
            pattern: r"\b(_[a-zA-Z0-9_]+)\b",
            advice: "Underscore-prefixed variable names are not allowed in this project. Either use the variable or remove it completely.",
            accept: is_underscore_binding,
        },
        Rule {
            name: "#[allow(dead_code)] attributes",
            pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
            advice: "#[allow(dead_code)] attributes are STRICTLY FORBIDDEN in this project. Either use the code or remove it completely.",
            accept: always,
        },
        Rule {
            name: "comments with all uppercase alphabetic characters",
            pattern: r"//.*[A-Z]",
            advice: "Comments where all alphabetic characters are uppercase are STRICTLY FORBIDDEN in this project.",
            accept: is_shouting_comment,
        },
    ]
}

fn crate_sources() -> impl Iterator<Item = PathBuf> {
    WalkDir::new(".")
        .into_iter()
        .filter_entry(|e| !SKIPPED_DIRS.iter().any(|dir| e.path().starts_with(dir)))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() != "build.rs")
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
}

fn scan_sources() -> Result<(), Box<dyn Error>> {
    let mut searcher = Searcher::new();
    for rule in rules() {
        let matcher = RegexMatcher::new_line_matcher(rule.pattern)?;
        for path in crate_sources() {
            println!("cargo:rerun-if-changed={}", path.display());
            let mut collector = RuleCollector::new(&rule, &path);
            searcher.search_path(&matcher, &path, &mut collector)?;
            if let Some(error_message) = collector.check_and_get_error_message() {
                return Err(error_message.into());
            }
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if let Err(e) = scan_sources() {
        // Shown in cargo's output before the build fails.
        eprintln!("{e}");
        std::process::exit(1);
    }
}
