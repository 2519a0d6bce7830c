//! Average cyclomatic complexity per file, measured on tree-sitter ASTs.
//!
//! Each function scores 1 plus one per decision point in its body (branches,
//! loops, case arms, catch clauses, ternaries, short-circuit operators). Nested
//! functions are measured on their own and do not add to their parent.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::ComplexityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
  Python,
  JavaScript,
  TypeScript,
  Tsx,
  Go,
  Rust,
  Java,
}

impl Language {
  /// Pick a grammar from the file extension.
  pub fn from_path(path: &Path) -> Option<Self> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
      "py" | "pyi" => Some(Self::Python),
      "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
      "ts" | "mts" | "cts" => Some(Self::TypeScript),
      "tsx" => Some(Self::Tsx),
      "go" => Some(Self::Go),
      "rs" => Some(Self::Rust),
      "java" => Some(Self::Java),
      _ => None,
    }
  }

  fn grammar(self) -> tree_sitter::Language {
    match self {
      Self::Python => tree_sitter_python::LANGUAGE.into(),
      Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
      Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
      Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
      Self::Go => tree_sitter_go::LANGUAGE.into(),
      Self::Rust => tree_sitter_rust::LANGUAGE.into(),
      Self::Java => tree_sitter_java::LANGUAGE.into(),
    }
  }

  fn function_kinds(self) -> &'static [&'static str] {
    match self {
      Self::Python => &["function_definition"],
      Self::JavaScript | Self::TypeScript | Self::Tsx => &[
        "function_declaration",
        "function_expression",
        "arrow_function",
        "method_definition",
        "generator_function_declaration",
      ],
      Self::Go => &["function_declaration", "method_declaration", "func_literal"],
      Self::Rust => &["function_item"],
      Self::Java => &["method_declaration", "constructor_declaration"],
    }
  }

  fn is_function(self, kind: &str) -> bool {
    self.function_kinds().contains(&kind)
  }
}

/// Decision point node kinds by language (tree-sitter node names).
static DECISION_POINTS: Lazy<HashMap<Language, HashSet<&'static str>>> = Lazy::new(|| {
  let c_like = HashSet::from([
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
    "ternary_expression",
    "binary_expression", // only for short-circuit operators
  ]);

  let mut m = HashMap::new();
  m.insert(
    Language::Python,
    HashSet::from([
      "if_statement",
      "elif_clause",
      "for_statement",
      "while_statement",
      "except_clause",
      "boolean_operator",
      "conditional_expression",
      "case_clause",
      "for_in_clause",
      "if_clause",
    ]),
  );
  m.insert(Language::JavaScript, c_like.clone());
  m.insert(Language::TypeScript, c_like.clone());
  m.insert(Language::Tsx, c_like);
  m.insert(
    Language::Go,
    HashSet::from([
      "if_statement",
      "for_statement",
      "expression_case",
      "type_case",
      "communication_case",
      "binary_expression",
    ]),
  );
  m.insert(
    Language::Rust,
    HashSet::from([
      "if_expression",
      "for_expression",
      "while_expression",
      "match_arm",
      "binary_expression",
    ]),
  );
  m.insert(
    Language::Java,
    HashSet::from([
      "if_statement",
      "for_statement",
      "enhanced_for_statement",
      "while_statement",
      "do_statement",
      "switch_block_statement_group",
      "catch_clause",
      "ternary_expression",
      "binary_expression",
    ]),
  );
  m
});

/// Binary operators that count as decision points.
static DECISION_OPERATORS: Lazy<HashSet<&'static str>> =
  Lazy::new(|| HashSet::from(["&&", "||", "??"]));

/// One analyzed function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionComplexity {
  pub name: String,
  pub line: usize,
  pub cyclomatic: u32,
}

/// Parses a file into functions with their cyclomatic complexity, or fails.
pub trait ComplexityAnalyzer {
  fn analyze(&self, path: &Path) -> Result<Vec<FunctionComplexity>, ComplexityError>;
}

/// Analyzer backed by the bundled tree-sitter grammars.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterAnalyzer;

impl ComplexityAnalyzer for TreeSitterAnalyzer {
  fn analyze(&self, path: &Path) -> Result<Vec<FunctionComplexity>, ComplexityError> {
    let language =
      Language::from_path(path).ok_or_else(|| ComplexityError::Unsupported(path.to_path_buf()))?;
    let bytes = fs::read(path).map_err(|source| ComplexityError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    // Non-UTF-8 content is treated as binary.
    let source =
      String::from_utf8(bytes).map_err(|_| ComplexityError::Unsupported(path.to_path_buf()))?;
    analyze_source(&source, language, path)
  }
}

/// Parse `source` and measure every function in it.
pub fn analyze_source(
  source: &str,
  language: Language,
  path: &Path,
) -> Result<Vec<FunctionComplexity>, ComplexityError> {
  let mut parser = Parser::new();
  parser
    .set_language(&language.grammar())
    .map_err(|e| ComplexityError::Language(e.to_string()))?;
  let tree = parser
    .parse(source, None)
    .ok_or_else(|| ComplexityError::Syntax(path.to_path_buf()))?;
  let root = tree.root_node();
  if root.has_error() {
    return Err(ComplexityError::Syntax(path.to_path_buf()));
  }

  let decisions = DECISION_POINTS.get(&language).cloned().unwrap_or_default();
  let mut functions = Vec::new();
  collect_functions(&root, source, language, &decisions, &mut functions);
  Ok(functions)
}

fn collect_functions(
  node: &Node,
  source: &str,
  language: Language,
  decisions: &HashSet<&str>,
  out: &mut Vec<FunctionComplexity>,
) {
  if language.is_function(node.kind()) {
    out.push(FunctionComplexity {
      name: function_name(node, source),
      line: node.start_position().row + 1,
      cyclomatic: function_complexity(node, source, language, decisions),
    });
  }

  let mut cursor = node.walk();
  for child in node.children(&mut cursor) {
    collect_functions(&child, source, language, decisions, out);
  }
}

fn function_name(node: &Node, source: &str) -> String {
  node
    .child_by_field_name("name")
    .and_then(|n| source.get(n.start_byte()..n.end_byte()))
    .unwrap_or("<anonymous>")
    .to_string()
}

fn function_complexity(
  func: &Node,
  source: &str,
  language: Language,
  decisions: &HashSet<&str>,
) -> u32 {
  fn is_decision_operator(node: &Node, source: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| {
      source
        .get(child.start_byte()..child.end_byte())
        .is_some_and(|text| DECISION_OPERATORS.contains(text))
    });
    found
  }

  fn traverse(
    node: &Node,
    source: &str,
    language: Language,
    decisions: &HashSet<&str>,
    complexity: &mut u32,
  ) {
    if language.is_function(node.kind()) {
      return;
    }
    if decisions.contains(node.kind())
      && (node.kind() != "binary_expression" || is_decision_operator(node, source))
    {
      *complexity += 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
      traverse(&child, source, language, decisions, complexity);
    }
  }

  let mut complexity = 1u32;
  let mut cursor = func.walk();
  for child in func.children(&mut cursor) {
    traverse(&child, source, language, decisions, &mut complexity);
  }
  complexity
}

/// Mean cyclomatic complexity over the file's functions; the denominator is
/// floored at 1 so a file without functions yields `Some(0.0)`. Any analysis
/// failure yields `None` ("no signal", distinct from zero).
pub fn avg_complexity<A: ComplexityAnalyzer + ?Sized>(analyzer: &A, path: &Path) -> Option<f64> {
  match analyzer.analyze(path) {
    Ok(functions) => {
      let total: u64 = functions.iter().map(|f| u64::from(f.cyclomatic)).sum();
      Some(total as f64 / functions.len().max(1) as f64)
    }
    Err(e) => {
      tracing::debug!(path = %path.display(), error = %e, "complexity unavailable");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use indoc::indoc;
  use tempfile::TempDir;

  fn measure(name: &str, source: &str) -> Option<f64> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    avg_complexity(&TreeSitterAnalyzer, &path)
  }

  #[test]
  fn python_decision_points() {
    let source = indoc! {"
      def classify(x, y):
          if x > 0 and y > 0:
              return 1
          elif x < 0:
              return -1
          for i in range(3):
              pass
          return 0

      def simple():
          return 1
    "};
    let functions = analyze_source(source, Language::Python, Path::new("m.py")).unwrap();
    let by_name: HashMap<_, _> = functions
      .iter()
      .map(|f| (f.name.as_str(), f.cyclomatic))
      .collect();
    // 1 + if + and + elif + for
    assert_eq!(by_name["classify"], 5);
    assert_eq!(by_name["simple"], 1);
    assert_eq!(measure("m.py", source), Some(3.0));
  }

  #[test]
  fn nested_functions_are_measured_separately() {
    let source = indoc! {"
      def outer():
          def inner(x):
              if x:
                  return 1
              return 0
          return inner
    "};
    let functions = analyze_source(source, Language::Python, Path::new("n.py")).unwrap();
    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0].name, "outer");
    assert_eq!(functions[0].cyclomatic, 1);
    assert_eq!(functions[1].name, "inner");
    assert_eq!(functions[1].cyclomatic, 2);
  }

  #[test]
  fn javascript_short_circuit_and_ternary() {
    let source = indoc! {"
      function pick(a, b) {
        if (a && b) {
          return 1;
        }
        return a ? 2 : 3;
      }
      const noop = () => 0;
    "};
    assert_eq!(measure("pick.js", source), Some(2.5));
  }

  #[test]
  fn rust_if_expression() {
    let source = indoc! {"
      fn a() {}

      fn b(x: bool) -> u8 {
          if x { 1 } else { 0 }
      }
    "};
    assert_eq!(measure("lib.rs", source), Some(1.5));
  }

  #[test]
  fn file_without_functions_is_zero_not_absent() {
    assert_eq!(measure("consts.py", "X = 1\nY = 2\n"), Some(0.0));
  }

  #[test]
  fn syntax_error_is_absent() {
    assert_eq!(measure("broken.py", "def broken(:\n    pass\n"), None);
  }

  #[test]
  fn unsupported_binary_and_missing_files_are_absent() {
    assert_eq!(measure("README.md", "# title\n"), None);

    let dir = TempDir::new().unwrap();
    let bin = dir.path().join("blob.py");
    fs::write(&bin, [0xff, 0xfe, 0x00, 0x81]).unwrap();
    assert_eq!(avg_complexity(&TreeSitterAnalyzer, &bin), None);

    assert_eq!(
      avg_complexity(&TreeSitterAnalyzer, &dir.path().join("deleted.py")),
      None
    );
  }

  #[test]
  fn language_detection() {
    assert_eq!(Language::from_path(Path::new("a/b.TSX")), Some(Language::Tsx));
    assert_eq!(Language::from_path(Path::new("x.go")), Some(Language::Go));
    assert_eq!(Language::from_path(Path::new("Makefile")), None);
  }
}
