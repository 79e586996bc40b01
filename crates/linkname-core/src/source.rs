//! Lightweight Go source scanner
//!
//! Reads just enough of a Go file to drive generation: the package clause,
//! every import declaration, and the names of top-level functions. The rest
//! of the file is tokenized to make sure it is lexically well formed
//! (terminated literals and comments, balanced brackets) without building
//! a full syntax tree.

use crate::error::{LinknameError, Result};
use std::path::{Path, PathBuf};

/// One import spec, e.g. `_ "unsafe"` or `"fmt"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportSpec {
    /// Explicit binding: an identifier, `_` or `.`
    pub name: Option<String>,
    /// Unquoted import path
    pub path: String,
}

impl ImportSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
        }
    }

    pub fn named(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
        }
    }

    /// Identifier this import is referred to by inside the file.
    ///
    /// Without an explicit name this is the last path element, which is the
    /// usual convention but not guaranteed by Go.
    pub fn binding(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }

    /// Cgo pseudo-package
    pub fn is_cgo(&self) -> bool {
        self.path == "C"
    }
}

/// A scanned Go source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Declared package name
    pub package: String,
    pub imports: Vec<ImportSpec>,
    /// Top-level function names, in declaration order
    pub definitions: Vec<String>,
    /// Byte offset of the `package` keyword
    pub package_offset: usize,
    /// Byte offset just past the package clause and import declarations
    pub body_offset: usize,
}

impl SourceFile {
    /// Scan `src`; `path` is only used for diagnostics
    pub fn parse(path: &Path, src: &str) -> Result<Self> {
        let mut scanner = Scanner::new(path, src);

        let tok = scanner.expect_token("expected 'package'")?;
        if tok.kind != Tok::Ident("package") {
            return Err(scanner.error_at(tok.start, "expected 'package'"));
        }
        let package_offset = tok.start;

        let tok = scanner.expect_token("expected package name")?;
        let package = match tok.kind {
            Tok::Ident("_") => return Err(scanner.error_at(tok.start, "invalid package name _")),
            Tok::Ident(name) if !is_keyword(name) => name.to_string(),
            _ => return Err(scanner.error_at(tok.start, "expected package name")),
        };
        scanner.eat_punct(';')?;

        let mut imports = Vec::new();
        loop {
            let checkpoint = scanner.pos;
            match scanner.next_token()? {
                Some(Token {
                    kind: Tok::Ident("import"),
                    ..
                }) => {
                    scanner.import_decl(&mut imports)?;
                    scanner.eat_punct(';')?;
                }
                _ => {
                    scanner.pos = checkpoint;
                    break;
                }
            }
        }
        let body_offset = scanner.pos;

        let definitions = scanner.top_level_functions()?;

        Ok(Self {
            path: path.to_path_buf(),
            package,
            imports,
            definitions,
            package_offset,
            body_offset,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok<'a> {
    Ident(&'a str),
    Str(String),
    Punct(char),
    /// Numbers and rune literals, which we never inspect
    Literal,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    kind: Tok<'a>,
    start: usize,
}

struct Scanner<'a> {
    path: &'a Path,
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(path: &'a Path, src: &'a str) -> Self {
        Self { path, src, pos: 0 }
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> LinknameError {
        let before = &self.src[..offset.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        LinknameError::Parse {
            file: self.path.to_path_buf(),
            line,
            column,
            message: message.into(),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let rest = &self.src[self.pos..];
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(self.error_at(self.pos, "comment not terminated")),
                }
            } else if let Some(c) = self.peek_char().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        self.skip_trivia()?;
        let start = self.pos;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(None),
        };

        let src = self.src;
        let kind = if c == '_' || c.is_alphabetic() {
            while self
                .peek_char()
                .is_some_and(|c| c == '_' || c.is_alphanumeric())
            {
                self.bump();
            }
            Tok::Ident(&src[start..self.pos])
        } else if c.is_ascii_digit() {
            while self
                .peek_char()
                .is_some_and(|c| c == '_' || c == '.' || c.is_ascii_alphanumeric())
            {
                self.bump();
            }
            Tok::Literal
        } else if c == '"' {
            Tok::Str(self.interpreted_string(start)?)
        } else if c == '`' {
            let rest = &src[self.pos..];
            match rest.find('`') {
                Some(end) => {
                    self.pos += end + 1;
                    Tok::Str(rest[..end].to_string())
                }
                None => return Err(self.error_at(start, "raw string literal not terminated")),
            }
        } else if c == '\'' {
            self.rune(start)?;
            Tok::Literal
        } else {
            Tok::Punct(c)
        };

        Ok(Some(Token { kind, start }))
    }

    fn expect_token(&mut self, message: &str) -> Result<Token<'a>> {
        match self.next_token()? {
            Some(tok) => Ok(tok),
            None => Err(self.error_at(self.src.len(), message)),
        }
    }

    /// Consume `c` if it is the next token
    fn eat_punct(&mut self, c: char) -> Result<bool> {
        let checkpoint = self.pos;
        match self.next_token()? {
            Some(Token {
                kind: Tok::Punct(p),
                ..
            }) if p == c => Ok(true),
            _ => {
                self.pos = checkpoint;
                Ok(false)
            }
        }
    }

    fn interpreted_string(&mut self, start: usize) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error_at(start, "string literal not terminated"))
                }
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('\\' | '"')) => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(self.error_at(start, "string literal not terminated")),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn rune(&mut self, start: usize) -> Result<()> {
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error_at(start, "rune literal not terminated"))
                }
                Some('\'') => return Ok(()),
                Some('\\') => {
                    self.bump();
                }
                Some(_) => {}
            }
        }
    }

    fn import_decl(&mut self, imports: &mut Vec<ImportSpec>) -> Result<()> {
        let tok = self.expect_token("expected import path")?;
        if tok.kind != Tok::Punct('(') {
            imports.push(self.import_spec(tok)?);
            return Ok(());
        }
        loop {
            let tok = self.expect_token("expected ')'")?;
            match tok.kind {
                Tok::Punct(')') => return Ok(()),
                Tok::Punct(';') => continue,
                _ => imports.push(self.import_spec(tok)?),
            }
        }
    }

    fn import_spec(&mut self, first: Token<'a>) -> Result<ImportSpec> {
        let start = first.start;
        let (name, path_tok) = match first.kind {
            Tok::Str(path) => (
                None,
                Token {
                    kind: Tok::Str(path),
                    start,
                },
            ),
            Tok::Ident(name) if !is_keyword(name) => {
                (Some(name.to_string()), self.expect_token("expected import path")?)
            }
            Tok::Punct('.') => (Some(".".to_string()), self.expect_token("expected import path")?),
            _ => return Err(self.error_at(start, "expected import path")),
        };
        match path_tok.kind {
            Tok::Str(path) if path.is_empty() || path.contains(char::is_whitespace) => {
                Err(self.error_at(path_tok.start, format!("invalid import path: {:?}", path)))
            }
            Tok::Str(path) => Ok(ImportSpec { name, path }),
            _ => Err(self.error_at(path_tok.start, "expected import path")),
        }
    }

    /// Tokenize the remainder, checking bracket balance and collecting
    /// the names of top-level functions (methods are skipped)
    fn top_level_functions(&mut self) -> Result<Vec<String>> {
        let mut definitions = Vec::new();
        let mut open: Vec<(char, usize)> = Vec::new();
        let mut after_func = false;

        while let Some(tok) = self.next_token()? {
            let was_after_func = std::mem::take(&mut after_func);
            match tok.kind {
                Tok::Ident("import") if open.is_empty() => {
                    return Err(self.error_at(
                        tok.start,
                        "imports must appear before other declarations",
                    ))
                }
                Tok::Ident("func") => after_func = open.is_empty(),
                Tok::Ident(name) if was_after_func => definitions.push(name.to_string()),
                Tok::Punct(c @ ('(' | '[' | '{')) => open.push((c, tok.start)),
                Tok::Punct(c @ (')' | ']' | '}')) => match open.pop() {
                    Some((o, _)) if closer(o) == c => {}
                    Some((o, _)) => {
                        return Err(self.error_at(
                            tok.start,
                            format!("expected '{}', found '{}'", closer(o), c),
                        ))
                    }
                    None => return Err(self.error_at(tok.start, format!("unexpected '{}'", c))),
                },
                _ => {}
            }
        }

        match open.pop() {
            Some((o, _)) => Err(self.error_at(
                self.src.len(),
                format!("expected '{}', found 'EOF'", closer(o)),
            )),
            None => Ok(definitions),
        }
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "break"
            | "case"
            | "chan"
            | "const"
            | "continue"
            | "default"
            | "defer"
            | "else"
            | "fallthrough"
            | "for"
            | "func"
            | "go"
            | "goto"
            | "if"
            | "import"
            | "interface"
            | "map"
            | "package"
            | "range"
            | "return"
            | "select"
            | "struct"
            | "switch"
            | "type"
            | "var"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Result<SourceFile> {
        SourceFile::parse(Path::new("test.go"), src)
    }

    #[test]
    fn test_package_and_grouped_imports() {
        let file = parse(
            r#"// Package main does things.
package main

import (
	_ "unsafe"
	"fmt"

	gen "github.com/gogo/protobuf/protoc-gen-gogo/generator"
	. "strings"
)

func main() { fmt.Println(ToUpper("x")) }
"#,
        )
        .unwrap();

        assert_eq!(file.package, "main");
        assert_eq!(
            file.imports,
            vec![
                ImportSpec::named("_", "unsafe"),
                ImportSpec::new("fmt"),
                ImportSpec::named("gen", "github.com/gogo/protobuf/protoc-gen-gogo/generator"),
                ImportSpec::named(".", "strings"),
            ]
        );
        assert_eq!(file.definitions, vec!["main".to_string()]);
    }

    #[test]
    fn test_offsets_bracket_header_and_body() {
        let src = "// header\n\npackage p\n\nimport \"os\"\nimport `io`\n\nvar x = 1\n";
        let file = parse(src).unwrap();

        assert_eq!(&src[..file.package_offset], "// header\n\n");
        assert_eq!(&src[file.body_offset..], "\n\nvar x = 1\n");
        assert_eq!(file.imports, vec![ImportSpec::new("os"), ImportSpec::new("io")]);
    }

    #[test]
    fn test_methods_are_not_definitions() {
        let file = parse(
            "package p\n\ntype T struct{}\n\nfunc (t *T) Method() {}\n\nfunc helper(f func() int) {}\n",
        )
        .unwrap();
        assert_eq!(file.definitions, vec!["helper".to_string()]);
    }

    #[test]
    fn test_body_less_declaration_is_a_definition() {
        let file = parse("package p\n\n//go:linkname goTag x.goTag\nfunc goTag(string) string\n").unwrap();
        assert_eq!(file.definitions, vec!["goTag".to_string()]);
    }

    #[test]
    fn test_literals_do_not_confuse_brackets() {
        let file = parse(
            "package p\n\nvar a = '('\nvar b = \"{[\"\nvar c = `)`\n/* } */\nfunc f() {}\n",
        )
        .unwrap();
        assert_eq!(file.definitions, vec!["f".to_string()]);
    }

    #[test]
    fn test_missing_package_clause() {
        let err = parse("func main() {}\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parsing package: test.go:1:1: expected 'package'"
        );
    }

    #[test]
    fn test_blank_package_name_rejected() {
        let err = parse("package _\n").unwrap_err();
        assert!(err.to_string().contains("invalid package name _"));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        let err = parse("package p\n\nfunc f() {\n").unwrap_err();
        assert!(err.to_string().contains("expected '}', found 'EOF'"), "{}", err);

        let err = parse("package p\n\nfunc f() )\n").unwrap_err();
        assert!(err.to_string().contains("test.go:3:10"), "{}", err);
    }

    #[test]
    fn test_unterminated_literals_rejected() {
        assert!(parse("package p\nvar s = \"abc\n").is_err());
        assert!(parse("package p\nvar s = `abc\n").is_err());
        assert!(parse("package p\n/* open\n").is_err());
    }

    #[test]
    fn test_late_import_rejected() {
        let err = parse("package p\n\nvar x = 1\n\nimport \"os\"\n").unwrap_err();
        assert!(err
            .to_string()
            .contains("imports must appear before other declarations"));
    }

    #[test]
    fn test_empty_import_path_rejected() {
        let err = parse("package p\nimport \"\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid import path"));
    }

    #[test]
    fn test_cgo_detection() {
        let file = parse("package p\n\n// #include <stdio.h>\nimport \"C\"\n").unwrap();
        assert!(file.imports[0].is_cgo());
        assert_eq!(file.imports[0].binding(), "C");
    }

    #[test]
    fn test_binding_defaults_to_last_element() {
        assert_eq!(ImportSpec::new("vendor/pkg/generator").binding(), "generator");
        assert_eq!(ImportSpec::named("g", "vendor/pkg/generator").binding(), "g");
    }
}
