//
// frontend/lite.rs
//
// Lightweight SQF frontend
//
// A small preprocessor, tokenizer, bracket-balance parser, variable extractor
// and linter. It understands enough SQF to drive the symbol index end to end;
// it is not a full SQF grammar.
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

use super::{
    FrontendError, IncludeError, IncludeResolver, ParseOutput, Preprocessed, RawDiagnostic,
    RawInclude, RawMacro, RawVariable, ScriptFrontend, Span,
};
use crate::reserved_words::is_magic_local;

/// Maximum `#include` nesting before the preprocessor gives up on a branch
pub const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Comment,
    Operator,
    /// Bracket, separator or terminator
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Significant (non-comment) tokens in document order
#[derive(Debug, Clone, Default)]
pub struct LiteAst {
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LiteFrontend;

#[async_trait]
impl ScriptFrontend for LiteFrontend {
    type Token = Token;
    type Ast = LiteAst;

    async fn preprocess(
        &self,
        text: &str,
        filename: &Path,
        resolver: &dyn IncludeResolver,
    ) -> Result<Preprocessed, FrontendError> {
        let mut preprocessor = Preprocessor {
            resolver,
            out: Preprocessed::default(),
            defines: HashMap::new(),
        };
        preprocessor.process(text, filename, 0).await;
        Ok(preprocessor.out)
    }

    fn tokenize(&self, code: &str) -> Result<Vec<Token>, FrontendError> {
        tokenize(code)
    }

    fn parse(&self, tokens: &[Token]) -> Result<ParseOutput<LiteAst>, FrontendError> {
        Ok(parse(tokens))
    }

    fn analyze(
        &self,
        ast: &LiteAst,
        tokens: &[Token],
        code: &str,
    ) -> Result<Vec<RawVariable>, FrontendError> {
        Ok(extract_variables(ast, tokens, code))
    }

    fn lint(&self, ast: &LiteAst, code: &str) -> Vec<RawDiagnostic> {
        let mut diagnostics = Vec::new();
        for variable in extract_variables(ast, &ast.tokens, code) {
            if !variable.name.starts_with('_') || is_magic_local(&variable.name) {
                continue;
            }
            if variable.definitions.is_empty() {
                for usage in &variable.usages {
                    diagnostics.push(RawDiagnostic::warning(
                        format!("Local variable {} is used but never defined", variable.name),
                        usage.clone(),
                    ));
                }
            }
        }
        diagnostics
    }
}

// ============================================================================
// Preprocessor
// ============================================================================

#[derive(Debug, Clone)]
struct Define {
    params: Option<Vec<String>>,
    body: String,
    file: PathBuf,
    body_offset: usize,
    body_len: usize,
}

struct Preprocessor<'r> {
    resolver: &'r dyn IncludeResolver,
    out: Preprocessed,
    defines: HashMap<String, Define>,
}

impl<'r> Preprocessor<'r> {
    fn process<'a>(&'a mut self, text: &'a str, file: &'a Path, depth: usize) -> BoxFuture<'a, ()> {
        async move {
            let lines = split_lines(text);
            let mut i = 0;
            while i < lines.len() {
                let (line_offset, line) = lines[i];
                let trimmed = line.trim_start();
                if !trimmed.starts_with('#') {
                    self.expand_line(line, line_offset, file);
                    i += 1;
                    continue;
                }

                // Directive: gather continuation lines ending in a backslash
                let mut end = i;
                while end + 1 < lines.len() && lines[end].1.trim_end().ends_with('\\') {
                    end += 1;
                }
                let directive_len: usize = lines[i..=end].iter().map(|(_, l)| l.len()).sum();
                let directive_text = &text[line_offset..line_offset + directive_len];
                let code_start = self.out.code.len();
                self.blank(directive_text, line_offset, file);
                let code_span = code_start..self.out.code.len();

                let hash_offset = line_offset + (line.len() - trimmed.len());
                self.directive(directive_text, hash_offset - line_offset, line_offset, file, code_span, depth)
                    .await;
                i = end + 1;
            }
        }
        .boxed()
    }

    /// Replace a directive with spaces of the same byte length so offsets
    /// after it keep lining up with the original text.
    fn blank(&mut self, text: &str, original_offset: usize, file: &Path) {
        let start = self.out.code.len();
        self.out
            .code
            .extend(text.bytes().map(|b| if b == b'\n' { '\n' } else { ' ' }));
        self.out
            .source_map
            .push_copy(start, text.len(), file, original_offset);
    }

    async fn directive(
        &mut self,
        text: &str,
        hash_at: usize,
        line_offset: usize,
        file: &Path,
        code_span: Span,
        depth: usize,
    ) {
        let after_hash = &text[hash_at + 1..];
        let keyword_start = hash_at + 1 + (after_hash.len() - after_hash.trim_start().len());
        let rest = &text[keyword_start..];
        let keyword_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let keyword = &rest[..keyword_len];
        let args_at = keyword_start + keyword_len;

        match keyword {
            "define" => self.define(text, args_at, line_offset, file),
            "undef" => {
                let name = text[args_at..].trim();
                self.defines.remove(name);
            }
            "include" => {
                let directive_end = line_offset + text.len();
                self.include(&text[args_at..], file, code_span, directive_end, depth)
                    .await;
            }
            // Conditional blocks are kept active in every branch
            _ => {}
        }
    }

    fn define(&mut self, text: &str, args_at: usize, line_offset: usize, file: &Path) {
        let after = &text[args_at..];
        let name_at = args_at + (after.len() - after.trim_start().len());
        let name_len = ident_len(&text[name_at..]);
        if name_len == 0 {
            return;
        }
        let name = text[name_at..name_at + name_len].to_string();

        let mut cursor = name_at + name_len;
        let mut params = None;
        if text[cursor..].starts_with('(') {
            if let Some(close) = text[cursor..].find(')') {
                let list = &text[cursor + 1..cursor + close];
                params = Some(
                    list.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect::<Vec<_>>(),
                );
                cursor += close + 1;
            }
        }

        let raw_body = &text[cursor..];
        let body_at = cursor + (raw_body.len() - raw_body.trim_start().len());
        let body_text = text[body_at..].trim_end();
        let body = body_text
            .lines()
            .map(|l| l.trim_end().trim_end_matches('\\').trim_end())
            .collect::<Vec<_>>()
            .join(" ");

        self.out.macros.push(RawMacro {
            name: name.clone(),
            arguments: params.as_ref().map(|p| format!("({})", p.join(", "))),
            value: body.clone(),
            filename: file.to_path_buf(),
            offset: line_offset + name_at,
        });
        self.defines.insert(
            name,
            Define {
                params,
                body,
                file: file.to_path_buf(),
                body_offset: line_offset + body_at,
                body_len: body_text.len(),
            },
        );
    }

    /// `directive_end` is the offset in `file` just past the directive
    async fn include(
        &mut self,
        args: &str,
        file: &Path,
        code_span: Span,
        directive_end: usize,
        depth: usize,
    ) {
        let args = args.trim();
        let requested = args
            .trim_start_matches(['"', '<'])
            .trim_end_matches(['"', '>'])
            .trim();

        let result = if depth + 1 > MAX_INCLUDE_DEPTH {
            Err(IncludeError::TooDeep(MAX_INCLUDE_DEPTH))
        } else if requested.is_empty() {
            Err(IncludeError::Empty)
        } else {
            match self.resolver.resolve(requested, file) {
                Ok(resolved) => match self.resolver.load(&resolved).await {
                    Ok(text) => Ok((resolved, text)),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            }
        };

        match result {
            Ok((resolved, included_text)) => {
                log::trace!("Including {} from {}", resolved.display(), file.display());
                self.out.includes.push(RawInclude {
                    filename: requested.to_string(),
                    expanded_filename: resolved.clone(),
                    span: code_span.clone(),
                });
                if !self.out.code.ends_with('\n') {
                    let at = self.out.code.len();
                    self.out.code.push('\n');
                    self.out
                        .source_map
                        .push_expansion(at..at + 1, file, directive_end, 0);
                }
                self.process(&included_text, &resolved, depth + 1).await;
                if !included_text.ends_with('\n') && !included_text.is_empty() {
                    let at = self.out.code.len();
                    self.out.code.push('\n');
                    self.out
                        .source_map
                        .push_expansion(at..at + 1, &resolved, included_text.len(), 0);
                }
            }
            Err(e) => {
                log::debug!("Include '{}' in {} failed: {}", requested, file.display(), e);
                self.out.errors.push(RawDiagnostic::error(
                    format!("Failed to include '{}': {}", requested, e),
                    code_span,
                ));
            }
        }
    }

    /// Copy a code line, expanding known macros
    fn expand_line(&mut self, line: &str, line_offset: usize, file: &Path) {
        let bytes = line.as_bytes();
        let mut copy_from = 0;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if b == b'"' || b == b'\'' {
                i = line[i + 1..]
                    .find(b as char)
                    .map_or(bytes.len(), |p| i + 1 + p + 1);
                continue;
            }
            if line[i..].starts_with("//") {
                break;
            }
            if is_ident_start(b) {
                let len = ident_len(&line[i..]);
                let name = &line[i..i + len];
                if let Some(define) = self.defines.get(name).cloned() {
                    if let Some(consumed) = self.expand_macro(&define, line, i, len, file, line_offset, copy_from) {
                        i += consumed;
                        copy_from = i;
                        continue;
                    }
                }
                i += len;
                continue;
            }
            i += line[i..].chars().next().map_or(1, |c| c.len_utf8());
        }
        self.copy(&line[copy_from..], line_offset + copy_from, file);
    }

    /// Expand one macro invocation starting at `at`. Returns the number of
    /// line bytes the invocation consumed, or `None` when the name is a
    /// function-like macro used without arguments.
    #[allow(clippy::too_many_arguments)]
    fn expand_macro(
        &mut self,
        define: &Define,
        line: &str,
        at: usize,
        name_len: usize,
        file: &Path,
        line_offset: usize,
        copy_from: usize,
    ) -> Option<usize> {
        let (expansion, consumed) = match &define.params {
            None => (define.body.clone(), name_len),
            Some(params) => {
                let after = &line[at + name_len..];
                if !after.starts_with('(') {
                    return None;
                }
                let (args, args_len) = split_macro_args(after)?;
                let mut body = define.body.clone();
                for (param, arg) in params.iter().zip(args.iter()) {
                    body = replace_identifier(&body, param, arg.trim());
                }
                (body.replace("##", ""), name_len + args_len)
            }
        };

        self.copy(&line[copy_from..at], line_offset + copy_from, file);
        let start = self.out.code.len();
        self.out.code.push_str(&expansion);
        self.out.source_map.push_expansion(
            start..self.out.code.len(),
            &define.file,
            define.body_offset,
            define.body_len,
        );
        Some(consumed)
    }

    fn copy(&mut self, text: &str, original_offset: usize, file: &Path) {
        let start = self.out.code.len();
        self.out.code.push_str(text);
        self.out
            .source_map
            .push_copy(start, text.len(), file, original_offset);
    }
}

/// Split text into `(offset, line)` pairs, each line keeping its newline
fn split_lines(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        lines.push((offset, line));
        offset += line.len();
    }
    lines
}

/// Parse `(a, b(c), d)` into its top-level arguments and the consumed length
fn split_macro_args(text: &str) -> Option<(Vec<String>, usize)> {
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut current = String::new();
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => {
                if depth > 0 {
                    current.push(ch);
                }
                depth += 1;
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    args.push(std::mem::take(&mut current));
                    return Some((args, i + 1));
                }
                current.push(ch);
            }
            ',' if depth == 1 => args.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    None
}

fn replace_identifier(body: &str, param: &str, arg: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if is_ident_start(bytes[i]) {
            let len = ident_len(&body[i..]);
            let ident = &body[i..i + len];
            out.push_str(if ident == param { arg } else { ident });
            i += len;
        } else {
            let ch_len = body[i..].chars().next().map_or(1, |c| c.len_utf8());
            out.push_str(&body[i..i + ch_len]);
            i += ch_len;
        }
    }
    out
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn ident_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    if bytes.is_empty() || !is_ident_start(bytes[0]) {
        return 0;
    }
    bytes
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
        .unwrap_or(bytes.len())
}

// ============================================================================
// Tokenizer
// ============================================================================

const TWO_CHAR_OPERATORS: &[&str] = &["==", "!=", ">=", "<=", "&&", "||", ">>"];

fn tokenize(code: &str) -> Result<Vec<Token>, FrontendError> {
    let bytes = code.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let start = i;

        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let kind = if code[i..].starts_with("//") {
            i = code[i..].find('\n').map_or(bytes.len(), |p| i + p);
            TokenKind::Comment
        } else if code[i..].starts_with("/*") {
            i = code[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
            TokenKind::Comment
        } else if b == b'"' || b == b'\'' {
            i = string_end(code, i).ok_or_else(|| {
                FrontendError::new("Unterminated string literal", Some(start))
            })?;
            TokenKind::String
        } else if b.is_ascii_digit() || (b == b'$' && i + 1 < bytes.len()) {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
            TokenKind::Number
        } else if is_ident_start(b) {
            i += ident_len(&code[i..]);
            TokenKind::Identifier
        } else if matches!(b, b'(' | b')' | b'[' | b']' | b'{' | b'}' | b';' | b',') {
            i += 1;
            TokenKind::Punct(b as char)
        } else if TWO_CHAR_OPERATORS.iter().any(|op| code[i..].starts_with(op)) {
            i += 2;
            TokenKind::Operator
        } else {
            i += code[i..].chars().next().map_or(1, |c| c.len_utf8());
            TokenKind::Operator
        };

        tokens.push(Token { kind, span: start..i });
    }

    Ok(tokens)
}

/// End offset (exclusive) of the string starting at `start`. A doubled quote
/// inside the literal is an escaped quote.
fn string_end(code: &str, start: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

// ============================================================================
// Parser
// ============================================================================

fn parse(tokens: &[Token]) -> ParseOutput<LiteAst> {
    let significant: Vec<Token> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .cloned()
        .collect();
    let errors = bracket_errors(&significant);
    ParseOutput {
        errors,
        ast: LiteAst {
            tokens: significant,
        },
    }
}

fn bracket_errors(tokens: &[Token]) -> Vec<RawDiagnostic> {
    let mut errors = Vec::new();
    let mut stack: Vec<(char, Span)> = Vec::new();
    for token in tokens {
        let TokenKind::Punct(c) = token.kind else {
            continue;
        };
        let expected = match c {
            '(' | '[' | '{' => {
                stack.push((c, token.span.clone()));
                continue;
            }
            ')' => '(',
            ']' => '[',
            '}' => '{',
            _ => continue,
        };
        if !stack.iter().any(|(open, _)| *open == expected) {
            errors.push(RawDiagnostic::error(
                format!("Unexpected '{}'", c),
                token.span.clone(),
            ));
            continue;
        }
        // Unwind brackets left open inside the one being closed
        while let Some((open, span)) = stack.pop() {
            if open == expected {
                break;
            }
            errors.push(RawDiagnostic::error(
                format!("Missing closing bracket for '{}'", open),
                span,
            ));
        }
    }
    for (open, span) in stack {
        errors.push(RawDiagnostic::error(
            format!("Missing closing bracket for '{}'", open),
            span,
        ));
    }
    errors
}

// ============================================================================
// Variable extraction
// ============================================================================

#[derive(Default)]
struct VariableCollector {
    variables: Vec<RawVariable>,
    by_name: HashMap<String, usize>,
}

impl VariableCollector {
    fn entry(&mut self, name: &str) -> &mut RawVariable {
        let key = name.to_lowercase();
        let idx = match self.by_name.get(&key) {
            Some(&idx) => idx,
            None => {
                self.variables.push(RawVariable {
                    name: name.to_string(),
                    ..Default::default()
                });
                self.by_name.insert(key, self.variables.len() - 1);
                self.variables.len() - 1
            }
        };
        &mut self.variables[idx]
    }

    /// Declare the local named by a string literal such as `"_unit"`
    fn declare_string(&mut self, token: &Token, code: &str) {
        let literal = &code[token.span.clone()];
        if literal.len() < 3 {
            return;
        }
        let content = &literal[1..literal.len() - 1];
        if content.starts_with('_') && ident_len(content) == content.len() {
            self.entry(content)
                .definitions
                .push(token.span.start + 1..token.span.end - 1);
        }
    }
}

/// Collect variable occurrences.
///
/// An identifier directly followed by `=` is a definition; every other
/// identifier is a usage. String literals naming locals after `private`,
/// `params` and `for` are definitions too.
fn extract_variables(ast: &LiteAst, tokens: &[Token], code: &str) -> Vec<RawVariable> {
    let sig = &ast.tokens;
    let text = |t: &Token| &code[t.span.clone()];
    let mut collector = VariableCollector::default();

    for (i, token) in sig.iter().enumerate() {
        if token.kind != TokenKind::Identifier {
            continue;
        }
        let name = text(token);
        let lower = name.to_ascii_lowercase();

        if matches!(lower.as_str(), "private" | "params" | "for") {
            match sig.get(i + 1) {
                Some(next) if next.kind == TokenKind::String => {
                    collector.declare_string(next, code);
                }
                Some(next) if next.kind == TokenKind::Punct('[') && lower != "for" => {
                    let mut depth = 0usize;
                    for inner in &sig[i + 1..] {
                        match inner.kind {
                            TokenKind::Punct('[') => depth += 1,
                            TokenKind::Punct(']') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            TokenKind::String => collector.declare_string(inner, code),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        let is_definition = sig
            .get(i + 1)
            .is_some_and(|n| n.kind == TokenKind::Operator && text(n) == "=");
        if is_definition {
            let statement_start = match i.checked_sub(1).map(|p| &sig[p]) {
                Some(prev) if text(prev).eq_ignore_ascii_case("private") => prev.span.start,
                _ => token.span.start,
            };
            let comment = preceding_comment(tokens, code, statement_start);
            let variable = collector.entry(name);
            variable.definitions.push(token.span.clone());
            if variable.comment.is_none() {
                variable.comment = comment;
            }
        } else {
            collector.entry(name).usages.push(token.span.clone());
        }
    }

    collector.variables
}

/// Text of a comment that ends on the line directly above `start`
fn preceding_comment(tokens: &[Token], code: &str, start: usize) -> Option<String> {
    let idx = tokens.partition_point(|t| t.span.start < start);
    let prev = tokens.get(idx.checked_sub(1)?)?;
    if prev.kind != TokenKind::Comment || prev.span.end > start {
        return None;
    }
    let gap = &code[prev.span.end..start];
    if !gap.trim().is_empty() || gap.matches('\n').count() > 1 {
        return None;
    }

    let raw = &code[prev.span.clone()];
    let cleaned = if let Some(line) = raw.strip_prefix("//") {
        line.trim().to_string()
    } else {
        raw.trim_start_matches("/*")
            .trim_end_matches("*/")
            .lines()
            .map(|l| l.trim().trim_start_matches('*').trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    };
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::SourceMap;

    /// Resolver over an in-memory file table, relative to the including file
    struct TableResolver(HashMap<PathBuf, String>);

    #[async_trait]
    impl IncludeResolver for TableResolver {
        fn resolve(&self, requested: &str, including_file: &Path) -> Result<PathBuf, IncludeError> {
            let dir = including_file.parent().unwrap_or(Path::new("/"));
            Ok(dir.join(requested))
        }

        async fn load(&self, path: &Path) -> Result<String, IncludeError> {
            self.0.get(path).cloned().ok_or_else(|| IncludeError::Unreadable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        }
    }

    fn resolver(files: &[(&str, &str)]) -> TableResolver {
        TableResolver(
            files
                .iter()
                .map(|(p, t)| (PathBuf::from(p), t.to_string()))
                .collect(),
        )
    }

    fn resolve_in(map: &SourceMap, offset: usize) -> (PathBuf, usize) {
        let (file, off) = map.resolve(offset).unwrap();
        (file.to_path_buf(), off)
    }

    async fn run(text: &str, files: &[(&str, &str)]) -> Preprocessed {
        LiteFrontend
            .preprocess(text, Path::new("/ws/main.sqf"), &resolver(files))
            .await
            .unwrap()
    }

    fn variables(code: &str) -> Vec<RawVariable> {
        let frontend = LiteFrontend;
        let tokens = frontend.tokenize(code).unwrap();
        let parsed = frontend.parse(&tokens).unwrap();
        frontend.analyze(&parsed.ast, &tokens, code).unwrap()
    }

    fn find<'a>(vars: &'a [RawVariable], name: &str) -> &'a RawVariable {
        vars.iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .unwrap_or_else(|| panic!("variable {} not found", name))
    }

    #[tokio::test]
    async fn test_plain_text_maps_to_itself() {
        let text = "a = 1;\nb = a;\n";
        let out = run(text, &[]).await;
        assert_eq!(out.code, text);
        assert_eq!(resolve_in(&out.source_map, 9), (PathBuf::from("/ws/main.sqf"), 9));
    }

    #[tokio::test]
    async fn test_define_is_blanked_and_recorded() {
        let text = "#define SPEED 10\nx = SPEED;\n";
        let out = run(text, &[]).await;
        assert_eq!(out.macros.len(), 1);
        assert_eq!(out.macros[0].name, "SPEED");
        assert_eq!(out.macros[0].value, "10");
        assert_eq!(out.macros[0].offset, 8);
        assert!(out.code.starts_with("                \nx = 10;"));
    }

    #[tokio::test]
    async fn test_function_like_macro_expansion() {
        let text = "#define ADD(a,b) (a + b)\nx = ADD(1, y);\n";
        let out = run(text, &[]).await;
        assert_eq!(out.macros[0].arguments.as_deref(), Some("(a, b)"));
        assert!(out.code.contains("x = (1 + y);"), "code was {:?}", out.code);
    }

    #[tokio::test]
    async fn test_macro_expansion_maps_to_defining_file() {
        let inc = "#define BROKEN (1 +\n";
        let text = "#include \"inc.hpp\"\nx = BROKEN;\n";
        let out = run(text, &[("/ws/inc.hpp", inc)]).await;

        let at = out.code.find("(1 +").unwrap();
        let (file, offset) = resolve_in(&out.source_map, at);
        assert_eq!(file, PathBuf::from("/ws/inc.hpp"));
        assert_eq!(&inc[offset..offset + 4], "(1 +");

        let x_at = out.code.find("x =").unwrap();
        let (file, offset) = resolve_in(&out.source_map, x_at);
        assert_eq!(file, PathBuf::from("/ws/main.sqf"));
        assert_eq!(&text[offset..offset + 3], "x =");
    }

    #[tokio::test]
    async fn test_include_records_and_maps() {
        let text = "#include \"lib.sqf\"\ny = 2;\n";
        let out = run(text, &[("/ws/lib.sqf", "libVar = 1;\n")]).await;
        assert_eq!(out.includes.len(), 1);
        assert_eq!(out.includes[0].filename, "lib.sqf");
        assert_eq!(out.includes[0].expanded_filename, PathBuf::from("/ws/lib.sqf"));

        let at = out.code.find("libVar").unwrap();
        assert_eq!(resolve_in(&out.source_map, at), (PathBuf::from("/ws/lib.sqf"), 0));
        let y_at = out.code.find("y = 2").unwrap();
        assert_eq!(resolve_in(&out.source_map, y_at), (PathBuf::from("/ws/main.sqf"), 19));
    }

    #[tokio::test]
    async fn test_include_on_last_line_after_expansion_maps_separator() {
        let text = "#define LONG_NAME_VALUE 1\nx = LONG_NAME_VALUE;\n#include \"lib.sqf\"";
        let out = run(text, &[("/ws/lib.sqf", "libVar = 1;\n")]).await;

        // Expansion shortened the generated code, so the offsets disagree
        let separator = out.includes[0].span.end;
        assert_ne!(separator, text.len());
        assert_eq!(&out.code[separator..separator + 1], "\n");
        assert_eq!(
            resolve_in(&out.source_map, separator),
            (PathBuf::from("/ws/main.sqf"), text.len())
        );
        let at = out.code.find("libVar").unwrap();
        assert_eq!(resolve_in(&out.source_map, at), (PathBuf::from("/ws/lib.sqf"), 0));
    }

    #[tokio::test]
    async fn test_missing_include_is_positioned_error() {
        let text = "x = 1;\n#include \"nope.hpp\"\ny = 2;\n";
        let out = run(text, &[]).await;
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].message.contains("nope.hpp"));
        assert_eq!(out.errors[0].span.start, 7);
        // Rest of the file still preprocessed
        assert!(out.code.contains("y = 2;"));
    }

    #[tokio::test]
    async fn test_recursive_include_stops_at_depth_limit() {
        let out = run("#include \"self.hpp\"\n", &[("/ws/self.hpp", "#include \"self.hpp\"\n")]).await;
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].message.contains("nested"));
        assert_eq!(out.includes.len(), MAX_INCLUDE_DEPTH);
    }

    #[tokio::test]
    async fn test_undef_stops_expansion() {
        let out = run("#define A 1\n#undef A\nx = A;\n", &[]).await;
        assert!(out.code.ends_with("x = A;\n"));
    }

    #[test]
    fn test_tokenize_kinds() {
        let code = "_x = \"a\"\"b\" + 1.5; // note\n/* block */ y == 2";
        let tokens = tokenize(code).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::String,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Punct(';'),
                TokenKind::Comment,
                TokenKind::Comment,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Number,
            ]
        );
        assert_eq!(&code[tokens[2].span.clone()], "\"a\"\"b\"");
    }

    #[test]
    fn test_tokenize_unterminated_string_fails_with_offset() {
        let err = tokenize("x = 1;\ny = \"open").unwrap_err();
        assert_eq!(err.offset, Some(11));
    }

    #[test]
    fn test_parse_reports_unbalanced_brackets() {
        let tokens = tokenize("if (a) then { b = [1, 2; };").unwrap();
        let parsed = parse(&tokens);
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].message.contains("'['"));

        let tokens = tokenize("x = 1; }").unwrap();
        let parsed = parse(&tokens);
        assert_eq!(parsed.errors[0].message, "Unexpected '}'");
    }

    #[test]
    fn test_definitions_and_usages() {
        let vars = variables("TAG_counter = 0;\nTAG_counter = TAG_counter + 1;\nhint str tag_COUNTER;");
        let counter = find(&vars, "TAG_counter");
        assert_eq!(counter.definitions.len(), 2);
        assert_eq!(counter.usages.len(), 2);
        assert_eq!(counter.name, "TAG_counter");
    }

    #[test]
    fn test_equality_is_not_definition() {
        let vars = variables("if (a == 1) then {};");
        let a = find(&vars, "a");
        assert!(a.definitions.is_empty());
        assert_eq!(a.usages.len(), 1);
    }

    #[test]
    fn test_string_declarations() {
        let code = "params [\"_unit\", [\"_range\", 10]];\nprivate [\"_a\", \"_b\"];\nfor \"_i\" from 0 to 3 do {};";
        let vars = variables(code);
        for name in ["_unit", "_range", "_a", "_b", "_i"] {
            let v = find(&vars, name);
            assert_eq!(v.definitions.len(), 1, "{} should be declared", name);
            assert_eq!(&code[v.definitions[0].clone()], name);
        }
    }

    #[test]
    fn test_comment_above_definition() {
        let code = "// Number of waves\nTAG_waves = 3;\n\n// detached\n\nTAG_other = 1;\n/* Spawn\n * radius */\nprivate _r = 5;";
        let vars = variables(code);
        assert_eq!(find(&vars, "TAG_waves").comment.as_deref(), Some("Number of waves"));
        assert_eq!(find(&vars, "TAG_other").comment, None);
        assert_eq!(find(&vars, "_r").comment.as_deref(), Some("Spawn\nradius"));
    }

    #[test]
    fn test_lint_flags_undefined_locals_only() {
        let code = "_a = 1; hint str (_a + _b + _this); globalVar = _b;";
        let frontend = LiteFrontend;
        let tokens = frontend.tokenize(code).unwrap();
        let parsed = frontend.parse(&tokens).unwrap();
        let lints = frontend.lint(&parsed.ast, code);
        assert_eq!(lints.len(), 2);
        assert!(lints.iter().all(|d| d.message.contains("_b")));
    }
}
