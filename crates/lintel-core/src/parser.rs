//! Parser front end.
//!
//! Source text goes through SWC and is lowered into the generic [`Ast`]. Comments are
//! collected on the side for inline directives, and the tokens the parser consumed
//! are kept for rules that inspect punctuation.

use swc_common::comments::{CommentKind as SwcCommentKind, SingleThreadedComments};
use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap, Spanned};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_parser::unstable::{Capturing, Token as SwcToken, TokenAndSpan};
use swc_ecma_parser::{EsSyntax, Lexer, Parser, StringInput, Syntax, TsSyntax};
use tracing::debug;

use crate::ast::lower::lower_program;
use crate::ast::{Ast, Span};
use crate::config::{LanguageOptions, SourceType};
use crate::source_code::{Comment, CommentKind, SourceCode, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
}

pub fn detect_language(filename: &str) -> Language {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "ts" | "mts" | "cts" => Language::TypeScript,
        "tsx" => Language::Tsx,
        "jsx" => Language::Jsx,
        _ => Language::JavaScript,
    }
}

/// Language options adjusted for the file extension of `filename`.
pub fn options_for_file(filename: &str, options: &LanguageOptions) -> LanguageOptions {
    let mut options = options.clone();
    match detect_language(filename) {
        Language::JavaScript => {}
        Language::TypeScript => options.typescript = true,
        Language::Jsx => options.jsx = true,
        Language::Tsx => {
            options.typescript = true;
            options.jsx = true;
        }
    }
    options
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    /// 1-based.
    pub column: usize,
    pub message: String,
}

pub struct ParsedFile {
    source_code: SourceCode,
    ast: Ast,
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("node_count", &self.ast.len())
            .field("line_count", &self.source_code.line_count())
            .field("comment_count", &self.source_code.comments().len())
            .finish()
    }
}

impl ParsedFile {
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn source_code(&self) -> &SourceCode {
        &self.source_code
    }

    pub fn source(&self) -> &str {
        self.source_code.text()
    }
}

fn syntax_for(options: &LanguageOptions) -> Syntax {
    if options.typescript {
        Syntax::Typescript(TsSyntax {
            tsx: options.jsx,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: options.jsx,
            decorators: true,
            allow_return_outside_function: options.source_type == SourceType::Commonjs,
            ..Default::default()
        })
    }
}

/// Parses `source` into a [`ParsedFile`].
///
/// Any syntax error, including ones SWC can recover from, fails the parse.
pub fn parse(source: &str, options: &LanguageOptions) -> Result<ParsedFile, ParseError> {
    let source_map: Lrc<SourceMap> = Default::default();
    let fm = source_map.new_source_file(
        FileName::Custom("input.js".into()).into(),
        source.to_string(),
    );
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        syntax_for(options),
        EsVersion::latest(),
        StringInput::from(&*fm),
        Some(&comments),
    );
    let capturing = Capturing::new(lexer);
    let captured = capturing.tokens();
    let mut parser = Parser::new_from(capturing);

    let program = match options.source_type {
        SourceType::Module => parser.parse_module().map(Program::Module),
        SourceType::Script | SourceType::Commonjs => parser.parse_script().map(Program::Script),
    };
    let recovered = parser.take_errors();
    drop(parser);

    let to_parse_error = |error: swc_ecma_parser::error::Error| {
        let loc = source_map.lookup_char_pos(error.span().lo);
        ParseError {
            line: loc.line,
            column: loc.col_display + 1,
            message: error.kind().msg().to_string(),
        }
    };

    let program = program.map_err(to_parse_error)?;
    if let Some(error) = recovered.into_iter().next() {
        return Err(to_parse_error(error));
    }

    let ast = lower_program(&program, source, fm.start_pos);
    let comments = collect_comments(comments, fm.start_pos.0);
    let tokens = collect_tokens(&captured.borrow(), source, fm.start_pos.0);
    debug!(
        nodes = ast.len(),
        comments = comments.len(),
        tokens = tokens.len(),
        "parsed source"
    );

    Ok(ParsedFile {
        source_code: SourceCode::new(source, comments).with_tokens(tokens),
        ast,
    })
}

fn collect_tokens(captured: &[TokenAndSpan], source: &str, base: u32) -> Vec<Token> {
    captured
        .iter()
        .filter_map(|captured| {
            let kind = token_kind(captured.token)?;
            let span = Span::new(
                captured.span.lo.0.saturating_sub(base) as usize,
                captured.span.hi.0.saturating_sub(base) as usize,
            );
            let value = source.get(span.start..span.end)?.to_string();
            Some(Token { kind, value, span })
        })
        .collect()
}

fn token_kind(token: SwcToken) -> Option<TokenKind> {
    use SwcToken as T;

    let kind = match token {
        T::Shebang | T::Error | T::Eof => return None,
        T::Str => TokenKind::String,
        T::Num | T::BigInt => TokenKind::Numeric,
        T::Regex => TokenKind::RegularExpression,
        T::Template
        | T::NoSubstitutionTemplateLiteral
        | T::TemplateHead
        | T::TemplateMiddle
        | T::TemplateTail => TokenKind::Template,
        T::JSXName => TokenKind::JSXIdentifier,
        T::JSXText => TokenKind::JSXText,
        T::True | T::False => TokenKind::Boolean,
        T::Null => TokenKind::Null,
        T::Await | T::Break | T::Case | T::Catch | T::Class | T::Const | T::Continue
        | T::Debugger | T::Default | T::Delete | T::Do | T::Else | T::Export | T::Extends
        | T::Finally | T::For | T::Function | T::If | T::Import | T::In | T::InstanceOf
        | T::Let | T::New | T::Return | T::Super | T::Switch | T::This | T::Throw | T::Try
        | T::TypeOf | T::Var | T::Void | T::While | T::With | T::Yield | T::Enum
        | T::Static => TokenKind::Keyword,
        T::LParen | T::RParen | T::LBrace | T::RBrace | T::LBracket | T::RBracket | T::Semi
        | T::Comma | T::Dot | T::Colon | T::QuestionMark | T::Bang | T::Tilde | T::Plus
        | T::Minus | T::Asterisk | T::Slash | T::Percent | T::Lt | T::Gt | T::Pipe
        | T::Caret | T::Ampersand | T::Eq | T::At | T::Hash | T::BackQuote | T::Arrow
        | T::DotDotDot | T::PlusPlus | T::MinusMinus | T::PlusEq | T::MinusEq | T::MulEq
        | T::DivEq | T::ModEq | T::LShiftEq | T::RShiftEq | T::ZeroFillRShiftEq
        | T::BitOrEq | T::BitXorEq | T::BitAndEq | T::ExpEq | T::LogicalOrEq
        | T::LogicalAndEq | T::NullishEq | T::OptionalChain | T::EqEq | T::NotEq
        | T::EqEqEq | T::NotEqEq | T::LtEq | T::GtEq | T::LShift | T::RShift
        | T::ZeroFillRShift | T::Exp | T::LogicalOr | T::LogicalAnd
        | T::NullishCoalescing | T::LessSlash | T::DollarLBrace | T::JSXTagStart
        | T::JSXTagEnd => TokenKind::Punctuator,
        // Contextual keywords and TypeScript words read as identifiers.
        _ => TokenKind::Identifier,
    };
    Some(kind)
}

fn collect_comments(comments: SingleThreadedComments, base: u32) -> Vec<Comment> {
    let (leading, trailing) = comments.take_all();
    let leading = leading.borrow();
    let trailing = trailing.borrow();

    let mut out: Vec<Comment> = leading
        .values()
        .chain(trailing.values())
        .flatten()
        .map(|comment| Comment {
            kind: match comment.kind {
                SwcCommentKind::Line => CommentKind::Line,
                SwcCommentKind::Block => CommentKind::Block,
            },
            value: comment.text.to_string(),
            span: Span::new(
                comment.span.lo.0.saturating_sub(base) as usize,
                comment.span.hi.0.saturating_sub(base) as usize,
            ),
        })
        .collect();
    out.sort_by_key(|comment| comment.span.start);
    out.dedup_by_key(|comment| comment.span.start);
    out
}
