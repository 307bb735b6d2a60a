//! Stylesheet and script post-processing.
//!
//! Uses lightningcss for prefixing, formatting and minifying CSS and oxc for
//! minifying JavaScript.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Readable and minified renditions of one stylesheet.
#[derive(Debug, Clone)]
pub struct StyleOutput {
    /// Prefixed, pretty-printed CSS. Shares the structural optimizations of
    /// the prefixing pass (merged rules, collapsed shorthands), so only
    /// whitespace and comments differ from `minified`.
    pub expanded: String,

    /// Prefixed, minified CSS with every comment removed
    pub minified: String,
}

/// Resolve browserslist queries into prefixing targets.
///
/// No queries means no prefixing.
pub fn browser_targets(queries: &[String]) -> Result<Targets, String> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }

    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| format!("Invalid browsers query: {}", e))?;

    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Prefix and format compiled CSS, producing both output renditions.
pub fn process_css(css: &str, filename: &str, targets: Targets) -> Result<StyleOutput, String> {
    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| format!("CSS parse error: {}", e))?;

    // Vendor prefixes are inserted by the property handlers that run here;
    // the same pass merges rules and shorthands for both renditions.
    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| format!("CSS prefix error: {}", e))?;

    let expanded = stylesheet
        .to_css(PrinterOptions {
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| format!("CSS print error: {}", e))?
        .code;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| format!("CSS minify error: {}", e))?
        .code;

    let minified = strip_css_comments(&minified);

    Ok(StyleOutput {
        minified: not_larger(minified, &expanded),
        expanded,
    })
}

/// Remove every `/* ... */` comment, leaving quoted strings untouched.
pub fn strip_css_comments(css: &str) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
                i += 1;
            }
            None if b == b'"' || b == b'\'' => {
                quote = Some(b);
                i += 1;
            }
            None if b == b'/' && bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&css[start..i]);
                i = match css[i + 2..].find("*/") {
                    Some(end) => i + 2 + end + 2,
                    None => bytes.len(),
                };
                start = i;
            }
            None => i += 1,
        }
    }

    if start < css.len() {
        out.push_str(&css[start..]);
    }
    out
}

/// Minify JavaScript source code.
///
/// Sources are parsed as classic scripts, so top-level declarations are
/// globals of the page and survive unmangled even when unused here.
pub fn minify_js(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::script();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(format!("JS parse error: {}", messages.join("; ")));
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;

    Ok(not_larger(code, source))
}

/// A minifier may pad tiny inputs (a trailing `;`); never ship a larger file.
fn not_larger(minified: String, original: &str) -> String {
    if minified.len() > original.len() {
        original.to_string()
    } else {
        minified
    }
}
