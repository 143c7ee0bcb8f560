// Infrastructure implementations for Cyberbrain.

pub mod config;
pub mod recording_loader;

use syn::{Expr, Stmt};

use crate::domain::ast::ParsedSource;
use crate::ports::SourceParser;

/// Parses source lines with `syn`.
///
/// A trailing `;` is optional: a bare call such as `f(x)` is accepted as an
/// expression statement.
pub struct SynSourceParser;

impl SourceParser for SynSourceParser {
    fn parse(&self, source: &str) -> Option<ParsedSource> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        let stmt = match syn::parse_str::<Stmt>(source) {
            Ok(stmt) => stmt,
            Err(_) => Stmt::Expr(syn::parse_str::<Expr>(source).ok()?, None),
        };
        Some(ParsedSource::new(stmt))
    }
}
