// Parsed form of a step's source line.
// Wraps a `syn` statement and knows how to recognise the target marker call.

use proc_macro2::TokenStream;
use quote::ToTokens;
use serde::Deserialize;
use syn::{Expr, PathArguments, Stmt};

use crate::error::MalformedTargetReason;

/// Default callee that designates the value to explain.
pub const DEFAULT_MARKER: &str = "cyberbrain::register";

/// A single parsed statement.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    stmt: Stmt,
}

impl ParsedSource {
    pub fn new(stmt: Stmt) -> Self {
        Self { stmt }
    }

    pub fn tokens(&self) -> TokenStream {
        self.stmt.to_token_stream()
    }

    /// Prints the statement back to source text.
    pub fn to_source_text(&self) -> String {
        self.tokens().to_string()
    }

    /// Extracts `name` out of `marker(name)`.
    pub fn marker_argument(&self, marker: &MarkerConfig) -> Result<String, MalformedTargetReason> {
        let expr = match &self.stmt {
            Stmt::Expr(expr, _) => expr,
            _ => return Err(MalformedTargetReason::NotACall),
        };

        let (callee, args): (String, Vec<&Expr>) = match expr {
            Expr::Call(call) => {
                let callee = match call.func.as_ref() {
                    Expr::Path(p) if p.qself.is_none() => p
                        .path
                        .segments
                        .iter()
                        .map(|s| s.ident.to_string())
                        .collect::<Vec<_>>()
                        .join("::"),
                    other => other.to_token_stream().to_string(),
                };
                (callee, call.args.iter().collect())
            }
            // `cyberbrain.register(x)` spells the same marker as a method call.
            Expr::MethodCall(call) => {
                let receiver = match bare_identifier(&call.receiver) {
                    Some(name) => name,
                    None => call.receiver.to_token_stream().to_string(),
                };
                (format!("{}::{}", receiver, call.method), call.args.iter().collect())
            }
            _ => return Err(MalformedTargetReason::NotACall),
        };

        if callee != marker.path {
            return Err(MalformedTargetReason::WrongCallee(callee));
        }
        if args.len() != 1 {
            return Err(MalformedTargetReason::ArgumentCount(args.len()));
        }
        bare_identifier(args[0]).ok_or(MalformedTargetReason::NotAnIdentifier)
    }
}

fn bare_identifier(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Path(p)
            if p.attrs.is_empty()
                && p.qself.is_none()
                && p.path.leading_colon.is_none()
                && p.path.segments.len() == 1 =>
        {
            let segment = &p.path.segments[0];
            match segment.arguments {
                PathArguments::None => Some(segment.ident.to_string()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Which call marks the value the user wants explained.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// `::`-separated callee path, e.g. `cyberbrain::register`.
    pub path: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_MARKER.to_string(),
        }
    }
}
