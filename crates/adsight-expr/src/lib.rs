//! # adsight-expr
//!
//! Arithmetic expressions over metric rows, used to compute derived values
//! such as ROAS or CTR without hard-coding each formula.
//!
//! Expressions are tokenized, parsed into an [`Expr`] tree and evaluated by
//! walking that tree. The grammar covers numeric literals, field names,
//! `+ - * /`, unary minus, parentheses and a single function,
//! `SAFE_DIVIDE(a, b)`, which returns `0` instead of dividing by zero.
//!
//! ```rust
//! use adsight_expr::{MetricRow, evaluate};
//!
//! let row = MetricRow::new().with("revenue", 500.0).with("spend", 125.0);
//! assert_eq!(evaluate("SAFE_DIVIDE(revenue, spend)", &row), 4.0);
//! assert_eq!(evaluate("revenue / (spend - 125)", &row), 0.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod derived;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use derived::{DerivedMetrics, standard_definitions};
pub use error::{ExprError, Result};
pub use eval::{Expression, MetricRow, evaluate, safe_divide};
pub use parser::{BinOp, Expr};
