//! Transformation recipes: short textual programs of the form
//! `return <TYPE>(InputMat [, r [, c]])` that rebuild a tuned
//! representation from scratch. Reimplemented as a tiny hand-written AST
//! and parser rather than an embedded interpreter (spec §9: "the grammar
//! is trivially small").

use crate::block::{convert, BlockStore};
use crate::csr::CsrMatrix;
use crate::error::{EngineError, Result};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// A parsed transformation recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub target_type: String,
    pub args: Vec<RecipeArg>,
}

/// An argument to a recipe call: either the literal input-matrix
/// placeholder or an integer block dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeArg {
    InputMat,
    Int(i64),
}

impl Recipe {
    /// Build the recipe for a block-store transformation, e.g.
    /// `return BCSR(InputMat, 4, 2)`.
    pub fn new_block_store(target_type: &str, r: usize, c: usize) -> Self {
        Self {
            target_type: target_type.to_string(),
            args: alloc::vec![RecipeArg::InputMat, RecipeArg::Int(r as i64), RecipeArg::Int(c as i64)],
        }
    }

    /// Render as `return TYPE(arg, arg, ...)`.
    pub fn to_text(&self) -> String {
        let mut out = String::from("return ");
        out.push_str(&self.target_type);
        out.push('(');
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match arg {
                RecipeArg::InputMat => out.push_str("InputMat"),
                RecipeArg::Int(v) => out.push_str(&v.to_string()),
            }
        }
        out.push(')');
        out
    }

    /// Parse `return TYPE(InputMat[, r[, c]])`.
    pub fn parse(text: &str) -> Result<Self> {
        let syntax_err = |message: &str| EngineError::Syntax {
            recipe: text.to_string(),
            message: message.into(),
        };

        let text = text.trim();
        let rest = text.strip_prefix("return").ok_or_else(|| syntax_err("expected 'return'"))?;
        let rest = rest.trim_start();

        let open = rest.find('(').ok_or_else(|| syntax_err("expected '('"))?;
        let target_type = rest[..open].trim().to_string();
        if target_type.is_empty() {
            return Err(syntax_err("missing target type"));
        }

        let close = rest.rfind(')').ok_or_else(|| syntax_err("expected ')'"))?;
        if close < open {
            return Err(syntax_err("mismatched parentheses"));
        }
        let arg_text = &rest[open + 1..close];

        let mut args = Vec::new();
        for (i, raw) in arg_text.split(',').enumerate() {
            let raw = raw.trim();
            if raw.is_empty() {
                if i == 0 {
                    continue;
                }
                return Err(syntax_err("empty argument"));
            }
            if raw == "InputMat" {
                args.push(RecipeArg::InputMat);
            } else {
                let v: i64 = raw.parse().map_err(|_| syntax_err("argument is neither InputMat nor an integer"))?;
                args.push(RecipeArg::Int(v));
            }
        }

        Ok(Self { target_type, args })
    }

    /// Re-apply this recipe to `csr`, rebuilding a tuned representation
    /// from scratch.
    pub fn apply(&self, csr: &CsrMatrix<'_>) -> Result<BlockStore> {
        let dims: Vec<i64> = self
            .args
            .iter()
            .filter_map(|a| match a {
                RecipeArg::Int(v) => Some(*v),
                RecipeArg::InputMat => None,
            })
            .collect();
        if dims.len() != 2 || dims.iter().any(|&v| v <= 0) {
            return Err(EngineError::Syntax {
                recipe: self.to_text(),
                message: "expected two positive block dimensions".into(),
            });
        }
        let r = dims[0] as usize;
        let c = dims[1] as usize;

        match self.target_type.as_str() {
            "BCSR" => Ok(BlockStore::Bcsr(convert::csr_to_bcsr(csr, r, c)?)),
            "MBCSR" => Ok(BlockStore::Mbcsr(convert::csr_to_mbcsr(csr, r, c)?)),
            other => Err(EngineError::Syntax {
                recipe: self.to_text(),
                message: alloc::format!("unknown target type '{other}'"),
            }),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        let recipe = Recipe::new_block_store("MBCSR", 4, 2);
        let text = recipe.to_text();
        assert_eq!(text, "return MBCSR(InputMat, 4, 2)");
        let parsed = Recipe::parse(&text).unwrap();
        assert_eq!(parsed, recipe);
    }

    #[test]
    fn malformed_recipe_is_a_syntax_error() {
        assert!(Recipe::parse("return MBCSR(InputMat, 4").is_err());
        assert!(Recipe::parse("MBCSR(InputMat, 4, 2)").is_err());
        assert!(Recipe::parse("return MBCSR(InputMat, four, 2)").is_err());
    }

    #[test]
    fn apply_rebuilds_the_tuned_representation() {
        let a = CsrMatrix::from_triplets(
            &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0), (3, 3, 5.0)],
            4,
            4,
        )
        .unwrap();
        let recipe = Recipe::new_block_store("BCSR", 2, 2);
        let store = recipe.apply(&a).unwrap();
        assert_eq!(store.r(), 2);
        assert_eq!(store.c(), 2);
    }
}
