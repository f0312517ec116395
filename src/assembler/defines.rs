/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::errors::AsmError;

// Expression recursion bound; a define cycle (`.define a b` / `.define b a`)
// hits this instead of blowing the stack.
const MAX_EVAL_DEPTH: u32 = 64;

// A define's stored value: folded constant, or an expression evaluated
// lazily against the table it lives in.
#[derive(Debug, Clone, PartialEq)]
pub enum DefineValue {
    Int(i32),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: String,
    value: Option<DefineValue>, // None = declared but not yet assigned
    public: bool,
}

/// Ordered symbol table. Entries keep insertion order (the printed output
/// relies on it) and names are unique. Labels go through the two-phase
/// declare/assign path; `.define` lands fully formed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defines {
    tab: Vec<Entry>,
}

impl Defines {
    pub fn new() -> Defines {
        Defines::default()
    }

    pub fn len(&self) -> usize {
        self.tab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tab.iter().any(|e| e.name == name)
    }

    fn find(&self, name: &str) -> Option<&Entry> {
        self.tab.iter().find(|e| e.name == name)
    }

    pub fn define(
        &mut self,
        name: &str,
        value: DefineValue,
        public: bool,
    ) -> Result<(), AsmError> {
        if self.contains(name) {
            return Err(AsmError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        self.tab.push(Entry {
            name: name.to_string(),
            value: Some(value),
            public,
        });
        Ok(())
    }

    /// Reserve a name for a forward label; `assign` fills it in later.
    pub fn declare(&mut self, name: &str, public: bool) -> Result<(), AsmError> {
        if self.contains(name) {
            return Err(AsmError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        self.tab.push(Entry {
            name: name.to_string(),
            value: None,
            public,
        });
        Ok(())
    }

    pub fn assign(&mut self, name: &str, value: i32) -> Result<(), AsmError> {
        let Some(entry) = self.tab.iter_mut().find(|e| e.name == name) else {
            return Err(AsmError::NotDeclared {
                name: name.to_string(),
            });
        };
        if entry.value.is_some() {
            return Err(AsmError::AlreadyAssigned {
                name: name.to_string(),
            });
        }
        entry.value = Some(DefineValue::Int(value));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<i32, AsmError> {
        self.resolve_depth(name, 0)
    }

    fn resolve_depth(&self, name: &str, depth: u32) -> Result<i32, AsmError> {
        let Some(entry) = self.find(name) else {
            return Err(AsmError::NotDefined {
                name: name.to_string(),
            });
        };
        match &entry.value {
            None => Err(AsmError::ValueNotAssigned {
                name: name.to_string(),
            }),
            Some(DefineValue::Int(v)) => Ok(*v),
            Some(DefineValue::Expr(e)) => self.eval_depth(e, depth + 1),
        }
    }

    /// Evaluate an expression against this table. Two's-complement 32-bit
    /// throughout; comparisons yield 1 or 0.
    pub fn eval(&self, expr: &Expr) -> Result<i32, AsmError> {
        self.eval_depth(expr, 0)
    }

    fn eval_depth(&self, expr: &Expr, depth: u32) -> Result<i32, AsmError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(AsmError::BadExpression {
                reason: "expression too deeply nested (definition cycle?)".to_string(),
            });
        }
        match expr {
            Expr::Num(n) => Ok(*n),
            Expr::Sym(name) => self.resolve_depth(name, depth),
            Expr::Unary(op, e) => {
                let v = self.eval_depth(e, depth + 1)?;
                Ok(match op {
                    UnaryOp::Neg => v.wrapping_neg(),
                    UnaryOp::Not => !v,
                    UnaryOp::Reverse => (v as u32).reverse_bits() as i32,
                })
            }
            Expr::Binary(op, l, r) => {
                let lhs = self.eval_depth(l, depth + 1)?;
                let rhs = self.eval_depth(r, depth + 1)?;
                match op {
                    BinOp::Or => Ok(lhs | rhs),
                    BinOp::And => Ok(lhs & rhs),
                    BinOp::Eq => Ok((lhs == rhs) as i32),
                    BinOp::Ne => Ok((lhs != rhs) as i32),
                    BinOp::Lt => Ok((lhs < rhs) as i32),
                    BinOp::Shl => Ok(((lhs as u32) << (rhs as u32 & 31)) as i32),
                    BinOp::Shr => Ok(((lhs as u32) >> (rhs as u32 & 31)) as i32),
                    BinOp::Add => Ok(lhs.wrapping_add(rhs)),
                    BinOp::Sub => Ok(lhs.wrapping_sub(rhs)),
                    BinOp::Mul => Ok(lhs.wrapping_mul(rhs)),
                    BinOp::Div => {
                        if rhs == 0 {
                            Err(AsmError::BadExpression {
                                reason: "division by zero".to_string(),
                            })
                        } else {
                            Ok(lhs.wrapping_div(rhs))
                        }
                    }
                    BinOp::Rem => {
                        if rhs == 0 {
                            Err(AsmError::BadExpression {
                                reason: "modulo by zero".to_string(),
                            })
                        } else {
                            Ok(lhs.wrapping_rem(rhs))
                        }
                    }
                }
            }
        }
    }

    /// Copy this table, optionally keeping only public entries. Fails if a
    /// kept entry is still unassigned.
    pub fn copy(&self, public_only: bool) -> Result<Defines, AsmError> {
        let mut out = Defines::new();
        for entry in &self.tab {
            if public_only && !entry.public {
                continue;
            }
            if entry.value.is_none() {
                return Err(AsmError::ValueNotAssigned {
                    name: entry.name.clone(),
                });
            }
            out.tab.push(entry.clone());
        }
        Ok(out)
    }

    /// Iterate entries in insertion order as (name, value, public) with every
    /// value fully resolved.
    pub fn resolved_entries(&self) -> Result<Vec<(String, i32, bool)>, AsmError> {
        self.tab
            .iter()
            .map(|e| Ok((e.name.clone(), self.resolve(&e.name)?, e.public)))
            .collect()
    }
}

// ------------- unit tests -------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_resolve() {
        let mut defs = Defines::new();
        defs.define("ten", DefineValue::Int(10), false).unwrap();
        assert_eq!(defs.resolve("ten").unwrap(), 10);
        assert!(defs.contains("ten"));
        assert!(!defs.contains("eleven"));
    }

    #[test]
    fn test_duplicate_define_fails() {
        let mut defs = Defines::new();
        defs.define("a", DefineValue::Int(1), false).unwrap();
        assert_eq!(
            defs.define("a", DefineValue::Int(2), false),
            Err(AsmError::AlreadyDefined {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_declare_assign_once() {
        let mut defs = Defines::new();
        defs.declare("lbl", false).unwrap();
        assert_eq!(
            defs.resolve("lbl"),
            Err(AsmError::ValueNotAssigned {
                name: "lbl".to_string()
            })
        );
        defs.assign("lbl", 7).unwrap();
        assert_eq!(defs.resolve("lbl").unwrap(), 7);
        assert_eq!(
            defs.assign("lbl", 8),
            Err(AsmError::AlreadyAssigned {
                name: "lbl".to_string()
            })
        );
    }

    #[test]
    fn test_assign_requires_declare() {
        let mut defs = Defines::new();
        assert_eq!(
            defs.assign("ghost", 1),
            Err(AsmError::NotDeclared {
                name: "ghost".to_string()
            })
        );
    }

    #[test]
    fn test_resolve_unknown() {
        let defs = Defines::new();
        assert_eq!(
            defs.resolve("nope"),
            Err(AsmError::NotDefined {
                name: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_copy_filters_public() {
        let mut defs = Defines::new();
        defs.define("a", DefineValue::Int(1), true).unwrap();
        defs.define("b", DefineValue::Int(2), false).unwrap();
        defs.define("c", DefineValue::Int(3), true).unwrap();

        let all = defs.copy(false).unwrap();
        assert_eq!(all.len(), 3);

        let public = defs.copy(true).unwrap();
        assert_eq!(public.len(), 2);
        assert!(public.contains("a"));
        assert!(!public.contains("b"));
        assert!(public.contains("c"));
    }

    #[test]
    fn test_copy_rejects_unassigned() {
        let mut defs = Defines::new();
        defs.declare("pending", true).unwrap();
        assert!(matches!(
            defs.copy(false),
            Err(AsmError::ValueNotAssigned { .. })
        ));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut defs = Defines::new();
        for name in ["z", "m", "a"] {
            defs.define(name, DefineValue::Int(0), false).unwrap();
        }
        let names: Vec<String> = defs
            .resolved_entries()
            .unwrap()
            .into_iter()
            .map(|(n, _, _)| n)
            .collect();
        assert_eq!(names, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_expr_value_evaluated_at_resolve_time() {
        let mut defs = Defines::new();
        defs.define(
            "double_base",
            DefineValue::Expr(Expr::Binary(
                BinOp::Mul,
                Box::new(Expr::Sym("base".to_string())),
                Box::new(Expr::Num(2)),
            )),
            false,
        )
        .unwrap();
        defs.define("base", DefineValue::Int(21), false).unwrap();
        assert_eq!(defs.resolve("double_base").unwrap(), 42);
    }

    #[test]
    fn test_eval_arithmetic() {
        let defs = Defines::new();
        let e = Expr::Binary(
            BinOp::Add,
            Box::new(Expr::Num(2)),
            Box::new(Expr::Binary(
                BinOp::Mul,
                Box::new(Expr::Num(3)),
                Box::new(Expr::Num(4)),
            )),
        );
        assert_eq!(defs.eval(&e).unwrap(), 14);

        let rev = Expr::Unary(UnaryOp::Reverse, Box::new(Expr::Num(1)));
        assert_eq!(defs.eval(&rev).unwrap(), i32::MIN);
    }

    #[test]
    fn test_eval_division_by_zero() {
        let defs = Defines::new();
        let e = Expr::Binary(BinOp::Div, Box::new(Expr::Num(1)), Box::new(Expr::Num(0)));
        assert!(matches!(
            defs.eval(&e),
            Err(AsmError::BadExpression { .. })
        ));
    }

    #[test]
    fn test_definition_cycle_is_an_error() {
        let mut defs = Defines::new();
        defs.define(
            "a",
            DefineValue::Expr(Expr::Sym("b".to_string())),
            false,
        )
        .unwrap();
        defs.define(
            "b",
            DefineValue::Expr(Expr::Sym("a".to_string())),
            false,
        )
        .unwrap();
        assert!(matches!(
            defs.resolve("a"),
            Err(AsmError::BadExpression { .. })
        ));
    }
}
