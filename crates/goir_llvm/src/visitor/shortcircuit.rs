//! C5a — short-circuit `&&`/`||` lowering.
//!
//! Builds the three-block (or two-block) diamond from SPEC_FULL.md §4.5a: a
//! lazily-invoked RHS thunk that may itself grow the CFG, followed by a Phi
//! whose `rhsBlock` predecessor is re-read after the thunk runs rather than
//! assumed to be the block the thunk started in.

use goir_hir::{BinOp, ExprId, Lit, TypeId};

use crate::error::Result;
use crate::lower_cx::LowerCx;
use crate::value::{ConstValue, Value};

impl<'ll, 'a> LowerCx<'ll, 'a> {
    /// `x || y` / `x && y`. `x`/`y` are still unevaluated `ExprId`s (not
    /// pre-lowered `Value`s) because the RHS must only be evaluated when
    /// the LHS doesn't already decide the result.
    pub(crate) fn lower_short_circuit(&mut self, op: BinOp, x: ExprId, y: ExprId, result_ty: TypeId) -> Result<Value<'ll>> {
        let lhs = self.lower(x)?;

        // Static fold: `true || _ = true`; `false && _ = false`.
        if let Value::Const(ConstValue { lit: Lit::Bool(b), .. }) = lhs {
            let decides = match op {
                BinOp::LOr => b,
                BinOp::LAnd => !b,
                _ => false,
            };
            if decides {
                return Ok(Value::Const(ConstValue { lit: Lit::Bool(b), ty: result_ty }));
            }
            // LHS doesn't decide the result on its own: evaluate the RHS
            // alone, no merge block needed.
            return self.lower(y);
        }

        let lhs_val = self.materialize(&lhs)?.into_int_value();
        let function = self.current_function();

        let lhs_block = self.builder.get_insert_block().expect("builder has an insertion point");
        let rhs_block = self.scx.llcx.append_basic_block(function, "shortcircuit.rhs");
        let merge_block = self.scx.llcx.append_basic_block(function, "shortcircuit.merge");

        match op {
            BinOp::LOr => {
                self.builder.build_conditional_branch(lhs_val, merge_block, rhs_block).unwrap();
            }
            BinOp::LAnd => {
                self.builder.build_conditional_branch(lhs_val, rhs_block, merge_block).unwrap();
            }
            _ => unreachable!("lower_short_circuit called with a non-logical BinOp"),
        }

        self.builder.position_at_end(rhs_block);
        let rhs = self.lower(y)?;
        let rhs_val = self.materialize(&rhs)?.into_int_value();
        // The thunk (`self.lower(y)`) may have emitted its own control flow;
        // the Phi's real predecessor is wherever the builder ended up, not
        // `rhs_block` itself.
        let rhs_end_block = self.builder.get_insert_block().expect("builder has an insertion point");
        self.builder.build_unconditional_branch(merge_block).unwrap();

        self.builder.position_at_end(merge_block);
        let bool_ty = self.scx.type_i1();
        let phi = self.builder.build_phi(bool_ty, "shortcircuit.result").unwrap();
        let lhs_const = bool_ty.const_int(u64::from(op == BinOp::LOr), false);
        phi.add_incoming(&[(&lhs_const, lhs_block), (&rhs_val, rhs_end_block)]);

        Ok(Value::Llvm(crate::value::LLVMValue::simple(
            phi.as_basic_value(),
            result_ty,
        )))
    }
}
