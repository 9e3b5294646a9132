//! C3 — Value Abstraction.
//!
//! A tagged union, not a trait object hierarchy (§9's design note prefers a
//! closed sum over open polymorphism): each variant carries exactly the
//! auxiliary data it needs.

use goir_hir::{BasicKind, BinOp, Lit, TypeId, TypeKind, UnOp};
use inkwell::values::{BasicValue, BasicValueEnum, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::error::{CodegenError, Result};
use crate::lower_cx::LowerCx;
use crate::scope::SlotId;

/// A first-class SSA value of a known source type.
#[derive(Copy, Clone)]
pub struct LLVMValue<'ll> {
    pub ssa: BasicValueEnum<'ll>,
    pub ty: TypeId,
    /// Back-reference to the stack slot this value was loaded from, if it
    /// is addressable (supports a later `&x` or use as an assignment LHS
    /// without a redundant re-load).
    pub pointer: Option<PointerValue<'ll>>,
    /// Set when this value is a bound method: the already-`ptr`-typed
    /// receiver to pass as the leading call argument.
    pub receiver: Option<BasicValueEnum<'ll>>,
}

impl<'ll> LLVMValue<'ll> {
    pub fn simple(ssa: BasicValueEnum<'ll>, ty: TypeId) -> Self {
        Self {
            ssa,
            ty,
            pointer: None,
            receiver: None,
        }
    }

    pub fn addressable(ssa: BasicValueEnum<'ll>, ty: TypeId, slot: PointerValue<'ll>) -> Self {
        Self {
            ssa,
            ty,
            pointer: Some(slot),
            receiver: None,
        }
    }
}

/// An untyped or typed constant, carried symbolically so implicit
/// conversion at the use site doesn't need to re-derive the literal.
#[derive(Copy, Clone)]
pub struct ConstValue {
    pub lit: Lit,
    pub ty: TypeId,
}

/// An expression whose value is a type — lets call-syntax dispatch detect
/// "this is a conversion, not a call" (C7).
#[derive(Copy, Clone)]
pub struct TypeValue {
    pub ty: TypeId,
}

#[derive(Copy, Clone)]
pub enum Value<'ll> {
    Llvm(LLVMValue<'ll>),
    Const(ConstValue),
    Type(TypeValue),
}

impl<'ll> Value<'ll> {
    pub fn ty(&self) -> TypeId {
        match self {
            Value::Llvm(v) => v.ty,
            Value::Const(v) => v.ty,
            Value::Type(v) => v.ty,
        }
    }

    pub fn as_llvm(&self) -> Option<&LLVMValue<'ll>> {
        match self {
            Value::Llvm(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&ConstValue> {
        match self {
            Value::Const(v) => Some(v),
            _ => None,
        }
    }
}

fn wrap_to_width(value: i64, bits: u32, signed: bool) -> i64 {
    if bits >= 64 {
        return value;
    }
    let mask: u64 = (1u64 << bits) - 1;
    let truncated = (value as u64) & mask;
    if signed {
        let sign_bit = 1u64 << (bits - 1);
        if truncated & sign_bit != 0 {
            (truncated | !mask) as i64
        } else {
            truncated as i64
        }
    } else {
        truncated as i64
    }
}

impl<'ll, 'a> LowerCx<'ll, 'a> {
    /// Bit width and signedness of a `Basic` integer type, if `t`'s
    /// underlying is one. `Int`/`Uint` resolve through `LowerConfig`'s
    /// configured width (§9).
    pub(crate) fn int_info(&self, t: TypeId) -> Option<(u32, bool)> {
        let underlying = self.pool.underlying_id(t);
        match self.pool.get(underlying) {
            TypeKind::Basic(BasicKind::Bool) => Some((1, false)),
            TypeKind::Basic(BasicKind::Int8) => Some((8, true)),
            TypeKind::Basic(BasicKind::Uint8) => Some((8, false)),
            TypeKind::Basic(BasicKind::Int16) => Some((16, true)),
            TypeKind::Basic(BasicKind::Uint16) => Some((16, false)),
            TypeKind::Basic(BasicKind::Int32) => Some((32, true)),
            TypeKind::Basic(BasicKind::Uint32) => Some((32, false)),
            TypeKind::Basic(BasicKind::Int64) => Some((64, true)),
            TypeKind::Basic(BasicKind::Uint64) => Some((64, false)),
            TypeKind::Basic(BasicKind::Int) => Some((self.config.int_width.bits(), true)),
            TypeKind::Basic(BasicKind::Uint) => Some((self.config.int_width.bits(), false)),
            TypeKind::Basic(BasicKind::Uintptr) => Some((self.config.pointer_width, false)),
            _ => None,
        }
    }

    pub(crate) fn is_float(&self, t: TypeId) -> bool {
        let underlying = self.pool.underlying_id(t);
        matches!(
            self.pool.get(underlying),
            TypeKind::Basic(BasicKind::Float32) | TypeKind::Basic(BasicKind::Float64)
        )
    }

    pub(crate) fn is_string(&self, t: TypeId) -> bool {
        let underlying = self.pool.underlying_id(t);
        matches!(self.pool.get(underlying), TypeKind::Basic(BasicKind::String))
    }

    /// `Struct`/`Array` operands compare by byte equality via
    /// `goir_memequal` (§4's "NEQ on strings ... should be covered" note
    /// generalizes to composite comparability; `binary_op` routes both
    /// `Eql`/`Neq` here before falling through to the int/float paths).
    fn is_composite(&self, t: TypeId) -> bool {
        let underlying = self.pool.underlying_id(t);
        matches!(self.pool.get(underlying), TypeKind::Struct { .. } | TypeKind::Array { .. })
    }

    /// Turn any `Value` into a concrete LLVM SSA value, materializing
    /// constants into real `inkwell` constant values on demand.
    pub fn materialize(&mut self, v: &Value<'ll>) -> Result<BasicValueEnum<'ll>> {
        match v {
            Value::Llvm(llv) => Ok(llv.ssa),
            Value::Const(c) => self.materialize_const(c),
            Value::Type(_) => Err(CodegenError::TypeMismatch {
                expected: "value".to_owned(),
                found: "type".to_owned(),
            }),
        }
    }

    fn materialize_const(&mut self, c: &ConstValue) -> Result<BasicValueEnum<'ll>> {
        let llvm_ty = self.types.to_llvm(self.pool, c.ty)?.ty;
        Ok(match c.lit {
            Lit::Int(n) => {
                let int_ty = llvm_ty.into_int_type();
                int_ty.const_int(n as u64, true).as_basic_value_enum()
            }
            Lit::Float(f) => {
                let float_ty = llvm_ty.into_float_type();
                float_ty.const_float(f).as_basic_value_enum()
            }
            Lit::Bool(b) => self
                .scx
                .type_i1()
                .const_int(u64::from(b), false)
                .as_basic_value_enum(),
            Lit::Char(ch) => self
                .scx
                .type_i32()
                .const_int(u64::from(ch as u32), false)
                .as_basic_value_enum(),
            Lit::Str(name) => {
                let s = self.interner.lookup(name);
                let global = self.builder.build_global_string_ptr(s, "str.lit").unwrap();
                let data = global.as_pointer_value().as_basic_value_enum();
                let len = self.scx.type_i32().const_int(s.len() as u64, false);
                let string_ty = self.types.string_type().into_struct_type();
                let agg = string_ty.const_named_struct(&[
                    data,
                    len.as_basic_value_enum(),
                ]);
                agg.as_basic_value_enum()
            }
        })
    }

    /// `Value::convert(target)`.
    pub fn convert(&mut self, v: Value<'ll>, target: TypeId) -> Result<Value<'ll>> {
        match v {
            Value::Const(c) => Ok(Value::Const(ConstValue { lit: c.lit, ty: target })),
            Value::Type(_) => Err(CodegenError::TypeMismatch {
                expected: "value".to_owned(),
                found: "type".to_owned(),
            }),
            Value::Llvm(llv) => {
                if let (Some((from_bits, from_signed)), Some((to_bits, _))) =
                    (self.int_info(llv.ty), self.int_info(target))
                {
                    let target_llvm = self.types.to_llvm(self.pool, target)?.ty.into_int_type();
                    let int_val = llv.ssa.into_int_value();
                    let converted = match to_bits.cmp(&from_bits) {
                        std::cmp::Ordering::Greater if from_signed => self
                            .builder
                            .build_int_s_extend(int_val, target_llvm, "sext")
                            .unwrap(),
                        std::cmp::Ordering::Greater => self
                            .builder
                            .build_int_z_extend(int_val, target_llvm, "zext")
                            .unwrap(),
                        std::cmp::Ordering::Less => self
                            .builder
                            .build_int_truncate(int_val, target_llvm, "trunc")
                            .unwrap(),
                        std::cmp::Ordering::Equal => int_val,
                    };
                    return Ok(Value::Llvm(LLVMValue::simple(
                        converted.as_basic_value_enum(),
                        target,
                    )));
                }

                if self.is_float(llv.ty) && self.is_float(target) {
                    let target_llvm = self.types.to_llvm(self.pool, target)?.ty.into_float_type();
                    let converted = self
                        .builder
                        .build_float_cast(llv.ssa.into_float_value(), target_llvm, "fcast")
                        .unwrap();
                    return Ok(Value::Llvm(LLVMValue::simple(
                        converted.as_basic_value_enum(),
                        target,
                    )));
                }

                // Pointers, named structs with identical underlyings, and
                // interface witnesses are all `ptr`/struct-of-`ptr` under
                // opaque pointers; no bitcast instruction is needed, only a
                // re-tag of the source type.
                Ok(Value::Llvm(LLVMValue {
                    ssa: llv.ssa,
                    ty: target,
                    pointer: llv.pointer,
                    receiver: llv.receiver,
                }))
            }
        }
    }

    fn const_fold(&self, op: BinOp, a: &ConstValue, b: &ConstValue, result_ty: TypeId) -> Option<ConstValue> {
        match (a.lit, b.lit) {
            (Lit::Int(x), Lit::Int(y)) => {
                let raw = match op {
                    BinOp::Add => x.wrapping_add(y),
                    BinOp::Sub => x.wrapping_sub(y),
                    BinOp::Mul => x.wrapping_mul(y),
                    BinOp::Quo if y != 0 => x.wrapping_div(y),
                    BinOp::Rem if y != 0 => x.wrapping_rem(y),
                    BinOp::And => x & y,
                    BinOp::Or => x | y,
                    BinOp::Xor => x ^ y,
                    BinOp::AndNot => x & !y,
                    BinOp::Shl => x.wrapping_shl(y as u32),
                    BinOp::Shr => x.wrapping_shr(y as u32),
                    BinOp::Eql => return Some(ConstValue { lit: Lit::Bool(x == y), ty: result_ty }),
                    BinOp::Neq => return Some(ConstValue { lit: Lit::Bool(x != y), ty: result_ty }),
                    BinOp::Lss => return Some(ConstValue { lit: Lit::Bool(x < y), ty: result_ty }),
                    BinOp::Leq => return Some(ConstValue { lit: Lit::Bool(x <= y), ty: result_ty }),
                    BinOp::Gtr => return Some(ConstValue { lit: Lit::Bool(x > y), ty: result_ty }),
                    BinOp::Geq => return Some(ConstValue { lit: Lit::Bool(x >= y), ty: result_ty }),
                    _ => return None,
                };
                let wrapped = match self.int_info(result_ty) {
                    Some((bits, signed)) => wrap_to_width(raw, bits, signed),
                    None => raw,
                };
                Some(ConstValue { lit: Lit::Int(wrapped), ty: result_ty })
            }
            (Lit::Float(x), Lit::Float(y)) => Some(match op {
                BinOp::Add => ConstValue { lit: Lit::Float(x + y), ty: result_ty },
                BinOp::Sub => ConstValue { lit: Lit::Float(x - y), ty: result_ty },
                BinOp::Mul => ConstValue { lit: Lit::Float(x * y), ty: result_ty },
                BinOp::Quo => ConstValue { lit: Lit::Float(x / y), ty: result_ty },
                BinOp::Eql => ConstValue { lit: Lit::Bool(x == y), ty: result_ty },
                BinOp::Neq => ConstValue { lit: Lit::Bool(x != y), ty: result_ty },
                BinOp::Lss => ConstValue { lit: Lit::Bool(x < y), ty: result_ty },
                BinOp::Leq => ConstValue { lit: Lit::Bool(x <= y), ty: result_ty },
                BinOp::Gtr => ConstValue { lit: Lit::Bool(x > y), ty: result_ty },
                BinOp::Geq => ConstValue { lit: Lit::Bool(x >= y), ty: result_ty },
                _ => return None,
            }),
            (Lit::Bool(x), Lit::Bool(y)) => Some(match op {
                BinOp::Eql => ConstValue { lit: Lit::Bool(x == y), ty: result_ty },
                BinOp::Neq => ConstValue { lit: Lit::Bool(x != y), ty: result_ty },
                _ => return None,
            }),
            (Lit::Str(x), Lit::Str(y)) => {
                let xs = self.interner.lookup(x);
                let ys = self.interner.lookup(y);
                Some(match op {
                    BinOp::Eql => ConstValue { lit: Lit::Bool(xs == ys), ty: result_ty },
                    BinOp::Neq => ConstValue { lit: Lit::Bool(xs != ys), ty: result_ty },
                    _ => return None,
                })
            }
            _ => None,
        }
    }

    /// `Value::binary_op(op, rhs)`. Folds at the constant level when both
    /// operands are `ConstValue`s (no IR emitted); otherwise materializes
    /// and emits real instructions, picking signed/unsigned or ordered
    /// float variants per the operand type.
    pub fn binary_op(&mut self, op: BinOp, lhs: Value<'ll>, rhs: Value<'ll>, result_ty: TypeId) -> Result<Value<'ll>> {
        if op.is_logical() {
            return Err(CodegenError::Unreachable {
                expr: goir_hir::ExprId::NONE,
                detail: "logical operators are lowered by the short-circuit path, not binary_op".to_owned(),
            });
        }

        if let (Value::Const(a), Value::Const(b)) = (&lhs, &rhs) {
            if let Some(folded) = self.const_fold(op, a, b, result_ty) {
                return Ok(Value::Const(folded));
            }
        }

        let operand_ty = lhs.ty();
        if self.is_string(operand_ty) && matches!(op, BinOp::Add | BinOp::Eql | BinOp::Neq | BinOp::Lss | BinOp::Leq | BinOp::Gtr | BinOp::Geq) {
            return self.lower_string_binary_op(op, lhs, rhs, result_ty);
        }

        if matches!(op, BinOp::Eql | BinOp::Neq) && self.is_composite(operand_ty) {
            let lhs_ptr = lhs.as_llvm().and_then(|v| v.pointer).ok_or_else(|| CodegenError::TypeMismatch {
                expected: "addressable struct/array value".to_owned(),
                found: "non-addressable value".to_owned(),
            })?;
            let rhs_ptr = rhs.as_llvm().and_then(|v| v.pointer).ok_or_else(|| CodegenError::TypeMismatch {
                expected: "addressable struct/array value".to_owned(),
                found: "non-addressable value".to_owned(),
            })?;
            return self.lower_composite_equality(lhs_ptr, rhs_ptr, operand_ty, op == BinOp::Neq, result_ty);
        }

        let l = self.materialize(&lhs)?;
        let r = self.materialize(&rhs)?;

        if let Some((_, signed)) = self.int_info(operand_ty) {
            let li = l.into_int_value();
            let ri = r.into_int_value();
            let result: BasicValueEnum = match op {
                BinOp::Add => self.builder.build_int_add(li, ri, "add").unwrap().as_basic_value_enum(),
                BinOp::Sub => self.builder.build_int_sub(li, ri, "sub").unwrap().as_basic_value_enum(),
                BinOp::Mul => self.builder.build_int_mul(li, ri, "mul").unwrap().as_basic_value_enum(),
                BinOp::Quo if signed => self.builder.build_int_signed_div(li, ri, "sdiv").unwrap().as_basic_value_enum(),
                BinOp::Quo => self.builder.build_int_unsigned_div(li, ri, "udiv").unwrap().as_basic_value_enum(),
                BinOp::Rem if signed => self.builder.build_int_signed_rem(li, ri, "srem").unwrap().as_basic_value_enum(),
                BinOp::Rem => self.builder.build_int_unsigned_rem(li, ri, "urem").unwrap().as_basic_value_enum(),
                BinOp::And => self.builder.build_and(li, ri, "and").unwrap().as_basic_value_enum(),
                BinOp::Or => self.builder.build_or(li, ri, "or").unwrap().as_basic_value_enum(),
                BinOp::Xor => self.builder.build_xor(li, ri, "xor").unwrap().as_basic_value_enum(),
                BinOp::AndNot => {
                    let not_r = self.builder.build_not(ri, "not").unwrap();
                    self.builder.build_and(li, not_r, "andnot").unwrap().as_basic_value_enum()
                }
                BinOp::Shl => self.builder.build_left_shift(li, ri, "shl").unwrap().as_basic_value_enum(),
                BinOp::Shr => self
                    .builder
                    .build_right_shift(li, ri, signed, "shr")
                    .unwrap()
                    .as_basic_value_enum(),
                _ if op.is_comparison() => {
                    let pred = int_predicate(op, signed);
                    self.builder.build_int_compare(pred, li, ri, "cmp").unwrap().as_basic_value_enum()
                }
                _ => {
                    return Err(CodegenError::UnresolvedBuiltin {
                        name: format!("{op:?}"),
                    })
                }
            };
            return Ok(Value::Llvm(LLVMValue::simple(result, result_ty)));
        }

        if self.is_float(operand_ty) {
            let lf = l.into_float_value();
            let rf = r.into_float_value();
            let result: BasicValueEnum = match op {
                BinOp::Add => self.builder.build_float_add(lf, rf, "fadd").unwrap().as_basic_value_enum(),
                BinOp::Sub => self.builder.build_float_sub(lf, rf, "fsub").unwrap().as_basic_value_enum(),
                BinOp::Mul => self.builder.build_float_mul(lf, rf, "fmul").unwrap().as_basic_value_enum(),
                BinOp::Quo => self.builder.build_float_div(lf, rf, "fdiv").unwrap().as_basic_value_enum(),
                _ if op.is_comparison() => {
                    let pred = float_predicate(op);
                    self.builder.build_float_compare(pred, lf, rf, "fcmp").unwrap().as_basic_value_enum()
                }
                _ => {
                    return Err(CodegenError::UnresolvedBuiltin {
                        name: format!("{op:?}"),
                    })
                }
            };
            return Ok(Value::Llvm(LLVMValue::simple(result, result_ty)));
        }

        Err(CodegenError::UnsupportedType {
            detail: "binary_op on a non-integer, non-float, non-string operand type".to_owned(),
        })
    }

    /// `Value::unary_op(op)`.
    pub fn unary_op(&mut self, op: UnOp, x: Value<'ll>, result_ty: TypeId) -> Result<Value<'ll>> {
        match op {
            UnOp::Pos => Ok(x),
            UnOp::Neg => match x {
                Value::Const(ConstValue { lit: Lit::Int(n), .. }) => {
                    Ok(Value::Const(ConstValue { lit: Lit::Int(-n), ty: result_ty }))
                }
                Value::Const(ConstValue { lit: Lit::Float(f), .. }) => {
                    Ok(Value::Const(ConstValue { lit: Lit::Float(-f), ty: result_ty }))
                }
                _ => {
                    let v = self.materialize(&x)?;
                    let negated: BasicValueEnum = if self.is_float(x.ty()) {
                        self.builder.build_float_neg(v.into_float_value(), "fneg").unwrap().as_basic_value_enum()
                    } else {
                        self.builder.build_int_neg(v.into_int_value(), "neg").unwrap().as_basic_value_enum()
                    };
                    Ok(Value::Llvm(LLVMValue::simple(negated, result_ty)))
                }
            },
            UnOp::Not => match x {
                Value::Const(ConstValue { lit: Lit::Bool(b), .. }) => {
                    Ok(Value::Const(ConstValue { lit: Lit::Bool(!b), ty: result_ty }))
                }
                _ => {
                    let v = self.materialize(&x)?.into_int_value();
                    let result = self.builder.build_not(v, "lnot").unwrap();
                    Ok(Value::Llvm(LLVMValue::simple(result.as_basic_value_enum(), result_ty)))
                }
            },
            UnOp::Xor => match x {
                Value::Const(ConstValue { lit: Lit::Int(n), .. }) => {
                    Ok(Value::Const(ConstValue { lit: Lit::Int(!n), ty: result_ty }))
                }
                _ => {
                    let v = self.materialize(&x)?.into_int_value();
                    let result = self.builder.build_not(v, "bitnot").unwrap();
                    Ok(Value::Llvm(LLVMValue::simple(result.as_basic_value_enum(), result_ty)))
                }
            },
            UnOp::Deref => self.make_pointee(x, result_ty),
            UnOp::Addr => match x.as_llvm().and_then(|v| v.pointer) {
                Some(ptr) => Ok(Value::Llvm(LLVMValue::simple(ptr.as_basic_value_enum(), result_ty))),
                None => Err(CodegenError::TypeMismatch {
                    expected: "addressable value".to_owned(),
                    found: "non-addressable value".to_owned(),
                }),
            },
        }
    }

    /// `Value::make_pointee()`: given a pointer SSA value, synthesize a
    /// pseudo-loaded value that remembers `pointer` so a later `&x` or
    /// assignment LHS can reuse the slot without a redundant re-load. The
    /// load itself is deferred to whoever actually consumes the value as
    /// data (StarExpr's caller decides whether to read through it).
    pub fn make_pointee(&mut self, x: Value<'ll>, pointee_ty: TypeId) -> Result<Value<'ll>> {
        let ptr = match &x {
            Value::Llvm(v) => v.ssa.into_pointer_value(),
            _ => {
                return Err(CodegenError::TypeMismatch {
                    expected: "pointer".to_owned(),
                    found: "non-pointer value".to_owned(),
                })
            }
        };
        let llvm_ty = self.types.to_llvm(self.pool, pointee_ty)?.ty;
        let loaded = self.builder.build_load(llvm_ty, ptr, "pointee").unwrap();
        Ok(Value::Llvm(LLVMValue::addressable(loaded, pointee_ty, ptr)))
    }

    /// Allocate a stack slot for a mutable local, returning its `SlotId`.
    pub fn alloc_slot(&mut self, llvm_ty: inkwell::types::BasicTypeEnum<'ll>, name: &str) -> SlotId {
        let ptr = self.builder.build_alloca(llvm_ty, name).unwrap();
        self.slots.alloc(ptr)
    }
}

fn int_predicate(op: BinOp, signed: bool) -> IntPredicate {
    match (op, signed) {
        (BinOp::Eql, _) => IntPredicate::EQ,
        (BinOp::Neq, _) => IntPredicate::NE,
        (BinOp::Lss, true) => IntPredicate::SLT,
        (BinOp::Lss, false) => IntPredicate::ULT,
        (BinOp::Leq, true) => IntPredicate::SLE,
        (BinOp::Leq, false) => IntPredicate::ULE,
        (BinOp::Gtr, true) => IntPredicate::SGT,
        (BinOp::Gtr, false) => IntPredicate::UGT,
        (BinOp::Geq, true) => IntPredicate::SGE,
        (BinOp::Geq, false) => IntPredicate::UGE,
        _ => unreachable!("non-comparison BinOp passed to int_predicate"),
    }
}

fn float_predicate(op: BinOp) -> FloatPredicate {
    match op {
        BinOp::Eql => FloatPredicate::OEQ,
        BinOp::Neq => FloatPredicate::ONE,
        BinOp::Lss => FloatPredicate::OLT,
        BinOp::Leq => FloatPredicate::OLE,
        BinOp::Gtr => FloatPredicate::OGT,
        BinOp::Geq => FloatPredicate::OGE,
        _ => unreachable!("non-comparison BinOp passed to float_predicate"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goir_hir::{BasicKind as HirBasicKind, ExprArena, StringInterner, TypePool};
    use inkwell::context::Context;

    fn fixture<'ll>(
        llcx: &'ll Context,
        pool: &'ll TypePool,
        exprs: &'ll ExprArena,
        interner: &'ll StringInterner,
    ) -> LowerCx<'ll, 'll> {
        let scx = Box::leak(Box::new(crate::context::SimpleCx::new(llcx, "m", 64)));
        let config = Box::leak(Box::new(crate::config::LowerConfig::default()));
        LowerCx::new(scx, config, pool, exprs, interner)
    }

    #[test]
    fn int32_add_wraps_like_two_complement() {
        let llcx = Context::create();
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));
        let int32 = pool.alloc_basic(HirBasicKind::Int32);
        let mut cx = fixture(&llcx, pool, exprs, interner);

        let big2 = ConstValue { lit: Lit::Int(2147483647), ty: int32 };
        let one = ConstValue { lit: Lit::Int(1), ty: int32 };
        let result = cx
            .binary_op(BinOp::Add, Value::Const(big2), Value::Const(one), int32)
            .unwrap();
        match result {
            Value::Const(ConstValue { lit: Lit::Int(n), .. }) => assert_eq!(n, -2147483648),
            _ => panic!("expected constant fold"),
        }
    }

    #[test]
    fn goos_string_equality_folds_to_bool_constant() {
        let llcx = Context::create();
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));
        let string_ty = pool.alloc_basic(HirBasicKind::String);
        let bool_ty = pool.alloc_basic(HirBasicKind::Bool);
        let mut cx = fixture(&llcx, pool, exprs, interner);

        let linux = interner.lookup(interner_intern(interner, "linux"));
        let _ = linux;
        let a_name = intern_mut(interner, "linux");
        let b_name = intern_mut(interner, "linux");

        let a = ConstValue { lit: Lit::Str(a_name), ty: string_ty };
        let b = ConstValue { lit: Lit::Str(b_name), ty: string_ty };
        let result = cx
            .binary_op(BinOp::Eql, Value::Const(a), Value::Const(b), bool_ty)
            .unwrap();
        match result {
            Value::Const(ConstValue { lit: Lit::Bool(b), .. }) => assert!(b),
            _ => panic!("expected bool constant"),
        }
    }

    // Test-only helpers: `&StringInterner` fixtures above are shared
    // references, but interning requires `&mut`; these cast through a raw
    // pointer strictly for test setup convenience (single-threaded, no
    // aliasing mutation occurs afterward).
    fn intern_mut(interner: &StringInterner, s: &str) -> goir_hir::Name {
        #[allow(invalid_reference_casting)]
        let interner_mut = unsafe { &mut *(interner as *const StringInterner as *mut StringInterner) };
        interner_mut.intern(s)
    }

    fn interner_intern(interner: &StringInterner, s: &str) -> goir_hir::Name {
        intern_mut(interner, s)
    }

    #[test]
    fn struct_equality_dispatches_to_memequal() {
        let llcx = Context::create();
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));
        let int32 = pool.alloc_basic(HirBasicKind::Int32);
        let bool_ty = pool.alloc_basic(HirBasicKind::Bool);
        let field_name = interner.intern("x");
        let struct_ty = pool.alloc_struct(vec![goir_hir::Field {
            name: field_name,
            ty: int32,
        }]);
        let mut cx = fixture(&llcx, pool, exprs, interner);

        let llvm_struct_ty = cx.types.to_llvm(pool, struct_ty).unwrap().ty;
        let function = cx
            .scx
            .llmod
            .add_function("struct_eq_test", cx.scx.type_void_func(&[]), None);
        let entry = cx.scx.llcx.append_basic_block(function, "entry");
        cx.builder.position_at_end(entry);
        cx.current_function = Some(function);

        let lhs_slot = cx.builder.build_alloca(llvm_struct_ty, "lhs").unwrap();
        let rhs_slot = cx.builder.build_alloca(llvm_struct_ty, "rhs").unwrap();
        let zero = llvm_struct_ty.into_struct_type().const_zero();
        cx.builder.build_store(lhs_slot, zero).unwrap();
        cx.builder.build_store(rhs_slot, zero).unwrap();
        let lhs_loaded = cx.builder.build_load(llvm_struct_ty, lhs_slot, "lhs.load").unwrap();
        let rhs_loaded = cx.builder.build_load(llvm_struct_ty, rhs_slot, "rhs.load").unwrap();

        let lhs = Value::Llvm(LLVMValue::addressable(lhs_loaded, struct_ty, lhs_slot));
        let rhs = Value::Llvm(LLVMValue::addressable(rhs_loaded, struct_ty, rhs_slot));

        let result = cx.binary_op(BinOp::Eql, lhs, rhs, bool_ty).unwrap();
        match result {
            Value::Llvm(v) => assert!(v.ssa.is_int_value()),
            _ => panic!("expected an LLVM i1 result from the memequal call"),
        }
        cx.builder.build_return(None).unwrap();
        assert!(cx.scx.llmod.verify().is_ok());
    }

    #[test]
    fn bool_not_folds_at_const_level() {
        let llcx = Context::create();
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));
        let bool_ty = pool.alloc_basic(HirBasicKind::Bool);
        let mut cx = fixture(&llcx, pool, exprs, interner);
        let v = Value::Const(ConstValue { lit: Lit::Bool(false), ty: bool_ty });
        let result = cx.unary_op(UnOp::Not, v, bool_ty).unwrap();
        match result {
            Value::Const(ConstValue { lit: Lit::Bool(b), .. }) => assert!(b),
            _ => panic!("expected bool constant"),
        }
    }
}
