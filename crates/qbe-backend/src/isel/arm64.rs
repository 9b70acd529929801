//! MADD/FMADD fusion (spec §8.4): QBE has no multiply-accumulate
//! instruction, so the front end always lowers `a*b+c` as a separate
//! `mul` followed by an `add`/`sub`. ARM64 has one, and this is the one
//! peephole this bundled backend exists to add over stock QBE: when a
//! `mul` result feeds directly into an adjacent add or subtract and
//! nothing else reads it, collapse the pair into a single `madd`/`msub`
//! (or `fmadd`/`fmsub` for float/double), trading a register write and
//! an instruction slot for one fused op.

use crate::ins::{Ins, Opcode, Operand, RegClass};

pub fn fuse_multiply_accumulate(block: &mut Vec<Ins>) {
    let mut out: Vec<Ins> = Vec::with_capacity(block.len());
    let mut i = 0;
    while i < block.len() {
        if i + 1 < block.len() {
            if let Some(fused) = try_fuse(&block[i], &block[i + 1], &block[i + 2..]) {
                out.push(fused);
                i += 2;
                continue;
            }
        }
        out.push(block[i].clone());
        i += 1;
    }
    *block = out;
}

fn try_fuse(mul: &Ins, combine: &Ins, rest: &[Ins]) -> Option<Ins> {
    if mul.op != Opcode::Mul {
        return None;
    }
    let Operand::Temp(mul_dest) = &mul.dest else { return None };

    let is_add = combine.op == Opcode::Add;
    let is_sub = combine.op == Opcode::Sub;
    if !is_add && !is_sub {
        return None;
    }

    // The mul's result must feed this instruction and nowhere else -
    // fusing would otherwise delete a value another instruction needs.
    if used_elsewhere(mul_dest, rest) {
        return None;
    }

    let (acc, mul_is_lhs) = if combine.lhs == Operand::Temp(mul_dest.clone()) {
        (combine.rhs.clone(), true)
    } else if combine.rhs == Operand::Temp(mul_dest.clone()) {
        (combine.lhs.clone(), false)
    } else {
        return None;
    };

    // `c - a*b` is MSUB; `a*b - c` has no single fused form on ARM64
    // (MSUB always subtracts the product from the accumulator), so only
    // fuse the subtract when the product is the right-hand operand.
    if is_sub && mul_is_lhs {
        return None;
    }

    let is_float = mul.ty.reg_class() == RegClass::Float;
    let op = match (is_add, is_float) {
        (true, false) => Opcode::Madd,
        (true, true) => Opcode::Fmadd,
        (false, false) => Opcode::Msub,
        (false, true) => Opcode::Fmsub,
    };

    let mut fused = Ins::new(op, combine.ty);
    fused.dest = combine.dest.clone();
    fused.lhs = mul.lhs.clone();
    fused.rhs = mul.rhs.clone();
    fused.extra = vec![acc];
    Some(fused)
}

fn used_elsewhere(temp: &str, rest: &[Ins]) -> bool {
    rest.iter().any(|ins| {
        operand_uses(&ins.lhs, temp) || operand_uses(&ins.rhs, temp) || ins.extra.iter().any(|e| operand_uses(e, temp))
    })
}

fn operand_uses(operand: &Operand, temp: &str) -> bool {
    matches!(operand, Operand::Temp(name) if name == temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ins::IlType;

    fn mul(dest: &str, lhs: Operand, rhs: Operand, ty: IlType) -> Ins {
        let mut ins = Ins::new(Opcode::Mul, ty);
        ins.dest = Operand::Temp(dest.to_string());
        ins.lhs = lhs;
        ins.rhs = rhs;
        ins
    }

    #[test]
    fn fuses_mul_then_add_into_madd() {
        let m = mul("%t1", Operand::Temp("%a".to_string()), Operand::Temp("%b".to_string()), IlType::L);
        let mut add = Ins::new(Opcode::Add, IlType::L);
        add.dest = Operand::Temp("%t2".to_string());
        add.lhs = Operand::Temp("%t1".to_string());
        add.rhs = Operand::Temp("%c".to_string());

        let mut block = vec![m, add];
        fuse_multiply_accumulate(&mut block);

        assert_eq!(block.len(), 1);
        assert_eq!(block[0].op, Opcode::Madd);
        assert_eq!(block[0].extra, vec![Operand::Temp("%c".to_string())]);
    }

    #[test]
    fn fuses_float_mul_then_add_into_fmadd() {
        let m = mul("%t1", Operand::Temp("%a".to_string()), Operand::Temp("%b".to_string()), IlType::D);
        let mut add = Ins::new(Opcode::Add, IlType::D);
        add.dest = Operand::Temp("%t2".to_string());
        add.lhs = Operand::Temp("%c".to_string());
        add.rhs = Operand::Temp("%t1".to_string());

        let mut block = vec![m, add];
        fuse_multiply_accumulate(&mut block);

        assert_eq!(block[0].op, Opcode::Fmadd);
    }

    #[test]
    fn fuses_c_minus_mul_into_msub() {
        let m = mul("%t1", Operand::Temp("%a".to_string()), Operand::Temp("%b".to_string()), IlType::L);
        let mut sub = Ins::new(Opcode::Sub, IlType::L);
        sub.dest = Operand::Temp("%t2".to_string());
        sub.lhs = Operand::Temp("%c".to_string());
        sub.rhs = Operand::Temp("%t1".to_string());

        let mut block = vec![m, sub];
        fuse_multiply_accumulate(&mut block);

        assert_eq!(block[0].op, Opcode::Msub);
    }

    #[test]
    fn does_not_fuse_when_the_product_is_used_again() {
        let m = mul("%t1", Operand::Temp("%a".to_string()), Operand::Temp("%b".to_string()), IlType::L);
        let mut add = Ins::new(Opcode::Add, IlType::L);
        add.dest = Operand::Temp("%t2".to_string());
        add.lhs = Operand::Temp("%t1".to_string());
        add.rhs = Operand::Temp("%c".to_string());
        let mut reuse = Ins::new(Opcode::Add, IlType::L);
        reuse.dest = Operand::Temp("%t3".to_string());
        reuse.lhs = Operand::Temp("%t1".to_string());
        reuse.rhs = Operand::Const(1);

        let mut block = vec![m, add, reuse];
        fuse_multiply_accumulate(&mut block);

        assert_eq!(block.len(), 3);
    }

    #[test]
    fn does_not_fuse_mul_minus_c() {
        let m = mul("%t1", Operand::Temp("%a".to_string()), Operand::Temp("%b".to_string()), IlType::L);
        let mut sub = Ins::new(Opcode::Sub, IlType::L);
        sub.dest = Operand::Temp("%t2".to_string());
        sub.lhs = Operand::Temp("%t1".to_string());
        sub.rhs = Operand::Temp("%c".to_string());

        let mut block = vec![m, sub];
        fuse_multiply_accumulate(&mut block);

        assert_eq!(block.len(), 2);
    }
}
