//! Forward copy propagation: `%b =T copy %a` followed by uses of `%b`
//! rewrites those uses to `%a` directly, so a later peephole (MADD/FMADD
//! fusion in particular) sees through the copies `ASTEmitter`'s coercion
//! path tends to leave behind.

use std::collections::HashMap;

use crate::ins::{Function, Opcode, Operand};

pub fn run(function: &mut Function) {
    let mut copies: HashMap<String, Operand> = HashMap::new();

    for block in &mut function.blocks {
        copies.clear();
        for ins in &mut block.ins {
            rewrite(&mut ins.lhs, &copies);
            rewrite(&mut ins.rhs, &copies);
            for extra in &mut ins.extra {
                rewrite(extra, &copies);
            }

            if ins.op == Opcode::Copy {
                if let Operand::Temp(dest) = &ins.dest {
                    let source = resolve(&ins.lhs, &copies);
                    copies.insert(dest.clone(), source);
                }
            } else if let Operand::Temp(dest) = &ins.dest {
                copies.remove(dest);
            }
        }
    }
}

fn resolve(operand: &Operand, copies: &HashMap<String, Operand>) -> Operand {
    if let Operand::Temp(name) = operand {
        if let Some(source) = copies.get(name) {
            return source.clone();
        }
    }
    operand.clone()
}

fn rewrite(operand: &mut Operand, copies: &HashMap<String, Operand>) {
    if let Operand::Temp(name) = operand {
        if let Some(source) = copies.get(name) {
            *operand = source.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ins::{Block, IlType};

    #[test]
    fn propagates_a_copy_into_a_later_use() {
        let mut copy_ins = crate::ins::Ins::new(Opcode::Copy, IlType::W);
        copy_ins.dest = Operand::Temp("%t2".to_string());
        copy_ins.lhs = Operand::Temp("%t1".to_string());

        let mut add_ins = crate::ins::Ins::new(Opcode::Add, IlType::W);
        add_ins.dest = Operand::Temp("%t3".to_string());
        add_ins.lhs = Operand::Temp("%t2".to_string());
        add_ins.rhs = Operand::Const(1);

        let mut function = Function {
            name: "$f".to_string(),
            params: vec![],
            ret_ty: None,
            blocks: vec![Block { label: "@start".to_string(), ins: vec![copy_ins, add_ins] }],
        };

        run(&mut function);
        assert_eq!(function.blocks[0].ins[1].lhs, Operand::Temp("%t1".to_string()));
    }
}
