//! Dead code elimination: drops any instruction that writes a temp which
//! is never read and has no side effect. Conservative by design - calls,
//! stores, and control flow are never removed even when their `dest`
//! looks unused, since a call result may matter only for its side
//! effect (the ABI contract [`fbasic_runtime_abi`] describes doesn't
//! promise purity).

use std::collections::HashSet;

use crate::ins::{Function, Opcode, Operand};

pub fn run(function: &mut Function) {
    let mut used: HashSet<String> = HashSet::new();
    for block in &function.blocks {
        for ins in &block.ins {
            collect_uses(&ins.lhs, &mut used);
            collect_uses(&ins.rhs, &mut used);
            for extra in &ins.extra {
                collect_uses(extra, &mut used);
            }
        }
    }

    for block in &mut function.blocks {
        block.ins.retain(|ins| {
            if has_side_effect(ins.op) {
                return true;
            }
            match &ins.dest {
                Operand::Temp(name) => used.contains(name),
                _ => true,
            }
        });
    }
}

fn has_side_effect(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::Call | Opcode::Store | Opcode::Jmp | Opcode::Jnz | Opcode::Ret | Opcode::Other(_)
    )
}

fn collect_uses(operand: &Operand, used: &mut HashSet<String>) {
    if let Operand::Temp(name) = operand {
        used.insert(name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ins::{Block, IlType, Ins};

    #[test]
    fn drops_an_unused_pure_instruction() {
        let mut dead = Ins::new(Opcode::Add, IlType::W);
        dead.dest = Operand::Temp("%t1".to_string());
        dead.lhs = Operand::Const(1);
        dead.rhs = Operand::Const(2);

        let ret = Ins::new(Opcode::Ret, IlType::W);

        let mut function = Function {
            name: "$f".to_string(),
            params: vec![],
            ret_ty: None,
            blocks: vec![Block { label: "@start".to_string(), ins: vec![dead, ret] }],
        };

        run(&mut function);
        assert_eq!(function.blocks[0].ins.len(), 1);
    }

    #[test]
    fn keeps_a_call_even_when_its_result_is_unused() {
        let mut call = Ins::new(Opcode::Call, IlType::W);
        call.dest = Operand::Temp("%t1".to_string());
        call.callee = Some("$fb_print_newline".to_string());

        let mut function = Function {
            name: "$f".to_string(),
            params: vec![],
            ret_ty: None,
            blocks: vec![Block { label: "@start".to_string(), ins: vec![call] }],
        };

        run(&mut function);
        assert_eq!(function.blocks[0].ins.len(), 1);
    }
}
