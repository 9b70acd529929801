//! Emits AArch64 assembly text (AT&T-free, plain ARM syntax, matching
//! what `as`/`cc` on an ARM64 host expects) from a selected `Function`.
//! Named `emit3` for the three-operand instruction shape every `Ins`
//! carries by the time it reaches here - nothing downstream needs a
//! fourth.

use std::fmt::Write as _;

use crate::ins::{CmpKind, DataDef, Function, Module, Opcode, Operand};
use crate::passes::regalloc::{self, Location};

pub fn emit_module(module: &Module) -> String {
    let mut out = String::new();
    writeln!(out, "    .text").unwrap();
    for function in &module.functions {
        emit_function(&mut out, function);
    }
    if !module.data.is_empty() {
        writeln!(out, "    .data").unwrap();
        for data in &module.data {
            emit_data(&mut out, data);
        }
    }
    out
}

fn emit_data(out: &mut String, data: &DataDef) {
    let label = asm_symbol(&data.name);
    writeln!(out, "{label}:").unwrap();
    for byte in &data.bytes {
        writeln!(out, "    .byte {byte}").unwrap();
    }
}

fn emit_function(out: &mut String, function: &Function) {
    let alloc = regalloc::allocate(function);
    let symbol = asm_symbol(&function.name);
    writeln!(out, "    .globl {symbol}").unwrap();
    writeln!(out, "{symbol}:").unwrap();
    writeln!(out, "    stp x29, x30, [sp, -16]!").unwrap();
    writeln!(out, "    mov x29, sp").unwrap();
    if alloc.frame_slots > 0 {
        let bytes = (alloc.frame_slots as u64 * 8).next_multiple_of(16);
        writeln!(out, "    sub sp, sp, #{bytes}").unwrap();
    }

    for block in &function.blocks {
        writeln!(out, "{}:", asm_label(&function.name, &block.label)).unwrap();
        for ins in &block.ins {
            emit_ins(out, &function.name, ins, &alloc);
        }
    }
    out.push('\n');
}

fn emit_ins(out: &mut String, func: &str, ins: &crate::ins::Ins, alloc: &regalloc::Allocation) {
    let reg = |operand: &Operand| -> String { location_text(operand, alloc) };

    match ins.op {
        Opcode::Add => writeln!(out, "    add {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs)).unwrap(),
        Opcode::Sub => writeln!(out, "    sub {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs)).unwrap(),
        Opcode::Mul => writeln!(out, "    mul {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs)).unwrap(),
        Opcode::Div => writeln!(out, "    sdiv {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs)).unwrap(),
        Opcode::Rem => {
            writeln!(out, "    sdiv x16, {}, {}", reg(&ins.lhs), reg(&ins.rhs)).unwrap();
            writeln!(out, "    msub {}, x16, {}, {}", reg(&ins.dest), reg(&ins.rhs), reg(&ins.lhs)).unwrap();
        }
        Opcode::And => writeln!(out, "    and {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs)).unwrap(),
        Opcode::Or => writeln!(out, "    orr {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs)).unwrap(),
        Opcode::Neg => writeln!(out, "    neg {}, {}", reg(&ins.dest), reg(&ins.lhs)).unwrap(),
        Opcode::Copy => writeln!(out, "    mov {}, {}", reg(&ins.dest), reg(&ins.lhs)).unwrap(),
        Opcode::Load => writeln!(out, "    ldr {}, [{}]", reg(&ins.dest), reg(&ins.lhs)).unwrap(),
        Opcode::Store => writeln!(out, "    str {}, [{}]", reg(&ins.lhs), reg(&ins.rhs)).unwrap(),
        Opcode::Cmp(kind) => {
            writeln!(out, "    cmp {}, {}", reg(&ins.lhs), reg(&ins.rhs)).unwrap();
            writeln!(out, "    cset {}, {}", reg(&ins.dest), cond_code(kind)).unwrap();
        }
        Opcode::Jmp => {
            if let Operand::Block(label) = &ins.lhs {
                writeln!(out, "    b {}", asm_label(func, label)).unwrap();
            }
        }
        Opcode::Jnz => {
            let then_lbl = ins.extra.first();
            let else_lbl = ins.extra.get(1);
            writeln!(out, "    cmp {}, #0", reg(&ins.lhs)).unwrap();
            if let Some(Operand::Block(label)) = then_lbl {
                writeln!(out, "    bne {}", asm_label(func, label)).unwrap();
            }
            if let Some(Operand::Block(label)) = else_lbl {
                writeln!(out, "    b {}", asm_label(func, label)).unwrap();
            }
        }
        Opcode::Call => {
            for (i, arg) in ins.extra.iter().enumerate().take(8) {
                writeln!(out, "    mov x{i}, {}", reg(arg)).unwrap();
            }
            let callee = ins.callee.as_deref().unwrap_or("?");
            writeln!(out, "    bl {}", asm_symbol(callee)).unwrap();
            if !matches!(ins.dest, Operand::None) {
                writeln!(out, "    mov {}, x0", reg(&ins.dest)).unwrap();
            }
        }
        Opcode::Ret => {
            if !matches!(ins.lhs, Operand::None) {
                writeln!(out, "    mov x0, {}", reg(&ins.lhs)).unwrap();
            }
            writeln!(out, "    mov sp, x29").unwrap();
            writeln!(out, "    ldp x29, x30, [sp], 16").unwrap();
            writeln!(out, "    ret").unwrap();
        }
        Opcode::Madd => writeln!(out, "    madd {}, {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs), reg(&ins.extra[0])).unwrap(),
        Opcode::Msub => writeln!(out, "    msub {}, {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs), reg(&ins.extra[0])).unwrap(),
        Opcode::Fmadd => writeln!(out, "    fmadd {}, {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs), reg(&ins.extra[0])).unwrap(),
        Opcode::Fmsub => writeln!(out, "    fmsub {}, {}, {}, {}", reg(&ins.dest), reg(&ins.lhs), reg(&ins.rhs), reg(&ins.extra[0])).unwrap(),
        Opcode::Other("hlt") => writeln!(out, "    brk #0").unwrap(),
        Opcode::Other(_) => writeln!(out, "    // unhandled").unwrap(),
    }
}

fn cond_code(kind: CmpKind) -> &'static str {
    match kind {
        CmpKind::Eq => "eq",
        CmpKind::Ne => "ne",
        CmpKind::Lt => "lt",
        CmpKind::Le => "le",
        CmpKind::Gt => "gt",
        CmpKind::Ge => "ge",
    }
}

fn location_text(operand: &Operand, alloc: &regalloc::Allocation) -> String {
    match operand {
        Operand::Temp(name) => match alloc.location_of(name) {
            Location::Reg(r) => r.to_string(),
            Location::Spill(slot) => format!("[sp, #{}]", slot * 8),
        },
        Operand::Const(v) => format!("#{v}"),
        Operand::FConst(v) => format!("#{v}"),
        Operand::Global(g) => asm_symbol(g),
        Operand::Block(b) => b.clone(),
        Operand::None => String::new(),
    }
}

fn asm_symbol(qbe_symbol: &str) -> String {
    qbe_symbol.trim_start_matches('$').to_string()
}

fn asm_label(func: &str, label: &str) -> String {
    format!(".L{}{}", asm_symbol(func), label.trim_start_matches('@'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ins::{Block, IlType, Ins};

    #[test]
    fn emits_a_globl_directive_and_symbol_label() {
        let function = Function {
            name: "$main".to_string(),
            params: vec![],
            ret_ty: None,
            blocks: vec![Block { label: "@start".to_string(), ins: vec![Ins::new(Opcode::Ret, IlType::W)] }],
        };
        let module = Module { functions: vec![function], data: vec![] };
        let asm = emit_module(&module);
        assert!(asm.contains(".globl main"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("ret"));
    }

    #[test]
    fn emits_madd_as_a_single_instruction() {
        let mut madd = Ins::new(Opcode::Madd, IlType::L);
        madd.dest = Operand::Temp("%t1".to_string());
        madd.lhs = Operand::Temp("%a".to_string());
        madd.rhs = Operand::Temp("%b".to_string());
        madd.extra = vec![Operand::Temp("%c".to_string())];
        let function = Function {
            name: "$f".to_string(),
            params: vec![],
            ret_ty: None,
            blocks: vec![Block { label: "@start".to_string(), ins: vec![madd] }],
        };
        let module = Module { functions: vec![function], data: vec![] };
        let asm = emit_module(&module);
        assert!(asm.contains("madd"));
    }
}
