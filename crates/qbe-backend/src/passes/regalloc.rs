//! A minimal allocator: every distinct temp in a function gets a
//! permanent slot, either one of a small fixed pool of ARM64 scratch
//! registers or a stack slot once the pool runs out. This is not a
//! liveness-based allocator (no interval splitting, no coalescing) - it
//! trades reuse for simplicity, which is acceptable for straight-line
//! AOT-compiled BASIC routines where register pressure inside one
//! function is low.

use std::collections::HashMap;

use crate::ins::{Function, Operand, RegClass};

const INT_REGS: &[&str] = &["x9", "x10", "x11", "x12", "x13", "x14", "x15"];
const FLOAT_REGS: &[&str] = &["d8", "d9", "d10", "d11", "d12", "d13", "d14", "d15"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Reg(&'static str),
    Spill(u32),
}

pub struct Allocation {
    locations: HashMap<String, Location>,
    pub frame_slots: u32,
}

impl Allocation {
    pub fn location_of(&self, temp: &str) -> Location {
        self.locations
            .get(temp)
            .cloned()
            .unwrap_or(Location::Spill(0))
    }
}

pub fn allocate(function: &Function) -> Allocation {
    let mut locations: HashMap<String, Location> = HashMap::new();
    let mut next_int = 0usize;
    let mut next_float = 0usize;
    let mut next_spill = 0u32;

    for block in &function.blocks {
        for ins in &block.ins {
            assign(&ins.dest, ins.ty.reg_class(), &mut locations, &mut next_int, &mut next_float, &mut next_spill);
            assign(&ins.lhs, ins.ty.reg_class(), &mut locations, &mut next_int, &mut next_float, &mut next_spill);
            assign(&ins.rhs, ins.ty.reg_class(), &mut locations, &mut next_int, &mut next_float, &mut next_spill);
        }
    }

    Allocation { locations, frame_slots: next_spill }
}

fn assign(
    operand: &Operand,
    class: RegClass,
    locations: &mut HashMap<String, Location>,
    next_int: &mut usize,
    next_float: &mut usize,
    next_spill: &mut u32,
) {
    let Operand::Temp(name) = operand else { return };
    if locations.contains_key(name) {
        return;
    }
    let pool = match class {
        RegClass::Int => INT_REGS,
        RegClass::Float => FLOAT_REGS,
    };
    let slot = match class {
        RegClass::Int => next_int,
        RegClass::Float => next_float,
    };
    let location = if *slot < pool.len() {
        let loc = Location::Reg(pool[*slot]);
        *slot += 1;
        loc
    } else {
        let loc = Location::Spill(*next_spill);
        *next_spill += 1;
        loc
    };
    locations.insert(name.clone(), location);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ins::{Block, IlType, Ins, Opcode};

    #[test]
    fn assigns_distinct_registers_to_distinct_temps() {
        let mut a = Ins::new(Opcode::Add, IlType::W);
        a.dest = Operand::Temp("%t1".to_string());
        a.lhs = Operand::Const(1);
        a.rhs = Operand::Const(2);
        let mut b = Ins::new(Opcode::Add, IlType::W);
        b.dest = Operand::Temp("%t2".to_string());
        b.lhs = Operand::Temp("%t1".to_string());
        b.rhs = Operand::Const(3);

        let function = Function {
            name: "$f".to_string(),
            params: vec![],
            ret_ty: None,
            blocks: vec![Block { label: "@start".to_string(), ins: vec![a, b] }],
        };

        let alloc = allocate(&function);
        assert_ne!(alloc.location_of("%t1"), alloc.location_of("%t2"));
    }

    #[test]
    fn spills_once_the_register_pool_is_exhausted() {
        let mut ins_list = Vec::new();
        for i in 0..(INT_REGS.len() + 1) {
            let mut ins = Ins::new(Opcode::Add, IlType::W);
            ins.dest = Operand::Temp(format!("%t{i}"));
            ins.lhs = Operand::Const(i as i64);
            ins.rhs = Operand::Const(0);
            ins_list.push(ins);
        }
        let function = Function {
            name: "$f".to_string(),
            params: vec![],
            ret_ty: None,
            blocks: vec![Block { label: "@start".to_string(), ins: ins_list }],
        };
        let alloc = allocate(&function);
        let last = format!("%t{}", INT_REGS.len());
        assert!(matches!(alloc.location_of(&last), Location::Spill(_)));
    }
}
