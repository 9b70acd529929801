//! Instruction selection: rewrites the machine-independent `Ins` stream
//! into ARM64-shaped instructions, fusing multiply-accumulate patterns
//! along the way (spec §5.4, §8.4). `arm64` holds the actual peephole;
//! this module just threads it over every block of every function.

pub mod arm64;

use crate::ins::Module;

pub fn select(module: &mut Module) {
    for function in &mut module.functions {
        for block in &mut function.blocks {
            arm64::fuse_multiply_accumulate(&mut block.ins);
        }
    }
}
