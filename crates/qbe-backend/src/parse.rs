//! A parser for the subset of QBE IL text this project's own `fbc`
//! front end emits (`fbasic-compiler`'s `codegen` module). This is not a
//! general QBE parser - it does not need to accept hand-written QBE, only
//! the shapes `QBEBuilder`, `ASTEmitter` and `CFGEmitter` produce.

use crate::ins::{Block, CmpKind, DataDef, Function, IlType, Ins, Module, Opcode, Operand};

pub fn parse_module(text: &str) -> Module {
    let mut module = Module::default();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("data ") {
            module.data.push(parse_data(rest));
            continue;
        }
        if trimmed.starts_with("export function") || trimmed.starts_with("function") {
            module.functions.push(parse_function(trimmed, &mut lines));
        }
    }

    module
}

fn parse_data(rest: &str) -> DataDef {
    // `$str1 = { b 104, b 105, b 0 }`
    let (name, body) = rest.split_once('=').unwrap_or((rest, ""));
    let name = name.trim().to_string();
    let body = body.trim().trim_start_matches('{').trim_end_matches('}');
    let bytes = body
        .split(',')
        .filter_map(|part| {
            let part = part.trim().strip_prefix("b ")?;
            part.trim().parse::<u8>().ok()
        })
        .collect();
    DataDef { name, bytes }
}

fn parse_function<'a>(header: &str, lines: &mut std::iter::Peekable<std::str::Lines<'a>>) -> Function {
    // `export function w $fn_Name(l %f_Name_x, w %f_Name_y) {`
    let ret_ty = header
        .split_whitespace()
        .find(|tok| matches!(*tok, "w" | "l" | "s" | "d"))
        .and_then(IlType::from_letter);

    let name = header
        .split(['(', ')'])
        .next()
        .and_then(|s| s.split_whitespace().last())
        .unwrap_or("$unknown")
        .to_string();

    let params = header
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(params, _)| params)
        .unwrap_or_default()
        .split(',')
        .filter_map(|p| {
            let p = p.trim();
            if p.is_empty() {
                return None;
            }
            let mut parts = p.split_whitespace();
            let ty = IlType::from_letter(parts.next()?)?;
            let ident = parts.next()?.to_string();
            Some((ty, ident))
        })
        .collect();

    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;

    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed == "}" {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            break;
        }
        if let Some(label) = trimmed.strip_prefix('@') {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(Block { label: format!("@{label}"), ins: Vec::new() });
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        let block = current.get_or_insert_with(|| Block { label: "@start".to_string(), ins: Vec::new() });
        block.ins.push(parse_ins(trimmed));
    }

    Function { name, params, ret_ty, blocks }
}

fn parse_ins(line: &str) -> Ins {
    if let Some(rest) = line.strip_prefix("jmp ") {
        let mut ins = Ins::new(Opcode::Jmp, IlType::W);
        ins.lhs = Operand::Block(rest.trim().to_string());
        return ins;
    }
    if let Some(rest) = line.strip_prefix("jnz ") {
        let mut parts = rest.splitn(3, ',').map(str::trim);
        let cond = parts.next().unwrap_or_default();
        let then_lbl = parts.next().unwrap_or_default();
        let else_lbl = parts.next().unwrap_or_default();
        let mut ins = Ins::new(Opcode::Jnz, IlType::W);
        ins.lhs = parse_operand(cond);
        ins.extra = vec![Operand::Block(then_lbl.to_string()), Operand::Block(else_lbl.to_string())];
        return ins;
    }
    if line.starts_with("ret") {
        let mut ins = Ins::new(Opcode::Ret, IlType::W);
        let val = line.trim_start_matches("ret").trim();
        if !val.is_empty() {
            ins.lhs = parse_operand(val);
        }
        return ins;
    }
    if line == "hlt" {
        return Ins::new(Opcode::Other("hlt"), IlType::W);
    }
    if let Some(rest) = line.strip_prefix("call ") {
        return parse_call(rest, None, IlType::W);
    }
    if let Some(rest) = line.strip_prefix("store") {
        return parse_store(rest);
    }

    // `%dest =TYPE op args...` or `DEST =TYPE loadop addr`
    if let Some((dest, rest)) = line.split_once('=') {
        let dest = dest.trim();
        let rest = rest.trim();
        let ty_letter = rest.chars().next().unwrap_or('w');
        let ty = IlType::from_letter(&ty_letter.to_string()).unwrap_or(IlType::W);
        let rest = &rest[ty_letter.len_utf8()..];
        let rest = rest.trim();

        if let Some(args) = rest.strip_prefix("call ") {
            let mut ins = parse_call(args, Some(dest.to_string()), ty);
            ins.dest = Operand::Temp(dest.to_string());
            return ins;
        }

        let (op, operands) = rest.split_once(' ').unwrap_or((rest, ""));
        let mut ins = classify_op(op, ty);
        ins.dest = Operand::Temp(dest.to_string());
        let mut operand_iter = operands.split(',').map(str::trim).filter(|s| !s.is_empty());
        ins.lhs = operand_iter.next().map(parse_operand).unwrap_or(Operand::None);
        ins.rhs = operand_iter.next().map(parse_operand).unwrap_or(Operand::None);
        return ins;
    }

    Ins::new(Opcode::Other("unknown"), IlType::W)
}

fn parse_call(rest: &str, dest: Option<String>, ty: IlType) -> Ins {
    let mut ins = Ins::new(Opcode::Call, ty);
    if let Some(d) = dest {
        ins.dest = Operand::Temp(d);
    }
    let (callee, args) = rest.split_once('(').unwrap_or((rest, ""));
    ins.callee = Some(callee.trim().to_string());
    let args = args.trim_end_matches(')');
    ins.extra = args
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|arg| {
            let operand = arg.split_whitespace().last().unwrap_or(arg);
            parse_operand(operand)
        })
        .collect();
    ins
}

fn parse_store(rest: &str) -> Ins {
    // `storew val, addr` (the letter is attached directly to `store`)
    let letter = rest.chars().next().unwrap_or('w');
    let ty = IlType::from_letter(&letter.to_string()).unwrap_or(IlType::W);
    let rest = rest[letter.len_utf8()..].trim();
    let mut parts = rest.splitn(2, ',').map(str::trim);
    let mut ins = Ins::new(Opcode::Store, ty);
    ins.lhs = parts.next().map(parse_operand).unwrap_or(Operand::None);
    ins.rhs = parts.next().map(parse_operand).unwrap_or(Operand::None);
    ins
}

fn classify_op(op: &str, ty: IlType) -> Ins {
    let opcode = match op {
        "add" => Opcode::Add,
        "sub" => Opcode::Sub,
        "mul" => Opcode::Mul,
        "div" | "divl" | "divw" => Opcode::Div,
        "rem" | "reml" | "remw" => Opcode::Rem,
        "and" | "andw" => Opcode::And,
        "or" | "orw" => Opcode::Or,
        "neg" => Opcode::Neg,
        "copy" => Opcode::Copy,
        _ if op.starts_with("load") => Opcode::Load,
        _ if op.starts_with("ceq") => Opcode::Cmp(CmpKind::Eq),
        _ if op.starts_with("cne") => Opcode::Cmp(CmpKind::Ne),
        _ if op.starts_with("clt") || op.starts_with("cslt") || op.starts_with("cult") => Opcode::Cmp(CmpKind::Lt),
        _ if op.starts_with("cle") || op.starts_with("csle") || op.starts_with("cule") => Opcode::Cmp(CmpKind::Le),
        _ if op.starts_with("cgt") || op.starts_with("csgt") || op.starts_with("cugt") => Opcode::Cmp(CmpKind::Gt),
        _ if op.starts_with("cge") || op.starts_with("csge") || op.starts_with("cuge") => Opcode::Cmp(CmpKind::Ge),
        other => {
            return Ins::new(Opcode::Other(leak(other)), ty);
        }
    };
    Ins::new(opcode, ty)
}

/// Opcodes parsed from text need a `&'static str` to slot into
/// `Opcode::Other` without threading a lifetime through every `Ins`;
/// mnemonics are a small, bounded vocabulary so the leak is one-time
/// per distinct spelling, not per instruction.
fn leak(s: &str) -> &'static str {
    Box::leak(s.to_string().into_boxed_str())
}

fn parse_operand(text: &str) -> Operand {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix('%') {
        return Operand::Temp(format!("%{stripped}"));
    }
    if let Some(stripped) = text.strip_prefix('@') {
        return Operand::Block(format!("@{stripped}"));
    }
    if let Some(stripped) = text.strip_prefix('$') {
        return Operand::Global(format!("${stripped}"));
    }
    if let Some(stripped) = text.strip_prefix("d_") {
        if let Ok(f) = stripped.parse::<f64>() {
            return Operand::FConst(f);
        }
    }
    if let Some(stripped) = text.strip_prefix("s_") {
        if let Ok(f) = stripped.parse::<f64>() {
            return Operand::FConst(f);
        }
    }
    if let Ok(i) = text.parse::<i64>() {
        return Operand::Const(i);
    }
    Operand::Temp(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_function_with_one_block() {
        let il = "export function w $main(l %f_Main_x) {\n@start\n    %t1 =w add 1, 2\n    ret 0\n}\n";
        let module = parse_module(il);
        assert_eq!(module.functions.len(), 1);
        let f = &module.functions[0];
        assert_eq!(f.name, "$main");
        assert_eq!(f.params, vec![(IlType::L, "%f_Main_x".to_string())]);
        assert_eq!(f.blocks.len(), 1);
        assert_eq!(f.blocks[0].ins.len(), 2);
        assert_eq!(f.blocks[0].ins[0].op, Opcode::Add);
    }

    #[test]
    fn parses_multiple_blocks_split_on_labels() {
        let il = "function w $f() {\n@start\n    jmp @next\n@next\n    ret 0\n}\n";
        let module = parse_module(il);
        let f = &module.functions[0];
        assert_eq!(f.blocks.len(), 2);
        assert_eq!(f.blocks[0].ins[0].op, Opcode::Jmp);
    }

    #[test]
    fn parses_a_call_with_a_destination() {
        let il = "function w $f() {\n@start\n    %t1 =l call $fb_math_abs_d(d %t0)\n    ret 0\n}\n";
        let module = parse_module(il);
        let ins = &module.functions[0].blocks[0].ins[0];
        assert_eq!(ins.op, Opcode::Call);
        assert_eq!(ins.callee.as_deref(), Some("$fb_math_abs_d"));
        assert_eq!(ins.extra, vec![Operand::Temp("%t0".to_string())]);
    }

    #[test]
    fn parses_a_data_definition() {
        let module = parse_module("data $str1 = { b 104, b 105, b 0 }\n");
        assert_eq!(module.data[0].name, "$str1");
        assert_eq!(module.data[0].bytes, vec![104, 105, 0]);
    }

    #[test]
    fn parses_store_with_attached_letter() {
        let il = "function w $f() {\n@start\n    storew %t1, $g_x\n    ret 0\n}\n";
        let module = parse_module(il);
        let ins = &module.functions[0].blocks[0].ins[0];
        assert_eq!(ins.op, Opcode::Store);
        assert_eq!(ins.ty, IlType::W);
        assert_eq!(ins.rhs, Operand::Global("$g_x".to_string()));
    }
}
