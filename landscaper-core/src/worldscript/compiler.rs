//! Script to opcode listing translation. Statements compile to a
//! stack-machine instruction sequence; a stack reset is injected
//! before every statement that consumes operands, and structured
//! `if`/`then` blocks lower to `GOTO_IF_FALSE` with synthesized end
//! labels resolved in a final pass.

use std::collections::HashMap;

use super::ast::{Expr, Ins, Stmt};
use super::constants::{self, VarType, SAVEMAP_BASE};
use super::opcodes::{self, Namespace};
use super::parser::{strip_comments, tokenize, Parser};
use super::CompileError;

pub fn compile(source: &str, starting_offset: u32) -> Result<String, CompileError> {
    let code = strip_comments(source);
    let tokens = tokenize(&code)?;
    let ast = Parser::new(tokens).parse()?;
    let mut compiler = Compiler { label_counter: 0 };
    let ast = compiler.add_resets(ast);

    let mut instructions = Vec::new();
    for stmt in &ast {
        compiler.generate_statement(stmt, &mut instructions)?;
    }
    let resolved = resolve_labels(&instructions, starting_offset)?;

    Ok(resolved
        .iter()
        .map(|(mnemonic, params)| {
            if params.is_empty() {
                mnemonic.clone()
            } else {
                format!("{mnemonic} {}", params.join(" ").to_uppercase())
            }
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

struct Compiler {
    label_counter: usize,
}

fn hex_param(value: i64) -> String {
    if value < 0x100 {
        format!("{value:02x}")
    } else {
        format!("{value:04x}")
    }
}

fn reset_statement() -> Stmt {
    Stmt::Expr(Expr::call(
        Expr::member(Expr::ident("System"), "reset_stack"),
        Vec::new(),
    ))
}

/// Does this call consume stack operands when executed as a statement?
fn needs_reset(expr: &Expr) -> bool {
    let Expr::Call { callee, .. } = expr else {
        return false;
    };
    let Expr::Member { object, property } = callee.as_ref() else {
        return false;
    };
    let Expr::Ident(namespace) = object.as_ref() else {
        return false;
    };
    if namespace == "System" && property == "call_function" {
        return true;
    }
    if namespace == "Memory" && property == "write" {
        return true;
    }
    match Namespace::parse(namespace) {
        Some(ns) => opcodes::OPCODES
            .iter()
            .any(|o| o.namespace == ns && o.method == *property && o.stack_params > 0),
        None => false,
    }
}

impl Compiler {
    fn add_resets(&mut self, ast: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(ast.len());
        for stmt in ast {
            match stmt {
                Stmt::If {
                    condition,
                    then_branch,
                } => {
                    out.push(reset_statement());
                    out.push(Stmt::If {
                        condition,
                        then_branch: self.add_resets(then_branch),
                    });
                }
                Stmt::Expr(expr) => {
                    if needs_reset(&expr) {
                        out.push(reset_statement());
                    }
                    out.push(Stmt::Expr(expr));
                }
                Stmt::Assign { .. } | Stmt::GotoIf { .. } => {
                    out.push(reset_statement());
                    out.push(stmt);
                }
                other => out.push(other),
            }
        }
        out
    }

    fn generate_statement(
        &mut self,
        stmt: &Stmt,
        out: &mut Vec<Ins>,
    ) -> Result<(), CompileError> {
        match stmt {
            Stmt::If {
                condition,
                then_branch,
            } => {
                let end_label = format!("__end_if_{}", self.label_counter);
                self.label_counter += 1;
                generate_expression(condition, out)?;
                out.push(Ins::op_with("GOTO_IF_FALSE", end_label.clone()));
                for branch_stmt in then_branch {
                    self.generate_statement(branch_stmt, out)?;
                }
                out.push(Ins::Label(end_label));
            }
            Stmt::GotoIf { condition, label } => {
                // GOTO_IF_FALSE branches on a false operand; a
                // top-level `!` folds into the branch instead of
                // emitting NOT.
                match condition {
                    Expr::Unary { op, operand } if op == "!" => {
                        generate_expression(operand, out)?;
                    }
                    other => {
                        generate_expression(other, out)?;
                        out.push(Ins::op("NOT"));
                    }
                }
                out.push(Ins::op_with("GOTO_IF_FALSE", label.clone()));
            }
            Stmt::Goto(label) => out.push(Ins::op_with("GOTO", label.clone())),
            Stmt::Label(label) => out.push(Ins::Label(label.clone())),
            Stmt::Return => out.push(Ins::op("RETURN")),
            Stmt::Expr(expr) => generate_expression_statement(expr, out)?,
            Stmt::Assign { left, right } => {
                generate_expression(left, out)?;
                generate_expression(right, out)?;
                out.push(Ins::op("WRITE"));
            }
            Stmt::Block(_) => {
                return Err(CompileError::UnexpectedToken {
                    expected: "statement".to_string(),
                    found: "block".to_string(),
                })
            }
        }
        Ok(())
    }
}

fn callee_parts(expr: &Expr) -> Option<(&str, &str)> {
    let Expr::Member { object, property } = expr else {
        return None;
    };
    let Expr::Ident(namespace) = object.as_ref() else {
        return None;
    };
    Some((namespace.as_str(), property.as_str()))
}

fn generate_expression_statement(expr: &Expr, out: &mut Vec<Ins>) -> Result<(), CompileError> {
    let Expr::Call { callee, args } = expr else {
        return Err(CompileError::UnexpectedToken {
            expected: "function call".to_string(),
            found: "expression".to_string(),
        });
    };
    let (namespace, method) = callee_parts(callee).ok_or_else(|| CompileError::UnknownFunction {
        namespace: "?".to_string(),
        method: "?".to_string(),
    })?;
    let function = format!("{namespace}.{method}");

    if namespace == "System" && method == "call_function" {
        if args.len() != 2 {
            return Err(CompileError::ArityMismatch {
                function,
                expected: 2,
                actual: args.len(),
            });
        }
        let func_id = resolve_literal(&args[0])
            .ok_or(CompileError::LiteralRequired { function })?;
        generate_expression(&args[1], out)?;
        out.push(Ins::op(&format!("CALL_FN_{func_id}")));
        return Ok(());
    }
    if namespace == "Memory" && method == "write" {
        if args.len() != 2 {
            return Err(CompileError::ArityMismatch {
                function,
                expected: 2,
                actual: args.len(),
            });
        }
        generate_expression(&args[0], out)?;
        generate_expression(&args[1], out)?;
        out.push(Ins::op("WRITE"));
        return Ok(());
    }
    if namespace == "System" && method == "wait" {
        if args.len() != 1 {
            return Err(CompileError::ArityMismatch {
                function,
                expected: 1,
                actual: args.len(),
            });
        }
        generate_expression(&args[0], out)?;
        out.push(Ins::op("WAIT_FRAMES"));
        out.push(Ins::op("WAIT"));
        return Ok(());
    }

    let def = lookup_function(namespace, method)?;
    if def.pushes_result {
        return Err(CompileError::ResultDiscarded { function });
    }
    if args.len() != def.stack_params as usize {
        return Err(CompileError::ArityMismatch {
            function,
            expected: def.stack_params as usize,
            actual: args.len(),
        });
    }
    for arg in args {
        generate_expression(arg, out)?;
    }
    out.push(Ins::op(def.mnemonic));
    Ok(())
}

fn lookup_function(
    namespace: &str,
    method: &str,
) -> Result<&'static opcodes::OpcodeDef, CompileError> {
    Namespace::parse(namespace)
        .and_then(|ns| opcodes::by_method(ns, method))
        .ok_or_else(|| CompileError::UnknownFunction {
            namespace: namespace.to_string(),
            method: method.to_string(),
        })
}

/// Literal value of an expression, resolving `Entities.x`/`Fields.x`
/// names.
fn resolve_literal(expr: &Expr) -> Option<i64> {
    if let Some(value) = expr.literal_value() {
        return Some(value);
    }
    if let Some((namespace, name)) = callee_parts(expr) {
        if namespace == "Entities" {
            return constants::model_id(name).map(|v| v as i64);
        }
        if namespace == "Fields" {
            return constants::field_id(name).map(|v| v as i64);
        }
    }
    None
}

fn bank_base(namespace: &str) -> i64 {
    if namespace == "Savemap" {
        SAVEMAP_BASE as i64
    } else {
        0
    }
}

fn bank_offset(namespace: &str, address: i64) -> Result<i64, CompileError> {
    let offset = address - bank_base(namespace);
    if !(0..=0xFFFF).contains(&offset) {
        return Err(CompileError::AddressOutOfRange {
            namespace: namespace.to_string(),
            address,
        });
    }
    Ok(offset)
}

fn check_bit(bit: i64) -> Result<i64, CompileError> {
    if !(0..=7).contains(&bit) {
        return Err(CompileError::BitOutOfRange { bit });
    }
    Ok(bit)
}

const BANK_NAMESPACES: &[&str] = &["Savemap", "Special", "Temp"];

fn generate_expression(expr: &Expr, out: &mut Vec<Ins>) -> Result<(), CompileError> {
    match expr {
        Expr::Num(_) | Expr::Hex(_) => {
            let value = expr.literal_value().unwrap_or_default();
            out.push(Ins::op_with("PUSH_CONSTANT", hex_param(value)));
            Ok(())
        }
        Expr::Ident(name) => Err(CompileError::BareIdentifier { name: name.clone() }),
        Expr::Member { object, property } => {
            generate_member(object, property, out)
        }
        Expr::Index { base, index } => generate_bit_index(base, index, out),
        Expr::Call { callee, args } => generate_call_expression(callee, args, out),
        Expr::Binary { op, left, right } => {
            generate_expression(left, out)?;
            generate_expression(right, out)?;
            let mnemonic = match op.as_str() {
                "+" => "ADD",
                "-" => "SUB",
                "*" => "MUL",
                "<" => "LT",
                ">" => "GT",
                "<=" => "LE",
                ">=" => "GE",
                "==" => "EQ",
                "&" => "AND",
                "|" => "OR",
                "and" => "LAND",
                "or" => "LOR",
                "<<" => "SHL",
                ">>" => "SHR",
                other => {
                    return Err(CompileError::UnsupportedOperator {
                        op: other.to_string(),
                    })
                }
            };
            out.push(Ins::op(mnemonic));
            Ok(())
        }
        Expr::Unary { op, operand } => {
            generate_expression(operand, out)?;
            let mnemonic = match op.as_str() {
                "-" => "NEG",
                "!" => "NOT",
                other => {
                    return Err(CompileError::UnsupportedOperator {
                        op: other.to_string(),
                    })
                }
            };
            out.push(Ins::op(mnemonic));
            Ok(())
        }
    }
}

fn generate_member(
    object: &Expr,
    property: &str,
    out: &mut Vec<Ins>,
) -> Result<(), CompileError> {
    // Savemap[0xADDR].byte / Temp[n].word and friends.
    if let Expr::Index { base, index } = object {
        if let (Expr::Ident(namespace), Some(address)) =
            (base.as_ref(), index.literal_value())
        {
            if BANK_NAMESPACES.contains(&namespace.as_str())
                && (property == "byte" || property == "word")
            {
                let offset = bank_offset(namespace, address)?;
                let mnemonic = format!(
                    "PUSH_{}_{}",
                    namespace.to_uppercase(),
                    property.to_uppercase()
                );
                out.push(Ins::op_with(&mnemonic, hex_param(offset)));
                return Ok(());
            }
        }
    }

    if let Expr::Ident(namespace) = object {
        match namespace.as_str() {
            "Savemap" => {
                if let Some((address, ty)) = constants::savemap_var_by_name(property) {
                    let offset = (address - SAVEMAP_BASE) as i64;
                    let mnemonic = match ty {
                        VarType::Word => "PUSH_SAVEMAP_WORD",
                        VarType::Byte => "PUSH_SAVEMAP_BYTE",
                        VarType::Bit => {
                            return Err(CompileError::UnknownVariable {
                                namespace: namespace.clone(),
                                name: property.to_string(),
                            })
                        }
                    };
                    out.push(Ins::op_with(mnemonic, hex_param(offset)));
                    return Ok(());
                }
            }
            "Special" => {
                if let Some((value, ty)) = constants::special_var_by_name(property) {
                    let mnemonic = match ty {
                        VarType::Byte => "PUSH_SPECIAL_BYTE",
                        VarType::Word => "PUSH_SPECIAL_WORD",
                        VarType::Bit => "PUSH_SPECIAL_BIT",
                    };
                    out.push(Ins::op_with(mnemonic, hex_param(value as i64)));
                    return Ok(());
                }
                // Registers with no table name decompile as
                // `unknown_<hex>`; accept them back.
                if let Some(hex) = property.strip_prefix("unknown_") {
                    let value = i64::from_str_radix(hex, 16).map_err(|_| {
                        CompileError::UnknownVariable {
                            namespace: namespace.clone(),
                            name: property.to_string(),
                        }
                    })?;
                    out.push(Ins::op_with("PUSH_SPECIAL_BYTE", hex_param(value)));
                    return Ok(());
                }
            }
            "Entities" => {
                if let Some(id) = constants::model_id(property) {
                    out.push(Ins::op_with("PUSH_CONSTANT", format!("{id:02x}")));
                    return Ok(());
                }
            }
            "Fields" => {
                if let Some(id) = constants::field_id(property) {
                    out.push(Ins::op_with("PUSH_CONSTANT", format!("{id:02x}")));
                    return Ok(());
                }
            }
            _ => {}
        }
        return Err(CompileError::UnknownVariable {
            namespace: namespace.clone(),
            name: property.to_string(),
        });
    }
    Err(CompileError::UnknownVariable {
        namespace: "?".to_string(),
        name: property.to_string(),
    })
}

fn generate_bit_index(
    base: &Expr,
    index: &Expr,
    out: &mut Vec<Ins>,
) -> Result<(), CompileError> {
    let Some(bit) = index.literal_value() else {
        return Err(CompileError::LiteralRequired {
            function: "bit index".to_string(),
        });
    };
    let Expr::Member { object, property } = base else {
        return Err(CompileError::UnknownVariable {
            namespace: "?".to_string(),
            name: "bit".to_string(),
        });
    };
    if property != "bit" {
        return Err(CompileError::UnknownVariable {
            namespace: "?".to_string(),
            name: property.clone(),
        });
    }

    // Savemap.known_byte.bit[n]
    if let Expr::Member {
        object: inner,
        property: var_name,
    } = object.as_ref()
    {
        if matches!(inner.as_ref(), Expr::Ident(ns) if ns == "Savemap") {
            return match constants::savemap_var_by_name(var_name) {
                Some((address, VarType::Byte)) => {
                    let offset = (address - SAVEMAP_BASE) as i64;
                    let value = offset * 8 + check_bit(bit)?;
                    out.push(Ins::op_with("PUSH_SAVEMAP_BIT", format!("{value:04x}")));
                    Ok(())
                }
                _ => Err(CompileError::UnknownVariable {
                    namespace: "Savemap".to_string(),
                    name: var_name.clone(),
                }),
            };
        }
    }

    // Namespace[0xADDR].bit[n]
    if let Expr::Index {
        base: ns_expr,
        index: addr_expr,
    } = object.as_ref()
    {
        if let (Expr::Ident(namespace), Some(address)) =
            (ns_expr.as_ref(), addr_expr.literal_value())
        {
            if BANK_NAMESPACES.contains(&namespace.as_str()) {
                let offset = bank_offset(namespace, address)?;
                let value = offset * 8 + check_bit(bit)?;
                let mnemonic = format!("PUSH_{}_BIT", namespace.to_uppercase());
                out.push(Ins::op_with(&mnemonic, format!("{value:04x}")));
                return Ok(());
            }
        }
    }

    Err(CompileError::UnknownVariable {
        namespace: "?".to_string(),
        name: "bit".to_string(),
    })
}

fn generate_call_expression(
    callee: &Expr,
    args: &[Expr],
    out: &mut Vec<Ins>,
) -> Result<(), CompileError> {
    let (namespace, method) = callee_parts(callee).ok_or_else(|| CompileError::UnknownFunction {
        namespace: "?".to_string(),
        method: "?".to_string(),
    })?;
    let function = format!("{namespace}.{method}");

    // Bank accessor call forms: Temp.word(4), Savemap.bit(0xC22, 1).
    if BANK_NAMESPACES.contains(&namespace) {
        match method {
            "bit" => {
                if args.len() != 2 {
                    return Err(CompileError::ArityMismatch {
                        function,
                        expected: 2,
                        actual: args.len(),
                    });
                }
                let (Some(address), Some(bit)) =
                    (args[0].literal_value(), args[1].literal_value())
                else {
                    return Err(CompileError::LiteralRequired { function });
                };
                let value = bank_offset(namespace, address)? * 8 + check_bit(bit)?;
                let mnemonic = format!("PUSH_{}_BIT", namespace.to_uppercase());
                out.push(Ins::op_with(&mnemonic, hex_param(value)));
                return Ok(());
            }
            "byte" | "word" => {
                if args.len() != 1 {
                    return Err(CompileError::ArityMismatch {
                        function,
                        expected: 1,
                        actual: args.len(),
                    });
                }
                let Some(address) = args[0].literal_value() else {
                    return Err(CompileError::LiteralRequired { function });
                };
                let offset = bank_offset(namespace, address)?;
                let mnemonic = format!(
                    "PUSH_{}_{}",
                    namespace.to_uppercase(),
                    method.to_uppercase()
                );
                out.push(Ins::op_with(&mnemonic, hex_param(offset)));
                return Ok(());
            }
            _ => {}
        }
    }

    let def = lookup_function(namespace, method)?;
    if !def.pushes_result {
        return Err(CompileError::NoResult { function });
    }
    if args.len() != def.stack_params as usize {
        return Err(CompileError::ArityMismatch {
            function,
            expected: def.stack_params as usize,
            actual: args.len(),
        });
    }
    for arg in args {
        generate_expression(arg, out)?;
    }
    out.push(Ins::op(def.mnemonic));
    Ok(())
}

fn instruction_size(mnemonic: &str, params: &[String]) -> u32 {
    if mnemonic.starts_with("CALL_FN_") {
        1
    } else {
        1 + params.len() as u32
    }
}

fn resolve_labels(
    instructions: &[Ins],
    starting_offset: u32,
) -> Result<Vec<(String, Vec<String>)>, CompileError> {
    let mut label_offsets = HashMap::new();
    let mut offset = starting_offset;
    for ins in instructions {
        match ins {
            Ins::Label(label) => {
                label_offsets.insert(label.clone(), offset);
            }
            Ins::Op { mnemonic, params } => offset += instruction_size(mnemonic, params),
        }
    }

    let mut resolved = Vec::new();
    for ins in instructions {
        let Ins::Op { mnemonic, params } = ins else {
            continue;
        };
        let params = params
            .iter()
            .map(|param| {
                if mnemonic == "GOTO" || mnemonic == "GOTO_IF_FALSE" {
                    let target = label_offsets.get(param).copied().ok_or_else(|| {
                        CompileError::UnknownLabel {
                            label: param.clone(),
                        }
                    })?;
                    Ok(hex_param(target as i64))
                } else {
                    Ok(param.clone())
                }
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        resolved.push((mnemonic.clone(), params));
    }
    Ok(resolved)
}
