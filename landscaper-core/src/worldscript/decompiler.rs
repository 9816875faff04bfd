//! Opcode listing to script translation. Runs a symbolic pass over the
//! instruction stream, reconstructing expressions on a value stack and
//! folding `GOTO_IF_FALSE` jumps back into `if`/`then` blocks.

use std::collections::HashSet;

use super::ast::{Expr, Stmt};
use super::constants::{self, VarType, SAVEMAP_BASE};
use super::opcodes::{self, Namespace, OpcodeDef, MODEL_METHODS};
use super::DecompileError;

struct Line {
    def: &'static OpcodeDef,
    params: Vec<String>,
}

pub fn decompile(listing: &str, starting_offset: u32) -> Result<String, DecompileError> {
    let mut lines = Vec::new();
    for (i, raw) in listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
    {
        lines.push(parse_line(raw, i + 1)?);
    }

    let mut decompiler = Decompiler {
        lines,
        offsets: Vec::new(),
        targets: HashSet::new(),
        processed: Vec::new(),
        stack: Vec::new(),
        statements: Vec::new(),
        starting_offset,
    };
    decompiler.calculate_offsets()?;
    decompiler.process_code()?;
    Ok(render_statements(&decompiler.statements))
}

fn parse_line(raw: &str, line: usize) -> Result<Line, DecompileError> {
    let mut tokens = raw.split(' ');
    let first = tokens.next().unwrap_or_default();
    let mut params: Vec<String> = tokens.map(str::to_string).collect();

    let mnemonic = if let Some(func_id) = first.strip_prefix("CALL_FN_") {
        if func_id.is_empty() || func_id.parse::<u32>().is_err() {
            return Err(DecompileError::BadParameter {
                param: first.to_string(),
                line,
            });
        }
        params = vec![func_id.to_string()];
        "CALL_FN_"
    } else {
        first
    };

    let def = opcodes::by_mnemonic(mnemonic).ok_or_else(|| DecompileError::UnknownMnemonic {
        mnemonic: mnemonic.to_string(),
        line,
    })?;
    if mnemonic != "CALL_FN_" && params.len() != def.code_params as usize {
        return Err(DecompileError::ParamCountMismatch {
            mnemonic: mnemonic.to_string(),
            expected: def.code_params as usize,
            actual: params.len(),
            line,
        });
    }
    Ok(Line { def, params })
}

struct Decompiler {
    lines: Vec<Line>,
    offsets: Vec<u32>,
    targets: HashSet<u32>,
    processed: Vec<bool>,
    stack: Vec<Expr>,
    statements: Vec<Stmt>,
    starting_offset: u32,
}

fn parse_hex(param: &str, line: usize) -> Result<u32, DecompileError> {
    u32::from_str_radix(param, 16).map_err(|_| DecompileError::BadParameter {
        param: param.to_string(),
        line,
    })
}

impl Decompiler {
    fn calculate_offsets(&mut self) -> Result<(), DecompileError> {
        let mut offset = self.starting_offset;
        for line in &self.lines {
            self.offsets.push(offset);
            offset += 1;
            if line.def.mnemonic != "CALL_FN_" {
                offset += line.params.len() as u32;
            }
        }
        for (i, line) in self.lines.iter().enumerate() {
            match line.def.mnemonic {
                "GOTO" => {
                    self.targets.insert(parse_hex(&line.params[0], i + 1)?);
                }
                // A backward conditional jump cannot fold into an
                // `if` block; it needs a label at its target.
                "GOTO_IF_FALSE" => {
                    let target = parse_hex(&line.params[0], i + 1)?;
                    if target <= self.offsets[i] {
                        self.targets.insert(target);
                    }
                }
                _ => {}
            }
        }
        self.processed = vec![false; self.lines.len()];
        Ok(())
    }

    fn find_line(&self, offset: u32) -> Option<usize> {
        self.offsets.iter().position(|&o| o == offset)
    }

    fn process_code(&mut self) -> Result<(), DecompileError> {
        let mut i = 0;
        while i < self.lines.len() {
            if self.processed[i] {
                i += 1;
                continue;
            }
            let (statement, next) = self.process_single_line(i)?;
            if let Some(statement) = statement {
                self.statements.push(statement);
            }
            i = next.unwrap_or(i + 1);
        }
        Ok(())
    }

    fn pop(&mut self, mnemonic: &str, line: usize) -> Result<Expr, DecompileError> {
        self.stack.pop().ok_or_else(|| DecompileError::StackUnderflow {
            mnemonic: mnemonic.to_string(),
            line,
        })
    }

    fn pop_args(&mut self, def: &OpcodeDef, line: usize) -> Result<Vec<Expr>, DecompileError> {
        let mut args = Vec::with_capacity(def.stack_params as usize);
        for _ in 0..def.stack_params {
            args.push(self.pop(def.mnemonic, line)?);
        }
        args.reverse();
        Ok(args)
    }

    fn process_single_line(
        &mut self,
        index: usize,
    ) -> Result<(Option<Stmt>, Option<usize>), DecompileError> {
        if self.processed[index] {
            return Ok((None, None));
        }
        self.processed[index] = true;

        let offset = self.offsets[index];
        let line_number = index + 1;
        let def = self.lines[index].def;
        let params = self.lines[index].params.clone();

        let mut statements = Vec::new();
        if self.targets.contains(&offset) {
            statements.push(Stmt::Label(format!("label_{offset:x}")));
        }

        let mut next = None;
        let mut tail_statement = None;

        match def.mnemonic {
            "RESET" | "NOP" => {}
            "GOTO" => {
                let target = parse_hex(&params[0], line_number)?;
                tail_statement = Some(Stmt::Goto(format!("label_{target:x}")));
                next = Some(self.find_line(target).ok_or(
                    DecompileError::MissingJumpTarget {
                        target,
                        line: line_number,
                    },
                )?);
            }
            "GOTO_IF_FALSE" => {
                let condition = self.pop("GOTO_IF_FALSE", line_number)?;
                let target = parse_hex(&params[0], line_number)?;
                let target_line =
                    self.find_line(target)
                        .ok_or(DecompileError::MissingJumpTarget {
                            target,
                            line: line_number,
                        })?;
                if target <= offset {
                    // Backward jump: emit the raw conditional branch,
                    // negated to read as "branch when true".
                    tail_statement = Some(Stmt::GotoIf {
                        condition: Expr::Unary {
                            op: "!".to_string(),
                            operand: Box::new(condition),
                        },
                        label: format!("label_{target:x}"),
                    });
                } else {
                    let mut then_branch = Vec::new();
                    let mut j = index + 1;
                    while j < self.lines.len() && self.offsets[j] < target {
                        let (stmt, _) = self.process_single_line(j)?;
                        if let Some(stmt) = stmt {
                            then_branch.push(stmt);
                        }
                        j += 1;
                    }
                    tail_statement = Some(Stmt::If {
                        condition,
                        then_branch,
                    });
                    next = Some(target_line);
                }
            }
            _ => self.handle_opcode(def, &params, line_number, &mut statements)?,
        }

        if let Some(stmt) = tail_statement {
            statements.push(stmt);
        }

        let statement = match statements.len() {
            0 => None,
            1 => statements.pop(),
            _ => Some(Stmt::Block(statements)),
        };
        Ok((statement, next))
    }

    fn handle_opcode(
        &mut self,
        def: &'static OpcodeDef,
        params: &[String],
        line: usize,
        statements: &mut Vec<Stmt>,
    ) -> Result<(), DecompileError> {
        match def.mnemonic {
            "RETURN" => statements.push(Stmt::Return),
            "CALL_FN_" => {
                let entity = self.pop("CALL_FN_", line)?;
                let func_id: i64 =
                    params[0]
                        .parse()
                        .map_err(|_| DecompileError::BadParameter {
                            param: params[0].clone(),
                            line,
                        })?;
                statements.push(Stmt::Expr(Expr::call(
                    Expr::member(Expr::ident("System"), "call_function"),
                    vec![Expr::Num(func_id), entity],
                )));
            }
            "WRITE" => {
                let right = self.pop("WRITE", line)?;
                let left = self.pop("WRITE", line)?;
                statements.push(Stmt::Assign { left, right });
            }
            m if m.starts_with("PUSH_") => {
                let expr = push_expression(def, &params[0], line)?;
                self.stack.push(expr);
            }
            "WAIT" if self.wait_frames_on_top() => {
                let Some(Expr::Call { args, .. }) = self.stack.pop() else {
                    unreachable!();
                };
                statements.push(Stmt::Expr(Expr::call(
                    Expr::member(Expr::ident("System"), "wait"),
                    args,
                )));
            }
            _ => {
                let args = self.pop_args(def, line)?;
                let call = Expr::call(
                    Expr::member(Expr::ident(def.namespace.as_str()), def.method),
                    args,
                );
                if def.pushes_result {
                    let expr = if def.namespace == Namespace::Math {
                        math_expression(def, call)?
                    } else {
                        call
                    };
                    self.stack.push(expr);
                } else {
                    statements.push(Stmt::Expr(call));
                }
            }
        }
        Ok(())
    }

    fn wait_frames_on_top(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Expr::Call { callee, .. })
                if matches!(
                    callee.as_ref(),
                    Expr::Member { object, property }
                        if property == "wait_frames"
                            && matches!(object.as_ref(), Expr::Ident(name) if name == "System")
                )
        )
    }
}

fn math_expression(def: &OpcodeDef, call: Expr) -> Result<Expr, DecompileError> {
    let Expr::Call { mut args, .. } = call else {
        unreachable!();
    };
    let op = match def.mnemonic {
        "ADD" => "+",
        "SUB" => "-",
        "MUL" => "*",
        "LT" => "<",
        "GT" => ">",
        "LE" => "<=",
        "GE" => ">=",
        "EQ" => "==",
        "AND" => "&",
        "OR" => "|",
        "LAND" => "and",
        "LOR" => "or",
        "SHL" => "<<",
        "SHR" => ">>",
        "NEG" => "-",
        "NOT" => "!",
        _ => unreachable!("non-math opcode {}", def.mnemonic),
    };
    if args.len() == 2 {
        let right = args.pop().unwrap_or(Expr::Num(0));
        let left = args.pop().unwrap_or(Expr::Num(0));
        Ok(Expr::Binary {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        })
    } else {
        let operand = args.pop().unwrap_or(Expr::Num(0));
        Ok(Expr::Unary {
            op: op.to_string(),
            operand: Box::new(operand),
        })
    }
}

/// Small Temp indices read better in decimal.
fn temp_index(value: u32) -> Expr {
    if value < 10 {
        Expr::Num(value as i64)
    } else {
        Expr::Hex(value)
    }
}

fn push_expression(
    def: &OpcodeDef,
    param: &str,
    line: usize,
) -> Result<Expr, DecompileError> {
    let value = parse_hex(param, line)?;
    let expr = match def.mnemonic {
        "PUSH_CONSTANT" => Expr::Num(value as i64),
        "PUSH_SAVEMAP_WORD" | "PUSH_SAVEMAP_BYTE" => {
            let wanted = if def.mnemonic == "PUSH_SAVEMAP_WORD" {
                VarType::Word
            } else {
                VarType::Byte
            };
            let address = SAVEMAP_BASE + value;
            match constants::savemap_var(address) {
                Some((name, ty)) if ty == wanted => {
                    Expr::member(Expr::ident("Savemap"), name)
                }
                _ => Expr::member(
                    Expr::index(Expr::ident("Savemap"), Expr::Hex(address)),
                    if wanted == VarType::Word { "word" } else { "byte" },
                ),
            }
        }
        "PUSH_SAVEMAP_BIT" => {
            let address = SAVEMAP_BASE + value / 8;
            let bit = value % 8;
            let base = match constants::savemap_var(address) {
                Some((name, VarType::Byte)) => Expr::member(Expr::ident("Savemap"), name),
                _ => Expr::index(Expr::ident("Savemap"), Expr::Hex(address)),
            };
            Expr::index(Expr::member(base, "bit"), Expr::Num(bit as i64))
        }
        "PUSH_TEMP_WORD" | "PUSH_TEMP_BYTE" => Expr::member(
            Expr::index(Expr::ident("Temp"), temp_index(value)),
            if def.mnemonic == "PUSH_TEMP_WORD" { "word" } else { "byte" },
        ),
        "PUSH_SPECIAL_WORD" | "PUSH_SPECIAL_BYTE" | "PUSH_SPECIAL_BIT" => {
            let name = match constants::special_var(value) {
                Some((name, _)) => name.to_string(),
                None => format!("unknown_{value:02x}"),
            };
            Expr::Member {
                object: Box::new(Expr::ident("Special")),
                property: name,
            }
        }
        other => unreachable!("non-push opcode {other}"),
    };
    Ok(expr)
}

fn render_statements(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(|s| render_stmt(s, 0))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_stmt(stmt: &Stmt, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match stmt {
        Stmt::Expr(expr) => format!("{pad}{}", render_expr(expr)),
        Stmt::Assign { left, right } => {
            format!("{pad}{} = {}", render_expr(left), render_expr(right))
        }
        Stmt::If {
            condition,
            then_branch,
        } => {
            let body = then_branch
                .iter()
                .map(|s| render_stmt(s, indent + 1))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{pad}if {} then\n{body}\n{pad}end", render_expr(condition))
        }
        Stmt::GotoIf { condition, label } => {
            format!("{pad}if {} goto {label}", render_expr(condition))
        }
        Stmt::Goto(label) => format!("{pad}goto {label}"),
        Stmt::Label(label) => format!("{pad}::{label}::"),
        Stmt::Return => format!("{pad}return"),
        Stmt::Block(body) => body
            .iter()
            .map(|s| render_stmt(s, indent))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Num(v) => v.to_string(),
        Expr::Hex(v) => format!("0x{v:X}"),
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, property } => {
            format!("{}.{property}", render_expr(object))
        }
        Expr::Index { base, index } => {
            format!("{}[{}]", render_expr(base), render_expr(index))
        }
        Expr::Call { callee, args } => render_call(callee, args),
        Expr::Binary { op, left, right } => {
            let left_text = render_expr(left);
            let mut right_text = render_expr(right);
            // Comparisons against the player model read better with
            // the entity's name.
            if op == "==" && left_text == "Special.player_entity_model_id" {
                if let Some(value) = right.literal_value() {
                    if let Some(name) = constants::model_name(value as u32) {
                        right_text = format!("Entities.{name}");
                    }
                }
            }
            format!("{left_text} {op} {right_text}")
        }
        Expr::Unary { op, operand } => match operand.as_ref() {
            Expr::Binary { .. } => format!("{op}({})", render_expr(operand)),
            _ => format!("{op}{}", render_expr(operand)),
        },
    }
}

fn render_call(callee: &Expr, args: &[Expr]) -> String {
    let method = match callee {
        Expr::Member { property, .. } => property.as_str(),
        _ => "",
    };
    let rendered: Vec<String> = args
        .iter()
        .enumerate()
        .map(|(i, arg)| render_argument(method, i, arg))
        .collect();
    format!("{}({})", render_expr(callee), rendered.join(", "))
}

fn render_argument(method: &str, index: usize, arg: &Expr) -> String {
    if let Some(value) = arg.literal_value() {
        if method == "enter_field" && index == 0 {
            if let Some(name) = constants::field_name(value as u32) {
                return format!("Fields.{name}");
            }
        }
        if method == "call_function" && index == 1 {
            if let Some(name) = constants::model_name(value as u32) {
                return format!("Entities.{name}");
            }
        }
        if MODEL_METHODS.contains(&method) {
            if let Some(name) = constants::model_name(value as u32) {
                return format!("Entities.{name}");
            }
        }
    }
    render_expr(arg)
}
