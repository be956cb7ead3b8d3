use crate::builtin::Builtin;
use crate::error::Result;
use crate::image::Image;
use crate::lang::value::{BlockId, Value};
use crate::lexer::Lexer;
use crate::list_builder::ListBuilder;
use crate::memory::{DEFAULT_CELLS, Memory};
use crate::registry::FunctionRegistry;
use crate::runtime_error::{ErrorKind, RuntimeError};
use crate::stack::{Stack, mismatch, sum_numbers};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tracing::{debug, error, info, trace, warn};

type RunResult<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VMConfig {
    /// Fixed number of memory cells.
    pub memory_cells: usize,
    /// Initial state of the verbose flag (`verbosedebug` toggles it).
    pub verbose: bool,
    /// Turn out-of-range pointer access into an error instead of ignoring it.
    pub strict_bounds: bool,
    pub max_call_depth: usize,
    pub max_steps: Option<usize>,
    pub max_stack_size: Option<usize>,
}

impl Default for VMConfig {
    fn default() -> Self {
        VMConfig {
            memory_cells: DEFAULT_CELLS,
            verbose: false,
            strict_bounds: false,
            max_call_depth: 1000,
            max_steps: None,
            max_stack_size: None,
        }
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The code stack ran empty.
    Completed,
    /// `exit` or `quit` was executed.
    Halted,
}

/// Interpreter mode of one execution frame.
#[derive(Debug)]
enum Mode {
    Normal,
    /// Inside `( ... )`; `depth` counts nested blocks still open.
    CapturingBlock { id: BlockId, depth: usize },
    CapturingList(ListBuilder),
}

enum Flow {
    Next,
    Enter(Mode),
    Halt,
}

impl From<Outcome> for Flow {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => Flow::Next,
            Outcome::Halted => Flow::Halt,
        }
    }
}

/// An interpreter session.
///
/// The session owns the code and data stacks, the function registry, the
/// memory bank with its pointer, and the verbose flag. The registry, memory
/// and data stack persist across [`VM::run`] calls; [`VM::reset`] drops
/// all of it.
///
/// `ptrputc` and the stack dumps write to the session's output.
pub struct VM<W: Write = io::Stdout> {
    source: String,
    code_stack: Stack,
    data_stack: Stack,
    registry: FunctionRegistry,
    memory: Memory,
    verbose: bool,
    config: VMConfig,
    out: W,
    call_depth: usize,
    steps: usize,
}

impl VM<io::Stdout> {
    pub fn new() -> Self {
        Self::with_config(VMConfig::default())
    }

    pub fn with_config(config: VMConfig) -> Self {
        Self::with_output(config, io::stdout())
    }
}

impl Default for VM<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> VM<W> {
    pub fn with_output(config: VMConfig, out: W) -> Self {
        VM {
            source: String::new(),
            code_stack: Stack::code(Vec::new()),
            data_stack: Stack::data(),
            registry: FunctionRegistry::new(),
            memory: Memory::new(config.memory_cells),
            verbose: config.verbose,
            config,
            out,
            call_depth: 0,
            steps: 0,
        }
    }

    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn data_stack(&self) -> &Stack {
        &self.data_stack
    }

    /// Tokens left unexecuted by the last run (after an error or a halt).
    pub fn code_stack(&self) -> &Stack {
        &self.code_stack
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Store the program text for the next [`VM::run`].
    pub fn load(&mut self, source: &str) {
        self.source = source.to_string();
    }

    /// Tokenize the loaded program onto the code stack and execute it.
    ///
    /// Nothing executes when the program fails to lex. On a runtime error
    /// both stacks are left as they were at the failing instruction.
    pub fn run(&mut self) -> Result<Outcome> {
        let tokens = Lexer::new(&self.source).tokenize()?;
        debug!(tokens = tokens.len(), "program loaded");

        self.steps = 0;
        self.call_depth = 0;

        let mut code = Stack::code(tokens.into_iter().map(|t| t.value).collect());
        let mut data = std::mem::replace(&mut self.data_stack, Stack::data());
        let result = self.execute(&mut code, &mut data);
        self.code_stack = code;
        self.data_stack = data;

        let flushed = self.out.flush();
        let outcome = result.inspect_err(|e| error!("{}", e))?;
        flushed.map_err(RuntimeError::from)?;
        Ok(outcome)
    }

    pub fn eval(&mut self, source: &str) -> Result<Outcome> {
        self.load(source);
        self.run()
    }

    /// Data stack, top first, space separated.
    pub fn stack_to_string(&self) -> String {
        self.data_stack
            .iter_top_first()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn top_of_stack_to_string(&self) -> String {
        self.data_stack
            .top()
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    pub fn dump_data_stack(&mut self) -> io::Result<()> {
        write_listing(&mut self.out, "Data Stack", &self.data_stack)
    }

    pub fn dump_code_stack(&mut self) -> io::Result<()> {
        write_listing(&mut self.out, "Code Stack", &self.code_stack)
    }

    pub fn dump_function_registry(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        for (id, body) in self.registry.blocks() {
            let names: Vec<&str> = self
                .registry
                .names()
                .filter(|(_, bound)| *bound == id)
                .map(|(name, _)| name)
                .collect();
            if names.is_empty() {
                writeln!(self.out, "Function : {}", id)?;
            } else {
                writeln!(self.out, "Function : {} ({})", id, names.join(", "))?;
            }
            writeln!(self.out, "  >>> Function-Stack <<<")?;
            for (i, token) in body.iter().rev().enumerate() {
                let marker = if i == 0 { " (top)" } else { "" };
                writeln!(self.out, "    -> index-{}:  {}{}", i + 1, token, marker)?;
            }
            writeln!(self.out, "  End of Function Stack - {}", id)?;
        }
        Ok(())
    }

    pub fn clear_stacks(&mut self) {
        self.code_stack.clear();
        self.data_stack.clear();
    }

    /// Back to a fresh session with the same configuration and output.
    pub fn reset(&mut self) {
        self.source.clear();
        self.clear_stacks();
        self.registry.clear();
        self.memory.clear();
        self.verbose = self.config.verbose;
    }

    /// Snapshot the registry and memory.
    pub fn save_image(&self) -> Result<Vec<u8>> {
        Ok(Image::capture(&self.registry, &self.memory).to_bytes()?)
    }

    /// Replace the registry and memory with a saved image. Both stacks are
    /// cleared, since block references on them belong to the old registry.
    ///
    /// The image must hold exactly `memory_cells` cells. A rejected image
    /// leaves the session untouched.
    pub fn restore_image(&mut self, bytes: &[u8]) -> Result<()> {
        let image = Image::from_bytes(bytes)?;
        let (registry, memory) = image.into_parts(self.config.memory_cells)?;
        self.registry = registry;
        self.memory = memory;
        self.clear_stacks();
        Ok(())
    }

    fn check_limits(&mut self, data: &Stack) -> RunResult<()> {
        self.steps += 1;
        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(ErrorKind::StepLimitExceeded(max).into());
            }
        }
        if let Some(max) = self.config.max_stack_size {
            if data.len() > max {
                return Err(ErrorKind::StackLimitExceeded(max).into());
            }
        }
        Ok(())
    }

    /// Run `code` until it is empty, against `data`.
    fn execute(&mut self, code: &mut Stack, data: &mut Stack) -> RunResult<Outcome> {
        let mut mode = Mode::Normal;

        while let Some(token) = code.next() {
            self.check_limits(data)?;
            trace!(token = %token, "dispatch");

            mode = match mode {
                Mode::CapturingBlock { id, depth } => {
                    self.capture_block_token(id, depth, token, data)?
                }
                Mode::CapturingList(list) => capture_list_token(list, token, data)?,
                Mode::Normal => match self.dispatch(token, code, data)? {
                    Flow::Next => Mode::Normal,
                    Flow::Enter(next) => next,
                    Flow::Halt => return Ok(Outcome::Halted),
                },
            };
        }

        match mode {
            Mode::Normal => Ok(Outcome::Completed),
            Mode::CapturingBlock { id, .. } => Err(ErrorKind::UnterminatedBlock(id).into()),
            Mode::CapturingList(_) => Err(ErrorKind::UnterminatedList.into()),
        }
    }

    fn capture_block_token(
        &mut self,
        id: BlockId,
        depth: usize,
        token: Value,
        data: &mut Stack,
    ) -> RunResult<Mode> {
        let depth = match token.as_word() {
            Some("(") if depth == 0 => {
                self.registry.close_block(id)?;
                data.push(Value::Block(id));
                return Ok(Mode::Normal);
            }
            Some("(") => depth - 1,
            Some(")") => depth + 1,
            _ => depth,
        };
        self.registry.append_to_block(id, token)?;
        Ok(Mode::CapturingBlock { id, depth })
    }

    fn resolve(&self, name: &str) -> RunResult<BlockId> {
        self.registry
            .resolve(name)
            .ok_or_else(|| ErrorKind::UnboundName(name.to_string()).into())
    }

    /// Run a private copy of a block's body against `data`.
    fn invoke(&mut self, id: BlockId, label: &str, data: &mut Stack) -> RunResult<Outcome> {
        let body = self
            .registry
            .body(id)
            .ok_or(ErrorKind::UnknownBlock(id))?
            .to_vec();

        self.call_depth += 1;
        if self.call_depth > self.config.max_call_depth {
            self.call_depth -= 1;
            return Err(RuntimeError::new(ErrorKind::CallDepthExceeded(
                self.config.max_call_depth,
            ))
            .with_context(label));
        }

        let mut code = Stack::code(body);
        let result = self.execute(&mut code, data);

        self.call_depth -= 1;

        result.map_err(|e| e.with_context(label))
    }

    /// Run a block against a private copy of `data`; only the top of the
    /// private stack comes back.
    fn invoke_isolated(&mut self, id: BlockId, label: &str, data: &mut Stack) -> RunResult<Flow> {
        let mut private = data.clone();
        if self.invoke(id, label, &mut private)? == Outcome::Halted {
            return Ok(Flow::Halt);
        }
        if let Some(top) = private.next() {
            data.push(top);
        }
        Ok(Flow::Next)
    }

    fn out_of_bounds(&self, op: Builtin, pointer: i64) -> RunResult<()> {
        if self.config.strict_bounds {
            return Err(ErrorKind::OutOfBounds {
                op: op.name(),
                pointer,
                capacity: self.memory.capacity(),
            }
            .into());
        }
        if self.verbose {
            if pointer < 0 {
                warn!(op = %op, pointer, "pointer is less than zero");
            } else {
                warn!(op = %op, pointer, "pointer is larger than memory allocated");
            }
        }
        Ok(())
    }

    /// The cell under the pointer; `None` when the pointer is out of range
    /// and the bounds policy tolerates it.
    fn cell(&self, op: Builtin) -> RunResult<Option<i32>> {
        let pointer = self.memory.pointer();
        match self.memory.read(pointer) {
            Some(value) => Ok(Some(value)),
            None => {
                self.out_of_bounds(op, pointer)?;
                Ok(None)
            }
        }
    }

    fn read_cell(&self, op: Builtin) -> RunResult<i32> {
        Ok(self.cell(op)?.unwrap_or(0))
    }

    fn write_cell(&mut self, op: Builtin, value: i32) -> RunResult<()> {
        let pointer = self.memory.pointer();
        if !self.memory.write(pointer, value) {
            self.out_of_bounds(op, pointer)?;
        }
        Ok(())
    }

    fn update_cell(&mut self, op: Builtin, delta: i32) -> RunResult<()> {
        if let Some(value) = self.cell(op)? {
            let pointer = self.memory.pointer();
            self.memory.write(pointer, value.wrapping_add(delta));
        }
        Ok(())
    }

    fn dispatch(&mut self, token: Value, code: &mut Stack, data: &mut Stack) -> RunResult<Flow> {
        let builtin = match &token {
            Value::Word(word) => Builtin::from_word(word),
            _ => None,
        };
        // Literals, and words that are not builtins, go straight to the data stack.
        let Some(op) = builtin else {
            data.push(token);
            return Ok(Flow::Next);
        };

        use Builtin::*;
        match op {
            Exit | Quit => {
                debug!("{} requested, halting", op);
                write_listing(&mut self.out, "Data Stack", data)?;
                write_listing(&mut self.out, "Code Stack", code)?;
                return Ok(Flow::Halt);
            }
            Separator | Identity => {}
            True => data.push(Value::Bool(true)),
            False => data.push(Value::Bool(false)),

            // Arithmetic: the top of the stack is the left-hand operand.
            Add => arithmetic(op, data, |a, b| a + b)?,
            Sub => arithmetic(op, data, |a, b| a - b)?,
            Mul => arithmetic(op, data, |a, b| a * b)?,
            Div => arithmetic(op, data, |a, b| a / b)?,
            Mod => arithmetic(op, data, |a, b| a % b)?,
            Inc => {
                let a = data.pop_number(op)?;
                data.push(Value::Number(a + 1.0));
            }
            Dec => {
                let a = data.pop_number(op)?;
                data.push(Value::Number(a - 1.0));
            }
            NoRem => {
                let a = data.pop_number(op)?;
                let b = data.pop_number(op)?;
                data.push(Value::Bool((a % b) as i64 == 0));
            }

            Eql => {
                let a = data.pop(op)?;
                let b = data.pop(op)?;
                data.push(Value::Bool(a.same_value(&b)));
            }
            Or => {
                let a = data.pop_bool(op)?;
                let b = data.pop_bool(op)?;
                data.push(Value::Bool(a || b));
            }

            Dup => {
                let a = data.pop(op)?;
                data.push(a.clone());
                data.push(a);
            }
            Pop => {
                data.pop(op)?;
            }
            Swap => {
                let a = data.pop(op)?;
                let b = data.pop(op)?;
                data.push(a);
                data.push(b);
            }
            SumStack => {
                let sum = data.sum_numbers();
                data.push(Value::Number(sum));
            }
            Sum => {
                let items = data.pop_list(op)?;
                data.push(Value::Number(sum_numbers(&items)));
            }

            // Blocks and functions
            BeginBlock => {
                let id = self.registry.open_block()?;
                return Ok(Flow::Enter(Mode::CapturingBlock { id, depth: 0 }));
            }
            EndBlock => return Err(ErrorKind::UnbalancedBlock.into()),
            Func => {
                let id = data.pop_block(op)?;
                let name = code.pop_name(op)?;
                if self.verbose {
                    info!(block = %id, name = %name, "storing block");
                }
                self.registry.bind(&name, id);
            }
            Call => {
                let name = code.pop_name(op)?;
                let id = self.resolve(&name)?;
                if self.verbose {
                    info!(block = %id, name = %name, "running function by id");
                }
                return Ok(self.invoke(id, &format!("call {}", name), data)?.into());
            }
            CallSav => {
                let name = code.pop_name(op)?;
                let id = self.resolve(&name)?;
                return self.invoke_isolated(id, &format!("callsav {}", name), data);
            }
            Lambda => {
                let id = data.pop_block(op)?;
                return Ok(self.invoke(id, "lambda", data)?.into());
            }
            LambdaSav => {
                let id = data.pop_block(op)?;
                return self.invoke_isolated(id, "lambdasav", data);
            }
            If => {
                let condition = data.pop_block(op)?;
                if self.invoke(condition, "if", data)? == Outcome::Halted {
                    return Ok(Flow::Halt);
                }
                let holds = data.pop_bool(op)?;
                let then_block = data.pop_block(op)?;
                let else_block = data.pop_block(op)?;
                let branch = if holds { then_block } else { else_block };
                let outcome = self.invoke(branch, "if", data)?;
                if self.verbose {
                    info!(block = %branch, "if done");
                }
                return Ok(outcome.into());
            }
            IfStk => {
                let holds = data.pop_bool(op)?;
                let a = data.pop(op)?;
                let b = data.pop(op)?;
                data.push(if holds { a } else { b });
            }
            Loop => {
                let name = code.pop_name(op)?;
                let id = self.resolve(&name)?;
                let items = data.pop_list(op)?;
                let label = format!("loop {}", name);
                for item in items {
                    let mut private = Stack::data_with(vec![item]);
                    if self.invoke(id, &label, &mut private)? == Outcome::Halted {
                        return Ok(Flow::Halt);
                    }
                    if let Some(top) = private.next() {
                        data.push(top);
                    }
                }
            }
            CallStk => {
                let name = code.pop_name(op)?;
                let id = self.resolve(&name)?;
                let label = format!("callstk {}", name);
                for _ in 0..data.len() {
                    if self.invoke(id, &label, data)? == Outcome::Halted {
                        return Ok(Flow::Halt);
                    }
                }
            }

            // Lists
            Range => {
                let n = data.pop_number(op)?;
                let items = (0..(n as i32).max(0))
                    .map(|i| Value::Number(i as f64))
                    .collect();
                data.push(Value::List(items));
            }
            BeginList => return Ok(Flow::Enter(Mode::CapturingList(ListBuilder::begin()))),
            EndList => return Err(ErrorKind::UnbalancedList.into()),

            // Memory
            PtrInc => self.memory.move_pointer(1),
            PtrDec => self.memory.move_pointer(-1),
            Ptr => data.push(Value::Address(self.memory.pointer())),
            PtrVal => {
                let value = self.read_cell(op)?;
                data.push(Value::Number(value as f64));
            }
            PtrLoad => {
                let n = code.pop_number(op)?;
                self.memory.set_pointer(n as i64);
            }
            PtrSet => {
                let operand = code.pop(op)?;
                let value = match &operand {
                    Value::Char(c) => c.chars().next().map_or(0, |ch| ch as i32),
                    Value::Number(n) => *n as i32,
                    other => return Err(mismatch(op, "Char or Number", other)),
                };
                self.write_cell(op, value)?;
            }
            PtrSetStk => {
                let value = match data.peek(op)? {
                    Value::Number(n) => *n as i32,
                    other => return Err(mismatch(op, "Number", other)),
                };
                self.write_cell(op, value)?;
            }
            PtrPlus => self.update_cell(op, 1)?,
            PtrMinus => self.update_cell(op, -1)?,
            PtrPutc => {
                if let Some(value) = self.cell(op)? {
                    if (32..=126).contains(&value) {
                        write!(self.out, "{}", value as u8 as char)?;
                    }
                }
            }
            PtrWhile => {
                let id = data.pop_block(op)?;
                if self.verbose {
                    info!(block = %id, "executing block while cell is non-zero");
                }
                while self.read_cell(op)? != 0 {
                    if self.invoke(id, "ptrwhile", data)? == Outcome::Halted {
                        return Ok(Flow::Halt);
                    }
                }
                if self.verbose {
                    info!(block = %id, "ptrwhile done");
                }
            }
            PtrDebug => {
                if self.verbose {
                    let pointer = self.memory.pointer();
                    info!(pointer, value = ?self.memory.read(pointer), "pointer debug");
                }
            }

            // Diagnostics
            VerboseDebug => {
                self.verbose = !self.verbose;
                info!(verbose = self.verbose, "verbose setting modified");
            }
            DumpData => write_listing(&mut self.out, "Data Stack", data)?,
            DumpCode => write_listing(&mut self.out, "Code Stack", code)?,
        }

        Ok(Flow::Next)
    }
}

fn capture_list_token(mut list: ListBuilder, token: Value, data: &mut Stack) -> RunResult<Mode> {
    match token.as_word() {
        Some("]") => Err(ErrorKind::NestedList.into()),
        Some("[") => {
            data.push(list.end());
            Ok(Mode::Normal)
        }
        _ => {
            list.append(token);
            Ok(Mode::CapturingList(list))
        }
    }
}

/// Pop `a` then `b`, push `f(a, b)`.
fn arithmetic<F>(op: Builtin, data: &mut Stack, f: F) -> RunResult<()>
where
    F: Fn(f64, f64) -> f64,
{
    let a = data.pop_number(op)?;
    let b = data.pop_number(op)?;
    data.push(Value::Number(f(a, b)));
    Ok(())
}

/// Index-numbered, top-first listing of a stack.
fn write_listing<W: Write>(out: &mut W, title: &str, stack: &Stack) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, ">>> {} <<<", title)?;
    for (i, value) in stack.iter_top_first().enumerate() {
        let marker = if i == 0 { " (top)" } else { "" };
        writeln!(out, "  -> index-{}:  {}{}", i + 1, value, marker)?;
    }
    Ok(())
}
