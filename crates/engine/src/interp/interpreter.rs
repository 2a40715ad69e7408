// ETP - Execution Trace Prediction
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::{collections::HashMap, rc::Rc};

use tracing::trace;

use super::{
    builtins::Builtin,
    hook::{FrameView, HookAction, LineEvent, LineHook},
    ops::{self, OpError, OpResult, ValueIter},
    value::{dict_insert, Bindings, Function, Value},
    ExecutionLimits, SourceId,
};
use crate::{
    lang::{
        BinOp, Expr, ExprContext, ExprKind, Generator, Keyword, LogicalOp, Program, Stmt,
        StmtKind,
    },
    ErrorKind, RuntimeError,
};

/// How a run ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every statement ran
    Finished,
    /// The hook stopped the run
    Halted,
}

/// Non-local exit out of the evaluator
#[derive(Debug)]
pub(super) enum Signal {
    Error(RuntimeError),
    Halt,
}

pub(super) type Exec<T = Value> = Result<T, Signal>;

/// Control flow out of a block
#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

#[derive(Debug)]
enum FrameKind {
    Module { layout: Vec<String> },
    Function(Rc<Function>),
}

#[derive(Debug)]
struct Frame {
    source: SourceId,
    kind: FrameKind,
    locals: HashMap<String, Value>,
    /// Comprehension scopes, innermost last
    overlays: Vec<HashMap<String, Value>>,
}

impl Frame {
    fn new(source: SourceId, kind: FrameKind, locals: HashMap<String, Value>) -> Self {
        Self { source, kind, locals, overlays: Vec::new() }
    }

    fn view(&self) -> FrameView<'_> {
        match &self.kind {
            FrameKind::Module { layout } => {
                FrameView { layout, locals: &self.locals, function: None }
            }
            FrameKind::Function(function) => FrameView {
                layout: &function.def.locals,
                locals: &self.locals,
                function: Some(&function.def.name),
            },
        }
    }
}

/// Evaluates programs in one shared module namespace, reporting every line
/// to a [`LineHook`].
pub struct Interpreter<'h> {
    hook: &'h mut dyn LineHook,
    limits: ExecutionLimits,
    /// Module frame; its locals are the globals
    module: Frame,
    calls: Vec<Frame>,
    output: String,
    events: u64,
    /// Line of the statement being executed
    line: usize,
}

impl<'h> Interpreter<'h> {
    /// Create an interpreter reporting to `hook`
    pub fn new(hook: &'h mut dyn LineHook, limits: ExecutionLimits) -> Self {
        Self {
            hook,
            limits,
            module: Frame::new(
                SourceId::Snippet,
                FrameKind::Module { layout: Vec::new() },
                HashMap::new(),
            ),
            calls: Vec::new(),
            output: String::new(),
            events: 0,
            line: 0,
        }
    }

    /// Execute `program` at module scope.
    ///
    /// Names defined by earlier runs on the same interpreter stay visible.
    pub fn run_module(
        &mut self,
        program: &Program,
        source: SourceId,
    ) -> Result<Completion, RuntimeError> {
        self.calls.clear();
        self.module.source = source;
        self.module.kind = FrameKind::Module { layout: program.locals.clone() };
        self.module.overlays.clear();

        match self.exec_block(&program.body) {
            Ok(_) => Ok(Completion::Finished),
            Err(Signal::Halt) => {
                trace!(line = self.line, "run halted by hook");
                Ok(Completion::Halted)
            }
            Err(Signal::Error(error)) => Err(error),
        }
    }

    /// Text written by `print`
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Line events fired so far
    pub fn event_count(&self) -> u64 {
        self.events
    }

    /// Module-scope value of `name`
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.module.locals.get(name)
    }

    /// Module-scope bindings of `names`, in the given order, skipping unbound
    /// names
    pub fn module_bindings<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Bindings {
        let mut bindings = Bindings::new();
        for name in names {
            if let Some(value) = self.module.locals.get(name) {
                bindings.push(name, value.clone());
            }
        }
        bindings
    }

    pub(super) fn raise(&self, error: OpError) -> Signal {
        Signal::Error(RuntimeError { kind: error.kind, message: error.message, line: self.line })
    }

    pub(super) fn op<T>(&self, result: OpResult<T>) -> Exec<T> {
        result.map_err(|e| self.raise(e))
    }

    pub(super) fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn frame(&self) -> &Frame {
        self.calls.last().unwrap_or(&self.module)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        match self.calls.last_mut() {
            Some(frame) => frame,
            None => &mut self.module,
        }
    }

    fn fire(&mut self, line: usize) -> Exec<()> {
        self.line = line;
        self.events += 1;
        if let Some(max) = self.limits.max_line_events {
            if self.events > max {
                return Err(self.raise(OpError::new(
                    ErrorKind::EventBudgetExceeded,
                    format!("exceeded {max} line events"),
                )));
            }
        }

        let frame = self.calls.last().unwrap_or(&self.module);
        let event = LineEvent { source: frame.source, line, frame: frame.view() };
        match self.hook.on_line(&event) {
            HookAction::Continue => Ok(()),
            HookAction::Halt => Err(Signal::Halt),
        }
    }

    /// Fire the event of `stmt` unless it shares its line with an earlier
    /// statement
    fn enter(&mut self, stmt: &Stmt) -> Exec<()> {
        self.line = stmt.line();
        if stmt.inline {
            Ok(())
        } else {
            self.fire(stmt.line())
        }
    }

    fn exec_block(&mut self, body: &[Stmt]) -> Exec<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Exec<Flow> {
        self.enter(stmt)?;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value)?,
            StmtKind::If { test, body, orelse } => {
                let branch = if self.eval(test)?.truthy() { body } else { orelse };
                return self.exec_block(branch);
            }
            StmtKind::While { test, body, orelse } => loop {
                if !self.eval(test)?.truthy() {
                    return self.exec_block(orelse);
                }
                match self.exec_block(body)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal | Flow::Continue => {}
                }
                self.enter(stmt)?;
            },
            StmtKind::For { target, iter, body, orelse } => {
                let iterable = self.eval(iter)?;
                let items = self.op(ValueIter::new(&iterable))?;
                for item in items {
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    // One more header event per iteration request, including
                    // the one that exhausts the iterable
                    self.enter(stmt)?;
                }
                return self.exec_block(orelse);
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Assert { test, msg } => {
                if !self.eval(test)?.truthy() {
                    let message = match msg {
                        Some(expr) => self.eval(expr)?.to_string(),
                        None => String::new(),
                    };
                    return Err(self.raise(OpError::new(ErrorKind::AssertionError, message)));
                }
            }
            StmtKind::FunctionDef(def) => {
                let mut defaults = Vec::with_capacity(def.params.len());
                for param in &def.params {
                    defaults.push(match &param.default {
                        Some(expr) => Some(self.eval(expr)?),
                        None => None,
                    });
                }
                let source = self.frame().source;
                let function = Function { def: Rc::clone(def), defaults, source };
                self.store_name(&def.name, Value::Function(Rc::new(function)));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) -> Exec<()> {
        match &target.kind {
            ExprKind::Name { id, .. } => {
                let current = self.load_name(id)?;
                let rhs = self.eval(value)?;
                let updated = self.augmented(op, current, &rhs)?;
                self.store_name(id, updated);
                Ok(())
            }
            ExprKind::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                let current = self.op(ops::get_item(&container, &index))?;
                let rhs = self.eval(value)?;
                let updated = self.augmented(op, current, &rhs)?;
                self.op(ops::set_item(&container, &index, updated))
            }
            _ => Err(self.raise(OpError::new(
                ErrorKind::TypeError,
                "illegal expression for augmented assignment",
            ))),
        }
    }

    /// `current op= rhs`; lists are extended in place
    fn augmented(&self, op: BinOp, current: Value, rhs: &Value) -> Exec {
        if let (BinOp::Add, Value::List(items)) = (op, &current) {
            let extra = self.op(ops::collect_items(rhs))?;
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        self.op(ops::apply_binary_op(op, &current, rhs))
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Exec<()> {
        match &target.kind {
            ExprKind::Name { id, .. } => {
                self.store_name(id, value);
                Ok(())
            }
            ExprKind::Tuple(elements) | ExprKind::List(elements) => {
                let items = self.op(ops::collect_items(&value).map_err(|_| {
                    OpError::new(
                        ErrorKind::TypeError,
                        format!("cannot unpack non-iterable {} object", value.type_name()),
                    )
                }))?;
                if items.len() < elements.len() {
                    return Err(self.raise(OpError::new(
                        ErrorKind::ValueError,
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            elements.len(),
                            items.len()
                        ),
                    )));
                }
                if items.len() > elements.len() {
                    return Err(self.raise(OpError::new(
                        ErrorKind::ValueError,
                        format!("too many values to unpack (expected {})", elements.len()),
                    )));
                }
                for (element, item) in elements.iter().zip(items) {
                    self.assign(element, item)?;
                }
                Ok(())
            }
            ExprKind::Subscript { value: container, index } => {
                if matches!(index.kind, ExprKind::Slice { .. }) {
                    return Err(self.raise(OpError::new(
                        ErrorKind::TypeError,
                        "slice assignment is not supported",
                    )));
                }
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                self.op(ops::set_item(&container, &index, value))
            }
            _ => Err(self.raise(OpError::new(ErrorKind::TypeError, "cannot assign to expression"))),
        }
    }

    fn store_name(&mut self, name: &str, value: Value) {
        let frame = self.frame_mut();
        let scope = frame.overlays.last_mut().unwrap_or(&mut frame.locals);
        scope.insert(name.to_string(), value);
    }

    fn load_name(&self, name: &str) -> Exec {
        let frame = self.frame();
        if let Some(value) = frame.overlays.iter().rev().find_map(|overlay| overlay.get(name)) {
            return Ok(value.clone());
        }
        if let Some(value) = frame.locals.get(name) {
            return Ok(value.clone());
        }
        if let FrameKind::Function(function) = &frame.kind {
            if function.def.locals.iter().any(|local| local == name) {
                return Err(self.raise(OpError::new(
                    ErrorKind::UnboundLocalError,
                    format!("cannot access local variable '{name}' where it is not associated with a value"),
                )));
            }
            if let Some(value) = self.module.locals.get(name) {
                return Ok(value.clone());
            }
        }
        match Builtin::from_name(name) {
            Some(builtin) => Ok(Value::Builtin(builtin)),
            None => Err(self.raise(OpError::new(
                ErrorKind::NameError,
                format!("name '{name}' is not defined"),
            ))),
        }
    }

    pub(super) fn eval(&mut self, expr: &Expr) -> Exec {
        match &expr.kind {
            ExprKind::Int(v) => Ok(Value::Int(*v)),
            ExprKind::Float(v) => Ok(Value::Float(*v)),
            ExprKind::Str(s) => Ok(Value::Str(Rc::clone(s))),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::NoneLit => Ok(Value::None),
            ExprKind::Name { id, ctx: ExprContext::Load } => self.load_name(id),
            ExprKind::Name { id, ctx: ExprContext::Store } => Err(self.raise(OpError::new(
                ErrorKind::NameError,
                format!("name '{id}' used as a value in store context"),
            ))),
            ExprKind::List(elements) => Ok(Value::list(self.eval_all(elements)?)),
            ExprKind::Tuple(elements) => Ok(Value::tuple(self.eval_all(elements)?)),
            ExprKind::Dict(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.eval(key)?;
                    self.op(ops::check_hashable(&key))?;
                    let value = self.eval(value)?;
                    dict_insert(&mut entries, key, value);
                }
                Ok(Value::dict(entries))
            }
            ExprKind::Comprehension { element, generators, .. } => {
                self.eval_comprehension(element, generators)
            }
            ExprKind::Subscript { value, index } => {
                let container = self.eval(value)?;
                if let ExprKind::Slice { lower, upper, step } = &index.kind {
                    let lower = self.eval_slice_bound(lower.as_deref())?;
                    let upper = self.eval_slice_bound(upper.as_deref())?;
                    let step = self.eval_slice_bound(step.as_deref())?;
                    return self.op(ops::get_slice(&container, lower, upper, step));
                }
                let index = self.eval(index)?;
                self.op(ops::get_item(&container, &index))
            }
            ExprKind::Slice { .. } => {
                Err(self.raise(OpError::new(ErrorKind::TypeError, "slice outside of a subscript")))
            }
            ExprKind::Call { func, args, keywords } => self.eval_call(func, args, keywords),
            ExprKind::Attribute { value, attr } => {
                let receiver = self.eval(value)?;
                Err(self.raise(OpError::new(
                    ErrorKind::AttributeError,
                    format!("'{}' attribute '{attr}' can only be called", receiver.type_name()),
                )))
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                self.op(ops::apply_unary_op(*op, &operand))
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.op(ops::apply_binary_op(*op, &left, &right))
            }
            ExprKind::Compare { left, ops: operators, comparators } => {
                let mut current = self.eval(left)?;
                for (op, comparator) in operators.iter().zip(comparators) {
                    let next = self.eval(comparator)?;
                    if !self.op(ops::apply_comparison_op(*op, &current, &next))? {
                        return Ok(Value::Bool(false));
                    }
                    current = next;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::Logical { op, values } => {
                let mut result = Value::None;
                for value in values {
                    result = self.eval(value)?;
                    let stop = match op {
                        LogicalOp::And => !result.truthy(),
                        LogicalOp::Or => result.truthy(),
                    };
                    if stop {
                        break;
                    }
                }
                Ok(result)
            }
            ExprKind::IfExp { test, body, orelse } => {
                if self.eval(test)?.truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Exec<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn eval_slice_bound(&mut self, bound: Option<&Expr>) -> Exec<Option<i64>> {
        let Some(expr) = bound else {
            return Ok(None);
        };
        match self.eval(expr)? {
            Value::None => Ok(None),
            value => match value.as_int() {
                Some(v) => Ok(Some(v)),
                None => Err(self.raise(OpError::new(
                    ErrorKind::TypeError,
                    "slice indices must be integers or None",
                ))),
            },
        }
    }

    /// Comprehensions run in their own scope on top of the current frame;
    /// the first iterable is evaluated in the enclosing scope.
    fn eval_comprehension(&mut self, element: &Expr, generators: &[Generator]) -> Exec {
        let Some(first) = generators.first() else {
            return Ok(Value::list(Vec::new()));
        };
        let iterable = self.eval(&first.iter)?;

        self.frame_mut().overlays.push(HashMap::new());
        let mut out = Vec::new();
        let result = self.run_generators(element, generators, Some(iterable), &mut out);
        self.frame_mut().overlays.pop();

        result.map(|()| Value::list(out))
    }

    fn run_generators(
        &mut self,
        element: &Expr,
        generators: &[Generator],
        iterable: Option<Value>,
        out: &mut Vec<Value>,
    ) -> Exec<()> {
        let Some((generator, rest)) = generators.split_first() else {
            out.push(self.eval(element)?);
            return Ok(());
        };
        let iterable = match iterable {
            Some(value) => value,
            None => self.eval(&generator.iter)?,
        };
        let items = self.op(ValueIter::new(&iterable))?;
        'items: for item in items {
            self.assign(&generator.target, item)?;
            for cond in &generator.conds {
                if !self.eval(cond)?.truthy() {
                    continue 'items;
                }
            }
            self.run_generators(element, rest, None, out)?;
        }
        Ok(())
    }

    fn eval_call(&mut self, func: &Expr, args: &[Expr], keywords: &[Keyword]) -> Exec {
        if let ExprKind::Attribute { value, attr } = &func.kind {
            let receiver = self.eval(value)?;
            let (args, kwargs) = self.eval_arguments(args, keywords)?;
            return self.call_method(&receiver, attr, args, kwargs);
        }
        let callee = self.eval(func)?;
        let (args, kwargs) = self.eval_arguments(args, keywords)?;
        self.call_value(&callee, args, kwargs)
    }

    fn eval_arguments(
        &mut self,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Exec<(Vec<Value>, Vec<(String, Value)>)> {
        let args = self.eval_all(args)?;
        let mut kwargs = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            kwargs.push((keyword.name.clone(), self.eval(&keyword.value)?));
        }
        Ok((args, kwargs))
    }

    pub(super) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Exec {
        match callee {
            Value::Function(function) => self.call_function(Rc::clone(function), args, kwargs),
            Value::Builtin(builtin) => self.call_builtin(*builtin, args, kwargs),
            other => Err(self.raise(OpError::new(
                ErrorKind::TypeError,
                format!("'{}' object is not callable", other.type_name()),
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: Rc<Function>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Exec {
        if self.calls.len() >= self.limits.max_call_depth {
            return Err(self.raise(OpError::new(
                ErrorKind::RecursionError,
                "maximum recursion depth exceeded",
            )));
        }
        let locals = self.op(bind_arguments(&function, args, kwargs))?;
        let def = Rc::clone(&function.def);

        let caller_line = self.line;
        self.calls.push(Frame::new(function.source, FrameKind::Function(function), locals));
        let result = self.exec_block(&def.body);
        self.calls.pop();
        self.line = caller_line;

        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }
}

/// Bind call arguments to the parameters of `function`
fn bind_arguments(
    function: &Function,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> OpResult<HashMap<String, Value>> {
    let def = &function.def;
    let type_error = |message: String| OpError::new(ErrorKind::TypeError, message);

    if args.len() > def.params.len() {
        return Err(type_error(format!(
            "{}() takes {} positional argument{} but {} {} given",
            def.name,
            def.params.len(),
            if def.params.len() == 1 { "" } else { "s" },
            args.len(),
            if args.len() == 1 { "was" } else { "were" },
        )));
    }

    let mut locals = HashMap::with_capacity(def.locals.len());
    for (param, arg) in def.params.iter().zip(args) {
        locals.insert(param.name.clone(), arg);
    }
    for (name, value) in kwargs {
        if !def.params.iter().any(|param| param.name == name) {
            return Err(type_error(format!(
                "{}() got an unexpected keyword argument '{name}'",
                def.name
            )));
        }
        if locals.contains_key(&name) {
            return Err(type_error(format!(
                "{}() got multiple values for argument '{name}'",
                def.name
            )));
        }
        locals.insert(name, value);
    }

    let mut missing = Vec::new();
    for (param, default) in def.params.iter().zip(&function.defaults) {
        if locals.contains_key(&param.name) {
            continue;
        }
        match default {
            Some(value) => {
                locals.insert(param.name.clone(), value.clone());
            }
            None => missing.push(format!("'{}'", param.name)),
        }
    }
    if !missing.is_empty() {
        return Err(type_error(format!(
            "{}() missing {} required positional argument{}: {}",
            def.name,
            missing.len(),
            if missing.len() == 1 { "" } else { "s" },
            missing.join(", ")
        )));
    }
    Ok(locals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parse_program;

    fn run(source: &str) -> (Result<Completion, RuntimeError>, Vec<usize>, String, Vec<(String, String)>) {
        let program = parse_program(source).unwrap();
        let mut lines = Vec::new();
        let mut hook = |event: &LineEvent<'_>| {
            lines.push(event.line);
            HookAction::Continue
        };
        let limits = ExecutionLimits { max_line_events: Some(10_000), max_call_depth: 20 };
        let mut interpreter = Interpreter::new(&mut hook, limits);
        let result = interpreter.run_module(&program, SourceId::Snippet);
        let output = interpreter.output().to_string();
        let globals = interpreter
            .module_bindings(program.locals.iter().map(String::as_str))
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        drop(interpreter);
        (result, lines, output, globals)
    }

    fn globals_of(source: &str) -> Vec<(String, String)> {
        let (result, _, _, globals) = run(source);
        result.unwrap();
        globals
    }

    fn error_of(source: &str) -> RuntimeError {
        run(source).0.unwrap_err()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_straight_line_events() {
        let (result, lines, _, globals) = run("x = 1\ny = x + 1\n");
        assert_eq!(result.unwrap(), Completion::Finished);
        assert_eq!(lines, vec![1, 2]);
        assert_eq!(globals, pairs(&[("x", "1"), ("y", "2")]));
    }

    #[test]
    fn test_loop_events() {
        let (_, lines, _, _) = run("for i in range(3):\n    x = i\n");
        assert_eq!(lines, vec![1, 2, 1, 2, 1, 2, 1]);

        let (_, lines, _, _) = run("n = 2\nwhile n > 0:\n    n -= 1\nelse:\n    done = True\n");
        assert_eq!(lines, vec![1, 2, 3, 2, 3, 2, 5]);

        let (_, lines, _, _) = run("for i in range(5):\n    if i == 1:\n        break\n");
        assert_eq!(lines, vec![1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_branch_events() {
        let source = "x = 5\nif x < 0:\n    y = 1\nelif x < 3:\n    y = 2\nelse:\n    y = 3\n";
        let (_, lines, _, globals) = run(source);
        assert_eq!(lines, vec![1, 2, 4, 7]);
        assert_eq!(globals, pairs(&[("x", "5"), ("y", "3")]));
    }

    #[test]
    fn test_inline_statements_share_an_event() {
        let (_, lines, _, globals) = run("a = 1; b = 2\nif a: c = 3\n");
        assert_eq!(lines, vec![1, 2]);
        assert_eq!(globals, pairs(&[("a", "1"), ("b", "2"), ("c", "3")]));
    }

    #[test]
    fn test_function_events() {
        let source = "def f(a, b=2):\n    c = a * b\n    return c\nx = f(3)\ny = f(1, b=5)\n";
        let (_, lines, _, globals) = run(source);
        assert_eq!(lines, vec![1, 4, 2, 3, 5, 2, 3]);
        assert_eq!(globals, pairs(&[("f", "<function f>"), ("x", "6"), ("y", "5")]));
    }

    #[test]
    fn test_frame_view_in_function() {
        let program = parse_program("def f(a):\n    b = a + 1\n    return b\nf(4)\n").unwrap();
        let mut snapshots = Vec::new();
        let mut hook = |event: &LineEvent<'_>| {
            if event.line == 3 {
                snapshots.push((event.frame.function_name().map(str::to_string), event.frame.bindings().to_state().encode()));
            }
            HookAction::Continue
        };
        let mut interpreter = Interpreter::new(&mut hook, ExecutionLimits::default());
        interpreter.run_module(&program, SourceId::Snippet).unwrap();
        drop(interpreter);
        assert_eq!(snapshots, vec![(Some("f".to_string()), "a?4;b?5".to_string())]);
    }

    #[test]
    fn test_halt_stops_before_line() {
        let program = parse_program("x = 1\ny = 2\nz = 3\n").unwrap();
        let mut seen = 0;
        let mut hook = |_: &LineEvent<'_>| {
            seen += 1;
            if seen == 2 {
                HookAction::Halt
            } else {
                HookAction::Continue
            }
        };
        let mut interpreter = Interpreter::new(&mut hook, ExecutionLimits::default());
        assert_eq!(interpreter.run_module(&program, SourceId::Snippet).unwrap(), Completion::Halted);
        assert!(interpreter.global("x").is_some());
        assert!(interpreter.global("y").is_none());
    }

    #[test]
    fn test_comprehension_scope() {
        let globals = globals_of("xs = [i * i for i in range(4) if i % 2 == 0]\ntotal = sum(x for x in xs)\n");
        assert_eq!(globals, pairs(&[("xs", "[0, 4]"), ("total", "4")]));

        let err = error_of("ys = [i for i in range(2)]\nz = i\n");
        assert_eq!(err.kind, ErrorKind::NameError);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unpacking_and_subscripts() {
        let globals = globals_of("a, b = 1, 2\na, b = b, a\nxs = [0, 0]\nxs[1] = a\nxs[0] += 5\n");
        assert_eq!(globals, pairs(&[("a", "2"), ("b", "1"), ("xs", "[5, 2]")]));

        let err = error_of("a, b = [1, 2, 3]\n");
        assert_eq!(err.kind, ErrorKind::ValueError);
        assert_eq!(err.message, "too many values to unpack (expected 2)");
    }

    #[test]
    fn test_list_aug_assign_is_in_place() {
        let globals = globals_of("a = [1]\nb = a\na += [2]\n");
        assert_eq!(globals, pairs(&[("a", "[1, 2]"), ("b", "[1, 2]")]));
    }

    #[test]
    fn test_scoping_errors() {
        let err = error_of("x = 1\ndef f():\n    y = x\n    x = 2\nf()\n");
        assert_eq!(err.kind, ErrorKind::UnboundLocalError);
        assert_eq!(err.line, 3);

        let err = error_of("x = 1\ny = z\n");
        assert_eq!(err.kind, ErrorKind::NameError);
        assert_eq!(err.message, "name 'z' is not defined");
        assert_eq!(err.line, 2);

        let globals = globals_of("g = 10\ndef f():\n    return g + 1\nr = f()\n");
        assert_eq!(globals[2], ("r".to_string(), "11".to_string()));
    }

    #[test]
    fn test_runtime_errors_carry_line() {
        let err = error_of("a = 1\nb = a / 0\n");
        assert_eq!(err.kind, ErrorKind::ZeroDivisionError);
        assert_eq!(err.line, 2);

        let err = error_of("def f(n):\n    return f(n + 1)\nf(0)\n");
        assert_eq!(err.kind, ErrorKind::RecursionError);

        let err = error_of("def f(a):\n    return a\nf()\n");
        assert_eq!(err.message, "f() missing 1 required positional argument: 'a'");

        let err = error_of("assert 1 > 2, 'nope'\n");
        assert_eq!(err.kind, ErrorKind::AssertionError);
        assert_eq!(err.message, "nope");
    }

    #[test]
    fn test_event_budget() {
        let err = error_of("while True:\n    pass\n");
        assert_eq!(err.kind, ErrorKind::EventBudgetExceeded);
    }

    #[test]
    fn test_print_output() {
        let (_, _, output, _) = run("print('a', 1)\nprint([1, 'b'], end='')\n");
        assert_eq!(output, "a 1\n[1, 'b']");
    }
}
