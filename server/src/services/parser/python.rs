//! Python AST parsing via `rustpython-parser` (§4.1).
//!
//! Mirrors `rust_lang`: produces entities, an import table (including
//! `from x import *` star imports, preserved in file order per the
//! resolver's tie-break rules in §4.3), and raw call/base-class sites.

use rustpython_parser::ast::{self, Stmt};
use rustpython_parser::{parse, Mode};

use crate::models::entity::{Entity, EntityKind, Signature, SourceLocation};
use crate::models::error::{SynapseError, SynapseResult};
use crate::models::project_index::{ImportTable, ParsedFile, RawCallSite, RawInheritSite};
use crate::services::complexity::ComplexityAccumulator;

pub fn parse_source(normalized_path: &str, content: &str) -> SynapseResult<ParsedFile> {
    let module = parse(content, Mode::Module, normalized_path).map_err(|e| {
        SynapseError::PartialParse {
            file: normalized_path.into(),
            message: e.to_string(),
        }
    })?;

    let body = match module {
        ast::Mod::Module(m) => m.body,
        _ => Vec::new(),
    };

    let mut visitor = PythonVisitor::new(normalized_path, content);
    visitor.parsed.entities.push(Entity::new_module(normalized_path));
    for stmt in &body {
        visitor.visit_top_level(stmt);
    }
    Ok(visitor.parsed)
}

/// Maps byte offsets (what `rustpython_parser` spans report) to 1-based
/// line numbers, since the parser never exposes line/column directly.
struct LineIndex {
    /// byte offset of the first character of each line.
    line_starts: Vec<u32>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self { line_starts }
    }

    fn line_for(&self, byte_offset: u32) -> u32 {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(i) => i as u32 + 1,
            Err(i) => i as u32,
        }
    }
}

struct PythonVisitor<'p> {
    path: &'p str,
    parsed: ParsedFile,
    scope: Vec<String>,
    lines: LineIndex,
}

impl<'p> PythonVisitor<'p> {
    fn new(path: &'p str, source: &str) -> Self {
        Self {
            path,
            parsed: ParsedFile::new(path),
            scope: Vec::new(),
            lines: LineIndex::new(source),
        }
    }

    fn qualified_name(&self, name: &str) -> String {
        if self.scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.scope.join("."), name)
        }
    }

    fn entity_id(&self, qualified_name: &str) -> String {
        Entity::make_id(self.path, qualified_name)
    }

    fn visit_top_level(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(f) => {
                let line = self.lines.line_for(f.range.start().to_usize() as u32);
                self.visit_function(&f.name, &f.args, &f.body, line)
            }
            Stmt::AsyncFunctionDef(f) => {
                let line = self.lines.line_for(f.range.start().to_usize() as u32);
                self.visit_function(&f.name, &f.args, &f.body, line)
            }
            Stmt::ClassDef(c) => self.visit_class(c),
            Stmt::Import(i) => self.visit_import(i),
            Stmt::ImportFrom(i) => self.visit_import_from(i),
            _ => {}
        }
    }

    fn visit_function(
        &mut self,
        name: &str,
        args: &ast::Arguments,
        body: &[Stmt],
        line: u32,
    ) {
        let qname = self.qualified_name(name);
        let id = self.entity_id(&qname);
        let owning_class = self.current_class_id();
        let kind = if owning_class.is_some() {
            EntityKind::Method
        } else {
            EntityKind::Function
        };
        let params: Vec<String> = args
            .args
            .iter()
            .map(|a| a.def.arg.to_string())
            .collect();

        let mut acc = ComplexityAccumulator::new();
        walk_body_complexity(body, &mut acc);

        self.parsed.entities.push(Entity {
            id: id.clone(),
            kind,
            qualified_name: qname.clone(),
            location: SourceLocation {
                file: self.path.to_string(),
                start_line: line,
                end_line: line,
            },
            signature: Signature {
                params,
                return_type: None,
                decorators: Vec::new(),
            },
            cyclomatic_complexity: acc.metrics.cyclomatic,
            cognitive_complexity: acc.metrics.cognitive,
            owning_class,
        });

        self.scope.push(name.to_string());
        let mut collector = CallCollector {
            caller_id: id,
            calls: Vec::new(),
            lines: &self.lines,
        };
        for stmt in body {
            collector.visit_stmt(stmt);
        }
        self.parsed.raw_calls.extend(collector.calls);
        for stmt in body {
            self.visit_top_level(stmt);
        }
        self.scope.pop();
    }

    fn current_class_id(&self) -> Option<String> {
        if self.scope.is_empty() {
            return None;
        }
        let qname = self.scope.join(".");
        Some(self.entity_id(&qname))
    }

    fn visit_class(&mut self, c: &ast::StmtClassDef) {
        let name = c.name.to_string();
        let qname = self.qualified_name(&name);
        let id = self.entity_id(&qname);
        let line = self.lines.line_for(c.range.start().to_usize() as u32);

        self.parsed.entities.push(Entity {
            id: id.clone(),
            kind: EntityKind::Class,
            qualified_name: qname.clone(),
            location: SourceLocation {
                file: self.path.to_string(),
                start_line: line,
                end_line: line,
            },
            signature: Signature::default(),
            cyclomatic_complexity: 0,
            cognitive_complexity: 0,
            owning_class: None,
        });

        for base in &c.bases {
            if let Some(name) = expr_name(base) {
                self.parsed.raw_inherits.push(RawInheritSite {
                    class_id: id.clone(),
                    base_name: name,
                    line,
                });
            }
        }

        self.scope.push(name);
        for stmt in &c.body {
            self.visit_top_level(stmt);
        }
        self.scope.pop();
    }

    fn visit_import(&mut self, i: &ast::StmtImport) {
        for alias in &i.names {
            let canonical = alias.name.to_string();
            let bound = alias
                .asname
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| canonical.split('.').next().unwrap_or(&canonical).to_string());
            self.parsed.imports.aliases.insert(bound, canonical);
        }
    }

    fn visit_import_from(&mut self, i: &ast::StmtImportFrom) {
        let module = i
            .module
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_default();
        for alias in &i.names {
            if alias.name.as_str() == "*" {
                self.parsed.imports.star_imports.push(module.clone());
                continue;
            }
            let canonical = if module.is_empty() {
                alias.name.to_string()
            } else {
                format!("{}.{}", module, alias.name)
            };
            let bound = alias
                .asname
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| alias.name.to_string());
            self.parsed.imports.aliases.insert(bound, canonical);
        }
    }
}

fn expr_name(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Name(n) => Some(n.id.to_string()),
        ast::Expr::Attribute(a) => {
            let base = expr_name(&a.value)?;
            Some(format!("{}.{}", base, a.attr))
        }
        _ => None,
    }
}

fn walk_body_complexity(body: &[Stmt], acc: &mut ComplexityAccumulator) {
    for stmt in body {
        walk_stmt_complexity(stmt, acc);
    }
}

fn walk_stmt_complexity(stmt: &Stmt, acc: &mut ComplexityAccumulator) {
    match stmt {
        Stmt::If(s) => {
            acc.decision_point();
            acc.enter_nesting();
            walk_body_complexity(&s.body, acc);
            walk_body_complexity(&s.orelse, acc);
            acc.exit_nesting();
        }
        Stmt::While(s) => {
            acc.decision_point();
            acc.enter_nesting();
            walk_body_complexity(&s.body, acc);
            acc.exit_nesting();
        }
        Stmt::For(s) => {
            acc.decision_point();
            acc.enter_nesting();
            walk_body_complexity(&s.body, acc);
            acc.exit_nesting();
        }
        Stmt::Try(s) => {
            acc.enter_nesting();
            walk_body_complexity(&s.body, acc);
            for handler in &s.handlers {
                let ast::ExceptHandler::ExceptHandler(h) = handler;
                acc.decision_point();
                walk_body_complexity(&h.body, acc);
            }
            acc.exit_nesting();
        }
        Stmt::FunctionDef(_) | Stmt::AsyncFunctionDef(_) | Stmt::ClassDef(_) => {
            // nested defs are separate entities, visited independently
        }
        _ => {}
    }
}

struct CallCollector<'l> {
    caller_id: String,
    calls: Vec<RawCallSite>,
    lines: &'l LineIndex,
}

impl<'l> CallCollector<'l> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.visit_expr(&e.value),
            Stmt::Return(r) => {
                if let Some(v) = &r.value {
                    self.visit_expr(v);
                }
            }
            Stmt::Assign(a) => self.visit_expr(&a.value),
            Stmt::If(s) => {
                self.visit_expr(&s.test);
                for stmt in &s.body {
                    self.visit_stmt(stmt);
                }
                for stmt in &s.orelse {
                    self.visit_stmt(stmt);
                }
            }
            Stmt::While(s) => {
                for stmt in &s.body {
                    self.visit_stmt(stmt);
                }
            }
            Stmt::For(s) => {
                for stmt in &s.body {
                    self.visit_stmt(stmt);
                }
            }
            Stmt::Try(s) => {
                for stmt in &s.body {
                    self.visit_stmt(stmt);
                }
                for handler in &s.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    for stmt in &h.body {
                        self.visit_stmt(stmt);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &ast::Expr) {
        if let ast::Expr::Call(call) = expr {
            if let Some(name) = expr_name(&call.func) {
                self.calls.push(RawCallSite {
                    caller_id: self.caller_id.clone(),
                    callee_name: name,
                    line: self.lines.line_for(call.range.start().to_usize() as u32),
                });
            }
            for arg in &call.args {
                self.visit_expr(arg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_and_call_site() {
        let src = "def bar():\n    pass\n\ndef foo():\n    bar()\n";
        let parsed = parse_source("a.py", src).unwrap();
        let names: Vec<_> = parsed
            .entities
            .iter()
            .map(|e| e.qualified_name.as_str())
            .collect();
        assert!(names.contains(&"foo"));
        assert!(names.contains(&"bar"));
        assert_eq!(parsed.raw_calls.len(), 1);
        assert_eq!(parsed.raw_calls[0].callee_name, "bar");
    }

    #[test]
    fn star_import_recorded_in_file_order() {
        let src = "from b import *\nfrom c import *\n";
        let parsed = parse_source("a.py", src).unwrap();
        assert_eq!(parsed.imports.star_imports, vec!["b", "c"]);
    }

    #[test]
    fn class_base_recorded_as_inherit_site() {
        let src = "class Base:\n    pass\n\nclass Child(Base):\n    pass\n";
        let parsed = parse_source("a.py", src).unwrap();
        assert_eq!(parsed.raw_inherits.len(), 1);
        assert_eq!(parsed.raw_inherits[0].base_name, "Base");
    }
}
