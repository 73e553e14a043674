//! Rust AST parsing via `syn` (§4.1).
//!
//! Produces entities (functions, methods, structs/enums as classes), an
//! import table built from `use` declarations, and raw call sites for the
//! resolver. Line numbers come from `proc_macro2::Span::start()`, which
//! requires the `span-locations` feature on `proc-macro2` — without it
//! every span reports line 1, which is useless for blast-radius/violation
//! reporting.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{
    visit::Visit, Expr, FnArg, ImplItem, Item, ItemEnum, ItemFn, ItemImpl, ItemStruct, ItemTrait,
    ItemUse, Pat, ReturnType, Stmt, UseTree,
};

use crate::models::entity::{Entity, EntityKind, Signature, SourceLocation};
use crate::models::error::{SynapseError, SynapseResult};
use crate::models::project_index::{ImportTable, ParsedFile, RawCallSite};
use crate::services::complexity::ComplexityAccumulator;

pub fn parse_source(normalized_path: &str, content: &str) -> SynapseResult<ParsedFile> {
    let file = syn::parse_file(content).map_err(|e| SynapseError::PartialParse {
        file: normalized_path.into(),
        message: e.to_string(),
    })?;

    let mut visitor = RustVisitor::new(normalized_path);
    visitor.parsed.entities.push(Entity::new_module(normalized_path));
    for item in &file.items {
        visitor.visit_top_level_item(item);
    }
    Ok(visitor.parsed)
}

fn line_of(span: Span) -> u32 {
    span.start().line as u32
}

struct RustVisitor<'p> {
    path: &'p str,
    parsed: ParsedFile,
    scope: Vec<String>,
}

impl<'p> RustVisitor<'p> {
    fn new(path: &'p str) -> Self {
        Self {
            path,
            parsed: ParsedFile::new(path),
            scope: Vec::new(),
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

    fn visit_top_level_item(&mut self, item: &Item) {
        match item {
            Item::Fn(f) => self.visit_free_function(f),
            Item::Struct(s) => self.visit_struct(s),
            Item::Enum(e) => self.visit_enum(e),
            Item::Trait(t) => self.visit_trait(t),
            Item::Impl(i) => self.visit_impl(i),
            Item::Use(u) => self.visit_use(u),
            Item::Mod(m) => {
                if let Some((_, items)) = &m.content {
                    self.scope.push(m.ident.to_string());
                    for item in items {
                        self.visit_top_level_item(item);
                    }
                    self.scope.pop();
                }
            }
            _ => {}
        }
    }

    fn signature_of(sig: &syn::Signature) -> Signature {
        let params = sig
            .inputs
            .iter()
            .filter_map(|arg| match arg {
                FnArg::Typed(pat_type) => match &*pat_type.pat {
                    Pat::Ident(id) => Some(id.ident.to_string()),
                    _ => Some(quote::quote!(#pat_type).to_string()),
                },
                FnArg::Receiver(_) => Some("self".to_string()),
            })
            .collect();
        let return_type = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(quote::quote!(#ty).to_string()),
        };
        Signature {
            params,
            return_type,
            decorators: Vec::new(),
        }
    }

    fn visit_free_function(&mut self, f: &ItemFn) {
        let name = f.sig.ident.to_string();
        let qname = self.qualified_name(&name);
        let id = self.entity_id(&qname);
        let start = line_of(f.sig.fn_token.span());
        let end = line_of(f.block.brace_token.span.close().span());
        let complexity = self.walk_block_complexity(&f.block);

        self.parsed.entities.push(Entity {
            id: id.clone(),
            kind: EntityKind::Function,
            qualified_name: qname.clone(),
            location: SourceLocation {
                file: self.path.to_string(),
                start_line: start,
                end_line: end,
            },
            signature: Self::signature_of(&f.sig),
            cyclomatic_complexity: complexity.metrics.cyclomatic,
            cognitive_complexity: complexity.metrics.cognitive,
            owning_class: None,
        });

        self.scope.push(name);
        self.collect_calls(&f.block, &id);
        self.scope.pop();
    }

    fn visit_struct(&mut self, s: &ItemStruct) {
        let name = s.ident.to_string();
        let qname = self.qualified_name(&name);
        let id = self.entity_id(&qname);
        let line = line_of(s.ident.span());
        self.parsed.entities.push(Entity {
            id,
            kind: EntityKind::Class,
            qualified_name: qname,
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
    }

    fn visit_enum(&mut self, e: &ItemEnum) {
        let name = e.ident.to_string();
        let qname = self.qualified_name(&name);
        let id = self.entity_id(&qname);
        let line = line_of(e.ident.span());
        self.parsed.entities.push(Entity {
            id,
            kind: EntityKind::Class,
            qualified_name: qname,
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
    }

    fn visit_trait(&mut self, t: &ItemTrait) {
        let name = t.ident.to_string();
        let qname = self.qualified_name(&name);
        let id = self.entity_id(&qname);
        let line = line_of(t.ident.span());
        self.parsed.entities.push(Entity {
            id,
            kind: EntityKind::Class,
            qualified_name: qname,
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
    }

    fn visit_impl(&mut self, i: &ItemImpl) {
        let syn::Type::Path(type_path) = &*i.self_ty else {
            return;
        };
        let Some(segment) = type_path.path.segments.last() else {
            return;
        };
        let owner_name = segment.ident.to_string();
        let owner_qname = self.qualified_name(&owner_name);
        let owner_id = self.entity_id(&owner_qname);

        if let Some((_, trait_path, _)) = &i.trait_ {
            if let Some(trait_name) = trait_path.segments.last() {
                self.parsed.raw_inherits.push(
                    crate::models::project_index::RawInheritSite {
                        class_id: owner_id.clone(),
                        base_name: trait_name.ident.to_string(),
                        line: line_of(trait_path.span()),
                    },
                );
            }
        }

        self.scope.push(owner_name);
        for item in &i.items {
            if let ImplItem::Fn(method) = item {
                let name = method.sig.ident.to_string();
                let qname = self.qualified_name(&name);
                let id = self.entity_id(&qname);
                let start = line_of(method.sig.fn_token.span());
                let end = line_of(method.block.brace_token.span.close().span());
                let complexity = self.walk_block_complexity(&method.block);

                self.parsed.entities.push(Entity {
                    id: id.clone(),
                    kind: EntityKind::Method,
                    qualified_name: qname.clone(),
                    location: SourceLocation {
                        file: self.path.to_string(),
                        start_line: start,
                        end_line: end,
                    },
                    signature: Self::signature_of(&method.sig),
                    cyclomatic_complexity: complexity.metrics.cyclomatic,
                    cognitive_complexity: complexity.metrics.cognitive,
                    owning_class: Some(owner_id.clone()),
                });

                self.scope.push(name);
                self.collect_calls(&method.block, &id);
                self.scope.pop();
            }
        }
        self.scope.pop();
    }

    fn visit_use(&mut self, u: &ItemUse) {
        collect_use_tree(&u.tree, String::new(), &mut self.parsed.imports);
    }

    fn walk_block_complexity(&self, block: &syn::Block) -> ComplexityAccumulator {
        let mut acc = ComplexityAccumulator::new();
        let mut walker = ComplexityWalker { acc: &mut acc };
        walker.visit_block(block);
        acc
    }

    fn collect_calls(&mut self, block: &syn::Block, caller_id: &str) {
        let mut collector = CallCollector {
            caller_id: caller_id.to_string(),
            calls: Vec::new(),
        };
        collector.visit_block(block);
        self.parsed.raw_calls.extend(collector.calls);
    }
}

// Canonical values use "." joins throughout, matching the dotted module
// names `resolver::module_name_for` derives from file paths, so a Rust
// `use a::b::c` and a Python `from a.b import c` resolve the same way.
fn collect_use_tree(tree: &UseTree, prefix: String, imports: &mut ImportTable) {
    match tree {
        UseTree::Path(p) => {
            let next_prefix = if prefix.is_empty() {
                p.ident.to_string()
            } else {
                format!("{}.{}", prefix, p.ident)
            };
            collect_use_tree(&p.tree, next_prefix, imports);
        }
        UseTree::Name(n) => {
            let canonical = if prefix.is_empty() {
                n.ident.to_string()
            } else {
                format!("{}.{}", prefix, n.ident)
            };
            imports.aliases.insert(n.ident.to_string(), canonical);
        }
        UseTree::Rename(r) => {
            let canonical = if prefix.is_empty() {
                r.ident.to_string()
            } else {
                format!("{}.{}", prefix, r.ident)
            };
            imports.aliases.insert(r.rename.to_string(), canonical);
        }
        UseTree::Glob(_) => {
            imports.star_imports.push(prefix);
        }
        UseTree::Group(g) => {
            for item in &g.items {
                collect_use_tree(item, prefix.clone(), imports);
            }
        }
    }
}

/// Walks a function body accumulating cyclomatic/cognitive complexity
/// without collecting entities (kept separate from `CallCollector` so each
/// visitor stays a single pass with one responsibility).
struct ComplexityWalker<'a> {
    acc: &'a mut ComplexityAccumulator,
}

impl<'ast> Visit<'ast> for ComplexityWalker<'_> {
    fn visit_expr(&mut self, node: &'ast Expr) {
        match node {
            Expr::If(_) | Expr::Match(_) | Expr::While(_) | Expr::ForLoop(_) | Expr::Loop(_) => {
                self.acc.decision_point();
                self.acc.enter_nesting();
                syn::visit::visit_expr(self, node);
                self.acc.exit_nesting();
                return;
            }
            Expr::Try(_) => {
                self.acc.decision_point();
            }
            Expr::Binary(bin) => {
                if matches!(bin.op, syn::BinOp::And(_) | syn::BinOp::Or(_)) {
                    self.acc.boolean_operator();
                }
            }
            _ => {}
        }
        syn::visit::visit_expr(self, node);
    }

    fn visit_arm(&mut self, node: &'ast syn::Arm) {
        self.acc.decision_point();
        syn::visit::visit_arm(self, node);
    }
}

/// Extracts raw call sites (caller entity ID, callee textual name, line)
/// for the resolver (§4.1, §4.3).
struct CallCollector {
    caller_id: String,
    calls: Vec<RawCallSite>,
}

impl<'ast> Visit<'ast> for CallCollector {
    fn visit_expr(&mut self, node: &'ast Expr) {
        match node {
            Expr::Call(call) => {
                if let Some(name) = callee_name(&call.func) {
                    self.calls.push(RawCallSite {
                        caller_id: self.caller_id.clone(),
                        callee_name: name,
                        line: line_of(call.span()),
                    });
                }
            }
            Expr::MethodCall(call) => {
                self.calls.push(RawCallSite {
                    caller_id: self.caller_id.clone(),
                    callee_name: call.method.to_string(),
                    line: line_of(call.span()),
                });
            }
            _ => {}
        }
        syn::visit::visit_expr(self, node);
    }
}

fn callee_name(func: &Expr) -> Option<String> {
    match func {
        Expr::Path(p) => {
            let segments: Vec<String> = p
                .path
                .segments
                .iter()
                .map(|s| s.ident.to_string())
                .collect();
            Some(segments.join("."))
        }
        _ => None,
    }
}
