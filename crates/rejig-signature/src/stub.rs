//! Stub compilation contexts.
//!
//! To resolve a proposed type the way the compiler would at the method's
//! declaration site, we synthesize a minimal compilable unit: the package
//! and import prologue verbatim, then stubs of every enclosing and sibling
//! type declaration, split into a "before" and an "after" string straddling
//! the focal position. A candidate signature is spliced between the two and
//! the result resolved as an ordinary unit.

use rejig_hir::{CompilationUnit, MethodDecl, TypeDecl, TypeDeclKind};
use tracing::trace;

/// Before/after source fragments around the focal position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubTypeContext {
    before: String,
    after: String,
}

impl StubTypeContext {
    /// Build the stub context for `focal_position` (a byte offset into the
    /// unit's source, typically the start of the method being re-typed).
    pub fn create(unit: &CompilationUnit, focal_position: usize) -> Self {
        let intro_end = unit.intro_end().min(unit.source.len());
        let mut before = unit.source[..intro_end].to_string();
        if !before.is_empty() && !before.ends_with('\n') {
            before.push('\n');
        }
        let mut after = String::new();

        fill_with_type_stubs(&mut before, &mut after, focal_position, &unit.types);

        before.push(' ');
        after.insert(0, ' ');
        Self { before, after }
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }
}

fn fill_with_type_stubs(
    before: &mut String,
    after: &mut String,
    focal_position: usize,
    types: &[TypeDecl],
) {
    for decl in types {
        let opening = if decl.span.start < focal_position {
            &mut *before
        } else {
            &mut *after
        };
        append_type_header(opening, decl);
        opening.push_str("{\n");
        if decl.kind == TypeDeclKind::Enum {
            opening.push_str(";\n");
        }

        for method in &decl.methods {
            append_local_class_method_stub(before, after, focal_position, method);
        }
        fill_with_type_stubs(before, after, focal_position, &decl.nested);

        let closing = if decl.span.end < focal_position {
            &mut *before
        } else {
            &mut *after
        };
        closing.push_str("}\n");
    }
}

/// Local classes live inside method bodies; to keep them resolvable the
/// stub carries an enclosing method shell, but only for the method the
/// focal position sits in.
fn append_local_class_method_stub(
    before: &mut String,
    after: &mut String,
    focal_position: usize,
    method: &MethodDecl,
) {
    if method.local_types.is_empty() {
        return;
    }
    if !(method.span.start < focal_position && focal_position < method.span.end) {
        return;
    }
    append_modifiers(before, &method.modifiers);
    append_type_params(before, method);
    before.push_str("void ");
    before.push_str(method.name.as_str());
    before.push_str("(){\n");
    fill_with_type_stubs(before, after, focal_position, &method.local_types);
    after.push_str("}\n");
}

fn append_type_header(buf: &mut String, decl: &TypeDecl) {
    append_modifiers(buf, &decl.modifiers);
    buf.push_str(decl.kind.keyword());
    buf.push(' ');
    buf.push_str(decl.name.as_str());
    if !decl.type_params.is_empty() {
        buf.push('<');
        for (i, tp) in decl.type_params.iter().enumerate() {
            if i > 0 {
                buf.push(',');
            }
            buf.push_str(&tp.source_text());
        }
        buf.push('>');
    }
    if let Some(extends) = &decl.extends_text {
        buf.push_str(" extends ");
        buf.push_str(extends);
    }
    if !decl.implements_text.is_empty() {
        buf.push_str(if decl.kind == TypeDeclKind::Interface {
            " extends "
        } else {
            " implements "
        });
        buf.push_str(&decl.implements_text.join(", "));
    }
}

fn append_type_params(buf: &mut String, method: &MethodDecl) {
    if method.type_params.is_empty() {
        return;
    }
    buf.push('<');
    for (i, tp) in method.type_params.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        buf.push_str(&tp.source_text());
    }
    buf.push_str("> ");
}

fn append_modifiers(buf: &mut String, modifiers: &[String]) {
    for modifier in modifiers {
        buf.push_str(modifier);
        buf.push(' ');
    }
}

/// A disposable synthesized unit for one resolution round.
///
/// Mirrors a compiler working copy: it must be released on every exit path,
/// including early returns, which [`Drop`] guarantees; `discard` exists for
/// callers that want the release to be visible in the control flow.
#[derive(Debug)]
pub struct ScratchUnit {
    text: String,
    released: bool,
}

impl ScratchUnit {
    pub fn new(text: String) -> Self {
        Self {
            text,
            released: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn discard(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.text.clear();
            trace!("scratch unit discarded");
        }
    }
}

impl Drop for ScratchUnit {
    fn drop(&mut self) {
        self.release();
    }
}
