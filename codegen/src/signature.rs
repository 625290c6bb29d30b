//! Structured kernel signatures.
//!
//! A [`ParamList`] records each parameter's declaration text and its [`ArgKind`] in one push,
//! so the rendered header and the kind sequence handed to the backend cannot drift apart.

use std::fmt::Display;

use kiln_device::ArgKind;
use kiln_dtype::ScalarDType;

use crate::append;
use crate::builder::CodeBuilder;

#[derive(Debug, Clone, Default)]
pub struct ParamList {
    decls: Vec<String>,
    kinds: Vec<ArgKind>,
}

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    /// `const ga_size name`
    pub fn size(&mut self, name: impl Display) -> &mut Self {
        self.push(format!("const ga_size {name}"), ArgKind::Size)
    }

    /// `const ga_ssize name`
    pub fn ssize(&mut self, name: impl Display) -> &mut Self {
        self.push(format!("const ga_ssize {name}"), ArgKind::SSize)
    }

    /// `GLOBAL_MEM type_name *name`. `type_name` may be a typedef declared by the kernel.
    pub fn buffer(&mut self, type_name: &str, name: impl Display) -> &mut Self {
        self.push(format!("GLOBAL_MEM {type_name} *{name}"), ArgKind::Buffer)
    }

    /// `const <device type> name`, passed by value.
    pub fn scalar(&mut self, dtype: ScalarDType, name: impl Display) -> &mut Self {
        self.push(format!("const {} {name}", dtype.device_name()), ArgKind::Scalar(dtype))
    }

    fn push(&mut self, decl: String, kind: ArgKind) -> &mut Self {
        self.decls.push(decl);
        self.kinds.push(kind);
        self
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> &[ArgKind] {
        &self.kinds
    }

    pub fn into_kinds(self) -> Vec<ArgKind> {
        self.kinds
    }

    /// Append `KERNEL void entry(params)` without the opening brace.
    pub fn render_header(&self, builder: &mut CodeBuilder, entry: &str) {
        append!(builder, "KERNEL void {entry}({})", self.decls.join(", "));
    }
}

/// Parse the parameter kinds of `entry` back out of rendered source.
///
/// Only understands headers written by [`ParamList::render_header`]. Returns `None` when the
/// entry is missing or a parameter type is not recognised.
pub fn declared_kinds(source: &str, entry: &str) -> Option<Vec<ArgKind>> {
    let marker = format!("KERNEL void {entry}(");
    let start = source.find(&marker)? + marker.len();
    let rest = &source[start..];

    let mut depth = 0usize;
    let mut end = None;
    for (i, ch) in rest.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => {
                end = Some(i);
                break;
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    let params = &rest[..end?];
    if params.trim().is_empty() {
        return Some(Vec::new());
    }

    params.split(',').map(|decl| parse_decl(decl.trim())).collect()
}

fn parse_decl(decl: &str) -> Option<ArgKind> {
    if decl.contains('*') {
        return Some(ArgKind::Buffer);
    }
    let decl = decl.strip_prefix("const ").unwrap_or(decl);
    match decl.split_whitespace().next()? {
        "ga_size" => Some(ArgKind::Size),
        "ga_ssize" => Some(ArgKind::SSize),
        name => ScalarDType::from_device_name(name).map(ArgKind::Scalar),
    }
}
