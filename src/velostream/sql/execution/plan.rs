//! Field plan compilation.
//!
//! A [`FieldPlan`] is the compiled, immutable form of a SELECT list. It is
//! built once per query before the first row arrives and is only read during
//! execution, so one plan can be shared by any number of concurrent
//! projections.
//!
//! Compilation:
//! - sorts declared fields into plain columns, alias fields and unnamed
//!   expression fields, keeping declaration order
//! - rewrites references to earlier aliases into [`Expr::AliasRef`] so a later
//!   field sees the value computed for the alias
//! - records wildcard state (`*`, `EXCEPT`, `REPLACE`, `source.*`)
//! - decides whether the query runs in aggregate mode
//! - optionally lays the plan out over a positional schema for the columnar
//!   fast path

use super::types::reserved_keys;
use crate::velostream::sql::ast::{ColumnRef, Expr, FieldDecl, SelectField};
use crate::velostream::sql::error::SqlError;
use crate::velostream::sql::validation::function_registry::FUNCTION_REGISTRY;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// What a compiled field computes
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Bare reference copied from the input under its declared name
    Column(ColumnRef),
    /// `expr AS name`
    Alias { name: String, expr: Expr },
    /// Unaliased expression emitted under a derived name
    Expression { name: String, expr: Expr },
}

/// One compiled field of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedField {
    pub kind: FieldKind,
    pub invisible: bool,
}

impl PlannedField {
    /// Key this field is written under
    pub fn output_name(&self) -> &str {
        match &self.kind {
            FieldKind::Column(col) => &col.name,
            FieldKind::Alias { name, .. } | FieldKind::Expression { name, .. } => name,
        }
    }

    /// Expression to evaluate, or `None` for a plain column copy
    pub fn expr(&self) -> Option<&Expr> {
        match &self.kind {
            FieldKind::Column(_) => None,
            FieldKind::Alias { expr, .. } | FieldKind::Expression { expr, .. } => Some(expr),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Alias { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A `REPLACE(expr AS name)` entry of a wildcard
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub name: String,
    pub expr: Expr,
}

/// State of the all-sources wildcard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WildcardSpec {
    pub except: HashSet<String>,
    pub replace: Vec<Replacement>,
}

/// Where a columnar output slot takes its value from
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSource {
    /// Copy the input value at a fixed position
    Read(ReadPosition),
    /// Evaluate an aliased expression whose references all exist in the schema
    Evaluate(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPosition {
    At(usize),
    /// The schema has no such column. The slot stays null whether or not
    /// `send_nil` is set, so every output row keeps the layout's width.
    Absent,
}

/// One field of a columnar layout
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarSlot {
    pub name: String,
    /// Alias under which the value is made visible to later fields
    pub alias: Option<String>,
    /// Output position; `None` for invisible fields
    pub write: Option<usize>,
    pub source: SlotSource,
}

/// Positional layout of a plan over a known input schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarLayout {
    pub slots: Vec<ColumnarSlot>,
    /// Width every input row must have
    pub input_width: usize,
    /// Column names of the produced rows, in write order
    pub output_schema: Arc<Vec<String>>,
}

/// Compiled, read-only representation of a query's SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    /// Non-wildcard fields in declaration order
    pub fields: Vec<PlannedField>,
    /// All-sources wildcard, when `*` was requested
    pub wildcard: Option<WildcardSpec>,
    /// Sources named by `source.*`, in declaration order
    pub source_wildcards: Vec<String>,
    /// Whether any field calls an aggregate function
    pub is_aggregate: bool,
    /// Present only when compiled against a schema and every field qualifies
    pub columnar: Option<ColumnarLayout>,
}

impl FieldPlan {
    /// Compile a SELECT list for the named-mapping path
    pub fn compile(decls: &[FieldDecl]) -> Result<Self, SqlError> {
        Self::build(decls, None)
    }

    /// Compile a SELECT list and, when every field qualifies, lay it out over
    /// `schema` for the columnar fast path
    pub fn compile_columnar(decls: &[FieldDecl], schema: &[String]) -> Result<Self, SqlError> {
        Self::build(decls, Some(schema))
    }

    fn build(decls: &[FieldDecl], schema: Option<&[String]>) -> Result<Self, SqlError> {
        if decls.is_empty() {
            return Err(SqlError::execution_error("SELECT list is empty"));
        }

        // Aliases declared so far, with their rewritten expressions
        let mut aliases: HashMap<String, Expr> = HashMap::new();
        let mut fields = Vec::new();
        let mut wildcard: Option<WildcardSpec> = None;
        let mut source_wildcards: Vec<String> = Vec::new();
        let mut placeholder_count = 0usize;

        for decl in decls {
            match &decl.field {
                SelectField::Wildcard { except, replace } => {
                    let spec = wildcard.get_or_insert_with(WildcardSpec::default);
                    spec.except.extend(except.iter().cloned());
                    for (expr, name) in replace {
                        if name.is_empty() {
                            return Err(SqlError::execution_error(
                                "REPLACE entries must name the field they replace",
                            ));
                        }
                        spec.replace.push(Replacement {
                            name: name.clone(),
                            expr: rewrite_alias_refs(expr, &aliases),
                        });
                    }
                }
                SelectField::QualifiedWildcard { source } => {
                    if source.is_empty() {
                        return Err(SqlError::execution_error(
                            "qualified wildcard requires a source name",
                        ));
                    }
                    if !source_wildcards.contains(source) {
                        source_wildcards.push(source.clone());
                    }
                }
                SelectField::Column(col) => fields.push(PlannedField {
                    kind: FieldKind::Column(col.clone()),
                    invisible: decl.invisible,
                }),
                SelectField::Expression { expr, alias: None } => {
                    let kind = match expr {
                        Expr::Column(col) => FieldKind::Column(col.clone()),
                        Expr::Function { name, .. } => FieldKind::Expression {
                            name: name.clone(),
                            expr: rewrite_alias_refs(expr, &aliases),
                        },
                        other => {
                            let name = reserved_keys::placeholder_field_name(placeholder_count);
                            placeholder_count += 1;
                            FieldKind::Expression {
                                name,
                                expr: rewrite_alias_refs(other, &aliases),
                            }
                        }
                    };
                    fields.push(PlannedField {
                        kind,
                        invisible: decl.invisible,
                    });
                }
                SelectField::Expression {
                    expr,
                    alias: Some(name),
                } => {
                    let rewritten = rewrite_alias_refs(expr, &aliases);
                    aliases.insert(name.clone(), rewritten.clone());
                    fields.push(PlannedField {
                        kind: FieldKind::Alias {
                            name: name.clone(),
                            expr: rewritten,
                        },
                        invisible: decl.invisible,
                    });
                }
            }
        }

        let is_aggregate = fields
            .iter()
            .filter_map(PlannedField::expr)
            .chain(wildcard.iter().flat_map(|w| w.replace.iter().map(|r| &r.expr)))
            .any(|expr| FUNCTION_REGISTRY.contains_aggregate(expr));

        let mut plan = FieldPlan {
            fields,
            wildcard,
            source_wildcards,
            is_aggregate,
            columnar: None,
        };
        if let Some(schema) = schema {
            plan.columnar = plan.layout_columnar(schema);
        }
        Ok(plan)
    }

    /// Lay the plan out over a positional schema, or explain why it cannot be
    fn layout_columnar(&self, schema: &[String]) -> Option<ColumnarLayout> {
        match self.try_layout_columnar(schema) {
            Ok(layout) => Some(layout),
            Err(reason) => {
                log::debug!("Columnar fast path disabled: {}", reason);
                None
            }
        }
    }

    fn try_layout_columnar(&self, schema: &[String]) -> Result<ColumnarLayout, String> {
        if self.wildcard.is_some() {
            return Err("query selects *".to_string());
        }
        if let Some(source) = self.source_wildcards.first() {
            return Err(format!("query selects {}.*", source));
        }
        if self.is_aggregate {
            return Err("query aggregates".to_string());
        }

        let positions: HashMap<&str, usize> = schema
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut slots = Vec::with_capacity(self.fields.len());
        let mut output_schema = Vec::new();
        for field in &self.fields {
            let source = match &field.kind {
                FieldKind::Column(col) => SlotSource::Read(
                    positions
                        .get(col.name.as_str())
                        .map(|p| ReadPosition::At(*p))
                        .unwrap_or(ReadPosition::Absent),
                ),
                FieldKind::Alias { name, expr } => {
                    if let Some(missing) = expr
                        .get_columns()
                        .into_iter()
                        .find(|c| !positions.contains_key(c.name.as_str()))
                    {
                        return Err(format!(
                            "alias {} references {} which is not in the schema",
                            name, missing
                        ));
                    }
                    match expr {
                        Expr::Column(col) => SlotSource::Read(
                            positions
                                .get(col.name.as_str())
                                .map(|p| ReadPosition::At(*p))
                                .unwrap_or(ReadPosition::Absent),
                        ),
                        other => SlotSource::Evaluate(other.clone()),
                    }
                }
                FieldKind::Expression { name, .. } => {
                    return Err(format!("unaliased expression {} has no position", name));
                }
            };

            let write = if field.invisible {
                None
            } else {
                output_schema.push(field.output_name().to_string());
                Some(output_schema.len() - 1)
            };
            slots.push(ColumnarSlot {
                name: field.output_name().to_string(),
                alias: field.alias().map(str::to_string),
                write,
                source,
            });
        }

        Ok(ColumnarLayout {
            slots,
            input_width: schema.len(),
            output_schema: Arc::new(output_schema),
        })
    }

    /// Output keys of fields that are computed but never emitted
    pub fn invisible_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.invisible)
            .map(PlannedField::output_name)
    }
}

/// Replace unqualified references to already-declared aliases with alias
/// references. Only earlier aliases are visible, so a field can never refer
/// to itself.
fn rewrite_alias_refs(expr: &Expr, aliases: &HashMap<String, Expr>) -> Expr {
    let rewrite = |e: &Expr| Box::new(rewrite_alias_refs(e, aliases));
    match expr {
        Expr::Column(ColumnRef { name, source: None }) => match aliases.get(name) {
            Some(aliased) => Expr::AliasRef {
                alias: name.clone(),
                expr: Box::new(aliased.clone()),
            },
            None => expr.clone(),
        },
        Expr::Column(_) | Expr::AliasRef { .. } | Expr::Literal(_) => expr.clone(),
        Expr::Wildcard { except, replace } => Expr::Wildcard {
            except: except.clone(),
            replace: replace
                .iter()
                .map(|(e, name)| (rewrite_alias_refs(e, aliases), name.clone()))
                .collect(),
        },
        Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
            left: rewrite(left),
            op: *op,
            right: rewrite(right),
        },
        Expr::UnaryOp { op, expr } => Expr::UnaryOp {
            op: *op,
            expr: rewrite(expr),
        },
        Expr::Function { name, args } => Expr::Function {
            name: name.clone(),
            args: args.iter().map(|a| rewrite_alias_refs(a, aliases)).collect(),
        },
        Expr::Case {
            operand,
            when_clauses,
            else_clause,
        } => Expr::Case {
            operand: operand.as_deref().map(rewrite),
            when_clauses: when_clauses
                .iter()
                .map(|(c, r)| (rewrite_alias_refs(c, aliases), rewrite_alias_refs(r, aliases)))
                .collect(),
            else_clause: else_clause.as_deref().map(rewrite),
        },
        Expr::FieldAccess { expr, key } => Expr::FieldAccess {
            expr: rewrite(expr),
            key: key.clone(),
        },
        Expr::Index { expr, index } => Expr::Index {
            expr: rewrite(expr),
            index: *index,
        },
        Expr::Slice { expr, start, end } => Expr::Slice {
            expr: rewrite(expr),
            start: *start,
            end: *end,
        },
    }
}
