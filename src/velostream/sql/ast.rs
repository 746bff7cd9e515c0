/*!
# Projection Abstract Syntax Tree (AST)

This module defines the parsed shape of a query's SELECT list as the projection
stage consumes it. Parsing itself happens upstream; the projection stage treats
these values as already-validated input.

## Key Features

- **Path Navigation**: `a->b` (map descent), `a[0]` (indexing) and `a[1:3]` (half-open slicing)
- **Source Qualification**: `src1.a` and `src1.*` for rows produced by joins
- **Wildcard Modifiers**: `* EXCEPT(a, b) REPLACE(x AS a)`
- **Invisible Fields**: fields computed for reference by other fields but never emitted

## Example Field Lists

```sql
SELECT a, b->c AS bc, abs(d) FROM demo
SELECT * EXCEPT(b) REPLACE(upper(a) AS a) FROM demo
SELECT src1.*, src2.id FROM src1 INNER JOIN src2 ON src1.id = src2.id
SELECT count(*) AS c, a FROM demo GROUP BY TUMBLINGWINDOW(ss, 10)
```
*/

use std::fmt;

/// Reference to a named field, optionally qualified by its source stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub name: String,
    /// Declared source (e.g. `src1` in `src1.a`); `None` for unqualified references
    pub source: Option<String>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    pub fn qualified(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}.{}", source, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A declared field in the SELECT list, before compilation into a field plan
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub field: SelectField,
    /// Computed but excluded from output
    pub invisible: bool,
}

impl FieldDecl {
    pub fn visible(field: SelectField) -> Self {
        Self {
            field,
            invisible: false,
        }
    }

    pub fn invisible(field: SelectField) -> Self {
        Self {
            field,
            invisible: true,
        }
    }
}

impl From<SelectField> for FieldDecl {
    fn from(field: SelectField) -> Self {
        FieldDecl::visible(field)
    }
}

/// Field selection in SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub enum SelectField {
    /// Simple column reference: [source.]column_name
    Column(ColumnRef),
    /// Expression with optional alias: expr [AS alias]
    Expression { expr: Expr, alias: Option<String> },
    /// Wildcard selection: * [EXCEPT(...)] [REPLACE(expr AS name, ...)]
    Wildcard {
        except: Vec<String>,
        replace: Vec<(Expr, String)>,
    },
    /// Source-qualified wildcard: source.*
    QualifiedWildcard { source: String },
}

impl SelectField {
    /// Plain `*` with no modifiers
    pub fn wildcard() -> Self {
        SelectField::Wildcard {
            except: Vec::new(),
            replace: Vec::new(),
        }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectField::Expression {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn unaliased(expr: Expr) -> Self {
        SelectField::Expression { expr, alias: None }
    }

    /// Get column references from this field
    pub fn get_columns(&self) -> Vec<ColumnRef> {
        match self {
            SelectField::Column(col) => vec![col.clone()],
            SelectField::Expression { expr, .. } => expr.get_columns(),
            SelectField::Wildcard { replace, .. } => {
                replace.iter().flat_map(|(e, _)| e.get_columns()).collect()
            }
            SelectField::QualifiedWildcard { .. } => Vec::new(),
        }
    }
}

/// SQL expressions evaluated by the projection stage
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(ColumnRef),
    /// Reference to an alias declared earlier in the same field list.
    ///
    /// Carries the aliased expression so that it can be recomputed when the
    /// alias value has not been stored yet.
    AliasRef { alias: String, expr: Box<Expr> },
    /// Literal values
    Literal(LiteralValue),
    /// Binary operations: expr op expr
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Unary operations: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },
    /// Function calls: func_name(args...)
    Function { name: String, args: Vec<Expr> },
    /// CASE expressions for conditional logic.
    ///
    /// With an operand (`CASE x WHEN 1 THEN ...`) each WHEN value is compared
    /// for equality; without one each WHEN is a boolean condition.
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>, // (condition, result)
        else_clause: Option<Box<Expr>>,
    },
    /// Map descent: expr->key
    FieldAccess { expr: Box<Expr>, key: String },
    /// Sequence indexing: expr[index]. Negative indexes count from the end.
    Index { expr: Box<Expr>, index: i64 },
    /// Half-open sequence slicing: expr[start:end]
    Slice {
        expr: Box<Expr>,
        start: Option<i64>,
        end: Option<i64>,
    },
    /// `*` as a function argument, as in count(*) or count(* EXCEPT(a, b)).
    /// Evaluates to the row's field map with the modifiers applied.
    Wildcard {
        except: Vec<String>,
        replace: Vec<(Expr, String)>,
    },
}

/// Literal values in SQL
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    /// High-precision decimal literal
    Decimal(String), // Store as string to preserve exact precision during parsing
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logical
    And,
    Or,

    // String operations
    Concat, // || concatenation operator
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    IsNull,
    IsNotNull,
}

impl Expr {
    // Builders used by statement compilers and tests

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn qualified(source: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::qualified(source, name))
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    /// Plain `*` argument
    pub fn wildcard() -> Self {
        Expr::Wildcard {
            except: Vec::new(),
            replace: Vec::new(),
        }
    }

    pub fn wildcard_except(except: &[&str]) -> Self {
        Expr::Wildcard {
            except: except.iter().map(|name| name.to_string()).collect(),
            replace: Vec::new(),
        }
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn integer(value: i64) -> Self {
        Expr::Literal(LiteralValue::Integer(value))
    }

    pub fn float(value: f64) -> Self {
        Expr::Literal(LiteralValue::Float(value))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(LiteralValue::Boolean(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(LiteralValue::String(value.into()))
    }

    /// `self->key`
    pub fn arrow(self, key: impl Into<String>) -> Self {
        Expr::FieldAccess {
            expr: Box::new(self),
            key: key.into(),
        }
    }

    /// `self[index]`
    pub fn at(self, index: i64) -> Self {
        Expr::Index {
            expr: Box::new(self),
            index,
        }
    }

    /// `self[start:end]`
    pub fn slice(self, start: Option<i64>, end: Option<i64>) -> Self {
        Expr::Slice {
            expr: Box::new(self),
            start,
            end,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    /// Extract all column references from this expression
    pub fn get_columns(&self) -> Vec<ColumnRef> {
        let mut columns = Vec::new();
        self.visit(&mut |e| {
            if let Expr::Column(col) = e {
                columns.push(col.clone());
            }
        });
        columns
    }

    /// Names of every function called anywhere in this expression
    pub fn get_function_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.visit(&mut |e| {
            if let Expr::Function { name, .. } = e {
                names.push(name.clone());
            }
        });
        names
    }

    /// Pre-order walk over this expression and all sub-expressions.
    ///
    /// Alias references are not descended into; their expression belongs to
    /// the field that declared the alias.
    pub fn visit<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match self {
            Expr::Column(_) | Expr::AliasRef { .. } | Expr::Literal(_) => {}
            Expr::Wildcard { replace, .. } => {
                for (expr, _) in replace {
                    expr.visit(f);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::FieldAccess { expr, .. }
            | Expr::Index { expr, .. }
            | Expr::Slice { expr, .. } => expr.visit(f),
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(operand) = operand {
                    operand.visit(f);
                }
                for (condition, result) in when_clauses {
                    condition.visit(f);
                    result.visit(f);
                }
                if let Some(else_expr) = else_clause {
                    else_expr.visit(f);
                }
            }
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "'{}'", s),
            LiteralValue::Integer(i) => write!(f, "{}", i),
            LiteralValue::Float(v) => write!(f, "{}", v),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::Null => write!(f, "NULL"),
            LiteralValue::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Concat => "||",
        };
        write!(f, "{}", symbol)
    }
}

/// SQL-like rendering, used when reporting which field failed
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(col) => write!(f, "{}", col),
            Expr::AliasRef { alias, .. } => write!(f, "{}", alias),
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::BinaryOp { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => write!(f, "NOT {}", expr),
                UnaryOperator::Minus => write!(f, "-{}", expr),
                UnaryOperator::IsNull => write!(f, "{} IS NULL", expr),
                UnaryOperator::IsNotNull => write!(f, "{} IS NOT NULL", expr),
            },
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for (condition, result) in when_clauses {
                    write!(f, " WHEN {} THEN {}", condition, result)?;
                }
                if let Some(else_expr) = else_clause {
                    write!(f, " ELSE {}", else_expr)?;
                }
                write!(f, " END")
            }
            Expr::FieldAccess { expr, key } => write!(f, "{}->{}", expr, key),
            Expr::Index { expr, index } => write!(f, "{}[{}]", expr, index),
            Expr::Slice { expr, start, end } => {
                write!(f, "{}[", expr)?;
                if let Some(s) = start {
                    write!(f, "{}", s)?;
                }
                write!(f, ":")?;
                if let Some(e) = end {
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Expr::Wildcard { except, replace } => {
                write!(f, "*")?;
                if !except.is_empty() {
                    write!(f, " EXCEPT({})", except.join(", "))?;
                }
                if !replace.is_empty() {
                    let items: Vec<String> = replace
                        .iter()
                        .map(|(expr, name)| format!("{} AS {}", expr, name))
                        .collect();
                    write!(f, " REPLACE({})", items.join(", "))?;
                }
                Ok(())
            }
        }
    }
}
