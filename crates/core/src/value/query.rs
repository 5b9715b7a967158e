//! Query conditions behind `CMPISelectExp`
//!
//! There is no query grammar: conditions are built in Rust and carried in
//! disjunctive normal form (an OR of AND-ed predicates). The conjunctive form
//! handed out by `getCOD` is derived from it on demand.

use std::fmt;

use serde::Serialize;

use crate::datetime::CimDateTime;
use crate::sdk::*;
use crate::value::{Data, InstanceData, Value};

/// Predicate operator (`CMPIPredOp`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PredOp {
    Equals,
    NotEquals,
    LessThan,
    GreaterThanOrEquals,
    GreaterThan,
    LessThanOrEquals,
    Isa,
    NotIsa,
    Like,
    NotLike,
}

impl PredOp {
    pub const fn as_raw(self) -> CMPIPredOp {
        match self {
            PredOp::Equals => CMPI_PredOp_Equals,
            PredOp::NotEquals => CMPI_PredOp_NotEquals,
            PredOp::LessThan => CMPI_PredOp_LessThan,
            PredOp::GreaterThanOrEquals => CMPI_PredOp_GreaterThanOrEquals,
            PredOp::GreaterThan => CMPI_PredOp_GreaterThan,
            PredOp::LessThanOrEquals => CMPI_PredOp_LessThanOrEquals,
            PredOp::Isa => CMPI_PredOp_Isa,
            PredOp::NotIsa => CMPI_PredOp_NotIsa,
            PredOp::Like => CMPI_PredOp_Like,
            PredOp::NotLike => CMPI_PredOp_NotLike,
        }
    }

    pub const fn from_raw(op: CMPIPredOp) -> Option<Self> {
        Some(match op {
            CMPI_PredOp_Equals => PredOp::Equals,
            CMPI_PredOp_NotEquals => PredOp::NotEquals,
            CMPI_PredOp_LessThan => PredOp::LessThan,
            CMPI_PredOp_GreaterThanOrEquals => PredOp::GreaterThanOrEquals,
            CMPI_PredOp_GreaterThan => PredOp::GreaterThan,
            CMPI_PredOp_LessThanOrEquals => PredOp::LessThanOrEquals,
            CMPI_PredOp_Isa => PredOp::Isa,
            CMPI_PredOp_NotIsa => PredOp::NotIsa,
            CMPI_PredOp_Like => PredOp::Like,
            CMPI_PredOp_NotLike => PredOp::NotLike,
            _ => return None,
        })
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            PredOp::Equals => "=",
            PredOp::NotEquals => "<>",
            PredOp::LessThan => "<",
            PredOp::GreaterThanOrEquals => ">=",
            PredOp::GreaterThan => ">",
            PredOp::LessThanOrEquals => "<=",
            PredOp::Isa => "ISA",
            PredOp::NotIsa => "NOT ISA",
            PredOp::Like => "LIKE",
            PredOp::NotLike => "NOT LIKE",
        }
    }
}

/// Normal form of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CondForm {
    /// Disjunction of conjunctions
    Doc,
    /// Conjunction of disjunctions
    Cod,
}

impl CondForm {
    pub const fn as_raw(self) -> CMPISelectCondType {
        match self {
            CondForm::Doc => CMPI_COND_DOC,
            CondForm::Cod => CMPI_COND_COD,
        }
    }
}

/// `property op literal`
///
/// `ty` is one of the string subtypes (`CMPI_integerString`, ...) telling how
/// the literal is to be compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredicateData {
    pub property: String,
    pub op: PredOp,
    pub value: String,
    pub ty: CMPIType,
}

impl PredicateData {
    pub fn new(property: &str, op: PredOp, value: impl Into<String>, ty: CMPIType) -> Self {
        Self {
            property: property.to_string(),
            op,
            value: value.into(),
            ty,
        }
    }

    /// Evaluate against a property looked up by `get`
    ///
    /// A missing or null property never satisfies a predicate.
    pub fn evaluate_with(&self, get: &mut dyn FnMut(&str) -> Option<Data>) -> bool {
        let Some(value) = get(&self.property).and_then(Data::into_value) else {
            return false;
        };
        self.matches(&value)
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self.op {
            PredOp::Isa | PredOp::NotIsa => {
                let class = match value {
                    Value::Instance(i) => Some(i.class_name()),
                    Value::Ref(p) => Some(p.class_name.as_str()),
                    _ => None,
                };
                let isa = class
                    .map(|c| c.eq_ignore_ascii_case(&self.value))
                    .unwrap_or(false);
                isa == (self.op == PredOp::Isa)
            }
            PredOp::Like | PredOp::NotLike => {
                let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                like(&text, &self.value) == (self.op == PredOp::Like)
            }
            _ => match self.compare(value) {
                Some(ord) => match self.op {
                    PredOp::Equals => ord.is_eq(),
                    PredOp::NotEquals => ord.is_ne(),
                    PredOp::LessThan => ord.is_lt(),
                    PredOp::LessThanOrEquals => ord.is_le(),
                    PredOp::GreaterThan => ord.is_gt(),
                    PredOp::GreaterThanOrEquals => ord.is_ge(),
                    _ => false,
                },
                None => false,
            },
        }
    }

    /// Ordering of the property value relative to the literal
    fn compare(&self, value: &Value) -> Option<std::cmp::Ordering> {
        let literal = self.value.trim();
        match self.ty {
            CMPI_integerString => value.as_integer()?.partial_cmp(&literal.parse::<i128>().ok()?),
            CMPI_realString | CMPI_numericString => {
                value.as_f64()?.partial_cmp(&literal.parse::<f64>().ok()?)
            }
            CMPI_booleanString => {
                let rhs = if literal.eq_ignore_ascii_case("true") {
                    true
                } else if literal.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return None;
                };
                value.as_bool()?.partial_cmp(&rhs)
            }
            CMPI_dateTimeString => match value {
                Value::DateTime(dt) => {
                    let rhs = CimDateTime::parse(literal).ok()?;
                    dt.binary().partial_cmp(&rhs.binary())
                }
                _ => None,
            },
            _ => match value {
                Value::String(s) | Value::Chars(s) => Some(s.as_str().cmp(&self.value)),
                other => match (other.as_f64(), literal.parse::<f64>()) {
                    (Some(lhs), Ok(rhs)) => lhs.partial_cmp(&rhs),
                    _ => Some(other.to_string().cmp(&self.value)),
                },
            },
        }
    }
}

impl fmt::Display for PredicateData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            CMPI_charString | CMPI_dateTimeString => {
                write!(f, "{} {} '{}'", self.property, self.op.symbol(), self.value)
            }
            _ => write!(f, "{} {} {}", self.property, self.op.symbol(), self.value),
        }
    }
}

/// SQL `LIKE` with `%` (any run) and `_` (one character)
fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((bp, bt)) = backtrack {
            pi = bp + 1;
            ti = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}

/// A query expression: language, text and its condition in DOC form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectExpData {
    pub language: String,
    pub query: String,
    doc: Vec<Vec<PredicateData>>,
}

impl SelectExpData {
    /// Expression from DOC terms; an empty list matches everything
    pub fn new(language: &str, query: &str, doc: Vec<Vec<PredicateData>>) -> Self {
        Self {
            language: language.to_string(),
            query: query.to_string(),
            doc,
        }
    }

    /// Single conjunction, with the query text derived from it
    pub fn all_of(class_name: &str, predicates: Vec<PredicateData>) -> Self {
        let mut query = format!("SELECT * FROM {class_name}");
        if !predicates.is_empty() {
            query.push_str(" WHERE ");
            let terms: Vec<String> = predicates.iter().map(|p| p.to_string()).collect();
            query.push_str(&terms.join(" AND "));
        }
        Self::new("WQL", &query, vec![predicates])
    }

    pub fn doc(&self) -> &[Vec<PredicateData>] {
        &self.doc
    }

    /// CNF of the same condition, by distributing OR over AND
    pub fn cod(&self) -> Vec<Vec<PredicateData>> {
        if self.doc.iter().any(Vec::is_empty) {
            return Vec::new();
        }
        self.doc.iter().fold(vec![Vec::new()], |acc, conj| {
            acc.iter()
                .flat_map(|clause| {
                    conj.iter().map(move |p| {
                        let mut next = clause.clone();
                        next.push(p.clone());
                        next
                    })
                })
                .collect()
        })
    }

    pub fn condition(&self, form: CondForm) -> Vec<Vec<PredicateData>> {
        match form {
            CondForm::Doc => self.doc.clone(),
            CondForm::Cod => self.cod(),
        }
    }

    pub fn evaluate_with(&self, get: &mut dyn FnMut(&str) -> Option<Data>) -> bool {
        self.doc.is_empty()
            || self
                .doc
                .iter()
                .any(|conj| conj.iter().all(|p| p.evaluate_with(get)))
    }

    pub fn evaluate(&self, inst: &InstanceData) -> bool {
        self.evaluate_with(&mut |name| inst.property(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectPathData;

    fn sample() -> InstanceData {
        InstanceData::new(ObjectPathData::new("root/cimv2", "Sample_Fan"))
            .with_property("Name", "fan-1")
            .with_property("Speed", 1200u32)
            .with_property("Active", true)
            .with_property("Ratio", 0.5f64)
    }

    #[test]
    fn test_pred_op_values() {
        assert_eq!(PredOp::Equals.as_raw(), 1);
        assert_eq!(PredOp::NotLike.as_raw(), 10);
        assert_eq!(PredOp::from_raw(7), Some(PredOp::Isa));
        assert_eq!(PredOp::from_raw(0), None);
        assert_eq!(CondForm::Doc.as_raw(), 0);
        assert_eq!(CondForm::Cod.as_raw(), 1);
    }

    #[test]
    fn test_like() {
        assert!(like("fan-1", "fan%"));
        assert!(like("fan-1", "%-_"));
        assert!(like("abc", "%"));
        assert!(like("", "%"));
        assert!(!like("fan-1", "fan"));
        assert!(like("aXbXc", "a%c"));
        assert!(!like("ab", "a_c"));
    }

    #[test]
    fn test_typed_comparisons() {
        let inst = sample();
        let p = |prop: &str, op, v: &str, ty| PredicateData::new(prop, op, v, ty);
        let eval = |pr: PredicateData| SelectExpData::all_of("Sample_Fan", vec![pr]).evaluate(&inst);

        assert!(eval(p("Speed", PredOp::GreaterThan, "1000", CMPI_integerString)));
        assert!(!eval(p("Speed", PredOp::LessThan, "1000", CMPI_integerString)));
        assert!(eval(p("Ratio", PredOp::LessThanOrEquals, "0.5", CMPI_realString)));
        assert!(eval(p("Active", PredOp::Equals, "TRUE", CMPI_booleanString)));
        assert!(eval(p("Name", PredOp::Equals, "fan-1", CMPI_charString)));
        assert!(eval(p("Name", PredOp::Like, "fan%", CMPI_charString)));
        assert!(eval(p("Name", PredOp::NotLike, "pump%", CMPI_charString)));
        assert!(!eval(p("Missing", PredOp::NotEquals, "x", CMPI_charString)));
    }

    #[test]
    fn test_isa_on_embedded_instance() {
        let inner = InstanceData::new(ObjectPathData::new("ns", "CIM_Fan"));
        let inst = InstanceData::new(ObjectPathData::new("ns", "Alert"))
            .with_property("Source", inner);
        let isa = PredicateData::new("Source", PredOp::Isa, "cim_fan", CMPI_classNameString);
        let not_isa = PredicateData::new("Source", PredOp::NotIsa, "CIM_Pump", CMPI_classNameString);
        let exp = SelectExpData::new("WQL", "", vec![vec![isa, not_isa]]);
        assert!(exp.evaluate(&inst));
    }

    #[test]
    fn test_doc_is_or_of_ands() {
        let a = PredicateData::new("Speed", PredOp::GreaterThan, "5000", CMPI_integerString);
        let b = PredicateData::new("Name", PredOp::Equals, "fan-1", CMPI_charString);
        let exp = SelectExpData::new("WQL", "", vec![vec![a.clone()], vec![b.clone()]]);
        assert!(exp.evaluate(&sample()));
        let exp = SelectExpData::new("WQL", "", vec![vec![a, b]]);
        assert!(!exp.evaluate(&sample()));
        assert!(SelectExpData::new("WQL", "", Vec::new()).evaluate(&sample()));
    }

    #[test]
    fn test_cod_distribution() {
        let p = |n: &str| PredicateData::new(n, PredOp::Equals, "1", CMPI_integerString);
        // (A and B) or C  ==  (A or C) and (B or C)
        let exp = SelectExpData::new("WQL", "", vec![vec![p("A"), p("B")], vec![p("C")]]);
        let cod = exp.cod();
        let names: Vec<Vec<&str>> = cod
            .iter()
            .map(|d| d.iter().map(|p| p.property.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["A", "C"], vec!["B", "C"]]);
        assert_eq!(exp.condition(CondForm::Doc).len(), 2);
    }

    #[test]
    fn test_query_text() {
        let exp = SelectExpData::all_of(
            "Sample_Fan",
            vec![
                PredicateData::new("Speed", PredOp::GreaterThan, "10", CMPI_integerString),
                PredicateData::new("Name", PredOp::Equals, "x", CMPI_charString),
            ],
        );
        assert_eq!(exp.query, "SELECT * FROM Sample_Fan WHERE Speed > 10 AND Name = 'x'");
        assert_eq!(exp.language, "WQL");
    }
}
