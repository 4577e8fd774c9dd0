//! Tuple/list value tree of MI records.

use crate::mi::decode::escape;
use crate::mi::error::Error;
use crate::mi_debug;
use itertools::Itertools;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Const(String),
    List(TList),
}

impl Value {
    pub fn as_const(&self) -> Option<&str> {
        match self {
            Value::Const(s) => Some(s),
            Value::List(_) => None,
        }
    }

    pub fn as_tlist(&self) -> Option<&TList> {
        match self {
            Value::List(list) => Some(list),
            Value::Const(_) => None,
        }
    }

    /// Items of a list value, empty for constants.
    pub fn as_list(&self) -> &[Item] {
        match self {
            Value::List(list) => list.items(),
            Value::Const(_) => &[],
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Const(s) => write!(f, "\"{}\"", escape(s)),
            Value::List(list) => Display::fmt(list, f),
        }
    }
}

/// Named value: `name=value`.
#[derive(Debug, Clone, PartialEq)]
pub struct MiResult {
    pub name: String,
    pub value: Value,
}

impl MiResult {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Display for MiResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Result(MiResult),
    Value(Value),
}

impl Item {
    /// Return true if item is a result with exactly this name.
    pub fn matches(&self, name: &str) -> bool {
        matches!(self, Item::Result(r) if r.name == name)
    }

    pub fn as_result(&self) -> Option<&MiResult> {
        match self {
            Item::Result(r) => Some(r),
            Item::Value(_) => None,
        }
    }

    /// Value of the item, for results this is the value after `=`.
    pub fn value(&self) -> &Value {
        match self {
            Item::Result(r) => &r.value,
            Item::Value(v) => v,
        }
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::Result(r) => Display::fmt(r, f),
            Item::Value(v) => Display::fmt(v, f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `{...}`
    Brace,
    /// `[...]`
    Bracket,
    /// Record results, rendered without delimiters.
    TopLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ListKind {
    #[strum(serialize = "result list")]
    Results,
    #[strum(serialize = "value list")]
    Values,
}

/// Ordered list of either results or bare values, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct TList {
    delimiter: Delimiter,
    kind: Option<ListKind>,
    items: Vec<Item>,
}

impl TList {
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            kind: None,
            items: vec![],
        }
    }

    pub fn top_level() -> Self {
        Self::new(Delimiter::TopLevel)
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Item kind, `None` until the first item is added.
    pub fn kind(&self) -> Option<ListKind> {
        self.kind
    }

    fn commit(&mut self, kind: ListKind, adding: &'static str) -> Result<(), Error> {
        match self.kind {
            Some(current) if current != kind => Err(Error::MixedList {
                kind: current,
                adding,
            }),
            _ => {
                self.kind = Some(kind);
                Ok(())
            }
        }
    }

    pub fn add_result(&mut self, result: MiResult) -> Result<(), Error> {
        self.commit(ListKind::Results, "result")?;
        self.items.push(Item::Result(result));
        Ok(())
    }

    pub fn add_value(&mut self, value: Value) -> Result<(), Error> {
        self.commit(ListKind::Values, "value")?;
        self.items.push(Item::Value(value));
        Ok(())
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a value of the first result named `name`.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        if self.kind == Some(ListKind::Values) {
            mi_debug!("lookup of `{name}` in a value list");
            return None;
        }
        self.items.iter().find_map(|item| match item {
            Item::Result(r) if r.name == name => Some(&r.value),
            _ => None,
        })
    }

    /// Constant value of the first result named `name`, empty string if absent.
    pub fn get_const_value(&self, name: &str) -> &str {
        self.get_const_value_or(name, "")
    }

    pub fn get_const_value_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.value_of(name)
            .and_then(Value::as_const)
            .unwrap_or(default)
    }
}

impl Display for TList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let body = self.items.iter().join(",");
        match self.delimiter {
            Delimiter::Brace => write!(f, "{{{body}}}"),
            Delimiter::Bracket => write!(f, "[{body}]"),
            Delimiter::TopLevel => f.write_str(&body),
        }
    }
}

impl<'a> IntoIterator for &'a TList {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
