use std::fmt;

use serde::{Deserialize, Serialize};

use crate::quote_identifier;

/// A table name in canonical form, optionally qualified by a schema.
///
/// `places`, `` `places` ``, `"places"` and ` places ` all name the same table, so they all
/// normalize to the same `TableName` and hit the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

/// Split `raw` on dots that are not inside quotes, removing quotes and surrounding whitespace
/// from each part.
fn identifier_parts(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut chars = raw.trim().chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut part = String::new();
        match chars.peek().copied() {
            Some(quote @ ('`' | '"')) => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == quote {
                        // A doubled quote is a literal quote character
                        if chars.next_if_eq(&quote).is_none() {
                            break;
                        }
                    }
                    part.push(c);
                }
                while chars.next_if(|c| *c != '.').is_some() {}
            }
            _ => {
                while let Some(c) = chars.next_if(|c| *c != '.') {
                    part.push(c);
                }
                part.truncate(part.trim_end().len());
            }
        }
        parts.push(part);
        if chars.next().is_none() {
            return parts;
        }
    }
}

impl TableName {
    pub fn new(raw: &str) -> Self {
        let mut parts = identifier_parts(raw);
        let name = parts.pop().unwrap_or_default();
        let schema = parts.pop().filter(|schema| !schema.is_empty());
        Self { schema, name }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name as SQL, with every part quoted.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        f.write_str(&self.name)
    }
}

impl From<&str> for TableName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TableName {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&TableName> for TableName {
    fn from(name: &TableName) -> Self {
        name.clone()
    }
}
