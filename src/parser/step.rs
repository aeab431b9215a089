use std::collections::HashMap;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    /// Upper-case STEP type name, e.g. `IFCWALL`.
    pub entity_type: String,
    pub values: Vec<StepValue>,
}

impl StepEntity {
    /// Non-empty string attribute at `index`.
    #[must_use]
    pub fn string(&self, index: usize) -> Option<&str> {
        self.values
            .get(index)
            .and_then(StepValue::as_str)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn reference(&self, index: usize) -> Option<u64> {
        self.values.get(index).and_then(StepValue::as_reference)
    }

    /// References in a list attribute; anything else yields nothing.
    #[must_use]
    pub fn references(&self, index: usize) -> Vec<u64> {
        match self.values.get(index) {
            Some(StepValue::List(items)) => {
                items.iter().filter_map(StepValue::as_reference).collect()
            }
            Some(StepValue::Reference(id)) => vec![*id],
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn enum_value(&self, index: usize) -> Option<&str> {
        match self.values.get(index) {
            Some(StepValue::Enum(e)) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct StepFile {
    pub entities: HashMap<u64, StepEntity>,
    pub schema: String,
    /// Instance numbers in file order.
    order: Vec<u64>,
    by_type: HashMap<String, Vec<u64>>,
}

impl StepFile {
    /// Parse a STEP physical file. Statements may span lines; comments are
    /// dropped. Entity instances that cannot be decoded are skipped.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let statements = split_statements(content);

        match statements.first() {
            Some(first) if first.starts_with("ISO-10303-21") => {}
            _ => {
                return Err(ParseError::InvalidStep {
                    message: "missing ISO-10303-21 header".to_string(),
                })
            }
        }

        let mut file = StepFile::default();
        let mut in_data = false;
        let mut saw_data = false;
        let mut skipped = 0usize;

        for statement in &statements {
            if statement.starts_with("FILE_SCHEMA") {
                file.schema = parse_schema(statement).unwrap_or_default();
                continue;
            }
            if statement == "DATA" {
                in_data = true;
                saw_data = true;
                continue;
            }
            if statement == "ENDSEC" {
                in_data = false;
                continue;
            }
            if in_data && statement.starts_with('#') {
                match parse_entity(statement) {
                    Some(entity) => file.insert(entity),
                    None => skipped += 1,
                }
            }
        }

        if !saw_data {
            return Err(ParseError::InvalidStep {
                message: "no DATA section".to_string(),
            });
        }
        if skipped > 0 {
            tracing::warn!(skipped, "Skipped undecodable STEP instances");
        }
        tracing::debug!(
            entities = file.entities.len(),
            schema = %file.schema,
            "Parsed STEP file"
        );

        Ok(file)
    }

    fn insert(&mut self, entity: StepEntity) {
        if self.entities.contains_key(&entity.id) {
            tracing::warn!(id = entity.id, "Duplicate STEP instance number, keeping the first");
            return;
        }
        self.order.push(entity.id);
        self.by_type
            .entry(entity.entity_type.clone())
            .or_default()
            .push(entity.id);
        self.entities.insert(entity.id, entity);
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Instances of an upper-case STEP type, in file order.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.by_type
            .get(entity_type)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// All instances in file order.
    pub fn iter(&self) -> impl Iterator<Item = &StepEntity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }
}

/// Split the file into `;`-terminated statements, ignoring `;` inside
/// strings and dropping `/* ... */` comments.
fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '/' if !in_string && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ';' if !in_string => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            '\r' | '\n' if !in_string => {}
            _ => current.push(ch),
        }
    }

    statements
}

fn parse_schema(statement: &str) -> Option<String> {
    let start = statement.find('\'')? + 1;
    let end = statement[start..].find('\'')? + start;
    Some(statement[start..end].to_string())
}

fn parse_entity(statement: &str) -> Option<StepEntity> {
    // Format: #123=IFCWALL('guid',#ref,'name',...)
    let eq_pos = statement.find('=')?;
    let id: u64 = statement[1..eq_pos].trim().parse().ok()?;

    let rest = statement[eq_pos + 1..].trim();
    let paren_pos = rest.find('(')?;
    let close_pos = rest.rfind(')')?;
    if close_pos < paren_pos {
        return None;
    }
    let entity_type = rest[..paren_pos].trim().to_ascii_uppercase();
    if entity_type.is_empty() {
        return None;
    }

    Some(StepEntity {
        id,
        entity_type,
        values: parse_values(&rest[paren_pos + 1..close_pos]),
    })
}

fn parse_values(s: &str) -> Vec<StepValue> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut paren_depth = 0i32;

    for ch in s.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '(' if !in_string => {
                paren_depth += 1;
                current.push(ch);
            }
            ')' if !in_string => {
                paren_depth -= 1;
                current.push(ch);
            }
            ',' if !in_string && paren_depth == 0 => {
                values.push(parse_single_value(current.trim()));
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        values.push(parse_single_value(current.trim()));
    }

    values
}

fn parse_single_value(s: &str) -> StepValue {
    let s = s.trim();

    if s == "$" {
        return StepValue::Null;
    }
    if s == "*" {
        return StepValue::Derived;
    }
    if let Some(stripped) = s.strip_prefix('#') {
        if let Ok(id) = stripped.parse::<u64>() {
            return StepValue::Reference(id);
        }
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return StepValue::String(decode_step_string(&s[1..s.len() - 1]));
    }
    if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
        return match &s[1..s.len() - 1] {
            "T" => StepValue::Boolean(true),
            "F" => StepValue::Boolean(false),
            inner => StepValue::Enum(inner.to_string()),
        };
    }
    if s.starts_with('(') && s.ends_with(')') {
        return StepValue::List(parse_values(&s[1..s.len() - 1]));
    }
    if let Ok(i) = s.parse::<i64>() {
        return StepValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return StepValue::Real(f);
    }
    // Typed value like IFCBOOLEAN(.T.) or IFCLABEL('x')
    if let Some(paren_pos) = s.find('(') {
        if s.ends_with(')') {
            return parse_single_value(&s[paren_pos + 1..s.len() - 1]);
        }
    }

    StepValue::String(s.to_string())
}

/// Decode the STEP string escapes:
/// `''` (apostrophe), `\\` (backslash), `\X\hh` (ISO 8859-1),
/// `\X2\hhhh…\X0\` (UCS-2), `\X4\hhhhhhhh…\X0\` (UCS-4) and `\S\c` (high half).
fn decode_step_string(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(ch) = rest.chars().next() {
        if ch == '\'' {
            result.push('\'');
            rest = rest.strip_prefix("''").unwrap_or(&rest[1..]);
        } else if let Some(tail) = rest.strip_prefix("\\\\") {
            result.push('\\');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("\\X2\\") {
            rest = decode_wide(tail, 4, &mut result);
        } else if let Some(tail) = rest.strip_prefix("\\X4\\") {
            rest = decode_wide(tail, 8, &mut result);
        } else if let Some(tail) = rest.strip_prefix("\\X\\") {
            let hex = tail.get(..2).unwrap_or(tail);
            if let Ok(code) = u8::from_str_radix(hex, 16) {
                result.push(char::from(code));
            }
            rest = &tail[hex.len()..];
        } else if let Some(tail) = rest.strip_prefix("\\S\\") {
            let mut tail_chars = tail.chars();
            if let Some(c) = tail_chars.next() {
                if let Some(shifted) = char::from_u32(u32::from(c) + 128) {
                    result.push(shifted);
                }
            }
            rest = tail_chars.as_str();
        } else {
            result.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    result
}

/// Decode hex code points of `width` digits up to the `\X0\` terminator and
/// return what follows it.
fn decode_wide<'a>(s: &'a str, width: usize, out: &mut String) -> &'a str {
    let end = s.find("\\X0\\").unwrap_or(s.len());
    for chunk in s[..end].as_bytes().chunks(width) {
        let code = std::str::from_utf8(chunk)
            .ok()
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        if let Some(c) = code {
            out.push(c);
        }
    }
    s.get(end + 4..).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n";

    fn parse(data: &str) -> StepFile {
        StepFile::parse(&format!("{HEADER}{data}\nENDSEC;\nEND-ISO-10303-21;\n")).unwrap()
    }

    #[test]
    fn reads_schema_and_entities_in_file_order() {
        let file = parse("#3=IFCWALL('a',$,'W1',$,$,$,$,$,.STANDARD.);\n#1=IFCWALL('b',$,'W2',$,$,$,$,$,$);");
        assert_eq!(file.schema, "IFC4");
        let ids: Vec<u64> = file.get_entities_by_type("IFCWALL").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(file.get_entity(3).unwrap().enum_value(8), Some("STANDARD"));
    }

    #[test]
    fn statements_may_span_lines_and_contain_semicolons_in_strings() {
        let file = parse("#1=IFCPROPERTYSINGLEVALUE('Note',$,\n IFCTEXT('a;b'),$);");
        let entity = file.get_entity(1).unwrap();
        assert_eq!(entity.values[2], StepValue::String("a;b".to_string()));
    }

    #[test]
    fn comments_are_ignored() {
        let file = parse("/* walls */ #1=IFCWALL('a',$,'W',$,$,$,$,$,$);");
        assert_eq!(file.entities.len(), 1);
    }

    #[test]
    fn decodes_typed_values_and_lists() {
        let file = parse("#1=IFCX(IFCBOOLEAN(.F.),(#2,#3),IFCREAL(2.5),.U.,*,'it''s');");
        let values = &file.get_entity(1).unwrap().values;
        assert_eq!(values[0], StepValue::Boolean(false));
        assert_eq!(
            values[1],
            StepValue::List(vec![StepValue::Reference(2), StepValue::Reference(3)])
        );
        assert_eq!(values[2], StepValue::Real(2.5));
        assert_eq!(values[3], StepValue::Enum("U".to_string()));
        assert_eq!(values[4], StepValue::Derived);
        assert_eq!(values[5], StepValue::String("it's".to_string()));
    }

    #[test]
    fn strings_with_parentheses_inside_lists() {
        let file = parse("#1=IFCX(('a(1)','b'),$);");
        assert_eq!(
            file.get_entity(1).unwrap().values[0],
            StepValue::List(vec![
                StepValue::String("a(1)".to_string()),
                StepValue::String("b".to_string())
            ])
        );
    }

    #[test]
    fn decodes_unicode_escapes() {
        assert_eq!(decode_step_string("Bet\\X2\\00E3\\X0\\o"), "Betão");
        assert_eq!(decode_step_string("N\\X\\EDvel"), "Nível");
        assert_eq!(decode_step_string("a\\\\b"), "a\\b");
    }

    #[test]
    fn rejects_non_step_content() {
        assert!(matches!(
            StepFile::parse("hello world"),
            Err(ParseError::InvalidStep { .. })
        ));
        assert!(matches!(
            StepFile::parse("ISO-10303-21;\nHEADER;\nENDSEC;\nEND-ISO-10303-21;"),
            Err(ParseError::InvalidStep { .. })
        ));
    }
}
