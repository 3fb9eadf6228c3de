//! Well-Formedness Checks
//!
//! quick-xml tokenizes leniently. These are the XML 1.0 constraints it does
//! not enforce itself; `document::parse` applies them to every token.

/// Name production (XML 1.0 5th ed. §2.3).
pub fn check_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) => {}
        Some(c) => return Err(format!("invalid name {:?}: cannot start with {:?}", name, c)),
        None => return Err("empty name".to_string()),
    }
    match chars.find(|c| !is_name_char(*c)) {
        Some(c) => Err(format!("invalid name {:?}: {:?} not allowed", name, c)),
        None => Ok(()),
    }
}

/// Raw (still escaped) attribute value.
pub fn check_attribute_value(raw: &str) -> Result<(), String> {
    if raw.contains('<') {
        return Err("'<' not allowed in attribute value".to_string());
    }
    check_chars(raw)
}

/// Raw (still escaped) character data.
pub fn check_text(raw: &str) -> Result<(), String> {
    if raw.contains("]]>") {
        return Err("']]>' not allowed in character data".to_string());
    }
    check_chars(raw)
}

pub fn check_comment(content: &str) -> Result<(), String> {
    if content.contains("--") || content.ends_with('-') {
        return Err("'--' not allowed in comment".to_string());
    }
    check_chars(content)
}

/// Content between `<?` and `?>`. Targets named `xml` in any case are
/// reserved; a real declaration is only seen at the very start.
pub fn check_processing_instruction(content: &str) -> Result<(), String> {
    let target = content
        .split(|c: char| c.is_ascii_whitespace())
        .next()
        .unwrap_or_default();
    if target.eq_ignore_ascii_case("xml") {
        return Err("XML declaration only allowed at the start of the document".to_string());
    }
    check_name(target)?;
    check_chars(content)
}

/// Char production (§2.2).
pub fn check_chars(s: &str) -> Result<(), String> {
    match s.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(format!("character U+{:04X} not allowed", c as u32)),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}
