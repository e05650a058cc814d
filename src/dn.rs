//! Distinguished names (RFC 4514) and the compact encoding used for diffs.
//!
//! A [`Dn`] is an ordered list of RDNs, leftmost (most specific) first.
//! Each RDN holds one or more attribute/value pairs (multi-valued RDNs are
//! joined with `+` in string form).
//!
//! Attribute values are treated as UTF-8 text; hex escapes decoding to
//! non-UTF-8 bytes are replaced during parsing.

use crate::error::{DnErrorKind, Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// One attribute/value pair inside an RDN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdnComponent {
    /// Attribute description (keystring or numeric OID), as written.
    pub name: String,
    /// Attribute value with escapes resolved.
    pub value: String,
}

/// One relative distinguished name.
///
/// Almost always a single component; multi-valued RDNs use the inline
/// capacity of one and spill only in the rare `+` case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    components: SmallVec<[RdnComponent; 1]>,
}

impl Rdn {
    /// The attribute/value pairs, in written order.
    pub fn components(&self) -> &[RdnComponent] {
        &self.components
    }

    /// Whether this RDN has more than one attribute/value pair.
    pub fn is_multi_valued(&self) -> bool {
        self.components.len() > 1
    }

    /// Compact form: lowercased attribute names, components sorted, minimal
    /// escaping, no insignificant whitespace.
    fn write_compact(&self, out: &mut String) {
        let mut sorted: SmallVec<[&RdnComponent; 1]> = self.components.iter().collect();
        sorted.sort_by(|a, b| {
            let an = a.name.to_ascii_lowercase();
            let bn = b.name.to_ascii_lowercase();
            an.cmp(&bn).then_with(|| a.value.cmp(&b.value))
        });
        for (i, comp) in sorted.iter().enumerate() {
            if i > 0 {
                out.push('+');
            }
            for c in comp.name.chars() {
                out.push(c.to_ascii_lowercase());
            }
            out.push('=');
            escape_value_into(&comp.value, out);
        }
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, comp) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            let mut escaped = String::new();
            escape_value_into(&comp.value, &mut escaped);
            write!(f, "{}={}", comp.name, escaped)?;
        }
        Ok(())
    }
}

/// A distinguished name.
///
/// # Examples
///
/// ```
/// use async_ldap::Dn;
///
/// let dn = Dn::parse("uid=jdoe, ou=People, dc=example, dc=com").unwrap();
/// assert_eq!(dn.rdns().len(), 4);
/// assert_eq!(dn.to_string(), "uid=jdoe,ou=People,dc=example,dc=com");
///
/// let parent = dn.parent().unwrap();
/// assert_eq!(parent.to_string(), "ou=People,dc=example,dc=com");
/// assert!(dn.is_descendant_of(&parent));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The empty DN (root DSE).
    pub fn empty() -> Self {
        Self { rdns: Vec::new() }
    }

    /// Parse a DN from its RFC 4514 string form.
    ///
    /// Escape handling: `\` followed by a special character yields that
    /// character; `\XX` hex pairs yield the raw byte. Unescaped spaces
    /// around separators and at the ends of values are insignificant.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_ldap::Dn;
    ///
    /// let dn = Dn::parse(r"cn=Doe\, Jane,ou=People,dc=example,dc=com").unwrap();
    /// assert_eq!(dn.rdn().unwrap().components()[0].value, "Doe, Jane");
    ///
    /// // The empty string is the root DSE
    /// assert!(Dn::parse("").unwrap().is_empty());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        Parser::new(s).parse()
    }

    /// The RDNs, leftmost first.
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The leftmost (most specific) RDN, if any.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Number of RDNs.
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Whether this is the empty DN.
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The parent DN (all RDNs except the leftmost).
    ///
    /// Returns `None` for the empty DN; the parent of a single-RDN DN is
    /// the empty DN.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Dn {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// Whether this DN sits at or below `ancestor` in the tree.
    ///
    /// Comparison uses the compact form, so attribute-name case, optional
    /// spaces, and multi-valued RDN order do not matter. Every DN is a
    /// descendant of itself and of the empty DN.
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        if ancestor.rdns.len() > self.rdns.len() {
            return false;
        }
        let offset = self.rdns.len() - ancestor.rdns.len();
        self.rdns[offset..]
            .iter()
            .zip(ancestor.rdns.iter())
            .all(|(a, b)| {
                let mut ca = String::new();
                let mut cb = String::new();
                a.write_compact(&mut ca);
                b.write_compact(&mut cb);
                ca == cb
            })
    }

    /// Compact encoding used to key entries when diffing directory contents.
    ///
    /// Attribute names are lowercased, insignificant whitespace is removed,
    /// multi-valued RDN components are sorted, and escaping is minimal. Two
    /// DNs that name the same entry modulo case of attribute names, optional
    /// spaces, or RDN component order compact to identical strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_ldap::Dn;
    ///
    /// let a = Dn::parse("CN=jdoe+SN=Doe, DC=example, DC=com").unwrap();
    /// let b = Dn::parse("sn=Doe+cn=jdoe,dc=example,dc=com").unwrap();
    /// assert_eq!(a.compact(), b.compact());
    /// ```
    pub fn compact(&self) -> String {
        let mut out = String::with_capacity(64);
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            rdn.write_compact(&mut out);
        }
        out
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", rdn)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Dn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Dn::parse(s)
    }
}

/// Escape an attribute value per RFC 4514 Section 2.4.
fn escape_value_into(value: &str, out: &mut String) {
    let bytes = value.as_bytes();
    for (i, c) in value.char_indices() {
        let first = i == 0;
        let last = i + c.len_utf8() == bytes.len();
        match c {
            '\\' | '"' | '+' | ',' | ';' | '<' | '>' => {
                out.push('\\');
                out.push(c);
            }
            '#' | ' ' if first => {
                out.push('\\');
                out.push(c);
            }
            ' ' if last => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
        }
    }

    fn err(&self, kind: DnErrorKind) -> Error {
        Error::invalid_dn_with_input(kind, self.input)
    }

    fn parse(mut self) -> Result<Dn> {
        if self.input.chars().all(|c| c == ' ') {
            return Ok(Dn::empty());
        }

        let mut rdns = Vec::new();
        let mut components: SmallVec<[RdnComponent; 1]> = SmallVec::new();

        loop {
            let component = self.parse_component()?;
            components.push(component);

            match self.chars.next() {
                Some('+') => {}
                Some(',') => {
                    rdns.push(Rdn { components });
                    components = SmallVec::new();
                }
                None => {
                    rdns.push(Rdn { components });
                    return Ok(Dn { rdns });
                }
                Some(_) => unreachable!("parse_component stops only at separators"),
            }
        }
    }

    /// Parse one `attr=value`, leaving the separator (if any) unconsumed.
    fn parse_component(&mut self) -> Result<RdnComponent> {
        // Attribute description: no escapes permitted, spaces around it ignored
        while self.chars.peek() == Some(&' ') {
            self.chars.next();
        }

        let mut name = String::new();
        loop {
            match self.chars.peek() {
                Some('=') => {
                    self.chars.next();
                    break;
                }
                Some(' ') => {
                    self.chars.next();
                }
                Some(',') | Some('+') | None => {
                    return Err(self.err(if name.is_empty() {
                        DnErrorKind::EmptyRdn
                    } else {
                        DnErrorKind::MissingEquals
                    }));
                }
                Some(&c) if c.is_ascii_alphanumeric() || c == '.' || c == '-' => {
                    name.push(c);
                    self.chars.next();
                }
                Some(_) => return Err(self.err(DnErrorKind::InvalidAttributeName)),
            }
        }
        if name.is_empty() {
            return Err(self.err(DnErrorKind::EmptyAttributeName));
        }

        // Value: bytes plus per-byte escaped flags so trimming only removes
        // unescaped spaces
        let mut bytes: Vec<u8> = Vec::new();
        let mut escaped: Vec<bool> = Vec::new();

        while let Some(&c) = self.chars.peek() {
            match c {
                ',' | '+' => break,
                '\\' => {
                    self.chars.next();
                    let next = self.chars.next().ok_or_else(|| self.err(DnErrorKind::TrailingEscape))?;
                    if next.is_ascii_hexdigit() {
                        let second = self
                            .chars
                            .next()
                            .ok_or_else(|| self.err(DnErrorKind::TrailingEscape))?;
                        if !second.is_ascii_hexdigit() {
                            return Err(self.err(DnErrorKind::InvalidHexEscape));
                        }
                        let hi = next.to_digit(16).unwrap() as u8;
                        let lo = second.to_digit(16).unwrap() as u8;
                        bytes.push((hi << 4) | lo);
                        escaped.push(true);
                    } else {
                        // Escaped special; unknown escapes pass through as the
                        // literal character (lenient, matching deployed servers)
                        let mut utf8 = [0u8; 4];
                        for b in next.encode_utf8(&mut utf8).bytes() {
                            bytes.push(b);
                            escaped.push(true);
                        }
                    }
                }
                _ => {
                    self.chars.next();
                    let mut utf8 = [0u8; 4];
                    for b in c.encode_utf8(&mut utf8).bytes() {
                        bytes.push(b);
                        escaped.push(false);
                    }
                }
            }
        }

        // Trim unescaped spaces at both ends
        let mut start = 0;
        while start < bytes.len() && bytes[start] == b' ' && !escaped[start] {
            start += 1;
        }
        let mut end = bytes.len();
        while end > start && bytes[end - 1] == b' ' && !escaped[end - 1] {
            end -= 1;
        }

        let value = String::from_utf8_lossy(&bytes[start..end]).into_owned();
        Ok(RdnComponent { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let dn = Dn::parse("dc=example,dc=com").unwrap();
        assert_eq!(dn.len(), 2);
        assert_eq!(dn.rdns()[0].components()[0].name, "dc");
        assert_eq!(dn.rdns()[0].components()[0].value, "example");
        assert_eq!(dn.to_string(), "dc=example,dc=com");
    }

    #[test]
    fn parse_insignificant_spaces() {
        let dn = Dn::parse("  uid = jdoe , ou = People , dc = example , dc = com  ").unwrap();
        assert_eq!(dn.to_string(), "uid=jdoe,ou=People,dc=example,dc=com");
    }

    #[test]
    fn parse_escaped_comma() {
        let dn = Dn::parse(r"cn=Doe\, Jane,ou=People").unwrap();
        assert_eq!(dn.rdn().unwrap().components()[0].value, "Doe, Jane");
        // Display re-escapes
        assert_eq!(dn.to_string(), r"cn=Doe\, Jane,ou=People");
    }

    #[test]
    fn parse_hex_escape() {
        let dn = Dn::parse(r"cn=caf\c3\a9").unwrap();
        assert_eq!(dn.rdn().unwrap().components()[0].value, "café");
    }

    #[test]
    fn parse_escaped_trailing_space_preserved() {
        let dn = Dn::parse(r"cn=trailing\ ").unwrap();
        assert_eq!(dn.rdn().unwrap().components()[0].value, "trailing ");
        assert_eq!(dn.to_string(), r"cn=trailing\ ");
    }

    #[test]
    fn parse_multi_valued_rdn() {
        let dn = Dn::parse("cn=jdoe+sn=Doe,dc=example,dc=com").unwrap();
        assert!(dn.rdn().unwrap().is_multi_valued());
        assert_eq!(dn.rdn().unwrap().components().len(), 2);
    }

    #[test]
    fn parse_empty_value_allowed() {
        let dn = Dn::parse("cn=,dc=example").unwrap();
        assert_eq!(dn.rdn().unwrap().components()[0].value, "");
    }

    #[test]
    fn parse_empty_is_root_dse() {
        assert!(Dn::parse("").unwrap().is_empty());
        assert!(Dn::parse("   ").unwrap().is_empty());
        assert_eq!(Dn::empty().to_string(), "");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Dn::parse("cn").unwrap_err(),
            Error::InvalidDn { kind: DnErrorKind::MissingEquals, .. }
        ));
        assert!(matches!(
            Dn::parse("=value").unwrap_err(),
            Error::InvalidDn { kind: DnErrorKind::EmptyAttributeName, .. }
        ));
        assert!(matches!(
            Dn::parse("cn=a,,cn=b").unwrap_err(),
            Error::InvalidDn { kind: DnErrorKind::EmptyRdn, .. }
        ));
        assert!(matches!(
            Dn::parse(r"cn=x\").unwrap_err(),
            Error::InvalidDn { kind: DnErrorKind::TrailingEscape, .. }
        ));
        assert!(matches!(
            Dn::parse(r"cn=x\4z").unwrap_err(),
            Error::InvalidDn { kind: DnErrorKind::InvalidHexEscape, .. }
        ));
        assert!(matches!(
            Dn::parse("c!n=x").unwrap_err(),
            Error::InvalidDn { kind: DnErrorKind::InvalidAttributeName, .. }
        ));
    }

    #[test]
    fn parent_chain() {
        let dn = Dn::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        let parent = dn.parent().unwrap();
        assert_eq!(parent.to_string(), "ou=People,dc=example,dc=com");

        let top = Dn::parse("dc=com").unwrap();
        assert!(top.parent().unwrap().is_empty());
        assert!(Dn::empty().parent().is_none());
    }

    #[test]
    fn descendant_of() {
        let entry = Dn::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        let base = Dn::parse("DC=Example, DC=COM").unwrap();
        let other = Dn::parse("dc=other,dc=com").unwrap();

        assert!(entry.is_descendant_of(&base));
        assert!(entry.is_descendant_of(&entry));
        assert!(entry.is_descendant_of(&Dn::empty()));
        assert!(!entry.is_descendant_of(&other));
        assert!(!base.is_descendant_of(&entry));
    }

    #[test]
    fn compact_normalizes_case_and_spaces() {
        let a = Dn::parse("UID=jdoe, OU=People, DC=example, DC=com").unwrap();
        let b = Dn::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(a.compact(), b.compact());
        assert_eq!(a.compact(), "uid=jdoe,ou=People,dc=example,dc=com");
    }

    #[test]
    fn compact_sorts_multi_valued_components() {
        let a = Dn::parse("cn=jdoe+sn=Doe,dc=example").unwrap();
        let b = Dn::parse("SN=Doe+CN=jdoe,dc=example").unwrap();
        assert_eq!(a.compact(), b.compact());
        assert_eq!(a.compact(), "cn=jdoe+sn=Doe,dc=example");
    }

    #[test]
    fn compact_preserves_value_case() {
        // Values keep their case; only attribute names fold
        let dn = Dn::parse("CN=JDoe,DC=Example").unwrap();
        assert_eq!(dn.compact(), "cn=JDoe,dc=Example");
    }

    #[test]
    fn compact_roundtrips_through_parse() {
        let dn = Dn::parse(r"CN=Doe\, Jane + SN=Doe , DC=example").unwrap();
        let compacted = Dn::parse(&dn.compact()).unwrap();
        assert_eq!(compacted.compact(), dn.compact());
    }
}
