//! Lossless model of a `Key=Value` settings file
//!
//! Every line is kept verbatim, including its terminator, so that serializing
//! an untouched document reproduces the input byte for byte. Only lines whose
//! value is actually changed get rebuilt; comments, section headers and
//! anything the grammar does not recognize pass through as opaque entries.

use std::fmt;

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Pair {
        key: String,
        value: String,
        raw_line: String,
    },
    /// Comments, blank lines, `[Section]` headers, unrecognized syntax
    Opaque { raw_line: String },
}

impl Entry {
    pub fn raw_line(&self) -> &str {
        match self {
            Entry::Pair { raw_line, .. } | Entry::Opaque { raw_line } => raw_line,
        }
    }

    fn raw_line_mut(&mut self) -> &mut String {
        match self {
            Entry::Pair { raw_line, .. } | Entry::Opaque { raw_line } => raw_line,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    entries: Vec<Entry>,
}

impl ConfigDocument {
    /// Parse text into entries. Never fails: unmatched lines become opaque.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .split_inclusive('\n')
            .map(|line| {
                let (body, _) = split_terminator(line);
                match parse_pair(body) {
                    Some((key, value, _)) => Entry::Pair {
                        key: key.to_string(),
                        value: value.to_string(),
                        raw_line: line.to_string(),
                    },
                    None => Entry::Opaque {
                        raw_line: line.to_string(),
                    },
                }
            })
            .collect();
        Self { entries }
    }

    pub fn serialize(&self) -> String {
        self.entries.iter().map(Entry::raw_line).collect()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of recognized `Key=Value` lines
    pub fn pair_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Pair { .. }))
            .count()
    }

    /// Value of the first pair whose key matches case-insensitively
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Pair { key: k, value, .. } if k.eq_ignore_ascii_case(key) => Some(value.as_str()),
            _ => None,
        })
    }

    /// Values of every pair whose key matches, in file order
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.iter().filter_map(move |entry| match entry {
            Entry::Pair { key: k, value, .. } if k.eq_ignore_ascii_case(key) => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Return a copy with every pair named `key` set to `value`
    ///
    /// Pairs already holding `value` keep their raw line untouched. A key
    /// that is not present is appended as a new line at the end.
    pub fn with_set_value(&self, key: &str, value: &str) -> Self {
        let mut entries = self.entries.clone();
        let mut found = false;

        for entry in entries.iter_mut() {
            if let Entry::Pair {
                key: k,
                value: v,
                raw_line,
            } = entry
            {
                if !k.eq_ignore_ascii_case(key) {
                    continue;
                }
                found = true;
                if v == value {
                    continue;
                }
                *raw_line = rebuild_line(raw_line, k, value);
                *v = value.to_string();
            }
        }

        if !found {
            let eol = self.line_ending();
            if let Some(last) = entries.last_mut() {
                if !last.raw_line().ends_with('\n') {
                    last.raw_line_mut().push_str(eol);
                }
            }
            entries.push(Entry::Pair {
                key: key.to_string(),
                value: value.to_string(),
                raw_line: format!("{key}={value}{eol}"),
            });
        }

        Self { entries }
    }

    /// Most common line terminator, `\n` if there is none
    ///
    /// A tie goes to whichever terminator appears first.
    fn line_ending(&self) -> &'static str {
        let mut crlf = 0usize;
        let mut lf = 0usize;
        let mut first = "\n";
        for line in self.entries.iter().map(Entry::raw_line) {
            let eol = if line.ends_with("\r\n") {
                crlf += 1;
                "\r\n"
            } else if line.ends_with('\n') {
                lf += 1;
                "\n"
            } else {
                continue;
            };
            if crlf + lf == 1 {
                first = eol;
            }
        }
        match crlf.cmp(&lf) {
            std::cmp::Ordering::Greater => "\r\n",
            std::cmp::Ordering::Less => "\n",
            std::cmp::Ordering::Equal => first,
        }
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            f.write_str(entry.raw_line())?;
        }
        Ok(())
    }
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Match `<ws>Key<ws>=<ws>Value<ws>`, returning key, value and the byte
/// offset of the key within `body`
fn parse_pair(body: &str) -> Option<(&str, &str, usize)> {
    let unmarked = body.strip_prefix(BOM).unwrap_or(body);
    let trimmed = unmarked.trim_start();
    let offset = body.len() - trimmed.len();

    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim_end();
    if key.is_empty() || !key.chars().all(is_key_char) {
        return None;
    }
    Some((key, value.trim(), offset))
}

/// Rewrite a pair line with a new value, keeping indentation, key casing and terminator
fn rebuild_line(raw_line: &str, key: &str, value: &str) -> String {
    let (body, eol) = split_terminator(raw_line);
    let offset = parse_pair(body).map(|(_, _, offset)| offset).unwrap_or(0);
    format!("{}{key}={value}{eol}", &body[..offset])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "[/Script/ShooterGame.ShooterGameUserSettings]\r\n",
        "; keep me\r\n",
        "ResolutionSizeX=2560\r\n",
        "  ResolutionSizeY = 1440\r\n",
        "+EnabledPlugins=Foo\r\n",
        "\r\n",
        "FullscreenMode=0",
    );

    #[test]
    fn test_roundtrip_is_byte_identical() {
        for text in [SAMPLE, "", "\n", "a=b", "no equals here\n", "=value\n", "x=1\n\n\n"] {
            assert_eq!(ConfigDocument::parse(text).serialize(), text);
        }
    }

    #[test]
    fn test_garbage_becomes_opaque() {
        let text = "\u{0}\u{1}binary junk\n{not: ini}\n";
        let doc = ConfigDocument::parse(text);
        assert_eq!(doc.pair_count(), 0);
        assert_eq!(doc.serialize(), text);
    }

    #[test]
    fn test_parse_classifies_lines() {
        let doc = ConfigDocument::parse(SAMPLE);
        assert_eq!(doc.entries().len(), 7);
        assert_eq!(doc.pair_count(), 3);
        assert!(matches!(doc.entries()[0], Entry::Opaque { .. }));
        assert!(matches!(doc.entries()[4], Entry::Opaque { .. }));
    }

    #[test]
    fn test_get_value_is_case_insensitive_and_trimmed() {
        let doc = ConfigDocument::parse(SAMPLE);
        assert_eq!(doc.get_value("resolutionsizex"), Some("2560"));
        assert_eq!(doc.get_value("ResolutionSizeY"), Some("1440"));
        assert_eq!(doc.get_value("FullscreenMode"), Some("0"));
        assert_eq!(doc.get_value("Missing"), None);
    }

    #[test]
    fn test_with_set_value_does_not_mutate_original() {
        let doc = ConfigDocument::parse(SAMPLE);
        let patched = doc.with_set_value("ResolutionSizeX", "1280");
        assert_eq!(doc.serialize(), SAMPLE);
        assert_eq!(patched.get_value("ResolutionSizeX"), Some("1280"));
    }

    #[test]
    fn test_with_set_value_keeps_indent_casing_and_terminator() {
        let doc = ConfigDocument::parse(SAMPLE);
        let patched = doc.with_set_value("resolutionsizey", "1024");
        let expected = SAMPLE.replace("  ResolutionSizeY = 1440\r\n", "  ResolutionSizeY=1024\r\n");
        assert_eq!(patched.serialize(), expected);
    }

    #[test]
    fn test_with_set_value_same_value_is_identity() {
        let text = "Key = Value \n";
        let doc = ConfigDocument::parse(text);
        assert_eq!(doc.with_set_value("key", "Value"), doc);
        assert_eq!(doc.with_set_value("key", "Value").serialize(), text);
    }

    #[test]
    fn test_with_set_value_appends_missing_key() {
        let doc = ConfigDocument::parse(SAMPLE);
        let patched = doc.with_set_value("bUseHDRDisplayOutput", "False");
        let expected = format!("{SAMPLE}\r\nbUseHDRDisplayOutput=False\r\n");
        assert_eq!(patched.serialize(), expected);
    }

    #[test]
    fn test_append_to_empty_document() {
        let doc = ConfigDocument::parse("");
        assert_eq!(doc.with_set_value("A", "1").serialize(), "A=1\n");
    }

    #[test]
    fn test_with_set_value_rewrites_duplicates() {
        let doc = ConfigDocument::parse("[A]\nX=1\n[B]\nX=2\n");
        let patched = doc.with_set_value("X", "9");
        assert_eq!(patched.serialize(), "[A]\nX=9\n[B]\nX=9\n");
    }

    #[test]
    fn test_values_lists_every_match() {
        let doc = ConfigDocument::parse("[A]\nHDR=Off\n[B]\nhdr = On\n");
        assert_eq!(doc.values("HDR").collect::<Vec<_>>(), vec!["Off", "On"]);
        assert_eq!(doc.values("Missing").count(), 0);
    }

    #[test]
    fn test_append_uses_dominant_line_ending() {
        // one LF line ahead of two CRLF lines
        let doc = ConfigDocument::parse("[Header]\nA=1\r\nB=2\r\n");
        assert_eq!(doc.with_set_value("C", "3").serialize(), "[Header]\nA=1\r\nB=2\r\nC=3\r\n");

        let doc = ConfigDocument::parse("A=1\r\nB=2\nC=3\n");
        assert_eq!(doc.with_set_value("D", "4").serialize(), "A=1\r\nB=2\nC=3\nD=4\n");
    }

    #[test]
    fn test_append_tie_uses_first_line_ending() {
        let doc = ConfigDocument::parse("A=1\r\nB=2\n");
        assert_eq!(doc.with_set_value("C", "3").serialize(), "A=1\r\nB=2\nC=3\r\n");
    }

    #[test]
    fn test_bom_preserved_on_first_line() {
        let text = "\u{feff}Width=2560\nHeight=1440\n";
        let doc = ConfigDocument::parse(text);
        assert_eq!(doc.get_value("Width"), Some("2560"));
        assert_eq!(doc.serialize(), text);

        let patched = doc.with_set_value("Width", "1280");
        assert_eq!(patched.serialize(), "\u{feff}Width=1280\nHeight=1440\n");
    }

    #[test]
    fn test_dotted_keys_are_pairs() {
        let doc = ConfigDocument::parse("Resolution.Width=2560\n");
        assert_eq!(doc.get_value("Resolution.Width"), Some("2560"));
    }
}
