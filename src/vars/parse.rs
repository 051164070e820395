//! Line scanner for environment dump files.
//!
//! This is not a shell parser. Each line either looks like a single
//! `NAME=VALUE` assignment or it is skipped, which silently drops comments,
//! continuation lines and multi-line constructs.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;

static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9\-_+./~]+)=(.*)").expect("valid assignment regex"));

/// Parse one line into a `(name, value)` pair.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    if !line.contains('=') {
        return None;
    }
    let caps = ASSIGNMENT.captures(line)?;
    let name = caps.get(1)?.as_str();
    let value = caps.get(2)?.as_str();
    Some((name, strip_quotes(value)))
}

/// Remove at most one pair of enclosing double quotes.
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Scan a reader and insert every assignment into `vars`.
///
/// Later assignments of the same name win. Bytes that are not UTF-8 are
/// replaced, so one bad line does not hide the rest of the file.
pub fn parse_into<R: BufRead>(reader: R, vars: &mut HashMap<String, String>) -> std::io::Result<()> {
    for line in reader.split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        if let Some((name, value)) = parse_line(&line) {
            vars.insert(name.to_string(), value.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_assignment() {
        assert_eq!(parse_line("TARGET_SYS=x86_64-poky-linux"), Some(("TARGET_SYS", "x86_64-poky-linux")));
    }

    #[test]
    fn test_strips_one_layer_of_quotes() {
        assert_eq!(parse_line(r#"IMAGE_ROOTFS="/tmp/rootfs""#), Some(("IMAGE_ROOTFS", "/tmp/rootfs")));
        assert_eq!(parse_line(r#"X=""nested"""#), Some(("X", r#""nested""#)));
        assert_eq!(parse_line(r#"X="unbalanced"#), Some(("X", r#""unbalanced"#)));
        assert_eq!(parse_line(r#"X="""#), Some(("X", "")));
    }

    #[test]
    fn test_value_keeps_extra_equals() {
        assert_eq!(parse_line("OPTS=a=b c=d"), Some(("OPTS", "a=b c=d")));
    }

    #[test]
    fn test_name_charset() {
        assert_eq!(parse_line("a.b/c~d+e-f_g=1"), Some(("a.b/c~d+e-f_g", "1")));
        assert_eq!(parse_line("export FOO=1"), None);
        assert_eq!(parse_line("FOO BAR=1"), None);
        assert_eq!(parse_line("=value"), None);
    }

    #[test]
    fn test_lines_without_equals_are_ignored() {
        assert_eq!(parse_line("# a comment"), None);
        assert_eq!(parse_line("    continuation \\"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_parse_into_skips_noise() {
        let input = "\
# header
A=1
do_fetch() {
    B=inside-function
}
C=\"three\"
D
";
        let mut vars = HashMap::new();
        parse_into(input.as_bytes(), &mut vars).unwrap();
        assert_eq!(vars.get("A").map(String::as_str), Some("1"));
        assert_eq!(vars.get("C").map(String::as_str), Some("three"));
        assert!(!vars.contains_key("D"));
        // indented lines fail the anchored name pattern
        assert!(!vars.contains_key("B"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_parse_into_survives_invalid_utf8() {
        let input: &[u8] = b"A=1\nB=caf\xe9\nC=3\n";
        let mut vars = HashMap::new();
        parse_into(input, &mut vars).unwrap();
        assert_eq!(vars.get("A").map(String::as_str), Some("1"));
        assert_eq!(vars.get("B").map(String::as_str), Some("caf\u{FFFD}"));
        assert_eq!(vars.get("C").map(String::as_str), Some("3"));
    }
}
