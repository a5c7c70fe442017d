use std::path::Path;

/// a small chemistry toolkit: SMARTS parsing, 2D layout, and drawing
pub mod toolkit;

pub mod config;
pub mod driver;

/// load the newline-separated patterns in `path`, in file order, with trailing
/// whitespace removed. blank lines are kept as empty patterns. bytes that are
/// not valid UTF-8 become U+FFFD, leaving the pattern on that line to fail on
/// its own
pub fn load_patterns(path: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let mut lines: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();
    if bytes.is_empty() || bytes.ends_with(b"\n") {
        lines.pop();
    }
    Ok(lines
        .into_iter()
        .map(|l| String::from_utf8_lossy(l).trim_end().to_owned())
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn patterns_keep_blank_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "[#6:1]-[#8:2]  \r\n\nc1ccccc1\t\n").unwrap();
        let got = load_patterns(f.path()).unwrap();
        assert_eq!(got, vec!["[#6:1]-[#8:2]", "", "c1ccccc1"]);
    }

    #[test]
    fn invalid_utf8_stays_on_its_line() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"CC\n[#6]\xe9\nCO").unwrap();
        let got = load_patterns(f.path()).unwrap();
        assert_eq!(got, vec!["CC", "[#6]\u{fffd}", "CO"]);

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(load_patterns(empty.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_file() {
        assert!(load_patterns("/nonexistent/smarts.sma").is_err());
    }
}
