//! Ordered record of check outcomes for one profile run

use crate::schema::ConfigObject;
use anyhow::bail;
use chrono::{DateTime, Local};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultTag {
    Success,
    Warning,
    Error,
    Exception,
}

impl ResultTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultTag::Success => "success",
            ResultTag::Warning => "warning",
            ResultTag::Error => "error",
            ResultTag::Exception => "exception",
        }
    }
}

impl fmt::Display for ResultTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ResultTag::Success),
            "warning" => Ok(ResultTag::Warning),
            "error" => Ok(ResultTag::Error),
            "exception" => Ok(ResultTag::Exception),
            other => bail!("Unknown result '{other}'"),
        }
    }
}

/// Outcome of one check invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolEntry {
    pub check: String,
    pub config: Option<ConfigObject>,
    pub result: ResultTag,
    pub msg: String,
    pub start: Option<DateTime<Local>>,
    pub end: Option<DateTime<Local>>,
}

impl ProtocolEntry {
    pub fn new(check: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            config: None,
            result: ResultTag::Success,
            msg: String::new(),
            start: None,
            end: None,
        }
    }

    pub fn with_result(mut self, result: ResultTag, msg: impl Into<String>) -> Self {
        self.result = result;
        self.msg = msg.into();
        self
    }

    pub fn start(&mut self) {
        self.start = Some(Local::now());
    }

    pub fn end(&mut self) {
        self.end = Some(Local::now());
    }

    /// Run time in milliseconds; zero until both timestamps are set.
    pub fn duration(&self) -> i64 {
        match (self.start, self.end) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            _ => 0,
        }
    }

    /// Warnings count as success.
    pub fn success(&self) -> bool {
        matches!(self.result, ResultTag::Success | ResultTag::Warning)
    }

    pub fn has_message(&self) -> bool {
        !self.msg.is_empty()
    }

    /// `None` for `include` admits every check; `None` for `exclude` rejects none.
    pub fn is_included(&self, include: Option<&[String]>, exclude: Option<&[String]>) -> bool {
        let included = include.is_none_or(|names| names.contains(&self.check));
        let excluded = exclude.is_some_and(|names| names.contains(&self.check));
        included && !excluded
    }
}

impl fmt::Display for ProtocolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} check ran {}ms with the {} message:\n{}",
            capitalize(&self.check),
            self.duration(),
            self.result,
            self.msg
        )
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Append-only list of entries for one profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protocol {
    pub profile: String,
    entries: Vec<ProtocolEntry>,
}

impl Protocol {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ProtocolEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ProtocolEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ProtocolEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProtocolEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new protocol with the entries admitted by [`ProtocolEntry::is_included`].
    pub fn filter(&self, include: Option<&[String]>, exclude: Option<&[String]>) -> Protocol {
        Protocol {
            profile: self.profile.clone(),
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.is_included(include, exclude))
                .cloned()
                .collect(),
        }
    }

    fn count(&self, tag: ResultTag) -> usize {
        self.entries.iter().filter(|e| e.result == tag).count()
    }

    pub fn successors(&self) -> usize {
        self.count(ResultTag::Success)
    }

    pub fn warnings(&self) -> usize {
        self.count(ResultTag::Warning)
    }

    pub fn errors(&self) -> usize {
        self.count(ResultTag::Error)
    }

    pub fn exceptions(&self) -> usize {
        self.count(ResultTag::Exception)
    }

    pub fn success(&self) -> bool {
        self.errors() + self.exceptions() == 0
    }

    pub fn result(&self) -> ResultTag {
        if self.success() {
            ResultTag::Success
        } else {
            ResultTag::Error
        }
    }
}

impl<'a> IntoIterator for &'a Protocol {
    type Item = &'a ProtocolEntry;
    type IntoIter = std::slice::Iter<'a, ProtocolEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Profile '{}' ran {} checks with {} errors. Please continue reading for details.",
            self.profile,
            self.len(),
            self.errors()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn protocol() -> Protocol {
        let mut protocol = Protocol::new("default");
        protocol.push(ProtocolEntry::new("dummy").with_result(ResultTag::Success, "ok"));
        protocol.push(ProtocolEntry::new("other").with_result(ResultTag::Warning, "hm"));
        protocol.push(ProtocolEntry::new("dummy").with_result(ResultTag::Error, "bad"));
        protocol
    }

    fn names(protocol: &Protocol) -> Vec<&str> {
        protocol.iter().map(|e| e.check.as_str()).collect()
    }

    #[test]
    fn test_filter_semantics() {
        let protocol = protocol();
        let dummy = vec!["dummy".to_string()];
        let dummy = Some(dummy.as_slice());
        let empty: Option<&[String]> = Some(&[]);

        assert_eq!(protocol.filter(None, None).len(), 3);
        assert_eq!(
            names(&protocol.filter(dummy, None)),
            vec!["dummy", "dummy"]
        );
        assert_eq!(names(&protocol.filter(None, dummy)), vec!["other"]);
        assert!(protocol.filter(empty, empty).is_empty());
        assert_eq!(protocol.filter(None, empty).len(), 3);
    }

    #[test]
    fn test_counts_and_result() {
        let mut protocol = protocol();
        assert_eq!(protocol.successors(), 1);
        assert_eq!(protocol.warnings(), 1);
        assert_eq!(protocol.errors(), 1);
        assert!(!protocol.success());
        assert_eq!(protocol.result(), ResultTag::Error);

        let mut clean = Protocol::new("web");
        clean.push(ProtocolEntry::new("a").with_result(ResultTag::Warning, ""));
        assert!(clean.success());
        assert_eq!(clean.result(), ResultTag::Success);

        protocol.push(ProtocolEntry::new("boom").with_result(ResultTag::Exception, "x"));
        assert_eq!(protocol.exceptions(), 1);
    }

    #[test]
    fn test_entry_success() {
        assert!(ProtocolEntry::new("a").success());
        assert!(ProtocolEntry::new("a").with_result(ResultTag::Warning, "").success());
        assert!(!ProtocolEntry::new("a").with_result(ResultTag::Error, "").success());
        assert!(!ProtocolEntry::new("a").with_result(ResultTag::Exception, "").success());
    }

    #[test]
    fn test_display() {
        let entry = ProtocolEntry::new("rejectTabs").with_result(ResultTag::Error, "Tab found");
        assert_eq!(
            entry.to_string(),
            "RejectTabs check ran 0ms with the error message:\nTab found"
        );
        assert_eq!(
            protocol().to_string(),
            "Profile 'default' ran 3 checks with 1 errors. Please continue reading for details."
        );
    }

    #[test]
    fn test_duration() {
        let mut entry = ProtocolEntry::new("a");
        assert_eq!(entry.duration(), 0);
        entry.start();
        entry.end();
        assert!(entry.duration() >= 0);
    }

    #[test]
    fn test_result_tag_strings() {
        for tag in [
            ResultTag::Success,
            ResultTag::Warning,
            ResultTag::Error,
            ResultTag::Exception,
        ] {
            assert_eq!(tag.as_str().parse::<ResultTag>().unwrap(), tag);
        }
        assert!("fine".parse::<ResultTag>().is_err());
    }
}
