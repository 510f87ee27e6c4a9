//! Ordered list of short strings, built once at collector init from a delimited
//! configuration string and then read only.
//!
//! The original source models this as a singly linked list of heap nodes; an owned
//! `Vec<String>` gives the same "build once, read many" lifecycle without the manual
//! allocation bookkeeping.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrList {
    entries: Vec<String>,
}

impl StrList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `input` on any byte in `delim`, dropping empty fields.
    pub fn split(input: &str, delim: char) -> Self {
        let entries = input
            .split(delim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Self { entries }
    }

    pub fn append(&mut self, s: impl Into<String>) {
        self.entries.push(s.into());
    }

    pub fn prepend(&mut self, s: impl Into<String>) {
        self.entries.insert(0, s.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e == key)
    }

    /// True iff an element equals `key` exactly, or an element `p*` exists where
    /// `key` starts with `p`.
    pub fn matches(&self, key: &str) -> bool {
        self.entries.iter().any(|e| match e.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => e == key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_empty_fields() {
        let list = StrList::split("a,,b,c", ',');
        assert_eq!(list.entries, vec!["a", "b", "c"]);
    }

    #[test]
    fn contains_is_exact() {
        let list = StrList::split("sda,sdb", ',');
        assert!(list.contains("sda"));
        assert!(!list.contains("sd"));
    }

    #[test]
    fn matches_supports_prefix_star() {
        let list = StrList::split("lo,veth*", ',');
        assert!(list.matches("lo"));
        assert!(list.matches("veth0"));
        assert!(list.matches("veth123"));
        assert!(!list.matches("eth0"));
    }

    #[test]
    fn append_and_prepend() {
        let mut list = StrList::new();
        list.append("b");
        list.prepend("a");
        assert_eq!(list.entries, vec!["a", "b"]);
    }
}
