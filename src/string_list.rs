/// Ordered sequence of strings with stack discipline.
///
/// Used for the folder path while walking a playlist container (folder start
/// pushes a segment, folder end pops it) and as a small insertion-ordered set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList {
    items: Vec<String>,
}

impl StringList {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn append(&mut self, item: impl Into<String>) {
        self.items.push(item.into());
    }

    /// Appends only if an equal entry is not already present.
    ///
    /// Returns `true` when the item was added.
    pub fn add_to_set(&mut self, item: impl Into<String>) -> bool {
        let item = item.into();
        // Recently added entries are the most likely duplicates
        if self.items.iter().rev().any(|existing| *existing == item) {
            tracing::trace!("Not adding \"{}\" because it is already in the set", item);
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove_last(&mut self) -> Option<String> {
        self.items.pop()
    }

    pub fn first(&self) -> Option<&str> {
        self.items.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.items.last().map(String::as_str)
    }

    pub fn join(&self, separator: &str) -> String {
        self.items.join(separator)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Drops every entry.
    pub fn release(&mut self) {
        self.items.clear();
    }
}

impl<S: Into<String>> FromIterator<S> for StringList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}
