//! Multi-line config comments.
//!
//! A comment manages its content as lines. Strings passed to the
//! line-oriented methods are split on configurable delimiters (regex
//! fragments matching the start and end of a line), so a string carrying
//! delimiters expands into several lines, while lines given as a list
//! stay as they are.

use regex::Regex;

use super::ConfigError;

/// Pattern matching the end of a comment line, unless reconfigured.
pub const DEFAULT_END_OF_LINE: &str = r"\r\n|\n|\r";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    name: String,
    lines: Vec<String>,
    start_of_line: String,
    end_of_line: Option<String>,
}

impl Comment {
    /// Creates a comment by splitting `text` with the default delimiters.
    pub fn new(text: &str) -> Self {
        let mut comment = Self::empty();
        comment.lines = comment.split_default(text);
        comment
    }

    /// Creates a comment with no lines.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            lines: Vec::new(),
            start_of_line: String::new(),
            end_of_line: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Sets the pattern matching the beginning of a line.
    pub fn set_start_of_lines(&mut self, delimiter: impl Into<String>) -> &mut Self {
        self.start_of_line = delimiter.into();
        self
    }

    /// Sets the pattern matching the end of a line.
    pub fn set_end_of_lines(&mut self, delimiter: impl Into<String>) -> &mut Self {
        self.end_of_line = Some(delimiter.into());
        self
    }

    /// Sets both line delimiters.
    pub fn set_delimiters(
        &mut self,
        start_of_line: impl Into<String>,
        end_of_line: impl Into<String>,
    ) -> &mut Self {
        self.set_start_of_lines(start_of_line)
            .set_end_of_lines(end_of_line)
    }

    fn end_of_line(&self) -> &str {
        self.end_of_line.as_deref().unwrap_or(DEFAULT_END_OF_LINE)
    }

    /// Splits with the built-in default delimiters; infallible.
    fn split_default(&self, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = text;
        loop {
            match rest.find(['\r', '\n']) {
                Some(pos) => {
                    lines.push(rest[..pos].to_owned());
                    let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                    rest = &rest[pos + skip..];
                }
                None => {
                    lines.push(rest.to_owned());
                    return lines;
                }
            }
        }
    }

    /// Splits a string into lines using the configured delimiters.
    ///
    /// The start-of-line pattern is stripped from the first line and the
    /// end-of-line pattern from the last, so delimited input round-trips.
    pub fn split_lines(&self, text: &str) -> Result<Vec<String>, ConfigError> {
        if self.end_of_line.is_none() && self.start_of_line.is_empty() {
            return Ok(self.split_default(text));
        }
        let separator = self.compile(&format!(
            "(?:{})(?:{})",
            self.end_of_line(),
            self.start_of_line
        ))?;
        let mut lines: Vec<String> = separator.split(text).map(str::to_owned).collect();
        if !self.start_of_line.is_empty() {
            let start = self.compile(&self.start_of_line)?;
            if let Some(first) = lines.first_mut() {
                *first = start.replacen(first, 1, "").into_owned();
            }
        }
        let end = self.compile(self.end_of_line())?;
        if let Some(last) = lines.last_mut() {
            *last = end.replacen(last, 1, "").into_owned();
        }
        Ok(lines)
    }

    fn compile(&self, pattern: &str) -> Result<Regex, ConfigError> {
        Regex::new(pattern).map_err(|source| ConfigError::InvalidDelimiter {
            pattern: pattern.to_owned(),
            source,
        })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn get_line(&self, position: usize) -> Option<&str> {
        self.lines.get(position).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Replaces the whole content by splitting `text`.
    pub fn set_content(&mut self, text: &str) -> Result<&mut Self, ConfigError> {
        self.lines = self.split_lines(text)?;
        Ok(self)
    }

    /// Appends `line` at the end; delimiters inside expand to more lines.
    pub fn new_line(&mut self, line: &str) -> Result<&mut Self, ConfigError> {
        let mut split = self.split_lines(line)?;
        self.lines.append(&mut split);
        Ok(self)
    }

    /// Pads the comment with `value` lines until it has `max` lines.
    pub fn fill_to(&mut self, max: usize, value: &str) -> &mut Self {
        while self.lines.len() < max {
            self.lines.push(value.to_owned());
        }
        self
    }

    /// Splices `lines` over `count` existing lines starting at `from`,
    /// padding with empty lines when `from` is past the end. A `count` of
    /// `None` replaces through the end.
    pub fn splice_lines(
        &mut self,
        lines: Vec<String>,
        from: usize,
        count: Option<usize>,
    ) -> &mut Self {
        self.fill_to(from, "");
        let available = self.lines.len() - from;
        let count = count.unwrap_or(available).min(available);
        self.lines.splice(from..from + count, lines);
        self
    }

    /// Like [`splice_lines`](Self::splice_lines), splitting `line` first.
    pub fn splice_line(
        &mut self,
        line: &str,
        from: usize,
        count: Option<usize>,
    ) -> Result<&mut Self, ConfigError> {
        let lines = self.split_lines(line)?;
        Ok(self.splice_lines(lines, from, count))
    }

    /// Replaces the line at `position`; extra lines are inserted after it.
    pub fn edit_line(&mut self, position: usize, line: &str) -> Result<&mut Self, ConfigError> {
        self.splice_line(line, position, Some(1))
    }

    /// Replaces as many lines as `text` splits into, starting at `from`.
    pub fn replace_from(&mut self, text: &str, from: usize) -> Result<&mut Self, ConfigError> {
        let lines = self.split_lines(text)?;
        let count = lines.len();
        Ok(self.splice_lines(lines, from, Some(count)))
    }

    /// Inserts the split lines of `text` at `from`, shifting the rest.
    pub fn insert_at(&mut self, text: &str, from: usize) -> Result<&mut Self, ConfigError> {
        let lines = self.split_lines(text)?;
        Ok(self.splice_lines(lines, from, Some(0)))
    }

    /// Joins the lines back with `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.lines.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_rejoin_round_trips() {
        let text = "first\n\nthird\n";
        let comment = Comment::new(text);
        assert_eq!(comment.lines(), &["first", "", "third", ""]);
        assert_eq!(comment.join("\n"), text.to_owned());
    }

    #[test]
    fn default_split_handles_all_newline_styles() {
        let comment = Comment::new("a\r\nb\rc\nd");
        assert_eq!(comment.lines(), &["a", "b", "c", "d"]);
    }

    #[test]
    fn custom_delimiters_strip_line_markers() {
        let mut comment = Comment::empty();
        comment.set_delimiters(r"\s*#\s?", r"\n");
        let lines = comment.split_lines("# one\n# two\n#three").unwrap();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn invalid_delimiters_are_reported() {
        let mut comment = Comment::empty();
        comment.set_end_of_lines("(");
        assert!(matches!(
            comment.split_lines("x"),
            Err(ConfigError::InvalidDelimiter { .. })
        ));
    }

    #[test]
    fn new_line_expands_embedded_delimiters() {
        let mut comment = Comment::new("head");
        comment.new_line("tail one\ntail two").unwrap();
        assert_eq!(comment.lines(), &["head", "tail one", "tail two"]);
    }

    #[test]
    fn edit_line_replaces_one_and_inserts_the_rest() {
        let mut comment = Comment::new("a\nb\nc");
        comment.edit_line(1, "B1\nB2").unwrap();
        assert_eq!(comment.lines(), &["a", "B1", "B2", "c"]);
    }

    #[test]
    fn fill_to_pads_up_to_the_requested_length() {
        let mut comment = Comment::new("only");
        comment.fill_to(3, "-");
        assert_eq!(comment.lines(), &["only", "-", "-"]);
        comment.fill_to(2, "x");
        assert_eq!(comment.len(), 3);
    }

    #[test]
    fn splice_past_the_end_pads_with_empty_lines() {
        let mut comment = Comment::new("one");
        comment.splice_line("four", 3, None).unwrap();
        assert_eq!(comment.lines(), &["one", "", "", "four"]);
    }

    #[test]
    fn insert_at_shifts_existing_lines() {
        let mut comment = Comment::new("a\nc");
        comment.insert_at("b", 1).unwrap();
        assert_eq!(comment.lines(), &["a", "b", "c"]);
    }

    #[test]
    fn replace_from_overwrites_in_place() {
        let mut comment = Comment::new("a\nb\nc\nd");
        comment.replace_from("B\nC", 1).unwrap();
        assert_eq!(comment.lines(), &["a", "B", "C", "d"]);
    }
}
