use std::{borrow::Cow, mem::take};

/// Tracks comments between declarations so the parser can attach them as leading, detached or
/// trailing comments.
#[derive(Debug, Clone)]
pub(super) struct Comments {
    leading_detached: Vec<String>,
    leading: Option<String>,
    trailing: Option<String>,

    is_trailing: bool,
    is_line_comment: bool,
    at_line_start: bool,
}

impl Comments {
    pub fn new() -> Comments {
        Comments {
            leading_detached: Vec::new(),
            leading: None,
            trailing: None,
            is_trailing: false,
            is_line_comment: false,
            at_line_start: true,
        }
    }

    pub fn block_comment(&mut self, comment: Cow<str>) {
        if self.is_trailing {
            self.trailing = Some(comment.into_owned());
            self.is_trailing = false;
        } else {
            self.flush();
            self.leading = Some(comment.into_owned());
        }
        self.at_line_start = false;
    }

    pub fn line_comment(&mut self, comment: Cow<str>) {
        // Line comments include their newline.
        self.at_line_start = true;

        if self.is_trailing {
            self.trailing = Some(comment.into_owned());
            self.is_trailing = false;
            return;
        }

        if self.leading.is_some() && !self.is_line_comment {
            self.flush();
        }
        match &mut self.leading {
            None => self.leading = Some(comment.into_owned()),
            Some(current) => current.push_str(comment.as_ref()),
        }
        self.is_line_comment = true;
    }

    pub fn newline(&mut self) {
        if self.is_trailing {
            self.is_trailing = false;
        } else if self.at_line_start {
            // A blank line detaches the comment block above it.
            self.flush();
        }
        self.at_line_start = true;
    }

    fn flush(&mut self) {
        self.leading_detached.extend(self.leading.take());
        self.is_line_comment = false;
    }

    /// Called after the token which ends a declaration, so that a comment on the rest of the
    /// line is treated as trailing.
    pub fn reset(&mut self) {
        self.leading = None;
        self.leading_detached.clear();
        self.trailing = None;

        self.is_trailing = true;
        self.is_line_comment = false;
        self.at_line_start = false;
    }

    pub fn take_leading(&mut self) -> (Vec<String>, Option<String>) {
        self.is_line_comment = false;
        (take(&mut self.leading_detached), take(&mut self.leading))
    }

    pub fn take_trailing(&mut self) -> Option<String> {
        take(&mut self.trailing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_then_leading() {
        let mut comments = Comments::new();
        comments.reset();
        comments.line_comment(" trailing\n".into());
        comments.line_comment(" leading\n".into());

        assert_eq!(comments.take_trailing(), Some(" trailing\n".to_owned()));
        assert_eq!(
            comments.take_leading(),
            (vec![], Some(" leading\n".to_owned()))
        );
    }

    #[test]
    fn blank_line_detaches() {
        let mut comments = Comments::new();
        comments.reset();
        comments.newline();
        comments.line_comment(" one\n".into());
        comments.line_comment(" two\n".into());
        comments.newline();
        comments.block_comment(" three ".into());
        comments.newline();

        assert_eq!(comments.take_trailing(), None);
        assert_eq!(
            comments.take_leading(),
            (vec![" one\n two\n".to_owned()], Some(" three ".to_owned()))
        );
    }

    #[test]
    fn adjacent_block_comments() {
        let mut comments = Comments::new();
        comments.block_comment(" a ".into());
        comments.newline();
        comments.block_comment(" b ".into());
        comments.newline();

        assert_eq!(
            comments.take_leading(),
            (vec![" a ".to_owned()], Some(" b ".to_owned()))
        );
    }
}
