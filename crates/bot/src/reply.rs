//! What a handler sends back: text (optionally with inline buttons) or a
//! PNG photo. Transport-agnostic; the Telegram client serializes these.

/// Upper bound on one text message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Payload echoed back when pressed; a command name.
    pub callback_data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self { label: label.into(), callback_data: callback_data.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text {
        text: String,
        /// Rows of inline buttons under the message.
        keyboard: Vec<Vec<Button>>,
    },
    Photo {
        png: Vec<u8>,
        file_name: String,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into(), keyboard: Vec::new() }
    }

    pub fn photo(png: Vec<u8>, file_name: impl Into<String>) -> Self {
        Reply::Photo { png, file_name: file_name.into() }
    }

    /// Attach inline buttons. No-op on photos.
    pub fn with_keyboard(mut self, rows: Vec<Vec<Button>>) -> Self {
        if let Reply::Text { keyboard, .. } = &mut self {
            *keyboard = rows;
        }
        self
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text { text, .. } => Some(text),
            Reply::Photo { .. } => None,
        }
    }
}

/// Split `text` into pieces of at most `limit` characters, breaking after
/// newlines where possible. Lines longer than `limit` are cut mid-line.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && current_len > 0 {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(limit) {
                if chunk.len() == limit {
                    pieces.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(split_message("hello\nworld", 4096), vec!["hello\nworld"]);
        assert_eq!(split_message("", 10), vec![""]);
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc\n";
        assert_eq!(split_message(text, 10), vec!["aaaa\nbbbb\n", "cccc\n"]);
    }

    #[test]
    fn test_split_long_line() {
        let text = format!("{}\nend", "x".repeat(25));
        let pieces = split_message(&text, 10);
        assert_eq!(pieces, vec!["x".repeat(10), "x".repeat(10), "xxxxx\nend".to_string()]);
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        let text = "é".repeat(8);
        assert_eq!(split_message(&text, 8).len(), 1);
        assert_eq!(split_message(&text, 4).len(), 2);
    }

    #[test]
    fn test_pieces_respect_limit_and_preserve_text() {
        let text: String = (0..500).map(|i| format!("Code: C{} | Item: thing {}\n", i, i)).collect();
        let pieces = split_message(&text, MAX_MESSAGE_CHARS);
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|p| p.chars().count() <= MAX_MESSAGE_CHARS));
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn test_with_keyboard() {
        let reply = Reply::text("hi").with_keyboard(vec![vec![Button::new("Go", "search")]]);
        match reply {
            Reply::Text { keyboard, .. } => assert_eq!(keyboard[0][0].callback_data, "search"),
            other => panic!("expected text, got {:?}", other),
        }
        let photo = Reply::photo(vec![1], "a.png").with_keyboard(vec![]);
        assert_eq!(photo.as_text(), None);
    }
}
