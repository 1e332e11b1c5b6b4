//! Splitting a plain-text transcript into chat messages, and back.
//!
//! A transcript is free-form text in which marker lines introduce turns:
//!
//! ```text
//! You are a terse assistant.
//! 	>>>>>>
//! What is a monad?
//!
//! 	<<<<<<
//! A monoid in the category of endofunctors.
//! ```
//!
//! Text before the first marker is the system prompt.  A run of three or more
//! `>` starts a user turn and a run of three or more `<` starts an assistant
//! turn.  A marker is preceded by whitespace (a tab, in the files this crate
//! writes) and followed by a newline; at the very start of the text the
//! whitespace may be missing, because the caller trims its input.
//!
//! [`render`] writes messages in the same format, so a saved log can be edited
//! and fed straight back in.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ChatMessage, Role};

/// Separator written before every user turn.
pub const PROMPT_SEPARATOR: &str = "\t>>>>>>";

/// Separator written before every assistant turn.
pub const CONTINUE_SEPARATOR: &str = "\t<<<<<<";

// Whitespace is the ASCII set `[\t\n\f\r ]`, so a blank line before a marker
// is consumed along with it.
static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\A|\n?[\t\n\x0C\r ]+)(?:(?P<user>>{3,})|(?P<assistant><{3,}))\n")
        .expect("invalid marker regex")
});

/// The kind of marker that introduced a segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    /// A run of `>`: the following text is a user turn.
    ToUser,
    /// A run of `<`: the following text is an assistant turn.
    ToAssistant,
}

impl Direction {
    /// The role of the segment this marker introduces.
    pub fn role(self) -> Role {
        match self {
            Direction::ToUser => Role::User,
            Direction::ToAssistant => Role::Assistant,
        }
    }
}

/// A run of text between markers, exactly as it appeared in the input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// The marker in front of this text; `None` only for the first segment.
    pub marker: Option<Direction>,
    /// The untrimmed text.
    pub text: &'a str,
}

/// Cut `text` at every marker.
///
/// The result always has one more segment than there are markers, and only the
/// first segment has no marker.
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut marker = None;
    let mut start = 0;
    for caps in MARKER.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        segments.push(Segment {
            marker,
            text: &text[start..whole.start()],
        });
        marker = Some(if caps.name("user").is_some() {
            Direction::ToUser
        } else {
            Direction::ToAssistant
        });
        start = whole.end();
    }
    segments.push(Segment {
        marker,
        text: &text[start..],
    });
    segments
}

/// Split a transcript into role-tagged messages.
///
/// With no markers the whole text is a single user message.  Otherwise the
/// text before the first marker becomes the system message and each later
/// segment takes the role of its marker.  Content is trimmed and messages that
/// end up empty are dropped.
pub fn parse(text: &str) -> Vec<ChatMessage> {
    let segments = tokenize(text);
    let candidates: Vec<(Role, &str)> = if let [only] = segments.as_slice() {
        vec![(Role::User, only.text)]
    } else {
        segments
            .iter()
            .filter_map(|segment| match segment.marker {
                // The emptiness check here is on the raw text, before trimming.
                None if segment.text.is_empty() => None,
                None => Some((Role::System, segment.text)),
                Some(direction) => Some((direction.role(), segment.text)),
            })
            .collect()
    };
    candidates
        .into_iter()
        .filter_map(|(role, content)| {
            let content = content.trim();
            (!content.is_empty()).then(|| ChatMessage::new(role, content))
        })
        .collect()
}

/// The separator line written in front of a message with `role`.
pub fn separator(role: Role) -> Option<&'static str> {
    match role {
        Role::System => None,
        Role::User => Some(PROMPT_SEPARATOR),
        Role::Assistant => Some(CONTINUE_SEPARATOR),
    }
}

/// Write messages back in transcript form.
///
/// Every message is its separator line (none for system), its content and a
/// blank line.  Trimming the output and passing it to [`parse`] yields the
/// same messages, provided a system message only appears first.
pub fn render(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        if let Some(separator) = separator(message.role) {
            out.push_str(separator);
            out.push('\n');
        }
        out.push_str(&message.content);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn system(s: &str) -> ChatMessage {
        ChatMessage::system(s)
    }

    fn user(s: &str) -> ChatMessage {
        ChatMessage::user(s)
    }

    fn assistant(s: &str) -> ChatMessage {
        ChatMessage::assistant(s)
    }

    #[test]
    fn parse_cases() {
        let cases: &[(&str, Vec<ChatMessage>)] = &[
            ("a\n>>>>>>\nb", vec![system("a"), user("b")]),
            (">>>>>>\nb", vec![user("b")]),
            ("\n>>>>>\nb", vec![user("b")]),
            ("\t\n>>>\nb", vec![user("b")]),
            ("\t>>\nb", vec![user(">>\nb")]),
            ("\n\t>>>>>>\nb", vec![user("b")]),
            ("    >>>>>>\nb", vec![user("b")]),
            ("    >\nb", vec![user(">\nb")]),
            ("b", vec![user("b")]),
            ("b\n", vec![user("b")]),
            ("\t>>>>\na\n\t<\nb", vec![user("a\n\t<\nb")]),
        ];
        for (input, want) in cases {
            assert_eq!(&parse(input), want, "parse({input:?})");
        }
    }

    #[test]
    fn no_markers_is_single_user_message() {
        assert_eq!(parse("  hello\nworld  "), vec![user("hello\nworld")]);
        assert_eq!(parse(""), vec![]);
        assert_eq!(parse(" \n\t "), vec![]);
    }

    #[test]
    fn assistant_marker() {
        assert_eq!(
            parse("sys\n\t>>>>>>\nq\n\t<<<<<<\na\n\t>>>>>>\nq2"),
            vec![system("sys"), user("q"), assistant("a"), user("q2")]
        );
    }

    #[test]
    fn roles_follow_markers_not_alternation() {
        assert_eq!(
            parse("\t<<<\none\n\t<<<\ntwo\n\t>>>\nthree\n\t>>>\nfour"),
            vec![
                assistant("one"),
                assistant("two"),
                user("three"),
                user("four")
            ]
        );
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(
            parse("\t>>>>>>\n\n\t<<<<<<\n   \n\t>>>>>>\nq"),
            vec![user("q")]
        );
        assert_eq!(parse("\t>>>>>>\n"), vec![]);
    }

    #[test]
    fn whitespace_only_prefix_is_not_a_system_message() {
        assert_eq!(parse("  \n \t>>>>>>\nq"), vec![user("q")]);
    }

    #[test]
    fn marker_needs_leading_whitespace_after_start() {
        assert_eq!(parse("a\nb>>>>\nc"), vec![user("a\nb>>>>\nc")]);
        assert_eq!(parse("a >>>>\nc"), vec![system("a"), user("c")]);
    }

    #[test]
    fn marker_needs_trailing_newline() {
        assert_eq!(parse("a\n\t>>>>>> \nb"), vec![user("a\n\t>>>>>> \nb")]);
        assert_eq!(parse("a\n\t>>>>>>"), vec![user("a\n\t>>>>>>")]);
    }

    #[test]
    fn mixed_run_is_not_a_marker() {
        assert_eq!(parse("a\n\t>>><<<\nb"), vec![user("a\n\t>>><<<\nb")]);
    }

    #[test]
    fn long_run_is_one_marker() {
        let input = format!("a\n\t{}\nb", ">".repeat(40));
        assert_eq!(parse(&input), vec![system("a"), user("b")]);
        assert_eq!(tokenize(&input).len(), 2);
    }

    #[test]
    fn tokenize_reports_directions() {
        let segments = tokenize("s\n\t>>>\nu\n\t<<<\na");
        assert_eq!(
            segments,
            vec![
                Segment {
                    marker: None,
                    text: "s"
                },
                Segment {
                    marker: Some(Direction::ToUser),
                    text: "u"
                },
                Segment {
                    marker: Some(Direction::ToAssistant),
                    text: "a"
                },
            ]
        );
    }

    #[test]
    fn tokenize_without_markers() {
        assert_eq!(
            tokenize("plain"),
            vec![Segment {
                marker: None,
                text: "plain"
            }]
        );
    }

    #[test]
    fn content_keeps_inner_formatting() {
        assert_eq!(
            parse("\t>>>\n  fn main() {\n  \t>>\n  }\n"),
            vec![user("fn main() {\n  \t>>\n  }")]
        );
    }

    #[test]
    fn render_layout() {
        let messages = vec![system("s"), user("u"), assistant("a")];
        assert_eq!(
            render(&messages),
            "s\n\n\t>>>>>>\nu\n\n\t<<<<<<\na\n\n"
        );
    }

    #[test]
    fn render_then_parse_round_trips() {
        let conversations = vec![
            vec![user("only")],
            vec![system("be brief"), user("hi")],
            vec![system("s"), user("q1"), assistant("a1"), user("q2")],
            vec![user("q"), assistant("a"), assistant("more"), user("again")],
            vec![assistant("I go first")],
            vec![user("multi\nline\n\n  indented"), assistant("ok")],
        ];
        for messages in conversations {
            let rendered = render(&messages);
            assert_eq!(parse(rendered.trim()), messages, "{rendered:?}");
        }
    }

    fn random_content(rng: &mut StdRng) -> String {
        const ALPHABET: &[char] = &['a', 'b', 'z', ' ', ' ', '\t', '\n', '>', '<', '>', '<'];
        loop {
            let len = rng.random_range(1..24);
            let raw: String = (0..len)
                .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
                .collect();
            let content = raw.trim();
            // Content that itself holds a marker line cannot survive a round trip.
            if !content.is_empty() && !MARKER.is_match(&format!("\n{content}\n")) {
                return content.to_string();
            }
        }
    }

    #[test]
    fn generated_conversations_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x6770_7470_6970_65);
        for _ in 0..2000 {
            let mut messages = Vec::new();
            if rng.random_bool(0.3) {
                messages.push(system(&random_content(&mut rng)));
            }
            for _ in 0..rng.random_range(1..6) {
                let content = random_content(&mut rng);
                messages.push(if rng.random_bool(0.5) {
                    user(&content)
                } else {
                    assistant(&content)
                });
            }
            let rendered = render(&messages);
            assert_eq!(parse(rendered.trim()), messages, "{rendered:?}");
        }
    }

    #[test]
    fn reparse_is_idempotent() {
        let messages = parse("sys  \n\t>>>>\n  q  \n\n\n    <<<<<<<<<\n a ");
        assert_eq!(messages, vec![system("sys"), user("q"), assistant("a")]);
        assert_eq!(parse(render(&messages).trim()), messages);
    }
}
