//! Prompt assembly for a chat turn

use crate::session::{Session, Turn};

/// Number of most recent turns replayed into the prompt
pub const CONTEXT_TURNS: usize = 6;

/// Builds the flat completion prompt for `message`.
///
/// Layout: the system prompt and a blank line, then the last
/// [`CONTEXT_TURNS`] turns as `User: q\nAI: a\n`, then `User: message\nAI:`
/// with nothing after it.
pub fn build_prompt<'a, I>(system_prompt: &str, history: I, message: &str) -> String
where
    I: IntoIterator<Item = &'a Turn>,
    I::IntoIter: ExactSizeIterator,
{
    let turns = history.into_iter();
    let skip = turns.len().saturating_sub(CONTEXT_TURNS);

    let mut prompt = String::with_capacity(system_prompt.len() + message.len() + 256);
    prompt.push_str(system_prompt);
    prompt.push_str("\n\n");

    for turn in turns.skip(skip) {
        prompt.push_str("User: ");
        prompt.push_str(turn.question());
        prompt.push_str("\nAI: ");
        prompt.push_str(turn.answer());
        prompt.push('\n');
    }

    prompt.push_str("User: ");
    prompt.push_str(message);
    prompt.push_str("\nAI:");
    prompt
}

/// Shorthand for [`build_prompt`] over a session's history
pub fn build_session_prompt(system_prompt: &str, session: &Session, message: &str) -> String {
    build_prompt(system_prompt, &session.history, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_history() {
        let prompt = build_prompt("Be kind.", &Vec::<Turn>::new(), "hi");
        assert_eq!(prompt, "Be kind.\n\nUser: hi\nAI:");
    }

    #[test]
    fn test_prompt_with_history() {
        let history = vec![Turn::new("hello", "hey there"), Turn::new("how are you?", "fine")];
        let prompt = build_prompt("S", &history, "bye");

        assert_eq!(
            prompt,
            "S\n\nUser: hello\nAI: hey there\nUser: how are you?\nAI: fine\nUser: bye\nAI:"
        );
    }

    #[test]
    fn test_prompt_keeps_only_last_six_turns() {
        let mut session = Session::new();
        for i in 0..10 {
            session.push_turn(Turn::new(format!("q{}", i), format!("a{}", i)));
        }

        let prompt = build_session_prompt("S", &session, "now");

        assert!(!prompt.contains("User: q3\n"));
        assert!(prompt.starts_with("S\n\nUser: q4\nAI: a4\n"));
        assert!(prompt.ends_with("User: q9\nAI: a9\nUser: now\nAI:"));
        assert_eq!(prompt.matches("User: ").count(), CONTEXT_TURNS + 1);
    }

    #[test]
    fn test_prompt_with_empty_system_prompt() {
        let prompt = build_prompt("", &Vec::<Turn>::new(), "x");
        assert_eq!(prompt, "\n\nUser: x\nAI:");
    }
}
