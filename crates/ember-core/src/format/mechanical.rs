use ember_abi::ChatMessage;

/// Last-resort rendering: `"<role>: <content>\n"` per message, then an open
/// `"assistant:"` turn.
pub fn render(messages: &[ChatMessage]) -> String {
    let cap = messages
        .iter()
        .map(|m| m.role.len() + m.content.len() + 3)
        .sum::<usize>()
        + "assistant:".len();
    let mut out = String::with_capacity(cap);
    for m in messages {
        out.push_str(&m.role);
        out.push_str(": ");
        out.push_str(&m.content);
        out.push('\n');
    }
    out.push_str("assistant:");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_user_pair() {
        let msgs = [ChatMessage::system("s"), ChatMessage::user("u")];
        assert_eq!(render(&msgs), "system: s\nuser: u\nassistant:");
    }

    #[test]
    fn roles_pass_through_verbatim() {
        let msgs = [ChatMessage::new("Narrator", "once")];
        assert_eq!(render(&msgs), "Narrator: once\nassistant:");
    }
}
