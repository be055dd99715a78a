use serde::{Deserialize, Serialize};

/// One conversation turn. Roles are free-form ("system", "user", "assistant",
/// or anything the caller's template understands) and are passed through
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn new<R: Into<String>, C: Into<String>>(role: R, content: C) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    #[inline]
    pub fn system<S: Into<String>>(s: S) -> Self {
        Self::new("system", s)
    }

    #[inline]
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self::new("user", s)
    }

    #[inline]
    pub fn assistant<S: Into<String>>(s: S) -> Self {
        Self::new("assistant", s)
    }

    /// Pair up parallel role/content lists as the managed caller sends them.
    /// Returns `None` when the lengths differ; order is preserved.
    pub fn zip<R, C>(roles: R, contents: C) -> Option<Vec<ChatMessage>>
    where
        R: IntoIterator,
        R::Item: Into<String>,
        R::IntoIter: ExactSizeIterator,
        C: IntoIterator,
        C::Item: Into<String>,
        C::IntoIter: ExactSizeIterator,
    {
        let roles = roles.into_iter();
        let contents = contents.into_iter();
        if roles.len() != contents.len() {
            return None;
        }
        Some(roles.zip(contents).map(|(r, c)| ChatMessage::new(r, c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_preserves_order() {
        let msgs = ChatMessage::zip(vec!["system", "user"], vec!["s", "u"]).unwrap();
        assert_eq!(msgs, vec![ChatMessage::system("s"), ChatMessage::user("u")]);
    }

    #[test]
    fn zip_rejects_length_mismatch() {
        assert!(ChatMessage::zip(vec!["user"], Vec::<String>::new()).is_none());
    }

    #[test]
    fn zip_of_nothing_is_empty_not_error() {
        let msgs = ChatMessage::zip(Vec::<String>::new(), Vec::<String>::new()).unwrap();
        assert!(msgs.is_empty());
    }
}
