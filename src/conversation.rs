use crate::state::Message;

/// Append-only log of the current session's messages.
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

/// Position of one image thumbnail in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSlot {
    pub message: usize,
    pub image: usize,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every image thumbnail in display order.
    pub fn image_slots(&self) -> Vec<ImageSlot> {
        self.messages
            .iter()
            .enumerate()
            .flat_map(|(message, msg)| {
                (0..msg.image_refs().len()).map(move |image| ImageSlot { message, image })
            })
            .collect()
    }

    /// The image set a thumbnail belongs to.
    pub fn images_of(&self, slot: ImageSlot) -> Option<&[String]> {
        self.messages
            .get(slot.message)
            .map(|m| m.image_refs())
            .filter(|refs| slot.image < refs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_insertion_order() {
        let mut log = ConversationStore::new();
        log.push(Message::user("first"));
        log.push(Message::assistant("second", None));
        log.push(Message::user("third"));

        let roles: Vec<Role> = log.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(log.messages().len(), 3);
        assert_eq!(log.messages()[2].content, "third");
    }

    #[test]
    fn image_slots_span_messages() {
        let mut log = ConversationStore::new();
        log.push(Message::user("show me"));
        log.push(Message::assistant(
            "here",
            Some(vec!["a".to_string(), "b".to_string()]),
        ));
        log.push(Message::assistant("none", Some(Vec::new())));
        log.push(Message::assistant("one", Some(vec!["c".to_string()])));

        assert_eq!(
            log.image_slots(),
            vec![
                ImageSlot { message: 1, image: 0 },
                ImageSlot { message: 1, image: 1 },
                ImageSlot { message: 3, image: 0 },
            ]
        );
        assert_eq!(
            log.images_of(ImageSlot { message: 1, image: 1 }),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert_eq!(log.images_of(ImageSlot { message: 0, image: 0 }), None);
    }
}
