use chrono::{DateTime, Utc};

/// One inbound message for a session.
#[derive(Debug, Clone)]
pub struct InboundMessage<C, K> {
    pub session_key: String,
    pub message_id: String,
    pub text: String,
    pub is_media: bool,
    pub timestamp: DateTime<Utc>,
    pub images: Option<Vec<String>>,
    pub context: C,
    pub config: K,
}

impl<C, K> InboundMessage<C, K> {
    pub fn new(
        session_key: impl Into<String>,
        message_id: impl Into<String>,
        text: impl Into<String>,
        context: C,
        config: K,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            message_id: message_id.into(),
            text: text.into(),
            is_media: false,
            timestamp: Utc::now(),
            images: None,
            context,
            config,
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    /// Media messages bypass the inbound debounce window.
    pub fn media(mut self) -> Self {
        self.is_media = true;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Messages coalesced into a single unit of work.
///
/// Context, config and timestamp come from the most recent message.
#[derive(Debug, Clone)]
pub struct MergedBatch<C, K> {
    pub session_key: String,
    pub text: String,
    pub images: Option<Vec<String>>,
    pub message_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub context: C,
    pub config: K,
}

impl<C, K> MergedBatch<C, K> {
    pub fn single(message: InboundMessage<C, K>) -> Self {
        Self {
            session_key: message.session_key,
            text: message.text,
            images: message.images.filter(|images| !images.is_empty()),
            message_ids: vec![message.message_id],
            timestamp: message.timestamp,
            context: message.context,
            config: message.config,
        }
    }

    /// Merge messages in arrival order. Returns `None` for an empty batch.
    pub fn merge(messages: Vec<InboundMessage<C, K>>) -> Option<Self> {
        let mut texts = Vec::with_capacity(messages.len());
        let mut images = Vec::new();
        let mut message_ids = Vec::with_capacity(messages.len());
        let mut last = None;
        for message in messages {
            texts.push(message.text);
            if let Some(list) = message.images {
                images.extend(list);
            }
            message_ids.push(message.message_id);
            last = Some((message.session_key, message.timestamp, message.context, message.config));
        }
        let (session_key, timestamp, context, config) = last?;
        Some(Self {
            session_key,
            text: texts.join("\n"),
            images: (!images.is_empty()).then_some(images),
            message_ids,
            timestamp,
            context,
            config,
        })
    }

    pub fn len(&self) -> usize {
        self.message_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message_ids.is_empty()
    }
}
