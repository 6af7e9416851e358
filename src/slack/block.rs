use serde::ser::SerializeStruct;
use serde::ser;

/// Slack's block API is its most modern, and allows us to mix rich formatting
/// with foreign plaintext. This is our limited subset thereof.
///
/// <https://api.slack.com/reference/block-kit/blocks>
pub enum Block {
    Section(TextBlock),
    /// Small, greyed out text beneath a section.
    Context(Vec<TextBlock>),
}

/// <https://api.slack.com/reference/block-kit/composition-objects#text>
pub enum TextBlock {
    Plaintext(String),
    /// "mrkdwn" is Slack's alternative to Markdown.
    ///
    /// <https://api.slack.com/reference/surfaces/formatting#basics>
    Mrkdwn(String),
}

impl ser::Serialize for TextBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut state = serializer.serialize_struct("TextBlock", 2)?;

        let (typ, text) = match self {
            TextBlock::Plaintext(x) => ("plain_text", x),
            TextBlock::Mrkdwn(x) => ("mrkdwn", x),
        };
        state.serialize_field("type", typ)?;
        state.serialize_field("text", text)?;

        state.end()
    }
}

impl ser::Serialize for Block {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut state = serializer.serialize_struct("Block", 2)?;

        match self {
            Block::Section(x) => {
                state.serialize_field("type", "section")?;
                state.serialize_field("text", x)?;
            }

            Block::Context(xs) => {
                state.serialize_field("type", "context")?;
                state.serialize_field("elements", xs)?;
            }
        };

        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_section() {
        let block = Block::Section(TextBlock::Mrkdwn("*hi*".into()));

        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({ "type": "section", "text": { "type": "mrkdwn", "text": "*hi*" } })
        );
    }

    #[test]
    fn test_serialize_context() {
        let block = Block::Context(vec![TextBlock::Plaintext("F123".into())]);

        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({
                "type": "context",
                "elements": [{ "type": "plain_text", "text": "F123" }]
            })
        );
    }
}
