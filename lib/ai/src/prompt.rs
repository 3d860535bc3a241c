//! Prompt template registry.
//!
//! Templates hold system instructions and an optional seed user message.
//! Both may contain `{{path}}` placeholders that are resolved against a
//! [`ConversationContext`] when the template is built into a
//! [`Conversation`]:
//!
//! - `requesting_user.id`, `requesting_user.username`,
//!   `requesting_user.display_name`
//! - `channel.id`, `channel.name`, `channel.display_name`
//! - `post.id`, `post.message`
//! - `params.<KEY>` for prompt parameters
//!
//! A placeholder the context cannot resolve falls back to the default of a
//! matching [`VariableDefinition`]. An optional variable without a default
//! renders empty. A required variable, or a placeholder with no definition
//! at all, fails to render.

use crate::error::PromptError;
use parley_conversation::{Conversation, ConversationContext, ConversationMessage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Template name for answering a question asked of the bot.
pub const DIRECT_MESSAGE_QUESTION: &str = "direct_message_question";
/// Template name for summarizing a thread.
pub const SUMMARIZE_THREAD: &str = "summarize_thread";
/// Template name for rewriting text in simpler words.
pub const SIMPLIFY_TEXT: &str = "simplify_text";
/// Template name for rewriting text in another tone.
pub const CHANGE_TONE: &str = "change_tone";
/// Template name for explaining a code snippet.
pub const EXPLAIN_CODE: &str = "explain_code";
/// Template name for reviewing a code snippet.
pub const SUGGEST_CODE_IMPROVEMENTS: &str = "suggest_code_improvements";
/// Template name for rewriting text as the user asks.
pub const ASK_AI_CHANGE_TEXT: &str = "ask_ai_change_text";
/// Template name for picking an emoji reaction to a post.
pub const EMOJI_REACTION: &str = "emoji_reaction";
/// Template name for summarizing what a channel missed.
pub const SUMMARIZE_CHANNEL_SINCE: &str = "summarize_channel_since";

/// A versioned prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Template name (used for lookup).
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Seed user message; empty for none.
    pub content: String,
    /// Optional system instructions.
    pub system_prompt: Option<String>,
    /// Description of what this template is for.
    pub description: Option<String>,
    /// Variable definitions, keyed by placeholder path.
    pub variables: HashMap<String, VariableDefinition>,
}

/// Definition of a template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Description of what this variable is for.
    pub description: String,
    /// Whether this variable is required.
    pub required: bool,
    /// Value used when the context cannot resolve the placeholder.
    pub default: Option<String>,
}

impl VariableDefinition {
    /// Creates a required variable definition.
    #[must_use]
    pub fn required(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Creates an optional variable definition.
    #[must_use]
    pub fn optional(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            required: false,
            default: None,
        }
    }

    /// Sets a default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl PromptTemplate {
    /// Creates a new prompt template with the given seed message.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.1.0".to_string(),
            content: content.into(),
            system_prompt: None,
            description: None,
            variables: HashMap::new(),
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a variable definition.
    #[must_use]
    pub fn with_variable(
        mut self,
        path: impl Into<String>,
        definition: VariableDefinition,
    ) -> Self {
        self.variables.insert(path.into(), definition);
        self
    }

    /// Renders the template into a conversation carrying `context`.
    ///
    /// The result starts with one system message when the template has
    /// system text, followed by the seed user message when it has one.
    pub fn render(&self, context: &ConversationContext) -> Result<Conversation, PromptError> {
        let mut conversation = Conversation::new(context.clone());

        if let Some(system) = &self.system_prompt {
            let text = self.render_text(system, context)?;
            conversation.push(ConversationMessage::system(text));
        }

        if !self.content.is_empty() {
            let text = self.render_text(&self.content, context)?;
            conversation.push(ConversationMessage::user(text));
        }

        Ok(conversation)
    }

    fn render_text(
        &self,
        text: &str,
        context: &ConversationContext,
    ) -> Result<String, PromptError> {
        let mut rendered = String::with_capacity(text.len());
        for segment in self.segments(text)? {
            match segment {
                Segment::Literal(literal) => rendered.push_str(literal),
                Segment::Placeholder(path) => rendered.push_str(&self.resolve(path, context)?),
            }
        }
        Ok(rendered)
    }

    fn resolve(&self, path: &str, context: &ConversationContext) -> Result<String, PromptError> {
        if let Some(value) = context.resolve(path) {
            return Ok(value);
        }
        match self.variables.get(path) {
            Some(VariableDefinition {
                default: Some(default),
                ..
            }) => Ok(default.clone()),
            Some(def) if !def.required => Ok(String::new()),
            _ => Err(PromptError::MissingVariable {
                template: self.name.clone(),
                variable: path.to_string(),
            }),
        }
    }

    fn segments<'a>(&self, text: &'a str) -> Result<Vec<Segment<'a>>, PromptError> {
        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(&rest[..start]));
            }
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| PromptError::ParseFailed {
                template: self.name.clone(),
                reason: "unterminated placeholder".to_string(),
            })?;
            let path = after[..end].trim();
            if path.is_empty() {
                return Err(PromptError::ParseFailed {
                    template: self.name.clone(),
                    reason: "empty placeholder".to_string(),
                });
            }
            segments.push(Segment::Placeholder(path));
            rest = &after[end + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }
        Ok(segments)
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// Registry of prompt templates.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in templates.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for template in default_templates() {
            registry.register(template);
        }
        registry
    }

    /// Registers a template, replacing any template with the same name.
    pub fn register(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Gets a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Builds the named template against `context`.
    pub fn build(
        &self,
        name: &str,
        context: &ConversationContext,
    ) -> Result<Conversation, PromptError> {
        let template = self.get(name).ok_or_else(|| PromptError::TemplateNotFound {
            name: name.to_string(),
        })?;
        let conversation = template.render(context)?;
        debug!(
            template = name,
            version = %template.version,
            messages = conversation.len(),
            "prompt built"
        );
        Ok(conversation)
    }

    /// Returns all registered templates.
    pub fn all(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.values()
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn default_templates() -> Vec<PromptTemplate> {
    let user_name = || {
        VariableDefinition::optional("Name of the user asking").with_default("the user")
    };
    let channel_name = || {
        VariableDefinition::optional("Channel the request comes from")
            .with_default("a direct message")
    };
    let message = || VariableDefinition::required("Text to operate on");

    vec![
        PromptTemplate::new(DIRECT_MESSAGE_QUESTION, "")
            .with_description("Answer a question asked of the bot")
            .with_system_prompt(
                "You are a helpful assistant taking part in a team chat. \
                 You are talking with {{requesting_user.display_name}} in \
                 {{channel.display_name}}. Answer concisely and use Markdown \
                 where it helps readability.",
            )
            .with_variable("requesting_user.display_name", user_name())
            .with_variable("channel.display_name", channel_name()),
        PromptTemplate::new(SUMMARIZE_THREAD, "")
            .with_description("Summarize a thread")
            .with_system_prompt(
                "You summarize chat threads for {{requesting_user.display_name}}. \
                 The messages that follow are the thread. List its main points, \
                 any decisions made and open action items.",
            )
            .with_variable("requesting_user.display_name", user_name()),
        PromptTemplate::new(SIMPLIFY_TEXT, "{{params.message}}")
            .with_description("Rewrite text in simpler words")
            .with_system_prompt(
                "Rewrite the text you are given so it is easy to read. Keep \
                 its meaning and reply with the rewritten text only.",
            )
            .with_variable("params.message", message()),
        PromptTemplate::new(CHANGE_TONE, "{{params.message}}")
            .with_description("Rewrite text in another tone")
            .with_system_prompt(
                "Rewrite the text you are given in a {{params.tone}} tone. \
                 Keep its meaning and reply with the rewritten text only.",
            )
            .with_variable("params.message", message())
            .with_variable("params.tone", VariableDefinition::required("Target tone")),
        PromptTemplate::new(EXPLAIN_CODE, "{{params.message}}")
            .with_description("Explain a code snippet")
            .with_system_prompt(
                "Explain what the code you are given does, step by step, for \
                 a developer who has not seen it before.",
            )
            .with_variable("params.message", message()),
        PromptTemplate::new(SUGGEST_CODE_IMPROVEMENTS, "{{params.message}}")
            .with_description("Review a code snippet")
            .with_system_prompt(
                "Review the code you are given. Point out bugs and readability \
                 problems and suggest concrete improvements.",
            )
            .with_variable("params.message", message()),
        PromptTemplate::new(ASK_AI_CHANGE_TEXT, "{{params.message}}")
            .with_description("Rewrite text following the user's request")
            .with_system_prompt(
                "Rewrite the text you are given as follows: {{params.ask}}. \
                 Reply with the rewritten text only.",
            )
            .with_variable("params.message", message())
            .with_variable("params.ask", VariableDefinition::required("How to change it")),
        PromptTemplate::new(EMOJI_REACTION, "{{post.message}}")
            .with_description("Pick an emoji reaction for a post")
            .with_system_prompt(
                "Pick one emoji that fits as a reaction to the message you are \
                 given. Reply with its short name only, such as thumbsup or \
                 tada, without colons.",
            )
            .with_variable("post.message", VariableDefinition::required("Post to react to")),
        PromptTemplate::new(SUMMARIZE_CHANNEL_SINCE, "")
            .with_description("Summarize recent channel activity")
            .with_system_prompt(
                "{{requesting_user.display_name}} has been away from \
                 {{channel.display_name}}. The messages that follow were posted \
                 while they were gone. Summarize what they missed{{params.focus}}.",
            )
            .with_variable("requesting_user.display_name", user_name())
            .with_variable("channel.display_name", channel_name())
            .with_variable(
                "params.focus",
                VariableDefinition::optional("Extra instruction appended to the request"),
            ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_conversation::Role;
    use parley_core::{ChannelId, UserId};
    use parley_platform::{Channel, User};

    fn alice_context() -> ConversationContext {
        let user = User::new(UserId::new("u1"), "alice").with_display_name("Alice");
        let channel = Channel::new(ChannelId::new("c1"), "town-square");
        ConversationContext::new(Some(user), Some(channel), None)
    }

    #[test]
    fn build_starts_with_one_system_message() {
        let registry = PromptRegistry::with_defaults();
        let conversation = registry
            .build(DIRECT_MESSAGE_QUESTION, &alice_context())
            .expect("renders");

        assert_eq!(conversation.len(), 1);
        let first = &conversation.messages[0];
        assert_eq!(first.role(), Role::System);
        assert!(first.text().contains("Alice"));
        assert!(first.text().contains("town-square"));
        assert_eq!(conversation.context, alice_context());
    }

    #[test]
    fn defaults_fill_unresolved_placeholders() {
        let registry = PromptRegistry::with_defaults();
        let conversation = registry
            .build(DIRECT_MESSAGE_QUESTION, &ConversationContext::default())
            .expect("renders");

        let system = conversation.extract_system_text();
        assert!(system.contains("the user"));
        assert!(system.contains("a direct message"));
    }

    #[test]
    fn seed_message_follows_system_message() {
        let registry = PromptRegistry::with_defaults();
        let context = ConversationContext::default()
            .with_parameter("message", "fn main() {}")
            .with_parameter("tone", "formal");

        let conversation = registry.build(CHANGE_TONE, &context).expect("renders");

        let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert!(conversation.messages[0].text().contains("formal tone"));
        assert_eq!(conversation.messages[1].text(), "fn main() {}");
    }

    #[test]
    fn unknown_template() {
        let err = PromptRegistry::new()
            .build("nope", &ConversationContext::default())
            .expect_err("unknown");
        assert_eq!(
            err,
            PromptError::TemplateNotFound {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn missing_variable_is_render_error() {
        let registry = PromptRegistry::with_defaults();
        let context = ConversationContext::default().with_parameter("message", "hello");

        let err = registry.build(CHANGE_TONE, &context).expect_err("no tone");

        assert!(err.is_render_error());
        assert_eq!(
            err,
            PromptError::MissingVariable {
                template: CHANGE_TONE.to_string(),
                variable: "params.tone".to_string()
            }
        );
    }

    #[test]
    fn malformed_placeholders() {
        let unterminated = PromptTemplate::new("broken", "Hello {{params.name");
        let err = unterminated
            .render(&ConversationContext::default())
            .expect_err("unterminated");
        assert!(matches!(err, PromptError::ParseFailed { .. }));

        let empty = PromptTemplate::new("empty", "Hello {{ }}");
        assert!(
            empty
                .render(&ConversationContext::default())
                .expect_err("empty")
                .is_render_error()
        );
    }

    #[test]
    fn template_without_placeholders_renders_verbatim() {
        let template = PromptTemplate::new("plain", "Just text { not a placeholder }");
        let conversation = template
            .render(&ConversationContext::default())
            .expect("renders");
        assert_eq!(
            conversation.messages,
            vec![ConversationMessage::user("Just text { not a placeholder }")]
        );
    }

    #[test]
    fn optional_variable_without_default_renders_empty() {
        let template = PromptTemplate::new("t", "a{{params.extra}}b")
            .with_variable("params.extra", VariableDefinition::optional("suffix"));
        let conversation = template
            .render(&ConversationContext::default())
            .expect("renders");
        assert_eq!(conversation.messages, vec![ConversationMessage::user("ab")]);

        let undeclared = PromptTemplate::new("u", "a{{params.extra}}b");
        assert!(matches!(
            undeclared.render(&ConversationContext::default()),
            Err(PromptError::MissingVariable { .. })
        ));

        let required = PromptTemplate::new("r", "a{{params.extra}}b")
            .with_variable("params.extra", VariableDefinition::required("suffix"));
        assert!(required.render(&ConversationContext::default()).is_err());
    }

    #[test]
    fn change_text_asks_for_the_requested_rewrite() {
        let registry = PromptRegistry::with_defaults();
        let context = ConversationContext::default()
            .with_parameter("message", "we ship friday")
            .with_parameter("ask", "make it sound excited");

        let conversation = registry.build(ASK_AI_CHANGE_TEXT, &context).expect("renders");

        assert!(conversation.extract_system_text().contains("make it sound excited"));
        assert_eq!(conversation.messages[1].text(), "we ship friday");
    }

    #[test]
    fn built_prompt_composes_with_thread() {
        let registry = PromptRegistry::with_defaults();
        let mut conversation = registry
            .build(SUMMARIZE_THREAD, &alice_context())
            .expect("renders");
        conversation.append_conversation(Conversation::from_messages(vec![
            ConversationMessage::user("q"),
            ConversationMessage::assistant("a"),
        ]));

        let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn registry_operations() {
        let mut registry = PromptRegistry::new();
        assert!(registry.is_empty());

        registry.register(PromptTemplate::new("template1", "Content 1"));
        registry.register(
            PromptTemplate::new("template2", "Content 2").with_version("1.0.0"),
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("template2").map(|t| t.version.as_str()), Some("1.0.0"));
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(PromptRegistry::with_defaults().all().count(), 9);
    }
}
