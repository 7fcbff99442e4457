//! Typed shapes for the protocol's method payloads.
//!
//! These model the wire schema the engine implements: tools, resources,
//! prompts, completions, sampling, roots, and logging.

pub mod completion;
pub mod content;
pub mod logging;
pub mod prompt;
pub mod resource;
pub mod root;
pub mod sampling;
pub mod tool;

pub use completion::{
    CompleteRequest, CompleteResult, Completion, CompletionArgument, CompletionReference,
};
pub use content::{Content, Role};
pub use logging::{LoggingLevel, LoggingMessageNotification, SetLevelRequest};
pub use prompt::{
    GetPromptRequest, GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptMessage,
};
pub use resource::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceRequest, ReadResourceResult,
    Resource, ResourceContents, ResourceTemplate,
};
pub use root::{ListRootsResult, Root};
pub use sampling::{
    CreateMessageRequest, CreateMessageResult, ModelHint, ModelPreferences, SamplingMessage,
};
pub use tool::{CallToolRequest, CallToolResult, ListToolsResult, Tool};
