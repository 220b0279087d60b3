pub mod common;
pub mod items;
pub mod response;
pub mod session;
pub mod tools;

pub use common::{
    AudioFormat, Eagerness, ItemStatus, JsonSchema, Metadata, Modality, Role, TurnDetectionType,
    Voice,
};
pub use items::{ContentPart, ContentType, ConversationItem, ItemType};
pub use response::{
    ResponseInfo, ResponseOptions, ResponseStatus, ResponseStatusDetails, TokenDetails, Usage,
};
pub use session::{InputAudioTranscription, SessionConfig, SessionInfo, TurnDetection};
pub use tools::Tool;
