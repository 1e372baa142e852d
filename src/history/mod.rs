mod log;
mod session;
mod storage;
mod store;
mod types;

pub use log::{LibsqlMessageLog, MessageLog, SnapshotLog, open_message_log};
pub use session::{ConversationSession, ImagePicker, PickedImage};
pub use storage::{
    KeyValueStore, LibsqlKeyValueStore, MemoryKeyValueStore, open_key_value_store,
};
pub use store::ConversationStore;
pub use types::*;
