mod session_store;
mod store;
mod umbrella;

pub use session_store::ACCESS_TOKEN_KEY;
pub use session_store::ChangeNotice;
pub use session_store::CONNECTED_KEY;
pub use session_store::LINKED_TOKEN_PREFIX;
pub use session_store::SessionStore;
pub use session_store::USER_ID_KEY;
pub use session_store::USER_KEY;
pub use store::FileStore;
pub use store::KeyValueStore;
pub use store::MemoryStore;
pub use store::StoreError;
pub use umbrella::UmbrellaSessionManager;
