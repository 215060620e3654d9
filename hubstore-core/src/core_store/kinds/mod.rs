/*
    Kinds - Per-message-kind store definitions and typed getters
*/

pub mod cast;
pub mod reaction;
pub mod signer;
pub mod user_data;
pub mod verification;

pub use cast::{CastStore, CastStoreDef};
pub use reaction::{ReactionStore, ReactionStoreDef};
pub use signer::{SignerStore, SignerStoreDef};
pub use user_data::{UserDataStore, UserDataStoreDef};
pub use verification::{VerificationStore, VerificationStoreDef};
