//! Test fixtures for creating signed messages
//!
//! Every factory returns a message whose hash is the blake3 digest of its
//! data and whose signature verifies, so fixtures pass `MessageValidator`
//! unless a test tampers with them afterwards.

use super::deterministic_rng::signing_key_with_seed;
use crate::core_store::model::{
    CastAddBody, CastId, CastParent, CastRemoveBody, Fid, HashScheme, Message, MessageBody,
    MessageData, MessageHash, MessageType, Network, ReactionBody, ReactionTarget, ReactionType,
    SignatureScheme, SignerBody, UserDataBody, UserDataType, VerificationAddBody,
    VerificationRemoveBody,
};
use crate::core_store::validation::{Blake3Hasher, MessageHasher};
use ed25519_dalek::{Signer, SigningKey};

pub const FID_FOR_TEST: Fid = 1234;
pub const TEST_NETWORK: Network = Network::Devnet;

const DELEGATE_SEED: u64 = 1;
const CUSTODY_SEED: u64 = 2;

/// Key that signs casts, reactions, verifications and user data
pub fn delegate_key() -> SigningKey {
    signing_key_with_seed(DELEGATE_SEED)
}

/// Key that signs SignerAdd and SignerRemove
pub fn custody_key() -> SigningKey {
    signing_key_with_seed(CUSTODY_SEED)
}

pub fn public_key_bytes(key: &SigningKey) -> Vec<u8> {
    key.verifying_key().to_bytes().to_vec()
}

/// Hash `data` and sign the hash with `key`
pub fn sign_message(data: MessageData, key: &SigningKey) -> Message {
    let bytes = data.encode().unwrap_or_default();
    let hash = Blake3Hasher.hash(&bytes);
    Message {
        signature: key.sign(hash.as_bytes()).to_bytes().to_vec(),
        signer: public_key_bytes(key),
        data,
        hash,
        hash_scheme: HashScheme::Blake3,
        signature_scheme: SignatureScheme::Ed25519,
    }
}

/// Same message signed by another key. The hash does not cover the signer.
pub fn resign(message: &Message, key: &SigningKey) -> Message {
    Message {
        signature: key.sign(message.hash.as_bytes()).to_bytes().to_vec(),
        signer: public_key_bytes(key),
        ..message.clone()
    }
}

/// Overwrite the hash; the result no longer passes envelope validation
pub fn with_forced_hash(message: &Message, hash: MessageHash) -> Message {
    Message { hash, ..message.clone() }
}

fn data(message_type: MessageType, fid: Fid, timestamp: u32, body: MessageBody) -> MessageData {
    MessageData { message_type, fid, timestamp, network: TEST_NETWORK, body }
}

pub fn cast_id_of(message: &Message) -> CastId {
    CastId::new(message.fid(), message.hash)
}

pub fn cast_body(text: &str) -> CastAddBody {
    CastAddBody {
        text: text.to_string(),
        mentions: Vec::new(),
        mentions_positions: Vec::new(),
        embeds: Vec::new(),
        parent: None,
    }
}

pub fn create_cast_add(fid: Fid, timestamp: u32, text: &str) -> Message {
    create_cast_add_with_body(fid, timestamp, cast_body(text))
}

pub fn create_cast_add_with_body(fid: Fid, timestamp: u32, body: CastAddBody) -> Message {
    sign_message(data(MessageType::CastAdd, fid, timestamp, MessageBody::CastAdd(body)), &delegate_key())
}

/// Reply to `parent`
pub fn create_cast_reply(fid: Fid, timestamp: u32, text: &str, parent: CastParent) -> Message {
    create_cast_add_with_body(fid, timestamp, CastAddBody { parent: Some(parent), ..cast_body(text) })
}

pub fn create_cast_remove(fid: Fid, timestamp: u32, target_hash: MessageHash) -> Message {
    sign_message(
        data(
            MessageType::CastRemove,
            fid,
            timestamp,
            MessageBody::CastRemove(CastRemoveBody { target_hash }),
        ),
        &delegate_key(),
    )
}

fn reaction(
    message_type: MessageType,
    fid: Fid,
    timestamp: u32,
    reaction_type: ReactionType,
    target: ReactionTarget,
) -> Message {
    sign_message(
        data(message_type, fid, timestamp, MessageBody::Reaction(ReactionBody { reaction_type, target })),
        &delegate_key(),
    )
}

pub fn create_reaction_add(
    fid: Fid,
    timestamp: u32,
    reaction_type: ReactionType,
    target: ReactionTarget,
) -> Message {
    reaction(MessageType::ReactionAdd, fid, timestamp, reaction_type, target)
}

pub fn create_reaction_remove(
    fid: Fid,
    timestamp: u32,
    reaction_type: ReactionType,
    target: ReactionTarget,
) -> Message {
    reaction(MessageType::ReactionRemove, fid, timestamp, reaction_type, target)
}

fn signer_message(message_type: MessageType, fid: Fid, timestamp: u32, signer: &[u8]) -> Message {
    sign_message(
        data(
            message_type,
            fid,
            timestamp,
            MessageBody::Signer(SignerBody { signer: signer.to_vec(), name: None }),
        ),
        &custody_key(),
    )
}

/// SignerAdd for `signer`, signed by the custody key
pub fn create_signer_add(fid: Fid, timestamp: u32, signer: &[u8]) -> Message {
    signer_message(MessageType::SignerAdd, fid, timestamp, signer)
}

pub fn create_signer_remove(fid: Fid, timestamp: u32, signer: &[u8]) -> Message {
    signer_message(MessageType::SignerRemove, fid, timestamp, signer)
}

pub fn create_verification_add(fid: Fid, timestamp: u32, address: &[u8]) -> Message {
    sign_message(
        data(
            MessageType::VerificationAdd,
            fid,
            timestamp,
            MessageBody::VerificationAdd(VerificationAddBody {
                address: address.to_vec(),
                claim_signature: vec![0xcd; 65],
                block_hash: vec![0xbe; 32],
            }),
        ),
        &delegate_key(),
    )
}

pub fn create_verification_remove(fid: Fid, timestamp: u32, address: &[u8]) -> Message {
    sign_message(
        data(
            MessageType::VerificationRemove,
            fid,
            timestamp,
            MessageBody::VerificationRemove(VerificationRemoveBody { address: address.to_vec() }),
        ),
        &delegate_key(),
    )
}

pub fn create_user_data_add(
    fid: Fid,
    timestamp: u32,
    user_data_type: UserDataType,
    value: &str,
) -> Message {
    sign_message(
        data(
            MessageType::UserDataAdd,
            fid,
            timestamp,
            MessageBody::UserData(UserDataBody { user_data_type, value: value.to_string() }),
        ),
        &delegate_key(),
    )
}
