/*
    Signer and verification store tests

    Tests:
    1. Signer add/remove lifecycle and active-signer lookups
    2. Signer key length validation
    3. Verification slots keyed by address
    4. Verification field validation
*/

use super::helpers::new_store;
use crate::core_store::kinds::{SignerStoreDef, VerificationStoreDef};
use crate::core_store::store::{PageOptions, StoreError};
use crate::test_utils::*;

#[test]
fn test_signer_lifecycle() {
    let store = new_store(SignerStoreDef);
    let key = public_key_bytes(&delegate_key());

    assert!(!store.is_active_signer(FID_FOR_TEST, &key).unwrap());

    let add = create_signer_add(FID_FOR_TEST, 100, &key);
    store.merge(&add).unwrap();
    assert!(store.is_active_signer(FID_FOR_TEST, &key).unwrap());
    assert_eq!(store.get_signer_add(FID_FOR_TEST, &key).unwrap(), add);

    let remove = create_signer_remove(FID_FOR_TEST, 150, &key);
    store.merge(&remove).unwrap();
    assert!(!store.is_active_signer(FID_FOR_TEST, &key).unwrap());
    assert_eq!(store.get_signer_remove(FID_FOR_TEST, &key).unwrap(), remove);

    let readd = create_signer_add(FID_FOR_TEST, 120, &key);
    assert_eq!(
        store.merge(&readd).unwrap_err().to_string(),
        "message conflicts with a more recent SignerRemove"
    );
}

#[test]
fn test_signers_listed_by_fid() {
    let store = new_store(SignerStoreDef);
    let first = create_signer_add(FID_FOR_TEST, 100, &[1; 32]);
    let second = create_signer_add(FID_FOR_TEST, 101, &[2; 32]);
    let removed = create_signer_remove(FID_FOR_TEST, 102, &[3; 32]);
    for message in [&first, &second, &removed] {
        store.merge(message).unwrap();
    }

    let adds = store.get_signer_adds_by_fid(FID_FOR_TEST, &PageOptions::default()).unwrap();
    assert_eq!(adds.messages, vec![first, second]);
    let removes = store.get_signer_removes_by_fid(FID_FOR_TEST, &PageOptions::default()).unwrap();
    assert_eq!(removes.messages, vec![removed]);
}

#[test]
fn test_signer_key_length_validated() {
    let store = new_store(SignerStoreDef);
    let short = create_signer_add(FID_FOR_TEST, 100, &[1; 31]);
    assert!(matches!(store.merge(&short), Err(StoreError::Validation(_))));
}

#[test]
fn test_verification_lifecycle() {
    let store = new_store(VerificationStoreDef);
    let address = address_with_seed(1);
    let other = address_with_seed(2);

    let add = create_verification_add(FID_FOR_TEST, 100, &address);
    let other_add = create_verification_add(FID_FOR_TEST, 101, &other);
    store.merge(&add).unwrap();
    store.merge(&other_add).unwrap();
    assert_eq!(store.get_verification_add(FID_FOR_TEST, &address).unwrap(), add);

    let remove = create_verification_remove(FID_FOR_TEST, 110, &address);
    store.merge(&remove).unwrap();

    assert!(matches!(
        store.get_verification_add(FID_FOR_TEST, &address),
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(store.get_verification_remove(FID_FOR_TEST, &address).unwrap(), remove);

    let adds = store.get_verification_adds_by_fid(FID_FOR_TEST, &PageOptions::default()).unwrap();
    assert_eq!(adds.messages, vec![other_add]);
    let removes = store.get_verification_removes_by_fid(FID_FOR_TEST, &PageOptions::default()).unwrap();
    assert_eq!(removes.messages, vec![remove]);
}

#[test]
fn test_verification_address_validated() {
    let store = new_store(VerificationStoreDef);
    let bad_add = create_verification_add(FID_FOR_TEST, 100, &[1; 19]);
    let bad_remove = create_verification_remove(FID_FOR_TEST, 100, &[1; 21]);

    assert!(matches!(store.merge(&bad_add), Err(StoreError::Validation(_))));
    assert!(matches!(store.merge(&bad_remove), Err(StoreError::Validation(_))));
}
