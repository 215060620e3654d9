/*
    Scenario tests for core_store subsystem

    Test suite covering:
    - Add/remove conflict resolution per message kind
    - Secondary indices and paging
    - Pruning and signer revocation
    - Event sequencing, listeners and subscriptions
    - Convergence under arbitrary arrival order
    - StoreSet routing and signer checks
*/

pub mod helpers;

pub mod signer_verification_tests;

pub mod event_tests;
pub mod store_set_tests;
