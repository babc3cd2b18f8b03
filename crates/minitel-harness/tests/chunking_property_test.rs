//! Property tests: reassembly must not depend on how the peer splits writes.

use minitel_harness::scenario::{Scenario, all_of, completed_with, single_terminal_event};
use proptest::prelude::*;

proptest! {
    // Each case is a full simulation
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_chunking_completes(chunk in 1usize..80, code in "[A-Z0-9]{1,24}") {
        let result = Scenario::new(format!("chunk size {chunk}"))
            .chunked(chunk)
            .override_code(code.clone())
            .oracle(all_of(vec![completed_with(code), single_terminal_event()]))
            .run();

        prop_assert!(result.is_ok(), "{:?}", result);
    }
}
