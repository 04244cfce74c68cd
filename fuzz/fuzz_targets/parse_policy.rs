#![no_main]

use libfuzzer_sys::fuzz_target;
use snapkeep_core::Policy;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Parsing must never panic, and canonical text must parse back to the
    // same policy.
    if let Ok(policy) = text.parse::<Policy>() {
        let canonical = policy.to_string();
        let reparsed: Policy = canonical.parse().expect("canonical text parses");
        assert_eq!(reparsed, policy, "{canonical:?}");
        assert_eq!(reparsed.to_string(), canonical);
    }
});
