#![no_main]

use chrono::{DateTime, FixedOffset, TimeZone};
use libfuzzer_sys::fuzz_target;
use snapkeep_core::{Policy, prune};

fuzz_target!(|data: &[u8]| {
    // first line: policy; then 8-byte little endian unix seconds with a
    // 4-byte offset each
    let Some(split) = data.iter().position(|&b| b == b'\n') else {
        return;
    };
    let Ok(text) = std::str::from_utf8(&data[..split]) else {
        return;
    };
    let Ok(policy) = text.parse::<Policy>() else {
        return;
    };

    let snapshots: Vec<DateTime<FixedOffset>> = data[split + 1..]
        .chunks_exact(12)
        .filter_map(|chunk| {
            let seconds = i64::from_le_bytes(chunk[..8].try_into().ok()?);
            let offset = i32::from_le_bytes(chunk[8..].try_into().ok()?) % 86_400;
            let zone = FixedOffset::east_opt(offset)?;
            // keep within a few thousand years of the epoch
            zone.timestamp_opt(seconds % 100_000_000_000, 0).single()
        })
        .collect();

    let pruned = prune(&snapshots, &policy);
    assert_eq!(pruned.keep.len(), snapshots.len());
    for (period, count) in policy.iter() {
        let kept = pruned
            .keep
            .iter()
            .filter(|reason| reason.contains(&period))
            .count();
        let missing = pruned.need.get(period);
        if count > 0 {
            assert_eq!(i64::try_from(kept).unwrap_or(i64::MAX) + missing, count);
        } else {
            assert_eq!(missing, count);
        }
    }
});
