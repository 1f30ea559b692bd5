//! # Configuration Tests
//!
//! Defaults, JSON deserialization with partial sections, and validation.

use o3sim_core::common::SimError;
use o3sim_core::config::*;
use pretty_assertions::assert_eq;

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn test_core_defaults() {
    let core = CoreConfig::default();
    assert_eq!(core.ifetch_buffer_size, 64);
    assert_eq!(core.decode_buffer_size, 32);
    assert_eq!(core.dispatch_buffer_size, 32);
    assert_eq!(core.rob_size, 352);
    assert_eq!(core.lq_size, 128);
    assert_eq!(core.sq_size, 72);
    assert_eq!((core.fetch_width, core.decode_width, core.dispatch_width), (6, 6, 6));
    assert_eq!(core.scheduler_size, 128);
    assert_eq!(core.exec_width, 4);
    assert_eq!((core.lq_width, core.sq_width), (2, 2));
    assert_eq!(core.retire_width, 5);
    assert_eq!((core.decode_latency, core.dispatch_latency), (1, 1));
    assert_eq!((core.scheduling_latency, core.exec_latency), (0, 0));
    assert_eq!(core.branch_mispredict_penalty, 1);
}

#[test]
fn test_dib_and_vmem_defaults() {
    let config = Config::default();
    assert_eq!((config.dib.sets, config.dib.ways, config.dib.window_bits), (32, 8, 4));
    assert_eq!(config.vmem.mode, TranslationMode::Paged);
    assert_eq!(config.vmem.levels, 5);
    assert_eq!(config.vmem.pte_page_size, 4096);
    assert_eq!(config.general.warmup_instructions, 0);
    assert!(!config.general.commit_log);
}

#[test]
fn test_sta_covers_every_in_flight_store_slot() {
    let core = CoreConfig::default();
    assert_eq!(core.sta_size(), (352 + 64 + 32 + 32) * 2);
}

// ══════════════════════════════════════════════════════════
// 2. JSON
// ══════════════════════════════════════════════════════════

#[test]
fn test_empty_json_is_default() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.core.rob_size, CoreConfig::default().rob_size);
    assert_eq!(config.memory.data_latency, MemoryConfig::default().data_latency);
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let json = r#"{
        "general": { "warmup_instructions": 1000, "commit_log": true },
        "core": { "lq_size": 4, "max_read": 1 },
        "vmem": { "mode": "Segment", "segments": { "heap": 4096 } }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.general.warmup_instructions, 1000);
    assert!(config.general.commit_log);
    assert_eq!(config.core.lq_size, 4);
    assert_eq!(config.core.max_read, 1);
    assert_eq!(config.core.sq_size, 72);
    assert_eq!(config.vmem.mode, TranslationMode::Segment);
    assert_eq!(config.vmem.segments.heap, 4096);
    assert_eq!(config.vmem.segments.stack, SegmentSizes::default().stack);
}

#[test]
fn test_malformed_json_is_a_parse_error() {
    assert!(matches!(Config::from_json("{ core: }"), Err(SimError::Config(_))));
}

#[test]
fn test_unknown_mode_is_a_parse_error() {
    let json = r#"{ "vmem": { "mode": "Pcache" } }"#;
    assert!(matches!(Config::from_json(json), Err(SimError::Config(_))));
}

// ══════════════════════════════════════════════════════════
// 3. Validation
// ══════════════════════════════════════════════════════════

#[test]
fn test_zero_width_rejected() {
    let err = Config::from_json(r#"{ "core": { "retire_width": 0 } }"#).unwrap_err();
    match err {
        SimError::InvalidConfig(msg) => assert!(msg.contains("core.retire_width"), "{msg}"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_capacity_must_be_page_multiple() {
    let mut config = Config::default();
    config.vmem.capacity = (64 << 20) + 100;
    assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
}

#[test]
fn test_pte_page_size_must_be_power_of_two() {
    let mut config = Config::default();
    config.vmem.pte_page_size = 3000;
    assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    config.vmem.pte_page_size = 1024;
    assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
}

#[test]
fn test_paged_capacity_must_exceed_reserve() {
    let mut config = Config::default();
    config.vmem.capacity = 1 << 20;
    assert!(config.validate().is_err());
    config.vmem.mode = TranslationMode::Segment;
    assert!(config.validate().is_ok(), "segment mode has no reserve");
}
