use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use o3sim_core::Simulator;
use o3sim_core::common::SimError;
use o3sim_core::sim::trace::encode_record;
use o3sim_core::sim::{InstructionSource, TraceReader};
use o3sim_core::soc::FixedLatencyMemory;

use crate::common::builder::instruction::InstrBuilder;
use crate::common::harness::{init_logging, small_config};

fn write_trace(instrs: &[o3sim_core::core::pipeline::instr::TraceInstr]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for instr in instrs {
        file.write_all(&encode_record(instr)).unwrap();
    }
    file.flush().unwrap();
    file
}

fn looping_trace() -> Vec<o3sim_core::core::pipeline::instr::TraceInstr> {
    let mut instrs = Vec::new();
    for _ in 0..4 {
        instrs.push(InstrBuilder::new(0x1000).dst(1).load(0x5555_5555_4000).build());
        instrs.push(InstrBuilder::new(0x1004).src(1).store(0x5555_5555_4008).build());
        instrs.push(InstrBuilder::new(0x1008).conditional(true).build());
    }
    instrs
}

#[test]
fn test_file_round_trip_links_targets() {
    let file = write_trace(&looping_trace());
    let mut reader = TraceReader::open(file.path()).unwrap();

    let mut seen = Vec::new();
    while let Some(instr) = reader.next_instr().unwrap() {
        seen.push(instr);
    }
    assert_eq!(seen.len(), 12);
    assert_eq!(reader.records(), 12);
    assert_eq!(seen[2].branch_target, 0x1000, "taken branch targets the next record");
    assert_eq!(seen[11].branch_target, 0, "last record has no successor");
    assert_eq!(seen[1].destination_memory[0], 0x5555_5555_4008);
    assert!(reader.next_instr().unwrap().is_none(), "end of stream is sticky");
}

#[test]
fn test_missing_file_is_a_trace_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TraceReader::open(dir.path().join("absent.trace")).unwrap_err();
    assert!(matches!(err, SimError::Trace(_)));
}

#[test]
fn test_simulate_from_trace_file() {
    init_logging();
    let file = write_trace(&looping_trace());
    let config = small_config();
    let source = TraceReader::open(file.path()).unwrap();
    let memory = FixedLatencyMemory::new(&config.memory);
    let mut sim = Simulator::new(&config, source, memory).unwrap();

    let stats = sim.run(None).unwrap();
    assert_eq!(stats.instructions_retired, 12);
    assert_eq!(stats.branches, 4);
    assert_eq!(stats.store_forwards, 0, "load precedes the store each iteration");
    assert_eq!(sim.core.commit_log.as_ref().map(Vec::len), Some(12));
}

#[test]
fn test_reader_over_bytes() {
    let instrs = looping_trace();
    let bytes: Vec<u8> = instrs.iter().flat_map(encode_record).collect();
    let mut reader = TraceReader::new(bytes.as_slice());
    let first = reader.next_instr().unwrap().unwrap();
    assert_eq!(first.ip, 0x1000);
    assert_eq!(reader.records(), 2, "one record of look-ahead");
}
