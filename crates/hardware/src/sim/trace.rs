//! Instruction sources.
//!
//! This module supplies the front end with its instruction stream:
//! 1. **Source Trait:** [`InstructionSource`], a pull interface returning one instruction
//!    per call until the stream ends.
//! 2. **In-memory Source:** [`VecSource`], used by tests and tools that synthesize
//!    instruction sequences.
//! 3. **Binary Traces:** [`TraceReader`], which decodes fixed 64-byte little-endian
//!    records and looks one record ahead so taken branches carry their target.
//!
//! Record layout (offsets in bytes): ip `0..8`, is_branch `8`, branch_taken `9`,
//! destination registers `10..12`, source registers `12..16`, destination memory
//! `16..32`, source memory `32..64`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::info;

use crate::common::constants::{NUM_INSTR_DESTINATIONS, NUM_INSTR_SOURCES, TRACE_RECORD_BYTES};
use crate::common::error::SimError;
use crate::core::pipeline::instr::TraceInstr;

/// Producer of the instruction stream.
pub trait InstructionSource {
    /// Returns the next instruction, or `None` once the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Trace`] if the underlying input fails.
    fn next_instr(&mut self) -> Result<Option<TraceInstr>, SimError>;
}

/// Sets the target of a taken branch to the address of the instruction after it.
const fn link_target(instr: &mut TraceInstr, next_ip: Option<u64>) {
    if instr.is_branch
        && instr.branch_taken
        && let Some(ip) = next_ip
    {
        instr.branch_target = ip;
    }
}

/// Instruction source over an in-memory sequence.
#[derive(Clone, Debug, Default)]
pub struct VecSource {
    instrs: VecDeque<TraceInstr>,
}

impl VecSource {
    /// Creates a source that yields `instrs` in order.
    ///
    /// Taken branches followed by another instruction get that instruction's
    /// address as their target.
    pub fn new(instrs: Vec<TraceInstr>) -> Self {
        let mut instrs = instrs;
        for i in 1..instrs.len() {
            let next_ip = instrs[i].ip;
            link_target(&mut instrs[i - 1], Some(next_ip));
        }
        Self {
            instrs: instrs.into(),
        }
    }

    /// Instructions not yet delivered.
    pub fn remaining(&self) -> usize {
        self.instrs.len()
    }
}

impl InstructionSource for VecSource {
    fn next_instr(&mut self) -> Result<Option<TraceInstr>, SimError> {
        Ok(self.instrs.pop_front())
    }
}

/// Encodes one instruction as a binary trace record.
pub fn encode_record(instr: &TraceInstr) -> [u8; TRACE_RECORD_BYTES] {
    let mut buf = [0u8; TRACE_RECORD_BYTES];
    buf[0..8].copy_from_slice(&instr.ip.to_le_bytes());
    buf[8] = u8::from(instr.is_branch);
    buf[9] = u8::from(instr.branch_taken);
    buf[10..12].copy_from_slice(&instr.destination_registers);
    buf[12..16].copy_from_slice(&instr.source_registers);
    for (i, addr) in instr.destination_memory.iter().enumerate() {
        let off = 16 + i * 8;
        buf[off..off + 8].copy_from_slice(&addr.to_le_bytes());
    }
    for (i, addr) in instr.source_memory.iter().enumerate() {
        let off = 32 + i * 8;
        buf[off..off + 8].copy_from_slice(&addr.to_le_bytes());
    }
    buf
}

fn read_u64(buf: &[u8; TRACE_RECORD_BYTES], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(bytes)
}

/// Decodes one binary trace record. The branch target is left at 0.
pub fn decode_record(buf: &[u8; TRACE_RECORD_BYTES]) -> TraceInstr {
    let mut instr = TraceInstr {
        ip: read_u64(buf, 0),
        is_branch: buf[8] != 0,
        branch_taken: buf[9] != 0,
        ..TraceInstr::default()
    };
    instr.destination_registers.copy_from_slice(&buf[10..10 + NUM_INSTR_DESTINATIONS]);
    instr.source_registers.copy_from_slice(&buf[12..12 + NUM_INSTR_SOURCES]);
    for i in 0..NUM_INSTR_DESTINATIONS {
        instr.destination_memory[i] = read_u64(buf, 16 + i * 8);
    }
    for i in 0..NUM_INSTR_SOURCES {
        instr.source_memory[i] = read_u64(buf, 32 + i * 8);
    }
    instr
}

/// Instruction source decoding binary trace records from any reader.
///
/// A truncated final record ends the stream like a clean end of input.
#[derive(Debug)]
pub struct TraceReader<R: Read> {
    reader: R,
    lookahead: Option<TraceInstr>,
    primed: bool,
    records: u64,
}

impl<R: Read> TraceReader<R> {
    /// Wraps a reader positioned at the first record.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            lookahead: None,
            primed: false,
            records: 0,
        }
    }

    /// Records decoded so far, look-ahead included.
    pub const fn records(&self) -> u64 {
        self.records
    }

    fn read_record(&mut self) -> Result<Option<TraceInstr>, SimError> {
        let mut buf = [0u8; TRACE_RECORD_BYTES];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                self.records += 1;
                Ok(Some(decode_record(&buf)))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(SimError::Trace(e)),
        }
    }
}

impl TraceReader<BufReader<File>> {
    /// Opens a trace file.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Trace`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "trace opened");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> InstructionSource for TraceReader<R> {
    fn next_instr(&mut self) -> Result<Option<TraceInstr>, SimError> {
        if !self.primed {
            self.lookahead = self.read_record()?;
            self.primed = true;
        }
        let Some(mut current) = self.lookahead.take() else {
            return Ok(None);
        };
        self.lookahead = self.read_record()?;
        link_target(&mut current, self.lookahead.map(|n| n.ip));
        Ok(Some(current))
    }
}
