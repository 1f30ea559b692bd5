//! Pipeline stage implementations.
//!
//! Each stage is a free function over the [`Core`](crate::core::Core) and runs
//! once per cycle, in this order:
//! 1. **Fetch:** Reads instructions into the fetch buffer, predicts branches, checks
//!    the DIB, groups translation and instruction-fetch requests, promotes to decode.
//! 2. **Decode:** Updates the DIB and resolves direct-branch mispredictions.
//! 3. **Dispatch:** Moves decoded instructions into the ROB.
//! 4. **Schedule:** Builds register dependencies and admits memory operands to the LSQ.
//! 5. **Execute:** Issues ready non-memory instructions.
//! 6. **Memory:** Drives the LSQ issue queues and store-to-load forwarding.
//! 7. **Complete:** Drains memory completions and finishes executed instructions.
//! 8. **Retire:** Writes back stores and releases the oldest instructions.

/// Completion and memory return handling.
pub mod complete;

/// Instruction decode stage implementation.
pub mod decode;

/// ROB dispatch stage implementation.
pub mod dispatch;

/// Non-memory execution stage implementation.
pub mod execute;

/// Fetch, DIB check, translation and instruction fetch.
pub mod fetch;

/// Load/store queue operation and forwarding.
pub mod memory;

/// In-order retirement stage implementation.
pub mod retire;

/// Register and memory scheduling.
pub mod schedule;

pub use complete::{complete_inflight, handle_memory_return};
pub use decode::decode_stage;
pub use dispatch::dispatch_stage;
pub use execute::execute_stage;
pub use fetch::{check_dib, fetch_instruction, fetch_stage, promote_to_decode, translate_fetch};
pub use memory::operate_lsq;
pub use retire::retire_stage;
pub use schedule::{schedule_memory_stage, schedule_stage};

use crate::core::pipeline::buffer::StageBuffer;
use crate::core::pipeline::instr::InstrRecord;

/// Appends `instr` to a buffer the caller has checked for space.
///
/// # Panics
///
/// Panics if the buffer is full, which means the caller's capacity check and
/// the buffer disagree.
fn admit(buffer: &mut StageBuffer, instr: InstrRecord, ready: bool, stage: &str) {
    let result = if ready {
        buffer.push_back_ready(instr)
    } else {
        buffer.push_back(instr)
    };
    if let Err(rejected) = result {
        panic!(
            "{stage}: buffer overflow admitting instr {} (capacity {})",
            rejected.instr_id,
            buffer.capacity()
        );
    }
}
