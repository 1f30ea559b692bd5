//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for one out-of-order core. It provides:
//! 1. **Cycle and IPC:** Total cycles, retired and fetched instructions, derived IPC.
//! 2. **Branch prediction:** Per-class counts and mispredictions, MPKI and ROB
//!    occupancy at misprediction.
//! 3. **Frontend:** Fetch stall cycles, DIB hits and code prefetch traffic.
//! 4. **Memory pipeline:** Store-to-load forwards, LQ/SQ/STA admission stalls,
//!    channel rejections and retirement write stalls.
//!
//! Counters are reset when warmup ends so the report covers the measured
//! region only.

use std::time::Instant;

use crate::core::pipeline::instr::BranchType;

/// Core statistics.
#[derive(Clone, Debug)]
pub struct CoreStats {
    start_time: Instant,
    /// Total simulated cycles.
    pub cycles: u64,
    /// Instructions retired.
    pub instructions_retired: u64,
    /// Instructions read from the instruction source.
    pub instructions_fetched: u64,

    /// Branch-classified instructions seen at fetch.
    pub branches: u64,
    /// Branches whose predicted target disagreed with the actual one.
    pub branch_mispredictions: u64,
    /// Branches per class.
    pub branch_types: [u64; BranchType::COUNT],
    /// Mispredictions per class.
    pub branch_type_misses: [u64; BranchType::COUNT],
    /// Sum of ROB occupancy sampled at every misprediction.
    pub rob_occupancy_at_mispredict: u64,

    /// Cycles fetch spent stalled behind a misprediction.
    pub fetch_stall_cycles: u64,
    /// Fetch-buffer entries that hit in the DIB.
    pub dib_hits: u64,

    /// Loads satisfied by an in-flight store.
    pub store_forwards: u64,
    /// Memory scheduling attempts refused for a full load queue.
    pub lq_full_events: u64,
    /// Memory scheduling attempts refused for a full store queue.
    pub sq_full_events: u64,
    /// Store admissions refused because an older store address was unresolved.
    pub sta_wait_events: u64,
    /// Requests the memory subsystem rejected.
    pub rejected_requests: u64,
    /// Retirement walks halted by a rejected store write.
    pub retire_write_stalls: u64,

    /// Code prefetches produced by the prefetcher.
    pub code_prefetches_requested: u64,
    /// Code prefetches handed to the memory subsystem.
    pub code_prefetches_issued: u64,
    /// Code prefetches discarded for targeting address 0.
    pub code_prefetches_dropped: u64,
}

impl Default for CoreStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            instructions_retired: 0,
            instructions_fetched: 0,
            branches: 0,
            branch_mispredictions: 0,
            branch_types: [0; BranchType::COUNT],
            branch_type_misses: [0; BranchType::COUNT],
            rob_occupancy_at_mispredict: 0,
            fetch_stall_cycles: 0,
            dib_hits: 0,
            store_forwards: 0,
            lq_full_events: 0,
            sq_full_events: 0,
            sta_wait_events: 0,
            rejected_requests: 0,
            retire_write_stalls: 0,
            code_prefetches_requested: 0,
            code_prefetches_issued: 0,
            code_prefetches_dropped: 0,
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"branch"`, `"frontend"`, `"memory"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "branch", "frontend", "memory"];

impl CoreStats {
    /// Retired instructions per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.instructions_retired as f64 / self.cycles as f64
        }
    }

    /// Branch mispredictions per thousand retired instructions.
    pub fn branch_mpki(&self) -> f64 {
        if self.instructions_retired == 0 {
            0.0
        } else {
            self.branch_mispredictions as f64 * 1000.0 / self.instructions_retired as f64
        }
    }

    /// Fraction of branches whose target was predicted correctly, in percent.
    pub fn prediction_accuracy(&self) -> f64 {
        if self.branches == 0 {
            0.0
        } else {
            100.0 * (self.branches - self.branch_mispredictions) as f64 / self.branches as f64
        }
    }

    /// Average ROB occupancy observed at a misprediction.
    pub fn average_rob_occupancy_at_mispredict(&self) -> f64 {
        if self.branch_mispredictions == 0 {
            0.0
        } else {
            self.rob_occupancy_at_mispredict as f64 / self.branch_mispredictions as f64
        }
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// Each element of `sections` should be one of [`STATS_SECTIONS`]. Pass an
    /// empty slice to print all sections (same as `print()`).
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64();

        if want("summary") {
            let kips = if seconds > 0.0 {
                (self.instructions_retired as f64 / seconds) / 1000.0
            } else {
                0.0
            };
            println!("\n==========================================================");
            println!("OUT-OF-ORDER CORE SIMULATION STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {seconds:.4} s");
            println!("sim_cycles               {}", self.cycles);
            println!("sim_insts                {}", self.instructions_retired);
            println!("sim_insts_fetched        {}", self.instructions_fetched);
            println!("sim_ipc                  {:.4}", self.ipc());
            println!("sim_kips                 {kips:.2}");
            println!("----------------------------------------------------------");
        }
        if want("branch") {
            println!("BRANCH PREDICTION");
            println!("  bp.lookups             {}", self.branches);
            println!("  bp.mispredicts         {}", self.branch_mispredictions);
            println!("  bp.accuracy            {:.2}%", self.prediction_accuracy());
            println!("  bp.mpki                {:.4}", self.branch_mpki());
            println!(
                "  bp.rob_at_mispredict   {:.2}",
                self.average_rob_occupancy_at_mispredict()
            );
            for ty in BranchType::ALL.iter().skip(1) {
                println!(
                    "  {:<22} {:<10} miss: {}",
                    ty.name(),
                    self.branch_types[ty.index()],
                    self.branch_type_misses[ty.index()]
                );
            }
            println!("----------------------------------------------------------");
        }
        if want("frontend") {
            println!("FRONTEND");
            println!("  fetch.stall_cycles     {}", self.fetch_stall_cycles);
            println!("  dib.hits               {}", self.dib_hits);
            println!(
                "  code_pf requested: {} | issued: {} | dropped: {}",
                self.code_prefetches_requested,
                self.code_prefetches_issued,
                self.code_prefetches_dropped
            );
            println!("----------------------------------------------------------");
        }
        if want("memory") {
            println!("MEMORY PIPELINE");
            println!("  lsq.store_forwards     {}", self.store_forwards);
            println!("  lsq.lq_full            {}", self.lq_full_events);
            println!("  lsq.sq_full            {}", self.sq_full_events);
            println!("  lsq.sta_wait           {}", self.sta_wait_events);
            println!("  mem.rejected           {}", self.rejected_requests);
            println!("  retire.write_stalls    {}", self.retire_write_stalls);
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
