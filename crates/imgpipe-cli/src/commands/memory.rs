//! Engine memory report.

use crate::MemoryArgs;
use anyhow::Result;
use imgpipe::Runtime;

/// Runs the memory command.
pub fn run(args: MemoryArgs, runtime: &Runtime) -> Result<()> {
    if args.drop_cache {
        runtime.drop_cache();
    }
    let stats = runtime.memory_stats();
    let config = runtime.config();

    println!("Engine:        {}", runtime.state());
    println!("Memory:        {}", super::format_size(stats.memory.max(0) as u64));
    println!("High-water:    {}", super::format_size(stats.memory_highwater.max(0) as u64));
    println!("Allocations:   {}", stats.allocations);
    println!("Concurrency:   {}", config.concurrency);
    println!(
        "Cache limits:  {} / {} ops",
        super::format_size(config.max_cache_mem),
        config.max_cache_ops
    );

    if args.dump {
        runtime.debug_dump();
    }
    Ok(())
}
