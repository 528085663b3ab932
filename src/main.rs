mod args;
mod tally;

use clap::Parser;
use copeland_ranking::AllocationBudgets;
use log::{debug, warn};

fn main() {
    let args = args::Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
    debug!("args: {:?}", args);

    let budgets = if args.allocate {
        let defaults = AllocationBudgets::DEFAULT_BUDGETS;
        Some(AllocationBudgets {
            total: args.total_budget.unwrap_or(defaults.total),
            long_stream: args.long_stream_budget.unwrap_or(defaults.long_stream),
            long_stream_slots: args.long_stream_slots.unwrap_or(defaults.long_stream_slots),
        })
    } else {
        None
    };

    let res = tally::run_proposal(
        args.manifest,
        args.votes,
        args.baseline,
        budgets,
        args.out,
        args.reference,
    );

    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
