use clap::Parser;

/// This is a tabulation program for ranked proposals, using pairwise (Copeland) comparisons.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The manifest describing the choices and the scoring rules, in JSON format.
    /// For more information about the file format, read the manual of the copeland_ranking crate.
    #[clap(short, long, value_parser)]
    pub manifest: String,

    /// (file path) The votes, as exported from the governance platform, in JSON format.
    #[clap(short = 'i', long, value_parser)]
    pub votes: String,

    /// (file path, optional) Another export of votes for the same proposal. If provided, the summary
    /// also contains how each choice moved between the baseline and the votes.
    #[clap(short, long, value_parser)]
    pub baseline: Option<String>,

    /// (file path) A reference file containing the summary in JSON format. If provided, the program will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// If passed as an argument, the ranked choices are also funded from the budget pools.
    #[clap(long, takes_value = false)]
    pub allocate: bool,

    /// (default 4500000) The overall budget pool for the allocation.
    #[clap(long, value_parser)]
    pub total_budget: Option<u64>,

    /// (default 1500000) The part of the budget that can be paid over two years.
    #[clap(long, value_parser)]
    pub long_stream_budget: Option<u64>,

    /// (default 10) Only the choices ranked within this many positions may be paid over two years.
    #[clap(long, value_parser)]
    pub long_stream_slots: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
