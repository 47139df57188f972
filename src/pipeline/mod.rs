// =============================================================================
// pipeline/mod.rs — THE MATCHMAKING ASSEMBLY LINE
// =============================================================================
//
// Four stations, strictly in order:
//
//   sampler    — picks lanes out of the flow table and bolts an imaginary
//                truck, driver, and pair of coordinates onto each one
//   economics  — prices every draft: revenue, deadhead fuel, net profit
//   ranker     — stars the k orders nearest each driver hub
//   matcher    — drops the unprofitable, truncates, and ships the views
//
// Every station is a pure function over the previous station's output.
// No stage reaches back upstream, no stage keeps state between requests,
// and the whole line can be rerun bit-for-bit identically from a single
// seed. Assembly lines that remember things are how you get haunted
// factories.
// =============================================================================

pub mod economics;
pub mod matcher;
pub mod ranker;
pub mod sampler;

pub use matcher::MatchPipeline;
