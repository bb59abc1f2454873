mod match_feed;

pub use match_feed::*;
