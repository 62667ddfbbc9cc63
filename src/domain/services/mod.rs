pub mod alarm_evaluator;
pub mod converter;

pub use alarm_evaluator::AlarmEvaluator;
pub use converter::{ChannelConverter, ChannelFailure, ConversionOutcome};
