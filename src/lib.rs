// lib.rs
pub mod accumulate;
pub mod align;
pub mod error;
pub mod event;
pub mod grouping;
pub mod merge;
pub mod onehot;
pub mod output;
pub mod pareto;
pub mod pipeline;
pub mod sorter;
pub mod stats;
