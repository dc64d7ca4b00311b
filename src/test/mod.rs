//! Hypothesis testing.


pub use ttest::{mean, ttest_ind, TTestResult};
