pub mod block_builder;
pub mod budget;
pub mod chains;
pub mod dsearch;
pub mod events;
pub mod kpi;
pub mod lower_bound;
pub mod master;
pub mod pool;
pub mod pricing;
pub mod rules;
pub mod run;
pub mod signing;
pub mod simplex;
pub mod time;
