// Application layer: concrete pipelines, output writing and job dispatch.

pub mod output;
pub mod pipelines;
pub mod runner;
