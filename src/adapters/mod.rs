// Adapters layer: concrete implementations for external systems (files, workbooks).

pub mod sheet;
pub mod storage;
