mod jsonl;

pub use jsonl::{WorldHeader, export_jsonl, import_jsonl};
