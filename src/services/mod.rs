pub mod cancel;
pub mod classifier;
pub mod flag_gate;
pub mod fs_service;
pub mod image_selector;
pub mod output_writer;
pub mod predict_loop;
pub mod ranker;
pub mod watcher;
